//! Environment-driven configuration

use crate::chat::StoreOptions;
use crate::delivery::StrategyKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const PORT_VAR: &str = "SAFEZONE_PORT";
pub const REPLY_DELAY_VAR: &str = "SAFEZONE_REPLY_DELAY_MS";
pub const REPLY_STRATEGY_VAR: &str = "SAFEZONE_REPLY_STRATEGY";
pub const SEED_PATH_VAR: &str = "SAFEZONE_SEED_PATH";
pub const EVENT_CAPACITY_VAR: &str = "SAFEZONE_EVENT_CAPACITY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub reply_delay: Duration,
    pub reply_strategy: StrategyKind,
    /// JSON seed file. The built-in demo seed is used when unset.
    pub seed_path: Option<PathBuf>,
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        let store = StoreOptions::default();
        Self {
            port: 8000,
            reply_delay: store.reply_delay,
            reply_strategy: StrategyKind::default(),
            seed_path: None,
            event_capacity: store.event_capacity,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset variables keep their
    /// defaults; set but malformed ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = parse_var(PORT_VAR, lookup(PORT_VAR))?.unwrap_or(defaults.port);
        let reply_delay = parse_var::<u64>(REPLY_DELAY_VAR, lookup(REPLY_DELAY_VAR))?
            .map_or(defaults.reply_delay, Duration::from_millis);
        let reply_strategy = match lookup(REPLY_STRATEGY_VAR) {
            None => defaults.reply_strategy,
            Some(value) => StrategyKind::parse(&value).ok_or(ConfigError::Invalid {
                var: REPLY_STRATEGY_VAR,
                value,
            })?,
        };
        let seed_path = lookup(SEED_PATH_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let capacity = parse_var::<usize>(EVENT_CAPACITY_VAR, lookup(EVENT_CAPACITY_VAR))?;
        let event_capacity = match capacity {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    var: EVENT_CAPACITY_VAR,
                    value: "0".to_string(),
                })
            }
            Some(capacity) => capacity,
            None => defaults.event_capacity,
        };

        Ok(Self {
            port,
            reply_delay,
            reply_strategy,
            seed_path,
            event_capacity,
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            reply_delay: self.reply_delay,
            event_capacity: self.event_capacity,
        }
    }
}
