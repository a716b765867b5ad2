//! Reply selection strategies for the delivery simulator

use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Canned replies a buddy sends back
pub const DEFAULT_REPLIES: &[&str] = &[
    "Salamat sa message! 😊",
    "Noted po! I'll get back to you soon.",
    "Okay po, maraming salamat!",
    "That sounds good! Let me check.",
    "Ingat palagi! 💪",
    "Sure, I can help with that.",
    "Naintindihan ko na po. Thank you!",
];

/// What a strategy knows about the message being answered
#[derive(Debug, Clone, Copy)]
pub struct ReplyContext<'a> {
    pub conversation_id: &'a str,
    pub participant_id: &'a str,
    pub participant_name: &'a str,
    pub outbound: &'a str,
}

/// Picks the content of the next simulated reply
pub trait ReplyStrategy: Send + Sync {
    fn choose_reply(&self, context: &ReplyContext<'_>) -> String;
}

fn phrases_or_default(phrases: Vec<String>) -> Vec<String> {
    if phrases.is_empty() {
        DEFAULT_REPLIES.iter().map(|s| (*s).to_string()).collect()
    } else {
        phrases
    }
}

/// Uniform random choice over a fixed phrase set
#[derive(Debug, Clone)]
pub struct RandomReplies {
    phrases: Vec<String>,
}

impl RandomReplies {
    pub fn new(phrases: Vec<String>) -> Self {
        Self {
            phrases: phrases_or_default(phrases),
        }
    }
}

impl Default for RandomReplies {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ReplyStrategy for RandomReplies {
    fn choose_reply(&self, _context: &ReplyContext<'_>) -> String {
        let mut rng = rand::thread_rng();
        self.phrases
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_REPLIES[0].to_string())
    }
}

/// Walks the phrase set in order, wrapping around. Deterministic.
#[derive(Debug)]
pub struct RotatingReplies {
    phrases: Vec<String>,
    next: AtomicUsize,
}

impl RotatingReplies {
    pub fn new(phrases: Vec<String>) -> Self {
        Self {
            phrases: phrases_or_default(phrases),
            next: AtomicUsize::new(0),
        }
    }
}

impl Default for RotatingReplies {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ReplyStrategy for RotatingReplies {
    fn choose_reply(&self, _context: &ReplyContext<'_>) -> String {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.phrases.len();
        self.phrases[index].clone()
    }
}

/// Strategy selector used by configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StrategyKind {
    #[default]
    Random,
    Rotate,
}

impl StrategyKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "random" => Some(Self::Random),
            "rotate" | "rotating" => Some(Self::Rotate),
            _ => None,
        }
    }

    pub fn build(self) -> Arc<dyn ReplyStrategy> {
        match self {
            Self::Random => Arc::new(RandomReplies::default()),
            Self::Rotate => Arc::new(RotatingReplies::default()),
        }
    }
}
