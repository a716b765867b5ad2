//! Seed data for the conversation store
//!
//! Conversations are never created by the chat core itself; they are loaded
//! here at startup from a JSON file or from the built-in demo set.

use crate::chat::{
    ChatError, ConversationSeed, ConversationStore, Participant, PresenceStatus, SeedMessage,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Actor id used for locally authored messages in the demo seed
pub const DEMO_ACTOR_ID: &str = "me";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid seed conversation: {0}")]
    Chat(#[from] ChatError),
}

/// On-disk seed document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub conversations: Vec<ConversationSeed>,
}

impl SeedFile {
    pub fn read(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load every conversation into the store. Stops at the first invalid
    /// entry.
    pub fn load_into(self, store: &ConversationStore) -> Result<usize, SeedError> {
        let count = self.conversations.len();
        for conversation in self.conversations {
            store.load_conversation(conversation)?;
        }
        tracing::info!(count, "Seeded conversations");
        Ok(count)
    }

    /// A few buddies with some history
    pub fn demo() -> Self {
        fn said(sender: &str, content: &str, read: bool) -> SeedMessage {
            SeedMessage {
                id: None,
                sender_id: sender.to_string(),
                content: content.to_string(),
                timestamp: None,
                read,
            }
        }

        Self {
            conversations: vec![
                ConversationSeed {
                    id: "conv-maria".into(),
                    participant: Participant::new("buddy-maria", "Maria Santos")
                        .with_status(PresenceStatus::Online),
                    messages: vec![
                        said(DEMO_ACTOR_ID, "Kumusta po kayo today?", true),
                        said("buddy-maria", "Okay lang ako, salamat sa pag-check!", false),
                    ],
                },
                ConversationSeed {
                    id: "conv-jose".into(),
                    participant: Participant::new("buddy-jose", "Jose Reyes")
                        .with_status(PresenceStatus::Away),
                    messages: vec![said(
                        "buddy-jose",
                        "Can someone help me buy groceries tomorrow?",
                        true,
                    )],
                },
                ConversationSeed {
                    id: "conv-nena".into(),
                    participant: Participant::new("buddy-nena", "Lola Nena"),
                    messages: Vec::new(),
                },
            ],
        }
    }
}
