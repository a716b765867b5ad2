//! Conversation and message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Presence shown next to a buddy's name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Away,
    #[default]
    Offline,
}

/// The other party of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: PresenceStatus,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: PresenceStatus::default(),
        }
    }

    pub fn with_status(mut self, status: PresenceStatus) -> Self {
        self.status = status;
        self
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Only ever flips from false to true
    pub read: bool,
}

/// A conversation between the local actor and one participant.
///
/// The message log is append-only and kept in chronological order. The
/// unread count is not stored: it is derived from the log on every call, so
/// it always equals the number of participant messages still unread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant: Participant,
    pub messages: Vec<Message>,
    pub last_message_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, participant: Participant) -> Self {
        Self {
            id: id.into(),
            participant,
            messages: Vec::new(),
            last_message_at: Utc::now(),
        }
    }

    /// Number of participant-authored messages not yet marked read
    pub fn unread_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender_id == self.participant.id && !m.read)
            .count()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Case-insensitive substring match on the participant's display name.
    /// An empty query matches everything. Whitespace is matched literally.
    pub fn matches(&self, query: &str) -> bool {
        query.is_empty()
            || self
                .participant
                .name
                .to_lowercase()
                .contains(&query.to_lowercase())
    }

    /// Timestamp for the next appended message: never earlier than the
    /// newest message already in the log.
    pub(crate) fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.messages.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.last_message_at = message.timestamp;
        self.messages.push(message);
    }

    /// Mark every message read. Returns how many flipped.
    pub(crate) fn mark_all_read(&mut self) -> usize {
        let mut flipped = 0;
        for message in self.messages.iter_mut().filter(|m| !m.read) {
            message.read = true;
            flipped += 1;
        }
        flipped
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            participant: self.participant.clone(),
            last_message: self.last_message().cloned(),
            last_message_at: self.last_message_at,
            message_count: self.messages.len(),
            unread_count: self.unread_count(),
        }
    }
}

/// List-view projection of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub participant: Participant,
    pub last_message: Option<Message>,
    pub last_message_at: DateTime<Utc>,
    pub message_count: usize,
    pub unread_count: usize,
}

/// Out-of-band definition of a conversation, used when loading seed data
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationSeed {
    pub id: String,
    pub participant: Participant,
    #[serde(default)]
    pub messages: Vec<SeedMessage>,
}

/// A historical message in a seed file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, read: bool) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender.to_string(),
            content: "hi".to_string(),
            timestamp: Utc::now(),
            read,
        }
    }

    #[test]
    fn test_unread_counts_only_participant_messages() {
        let mut conv = Conversation::new("c1", Participant::new("maria", "Maria"));
        conv.append(message("me", false));
        conv.append(message("maria", false));
        conv.append(message("maria", true));

        assert_eq!(conv.unread_count(), 1);
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let conv = Conversation::new("c1", Participant::new("maria", "Maria Santos"));
        assert!(conv.matches("santos"));
        assert!(conv.matches("MARIA"));
        assert!(conv.matches(""));
        assert!(!conv.matches("jose"));
    }

    #[test]
    fn test_matches_whitespace_literally() {
        let conv = Conversation::new("c1", Participant::new("maria", "Maria Santos"));
        assert!(conv.matches("a s"));
        assert!(conv.matches(" "));
        assert!(!conv.matches("   "));
        assert!(!conv.matches(" maria"));
    }

    #[test]
    fn test_next_timestamp_never_goes_backwards() {
        let mut conv = Conversation::new("c1", Participant::new("maria", "Maria"));
        let mut future = message("maria", false);
        future.timestamp = Utc::now() + chrono::Duration::hours(1);
        let expected = future.timestamp;
        conv.append(future);

        assert_eq!(conv.next_timestamp(), expected);
    }

    #[test]
    fn test_mark_all_read_reports_flips() {
        let mut conv = Conversation::new("c1", Participant::new("maria", "Maria"));
        conv.append(message("maria", false));
        conv.append(message("me", true));

        assert_eq!(conv.mark_all_read(), 1);
        assert_eq!(conv.mark_all_read(), 0);
        assert_eq!(conv.unread_count(), 0);
    }
}
