//! Chat error types

use thiserror::Error;

/// Rejected input. Always reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message content is empty")]
    EmptyContent,
    #[error("{field} must not be blank")]
    BlankIdentifier { field: &'static str },
    #[error("unknown conversation: {0}")]
    UnknownConversation(String),
    #[error("{0} is not the participant of this conversation")]
    ForeignSender(String),
    #[error("conversation already exists: {0}")]
    DuplicateConversation(String),
}

/// Errors returned by the conversation store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("conversation not found: {0}")]
    NotFound(String),
}

/// Coarse classification used by callers that map errors to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::Validation(_) => ErrorKind::Validation,
            ChatError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// True when the target conversation no longer exists, whichever way the
    /// operation reports it
    pub fn is_missing_conversation(&self) -> bool {
        matches!(
            self,
            ChatError::NotFound(_) | ChatError::Validation(ValidationError::UnknownConversation(_))
        )
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Reject identifiers that are empty or whitespace
pub(crate) fn require_id(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::BlankIdentifier { field })
    } else {
        Ok(())
    }
}
