//! Error types for the chatbot.

use mediconnect_core::error::MediConnectError;
use mediconnect_llm::LlmError;

/// Errors from a chat turn.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("{0}")]
    Llm(String),
    #[error("the AI service did not answer in time")]
    Timeout,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("session error: {0}")]
    Session(String),
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(_) => ChatError::Timeout,
            other => ChatError::Llm(other.to_string()),
        }
    }
}

impl From<MediConnectError> for ChatError {
    fn from(err: MediConnectError) -> Self {
        ChatError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::Session("lock poisoned".to_string()).to_string(),
            "session error: lock poisoned"
        );
    }

    #[test]
    fn test_from_llm_error() {
        let err: ChatError = LlmError::Timeout(Duration::from_secs(30)).into();
        assert!(matches!(err, ChatError::Timeout));

        let err: ChatError = LlmError::Upstream {
            status: 429,
            message: "quota exceeded".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "upstream error (429): quota exceeded");
    }

    #[test]
    fn test_from_storage_error() {
        let err: ChatError = MediConnectError::Storage("disk full".to_string()).into();
        assert!(matches!(err, ChatError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
