//! Error types for the model clients.

use std::time::Duration;

/// Errors from a text or image generation call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("model returned no content")]
    EmptyResponse,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else {
            LlmError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Upstream {
            status: 429,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "upstream error (429): quota exceeded");

        let err = LlmError::Timeout(Duration::from_secs(15));
        assert_eq!(err.to_string(), "timed out after 15s");

        assert_eq!(LlmError::EmptyResponse.to_string(), "model returned no content");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: LlmError = json_err.into();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
