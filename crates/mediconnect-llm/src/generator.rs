//! Generator traits shared by the chatbot and the avatar resolver.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;

/// Produces a free-text completion for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Options passed with an image request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageConstraints {
    /// Aspect ratio such as "1:1".
    pub aspect_ratio: String,
    /// Things the image must not contain, appended to the prompt.
    pub negative_prompt: Option<String>,
}

impl Default for ImageConstraints {
    fn default() -> Self {
        Self {
            aspect_ratio: "1:1".to_string(),
            negative_prompt: None,
        }
    }
}

/// Raw bytes of a generated image.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Produces an image for a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &ImageConstraints,
    ) -> Result<GeneratedImage, LlmError>;
}

/// Await `fut`, failing with [`LlmError::Timeout`] once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout(limit)),
    }
}
