//! Deterministic generators for tests (`test-utils` feature).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::generator::{GeneratedImage, ImageConstraints, ImageGenerator, TextGenerator};

/// One scripted outcome of a text generation call.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Reply(String),
    Fail(String),
    /// Sleep before replying; used to exercise timeouts.
    Stall(Duration, String),
}

/// Text generator that plays back a script and records every prompt.
///
/// When the script runs out, the `repeat` reply (if any) is returned;
/// otherwise calls fail with [`LlmError::EmptyResponse`].
#[derive(Debug, Default)]
pub struct ScriptedTextGenerator {
    script: Mutex<VecDeque<ScriptStep>>,
    repeat: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedTextGenerator {
    /// Reply with each string in order.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_steps(replies.into_iter().map(|r| ScriptStep::Reply(r.into())))
    }

    pub fn from_steps<I: IntoIterator<Item = ScriptStep>>(steps: I) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            repeat: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply with the same string to every call.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            repeat: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    fn next_step(&self) -> Option<ScriptStep> {
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.or_else(|| self.repeat.clone().map(ScriptStep::Reply))
    }
}

#[async_trait]
impl TextGenerator for ScriptedTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match self.next_step() {
            Some(ScriptStep::Reply(text)) => Ok(text),
            Some(ScriptStep::Fail(message)) => Err(LlmError::Upstream {
                status: 500,
                message,
            }),
            Some(ScriptStep::Stall(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Err(LlmError::EmptyResponse),
        }
    }
}

/// Text generator that always fails.
#[derive(Debug, Default)]
pub struct FailingTextGenerator {
    calls: AtomicUsize,
}

impl FailingTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FailingTextGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::Upstream {
            status: 503,
            message: "service unavailable".to_string(),
        })
    }
}

/// Image generator that returns the same image for every prompt.
#[derive(Debug)]
pub struct StaticImageGenerator {
    image: GeneratedImage,
    calls: AtomicUsize,
}

impl StaticImageGenerator {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            image: GeneratedImage {
                bytes,
                mime_type: mime_type.into(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for StaticImageGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _constraints: &ImageConstraints,
    ) -> Result<GeneratedImage, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.image.clone())
    }
}

/// Image generator that always fails.
#[derive(Debug, Default)]
pub struct FailingImageGenerator {
    calls: AtomicUsize,
}

impl FailingImageGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for FailingImageGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _constraints: &ImageConstraints,
    ) -> Result<GeneratedImage, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::Upstream {
            status: 400,
            message: "image generation is not available".to_string(),
        })
    }
}
