//! Generative model clients for MediConnect.
//!
//! Defines the [`TextGenerator`] and [`ImageGenerator`] seams used by the
//! chatbot and the avatar resolver, plus REST clients for the hosted Gemini
//! and Imagen models. Scripted fakes for tests live in `mock`, compiled only
//! with the `test-utils` feature.

pub mod error;
pub mod gemini;
pub mod generator;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::LlmError;
pub use gemini::{GeminiClient, ImagenClient};
pub use generator::{with_timeout, GeneratedImage, ImageConstraints, ImageGenerator, TextGenerator};
