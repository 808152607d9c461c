//! REST clients for the hosted Gemini text model and Imagen image model.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mediconnect_core::config::{ImageConfig, LlmConfig};

use crate::error::LlmError;
use crate::generator::{GeneratedImage, ImageConstraints, ImageGenerator, TextGenerator};

/// Upstream error bodies are truncated to this many bytes.
const MAX_ERROR_BODY_BYTES: usize = 2048;

const API_KEY_HEADER: &str = "x-goog-api-key";

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    message: Option<String>,
}

// =============================================================================
// Gemini text client
// =============================================================================

/// Text generation through the `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: &LlmConfig) -> Result<Self, LlmError> {
        let http = build_http(config.timeout_secs)?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: api_key.into(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "gemini generateContent");
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: GenerateContentResponse = parse_json_response(resp).await?;
        extract_text(parsed)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(resp: GenerateContentResponse) -> Result<String, LlmError> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

// =============================================================================
// Imagen image client
// =============================================================================

/// Image generation through the `predict` endpoint.
#[derive(Debug, Clone)]
pub struct ImagenClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ImagenClient {
    /// Build a client sharing the base URL of the text model.
    pub fn new(
        api_key: impl Into<String>,
        llm: &LlmConfig,
        image: &ImageConfig,
    ) -> Result<Self, LlmError> {
        let http = build_http(image.timeout_secs)?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/models/{}:predict",
                llm.base_url.trim_end_matches('/'),
                image.model
            ),
            api_key: api_key.into(),
            model: image.model.clone(),
        })
    }
}

#[async_trait]
impl ImageGenerator for ImagenClient {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &ImageConstraints,
    ) -> Result<GeneratedImage, LlmError> {
        debug!(model = %self.model, "imagen predict");
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: full_image_prompt(prompt, constraints),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: constraints.aspect_ratio.clone(),
            },
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: PredictResponse = parse_json_response(resp).await?;
        extract_image(parsed)
    }
}

fn full_image_prompt(prompt: &str, constraints: &ImageConstraints) -> String {
    match constraints.negative_prompt.as_deref() {
        Some(neg) if !neg.trim().is_empty() => format!("{} Avoid: {}.", prompt.trim(), neg.trim()),
        _ => prompt.trim().to_string(),
    }
}

fn extract_image(resp: PredictResponse) -> Result<GeneratedImage, LlmError> {
    let prediction = resp
        .predictions
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;
    let encoded = prediction
        .bytes_base64_encoded
        .filter(|b| !b.is_empty())
        .ok_or(LlmError::EmptyResponse)?;
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| LlmError::InvalidResponse(format!("bad image payload: {}", e)))?;
    Ok(GeneratedImage {
        bytes,
        mime_type: prediction
            .mime_type
            .unwrap_or_else(|| "image/png".to_string()),
    })
}

// =============================================================================
// Shared plumbing
// =============================================================================

fn build_http(timeout_secs: u64) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| LlmError::Request(format!("failed to build http client: {}", e)))
}

async fn parse_json_response<T: for<'de> Deserialize<'de>>(
    resp: reqwest::Response,
) -> Result<T, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }
    let body = match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > MAX_ERROR_BODY_BYTES {
                b.truncate(MAX_ERROR_BODY_BYTES);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            String::new()
        }
    };
    Err(upstream_error(status.as_u16(), &body))
}

fn upstream_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error.message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "unknown upstream error".to_string()
            } else {
                body.trim().to_string()
            }
        });
    LlmError::Upstream { status, message }
}
