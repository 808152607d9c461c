//! Ordered avatar fallback chain.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::Rng;
use tracing::{debug, warn};
use url::Url;

use mediconnect_core::config::AvatarConfig;
use mediconnect_core::{AvatarMethod, AvatarResult};
use mediconnect_llm::{with_timeout, ImageConstraints, ImageGenerator, TextGenerator};

use crate::error::TierError;
use crate::samples::{gender_prompt, half_for, hash_index, parse_gender};
use crate::style::{parse_style_reply, style_prompt, style_url};
use crate::tier::AvatarTier;

/// Used when the configured placeholder base URL cannot be parsed.
const DEFAULT_PLACEHOLDER_BASE: &str = "https://ui-avatars.com/api/";

const PORTRAIT_NEGATIVE_PROMPT: &str = "text, watermark, logo, cartoon, distorted face";

/// Input to a single resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvatarRequest {
    pub name: String,
    pub description: Option<String>,
    /// Ask for image synthesis. Ignored when no image generator is wired in.
    pub use_imagen: bool,
}

impl AvatarRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_imagen(mut self, use_imagen: bool) -> Self {
        self.use_imagen = use_imagen;
        self
    }

    fn description_text(&self) -> &str {
        self.description.as_deref().map(str::trim).unwrap_or("")
    }
}

/// Picks or synthesizes a profile picture, degrading tier by tier.
pub struct AvatarResolver {
    config: AvatarConfig,
    text: Option<Arc<dyn TextGenerator>>,
    image: Option<Arc<dyn ImageGenerator>>,
    image_constraints: ImageConstraints,
    ai_timeout: Duration,
    image_timeout: Duration,
}

impl AvatarResolver {
    /// A resolver with no generative capabilities; only the offline tiers
    /// can succeed until generators are attached.
    pub fn new(config: AvatarConfig) -> Self {
        let ai_timeout = Duration::from_secs(config.ai_timeout_secs.max(1));
        Self {
            config,
            text: None,
            image: None,
            image_constraints: ImageConstraints::default(),
            ai_timeout,
            image_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.text = Some(generator);
        self
    }

    pub fn with_image_generator(
        mut self,
        generator: Arc<dyn ImageGenerator>,
        constraints: ImageConstraints,
        timeout: Duration,
    ) -> Self {
        self.image = Some(generator);
        self.image_constraints = constraints;
        self.image_timeout = timeout;
        self
    }

    /// Override the timeout applied to each auxiliary text-generation call.
    pub fn with_ai_timeout(mut self, timeout: Duration) -> Self {
        self.ai_timeout = timeout;
        self
    }

    /// Run the full chain. Never fails.
    pub async fn resolve(&self, request: &AvatarRequest) -> AvatarResult {
        self.resolve_with(&AvatarTier::ORDER, request).await
    }

    /// Run only the [`AvatarTier::OFFLINE`] tiers. Synchronous, for page
    /// rendering.
    pub fn resolve_offline(&self, name: &str, description: &str) -> AvatarResult {
        for tier in AvatarTier::OFFLINE {
            match self.attempt_offline(tier, name, description) {
                Ok(result) => return result,
                Err(e) => debug!(tier = %tier, reason = %e, "offline avatar tier unavailable"),
            }
        }
        self.placeholder()
    }

    /// Run `tiers` in order, returning the first success. Falls through to a
    /// placeholder if every listed tier declines.
    pub async fn resolve_with(&self, tiers: &[AvatarTier], request: &AvatarRequest) -> AvatarResult {
        for &tier in tiers {
            match self.attempt(tier, request).await {
                Ok(result) => {
                    debug!(tier = %tier, name = %request.name, "avatar resolved");
                    return result;
                }
                Err(TierError::Skipped(reason)) => {
                    debug!(tier = %tier, reason = %reason, "avatar tier skipped");
                }
                Err(e) => {
                    warn!(tier = %tier, error = %e, "avatar tier failed, advancing");
                }
            }
        }
        self.placeholder()
    }

    async fn attempt(
        &self,
        tier: AvatarTier,
        request: &AvatarRequest,
    ) -> Result<AvatarResult, TierError> {
        match tier {
            AvatarTier::GeneratedImage => self.generated_image(request).await,
            AvatarTier::AiStyle => self.ai_style(request).await,
            AvatarTier::ClassifiedSample => self.classified_sample(request).await,
            offline => self.attempt_offline(offline, &request.name, request.description_text()),
        }
    }

    fn attempt_offline(
        &self,
        tier: AvatarTier,
        name: &str,
        description: &str,
    ) -> Result<AvatarResult, TierError> {
        match tier {
            AvatarTier::HashedSample => self.hashed_sample(name, description),
            AvatarTier::Placeholder => Ok(self.placeholder()),
            other => Err(TierError::Skipped(format!("{} needs the network", other))),
        }
    }

    async fn generated_image(&self, request: &AvatarRequest) -> Result<AvatarResult, TierError> {
        if !request.use_imagen {
            return Err(TierError::Skipped("image synthesis not requested".to_string()));
        }
        let generator = self
            .image
            .as_ref()
            .ok_or_else(|| TierError::Skipped("no image generator".to_string()))?;

        let prompt = portrait_prompt(&request.name, request.description_text());
        let image = with_timeout(
            self.image_timeout,
            generator.generate(&prompt, &self.image_constraints),
        )
        .await?;
        if image.bytes.is_empty() {
            return Err(TierError::Failed("empty image".to_string()));
        }
        let url = format!(
            "data:{};base64,{}",
            image.mime_type,
            BASE64.encode(&image.bytes)
        );
        Ok(AvatarResult::new(url, AvatarMethod::GeneratedImage))
    }

    async fn ai_style(&self, request: &AvatarRequest) -> Result<AvatarResult, TierError> {
        let description = request.description_text();
        if description.is_empty() {
            return Err(TierError::Skipped("no description".to_string()));
        }
        let generator = self
            .text
            .as_ref()
            .ok_or_else(|| TierError::Skipped("no text generator".to_string()))?;

        let prompt = style_prompt(&request.name, description);
        let reply = with_timeout(self.ai_timeout, generator.generate(&prompt)).await?;
        let style = parse_style_reply(&reply, &request.name).map_err(TierError::Failed)?;
        let url = style_url(&self.config.style_base_url, &style)
            .map_err(|e| TierError::Failed(format!("bad style URL: {}", e)))?;

        let mut result = AvatarResult::new(url, AvatarMethod::AiStyle);
        result.style = Some(style);
        Ok(result)
    }

    async fn classified_sample(&self, request: &AvatarRequest) -> Result<AvatarResult, TierError> {
        let generator = self
            .text
            .as_ref()
            .ok_or_else(|| TierError::Skipped("no text generator".to_string()))?;
        if request.name.trim().is_empty() && request.description_text().is_empty() {
            return Err(TierError::Skipped("nothing to classify".to_string()));
        }

        let prompt = gender_prompt(&request.name, request.description_text());
        let reply = with_timeout(self.ai_timeout, generator.generate(&prompt)).await?;
        let gender = parse_gender(&reply)
            .ok_or_else(|| TierError::Failed(format!("unrecognized classification: {}", reply.trim())))?;

        let half = half_for(&self.config.sample_images, gender)
            .ok_or_else(|| TierError::Skipped("not enough sample images".to_string()))?;
        let index = hash_index(&request.name, request.description_text(), half.len())
            .ok_or_else(|| TierError::Skipped("no sample images".to_string()))?;
        Ok(AvatarResult::new(
            half[index].clone(),
            AvatarMethod::ClassifiedSample,
        ))
    }

    fn hashed_sample(&self, name: &str, description: &str) -> Result<AvatarResult, TierError> {
        let samples = &self.config.sample_images;
        let index = hash_index(name, description, samples.len())
            .ok_or_else(|| TierError::Skipped("no sample images".to_string()))?;
        Ok(AvatarResult::new(
            samples[index].clone(),
            AvatarMethod::HashedSample,
        ))
    }

    fn placeholder(&self) -> AvatarResult {
        let number: u32 = rand::rng().random_range(1..=100);
        let params = [
            ("name", format!("Dr {}", number)),
            ("size", "128".to_string()),
            ("background", "random".to_string()),
            ("bold", "true".to_string()),
        ];
        let url = Url::parse_with_params(&self.config.placeholder_base_url, &params)
            .or_else(|_| Url::parse_with_params(DEFAULT_PLACEHOLDER_BASE, &params))
            .map(String::from)
            .unwrap_or_else(|_| DEFAULT_PLACEHOLDER_BASE.to_string());
        AvatarResult::new(url, AvatarMethod::Placeholder)
    }
}

fn portrait_prompt(name: &str, description: &str) -> String {
    let mut prompt = format!(
        "Professional headshot portrait of a doctor named {}",
        name.trim()
    );
    if !description.is_empty() {
        prompt.push_str(". ");
        prompt.push_str(description);
    }
    prompt.push_str(
        ". Friendly expression, white coat, plain light background, soft studio lighting, photorealistic.",
    );
    prompt
}

/// Image constraints for portrait synthesis at the given aspect ratio.
pub fn portrait_constraints(aspect_ratio: &str) -> ImageConstraints {
    ImageConstraints {
        aspect_ratio: aspect_ratio.to_string(),
        negative_prompt: Some(PORTRAIT_NEGATIVE_PROMPT.to_string()),
    }
}
