use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MediConnectError, Result};

/// Environment variable consulted when `llm.api_key` is not set in the file.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level configuration for the MediConnect application.
///
/// Loaded from `~/.mediconnect/config.toml` by default. Each section
/// corresponds to one collaborator of the web application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediConnectConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
}

impl MediConnectConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MediConnectConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MediConnectError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite database.
    pub data_dir: String,
    /// Directory served under `/static` (sample avatar images, stylesheets).
    pub static_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP listen port.
    pub port: u16,
    /// HTTP bind address.
    pub bind_address: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.mediconnect/data".to_string(),
            static_dir: "static".to_string(),
            log_level: "info".to_string(),
            port: 8000,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// Text-generation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Master switch. When false the chatbot answers with the
    /// service-unavailable message and the avatar resolver skips AI tiers.
    pub enabled: bool,
    /// API key. Falls back to the `GEMINI_API_KEY` environment variable.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// REST base URL.
    pub base_url: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key: file value first, then the environment.
    ///
    /// Blank values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

/// Image-generation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Whether the image generator is wired in at all. It shares the API key
    /// and base URL of the `llm` section.
    pub enabled: bool,
    /// Model name.
    pub model: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Requested aspect ratio, e.g. "1:1".
    pub aspect_ratio: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "imagen-3.0-generate-002".to_string(),
            timeout_secs: 60,
            aspect_ratio: "1:1".to_string(),
        }
    }
}

/// Chatbot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Trailing turns sent to the model with each prompt.
    pub context_turns: usize,
    /// Turns kept in the per-session history.
    pub history_turns: usize,
    /// Maximum number of doctors returned for an AI-derived search.
    pub ai_result_limit: usize,
    /// Maximum accepted message length in characters.
    pub max_message_length: usize,
    /// Sessions idle for longer than this are dropped from the session store.
    pub session_timeout_minutes: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_turns: 6,
            history_turns: 20,
            ai_result_limit: 10,
            max_message_length: 2000,
            session_timeout_minutes: 60,
        }
    }
}

/// Avatar resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Pre-stored sample images. The first half is used for doctors
    /// classified as male, the second half for doctors classified as female.
    pub sample_images: Vec<String>,
    /// Base URL of the parametric avatar service.
    pub style_base_url: String,
    /// Base URL of the initials placeholder service.
    pub placeholder_base_url: String,
    /// Timeout in seconds for each auxiliary text-generation call.
    pub ai_timeout_secs: u64,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            sample_images: (1..=8)
                .map(|i| format!("/static/avatars/doctor_{}.svg", i))
                .collect(),
            style_base_url: "https://api.dicebear.com/7.x".to_string(),
            placeholder_base_url: "https://ui-avatars.com/api/".to_string(),
            ai_timeout_secs: 15,
        }
    }
}
