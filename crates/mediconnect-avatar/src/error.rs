//! Tier outcome errors.

use mediconnect_llm::LlmError;

/// Why a tier did not produce an avatar. Every variant advances the
/// resolver to the next tier.
#[derive(Debug, thiserror::Error)]
pub enum TierError {
    /// The tier's preconditions were not met (capability absent, input empty).
    #[error("skipped: {0}")]
    Skipped(String),
    #[error("failed: {0}")]
    Failed(String),
    #[error("timed out")]
    TimedOut,
}

impl From<LlmError> for TierError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(_) => TierError::TimedOut,
            other => TierError::Failed(other.to_string()),
        }
    }
}
