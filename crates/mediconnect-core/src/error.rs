use thiserror::Error;

/// Top-level error type for MediConnect.
///
/// Subsystem crates define their own error types and implement
/// `From<MediConnectError>` (or the reverse) so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MediConnectError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(i64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MediConnectError {
    fn from(err: toml::de::Error) -> Self {
        MediConnectError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MediConnectError {
    fn from(err: toml::ser::Error) -> Self {
        MediConnectError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MediConnectError {
    fn from(err: serde_json::Error) -> Self {
        MediConnectError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for MediConnect operations.
pub type Result<T> = std::result::Result<T, MediConnectError>;
