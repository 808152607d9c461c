pub mod config;
pub mod error;
pub mod types;

pub use config::MediConnectConfig;
pub use error::{MediConnectError, Result};
pub use types::*;
