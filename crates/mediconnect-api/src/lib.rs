//! MediConnect API crate - axum HTTP server, HTML pages and the JSON
//! avatar endpoint.
//!
//! Serves the doctor directory (list, create, update, delete, profile,
//! search, recommendation), the chatbot page, the avatar generator and a
//! health check.

pub mod error;
pub mod forms;
pub mod handlers;
pub mod pages;
pub mod routes;
pub mod state;

pub use error::{ApiError, PageError};
pub use routes::{create_router, start_server};
pub use state::AppState;
