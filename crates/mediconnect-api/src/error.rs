//! API error types and response formatting.
//!
//! ApiError renders the JSON error body used by the JSON endpoints.
//! PageError wraps it for HTML routes, rendering a small error page with
//! the same status code.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use mediconnect_chat::ChatError;
use mediconnect_core::error::MediConnectError;

use crate::pages;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 404 Not Found - resource does not exist.
    NotFound(String),
    /// 500 Internal Server Error.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!(error = %msg, "Internal error");
        }
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<MediConnectError> for ApiError {
    fn from(err: MediConnectError) -> Self {
        match &err {
            MediConnectError::DoctorNotFound(_) => ApiError::NotFound(err.to_string()),
            MediConnectError::Storage(msg) => ApiError::Internal(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match &err {
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) => {
                ApiError::BadRequest(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

/// Error returned by HTML handlers.
#[derive(Debug)]
pub struct PageError(pub ApiError);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let err = self.0;
        if let ApiError::Internal(msg) = &err {
            tracing::error!(error = %msg, "Internal error");
        }
        let status = err.status();
        let message = match &err {
            ApiError::Internal(_) => "Something went wrong. Please try again.",
            other => other.message(),
        };
        (status, Html(pages::error_page(status, message))).into_response()
    }
}

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        PageError(err)
    }
}

impl From<MediConnectError> for PageError {
    fn from(err: MediConnectError) -> Self {
        PageError(err.into())
    }
}

impl From<ChatError> for PageError {
    fn from(err: ChatError) -> Self {
        PageError(err.into())
    }
}
