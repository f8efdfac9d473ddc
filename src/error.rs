//! Error types for the casegen gateway.
//!
//! Every collaborator failure is funnelled into [`GatewayError`], which also
//! knows how to render itself as an HTTP response for the axum handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Gateway-wide error taxonomy.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The issue tracker rejected the supplied credentials.
    #[error("Authentication failed: Invalid credentials")]
    Auth,

    /// Any other issue tracker failure. `status` is the upstream HTTP status
    /// when one was received.
    #[error("Tracker error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// The generative-language collaborator failed.
    #[error("Error generating test cases: {0}")]
    Generation(String),

    /// Missing or malformed request fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// Build an upstream error without a status code (transport failures,
    /// undecodable bodies).
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status reported to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Generation(_) | Self::Config(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
