//! Route handlers.

pub mod health;
pub mod metrics;
pub mod test_cases;
pub mod tracker;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;

/// Render a rejected JSON body. Oversized bodies keep their 413; everything
/// else is a validation failure.
pub(crate) fn reject_body(rejection: JsonRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return rejection.into_response();
    }
    GatewayError::Validation(rejection.body_text()).into_response()
}
