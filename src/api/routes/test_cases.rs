//! Test case generation route.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use super::reject_body;
use crate::api::models::TestCaseRequest;
use crate::api::server::AppState;

/// POST /generate-test-cases: `{content, token_count}` for a story.
pub async fn generate_test_cases(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TestCaseRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return reject_body(rejection),
    };

    match state.gateway.generate_test_cases(&request).await {
        Ok(cases) => Json(cases).into_response(),
        Err(e) => {
            warn!(jira_id = %request.jira_id, error = %e, "Test case generation failed");
            e.into_response()
        }
    }
}
