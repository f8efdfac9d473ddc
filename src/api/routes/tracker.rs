//! Issue tracker routes.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use super::reject_body;
use crate::api::models::IssueFetchRequest;
use crate::api::server::AppState;

/// POST /authenticate: verify credentials and remember the session.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<IssueFetchRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return reject_body(rejection),
    };

    match state.gateway.authenticate(&request).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            warn!(domain = %request.domain, error = %e, "Authentication failed");
            e.into_response()
        }
    }
}

/// POST /fetch-stories: an epic and its stories.
pub async fn fetch_stories(
    State(state): State<Arc<AppState>>,
    body: Result<Json<IssueFetchRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return reject_body(rejection),
    };

    match state.gateway.fetch_stories(&request).await {
        Ok(stories) => Json(stories).into_response(),
        Err(e) => {
            warn!(
                domain = %request.domain,
                epic = request.jira_id.as_deref().unwrap_or(""),
                error = %e,
                "Fetching stories failed"
            );
            e.into_response()
        }
    }
}
