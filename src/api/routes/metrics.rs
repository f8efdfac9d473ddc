//! Usage and cache counters.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::server::AppState;

/// GET /metrics: usage counters plus per-cache statistics.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<Value> {
    let gateway = &state.gateway;
    Json(json!({
        "usage": gateway.metrics().snapshot(),
        "caches": {
            "sessions": gateway.sessions().stats(),
            "responses": gateway.responses().stats(),
        },
    }))
}
