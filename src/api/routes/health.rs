//! Liveness route.

use crate::health::LIVENESS_MESSAGE;

/// GET /: static liveness message.
pub async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}
