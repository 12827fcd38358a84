//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks that identity provider keys are loaded

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 once verification keys are loaded, fetching them if the store
/// is still empty, and 503 if they cannot be loaded. Also serves as warm-up:
/// the first probe populates the key store before traffic arrives.
///
/// ## Security
///
/// Error messages are intentionally generic to avoid leaking infrastructure details.
#[tracing::instrument(skip_all, name = "wishlist.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.gate.ensure_keys().await {
        Ok(keys) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                identity_keys: "available",
                key_count: Some(keys.len()),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    identity_keys: "unavailable",
                    key_count: None,
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let result = health_check().await;
        assert_eq!(result, "OK");
    }
}
