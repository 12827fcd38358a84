//! HTTP routes for the wishlist service.
//!
//! Defines the Axum router and application state.

use crate::auth::{AuthGate, KeyMaterialStore, KeySetFetcher, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Authentication gate, owning the process-wide key material store.
    pub gate: Arc<AuthGate>,
}

impl AppState {
    /// Build the state, wiring an empty key store into a new gate.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the JWKS HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let fetcher = KeySetFetcher::new(
            config.jwks_url.clone(),
            Duration::from_secs(config.jwks_fetch_timeout_seconds),
        )?;
        let gate = AuthGate::new(
            fetcher,
            Arc::new(KeyMaterialStore::new()),
            TokenVerifier::new(Duration::from_secs(config.jwt_clock_skew_seconds)),
            Duration::from_secs(config.jwks_refresh_cooldown_seconds),
        );

        Ok(Self {
            config,
            gate: Arc::new(gate),
        })
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/ready` - Readiness probe (loads identity provider keys) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/auth/profile` - Verified identity of the caller - requires authentication
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        gate: Arc::clone(&state.gate),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/auth/profile", get(handlers::get_profile))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_app_state_starts_with_empty_store() {
        let vars = HashMap::from([
            ("AWS_REGION".to_string(), "us-east-1".to_string()),
            (
                "COGNITO_USER_POOL_ID".to_string(),
                "us-east-1_testPool".to_string(),
            ),
        ]);
        let config = Config::from_vars(&vars).unwrap();

        let state = AppState::new(config).unwrap();

        assert!(state.gate.store().is_empty().await);
    }
}
