//! Test server harness for E2E testing
//!
//! Provides `TestWishlistServer` for spawning real wishlist service instances
//! in tests.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wishlist_service::config::Config;
use wishlist_service::observability::metrics::init_metrics_recorder;
use wishlist_service::routes::{self, AppState};

/// The Prometheus recorder is process-global and can only be installed once.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the wishlist service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_profile_flow_e2e() -> Result<()> {
///     let jwks = MockJwksServer::start().await;
///     let server = TestWishlistServer::spawn(&jwks.jwks_url()).await?;
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/auth/profile", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestWishlistServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestWishlistServer {
    /// Spawn a server whose key set comes from `jwks_url`.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start with an empty key store
    /// - Re-fetch the key set on every unknown `kid` (no cooldown)
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with(jwks_url, &[]).await
    }

    /// Spawn a server with extra environment-style configuration overrides.
    pub async fn spawn_with(
        jwks_url: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("AWS_REGION".to_string(), "us-east-1".to_string()),
            (
                "COGNITO_USER_POOL_ID".to_string(),
                "us-east-1_testPool".to_string(),
            ),
            ("COGNITO_JWKS_URL".to_string(), jwks_url.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
            ("JWKS_REFRESH_COOLDOWN_SECONDS".to_string(), "0".to_string()),
            ("SHUTDOWN_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(
            AppState::new(config)
                .map_err(|e| anyhow::anyhow!("Failed to create app state: {}", e))?,
        );

        // Build routes using the service's real route builder
        let app = routes::build_routes(Arc::clone(&state), metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the shared application state (gate and key store).
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

impl Drop for TestWishlistServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestWishlistServer::spawn("http://127.0.0.1:9/.well-known/jwks.json").await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.addr().ip().is_loopback());

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }
}
