//! Authentication gate.
//!
//! The request-level entry point of authentication. For each request it
//! extracts the bearer token, makes sure key material is loaded, and asks the
//! verifier for an identity.
//!
//! Key material is loaded lazily by the first request that finds the store
//! empty. Loading is single-flight: concurrent first requests wait on one
//! fetch instead of each hitting the provider. A failed fetch leaves the
//! store as it was, so the next request tries again.
//!
//! An unknown `kid` may mean the provider rotated its keys. The gate then
//! re-fetches once and retries, unless the cached key set is younger than
//! the refresh cooldown.

use crate::auth::claims::VerifiedIdentity;
use crate::auth::jwks::KeySetFetcher;
use crate::auth::jwt::TokenVerifier;
use crate::auth::key_store::{KeyMaterial, KeyMaterialStore};
use crate::errors::AuthError;
use crate::observability::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::instrument;

/// Extract the token from an `Authorization` header value.
///
/// Requires the literal `Bearer ` scheme followed by a non-empty token with
/// no whitespace.
///
/// # Errors
///
/// Returns `AuthError::NoToken` for any other shape, including a missing header.
pub fn extract_bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let header = authorization.ok_or_else(|| {
        tracing::debug!(target: "wishlist.auth.gate", "Missing Authorization header");
        AuthError::NoToken
    })?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "wishlist.auth.gate", "Invalid Authorization header format");
        AuthError::NoToken
    })?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        tracing::debug!(target: "wishlist.auth.gate", "Invalid bearer token format");
        return Err(AuthError::NoToken);
    }

    Ok(token)
}

/// Orchestrates key loading and token verification for each request.
pub struct AuthGate {
    fetcher: KeySetFetcher,

    store: Arc<KeyMaterialStore>,

    verifier: TokenVerifier,

    /// Minimum snapshot age before an unknown `kid` may trigger a re-fetch.
    refresh_cooldown: Duration,

    /// Serializes key set fetches.
    population: Mutex<()>,
}

impl AuthGate {
    /// Create a gate over a shared key material store.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetcher for the provider's key set
    /// * `store` - Key material store, usually empty at startup
    /// * `verifier` - Token verifier
    /// * `refresh_cooldown` - Minimum age of the cached key set before an
    ///   unknown `kid` triggers a re-fetch. Zero re-fetches on every miss.
    pub fn new(
        fetcher: KeySetFetcher,
        store: Arc<KeyMaterialStore>,
        verifier: TokenVerifier,
        refresh_cooldown: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            verifier,
            refresh_cooldown,
            population: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<KeyMaterialStore> {
        &self.store
    }

    /// Authenticate a request from its `Authorization` header value.
    ///
    /// A missing or malformed header is rejected before any key loading.
    ///
    /// # Errors
    ///
    /// - `NoToken` - No usable bearer token
    /// - `KeySetUnavailable` - Key material could not be loaded
    /// - Any verifier error, unchanged
    #[instrument(skip_all, name = "wishlist.auth.gate")]
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<VerifiedIdentity, AuthError> {
        let result = self.authenticate_inner(authorization).await;

        match &result {
            Ok(_) => metrics::record_auth_attempt("authenticated"),
            Err(e) => {
                tracing::debug!(target: "wishlist.auth.gate", reason = e.kind(), "Authentication rejected");
                metrics::record_auth_attempt(e.kind());
            }
        }

        result
    }

    async fn authenticate_inner(
        &self,
        authorization: Option<&str>,
    ) -> Result<VerifiedIdentity, AuthError> {
        let token = extract_bearer_token(authorization)?;

        let keys = self.ensure_keys().await?;

        match self.verifier.verify(token, &keys) {
            Err(AuthError::UnknownSigningKey) => self.retry_after_refresh(token, keys).await,
            result => result,
        }
    }

    /// Return the current key material, fetching it first if the store is empty.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` if the store is empty and the
    /// fetch fails or yields no usable keys.
    pub async fn ensure_keys(&self) -> Result<Arc<KeyMaterial>, AuthError> {
        let snapshot = self.store.snapshot().await;
        if !snapshot.is_empty() {
            return Ok(snapshot);
        }

        let _guard = self.population.lock().await;

        // Another request may have populated the store while we waited
        let snapshot = self.store.snapshot().await;
        if !snapshot.is_empty() {
            return Ok(snapshot);
        }

        tracing::info!(target: "wishlist.auth.gate", "Key material empty, fetching key set");

        let loaded = match self.fetcher.fetch().await {
            Ok(published) => self.store.populate(&published).await,
            Err(_) => 0,
        };
        if loaded == 0 {
            tracing::warn!(
                target: "wishlist.availability",
                "Identity provider keys unavailable, rejecting until a fetch succeeds"
            );
            return Err(AuthError::KeySetUnavailable);
        }

        Ok(self.store.snapshot().await)
    }

    /// Handle an unknown `kid` by re-fetching the key set at most once.
    ///
    /// `stale` is the snapshot the token failed against.
    async fn retry_after_refresh(
        &self,
        token: &str,
        stale: Arc<KeyMaterial>,
    ) -> Result<VerifiedIdentity, AuthError> {
        let guard = self.population.lock().await;

        let current = self.store.snapshot().await;
        if !Arc::ptr_eq(&current, &stale) {
            // Refreshed by another request while we waited
            drop(guard);
            return self.verifier.verify(token, &current);
        }

        if current
            .age()
            .is_some_and(|age| age < self.refresh_cooldown)
        {
            tracing::debug!(
                target: "wishlist.auth.gate",
                "Unknown kid within refresh cooldown, not re-fetching"
            );
            return Err(AuthError::UnknownSigningKey);
        }

        tracing::info!(target: "wishlist.auth.gate", "Unknown kid, re-fetching key set");

        let published = match self.fetcher.fetch().await {
            Ok(published) => published,
            Err(_) => {
                tracing::warn!(
                    target: "wishlist.auth.gate",
                    "Key set re-fetch failed, keeping current key material"
                );
                return Err(AuthError::UnknownSigningKey);
            }
        };

        if self.store.populate(&published).await == 0 {
            return Err(AuthError::UnknownSigningKey);
        }

        let refreshed = self.store.snapshot().await;
        drop(guard);

        self.verifier.verify(token, &refreshed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gate_for(server: &MockServer) -> AuthGate {
        let fetcher = KeySetFetcher::new(
            format!("{}/.well-known/jwks.json", server.uri()),
            Duration::from_secs(2),
        )
        .unwrap();

        AuthGate::new(
            fetcher,
            Arc::new(KeyMaterialStore::new()),
            TokenVerifier::new(Duration::ZERO),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_extract_bearer_token_valid() {
        assert_eq!(extract_bearer_token(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        assert_eq!(extract_bearer_token(None), Err(AuthError::NoToken));
    }

    #[test]
    fn test_extract_bearer_token_rejects_other_shapes() {
        for header in [
            "",
            "Bearer",
            "Bearer ",
            "bearer abc.def.ghi",
            "Basic dXNlcjpwYXNz",
            "abc.def.ghi",
            "Bearer abc def",
            "Bearer  abc.def.ghi",
            "Bearer abc.def.ghi\t",
        ] {
            assert_eq!(
                extract_bearer_token(Some(header)),
                Err(AuthError::NoToken),
                "{header:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_token_rejected_without_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gate = gate_for(&server).await;

        assert_eq!(gate.authenticate(None).await, Err(AuthError::NoToken));
        assert_eq!(
            gate.authenticate(Some("Token abc")).await,
            Err(AuthError::NoToken)
        );
        assert!(gate.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_key_set_unavailable_and_store_stays_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let gate = gate_for(&server).await;

        assert_eq!(
            gate.authenticate(Some("Bearer a.b.c")).await,
            Err(AuthError::KeySetUnavailable)
        );
        assert!(gate.store().is_empty().await);

        // Not poisoned: the next request fetches again
        assert_eq!(
            gate.authenticate(Some("Bearer a.b.c")).await,
            Err(AuthError::KeySetUnavailable)
        );
    }

    #[tokio::test]
    async fn test_key_set_without_usable_keys_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [{"kid": "ec-key", "kty": "EC", "crv": "P-256"}]
            })))
            .mount(&server)
            .await;

        let gate = gate_for(&server).await;

        assert!(matches!(
            gate.ensure_keys().await,
            Err(AuthError::KeySetUnavailable)
        ));
        assert!(gate.store().is_empty().await);
    }
}
