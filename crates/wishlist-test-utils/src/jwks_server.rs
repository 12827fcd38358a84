//! Mocked identity provider JWKS endpoint
//!
//! Wraps a `wiremock` server that serves `/.well-known/jwks.json`, with
//! helpers for publishing fixture keys, simulating outages and counting
//! fetches.

use crate::crypto_fixtures::TestKeypair;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the provider serves its key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Build a JWKS document publishing `keys`.
pub fn jwks_document(keys: &[&TestKeypair]) -> Value {
    let keys: Vec<Value> = keys.iter().map(|k| k.jwk_json()).collect();
    json!({ "keys": keys })
}

/// Mock JWKS endpoint.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwksServer::start().await;
/// jwks.publish(&[&TestKeypair::new(1, "key-1")]).await;
/// assert_eq!(jwks.fetch_count().await, 0);
/// ```
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Full URL of the key set endpoint.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Serve `keys` on every fetch.
    pub async fn publish(&self, keys: &[&TestKeypair]) {
        self.respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
            .await;
    }

    /// Serve `keys`, delaying each response.
    ///
    /// Keeps a fetch in flight long enough for concurrent requests to pile up.
    pub async fn publish_with_delay(&self, keys: &[&TestKeypair], delay: Duration) {
        self.respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks_document(keys))
                .set_delay(delay),
        )
        .await;
    }

    /// Serve an arbitrary JSON body.
    pub async fn publish_raw(&self, body: Value) {
        self.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .await;
    }

    /// Fail every fetch with `status`.
    pub async fn fail_with(&self, status: u16) {
        self.respond_with(ResponseTemplate::new(status)).await;
    }

    /// Replace whatever is currently served with `template`.
    pub async fn respond_with(&self, template: ResponseTemplate) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Number of key set fetches received since the last change of response.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }
}
