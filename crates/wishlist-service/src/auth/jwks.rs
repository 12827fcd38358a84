//! Key set fetcher for the identity provider's published signing keys.
//!
//! Fetches the provider's `/.well-known/jwks.json` document and decodes each
//! published key independently, so one key this service does not understand
//! cannot break authentication for the keys it does.
//!
//! # Security
//!
//! - Every fetch carries a bounded timeout; an endpoint outage degrades to
//!   rejected requests, never hung ones
//! - Response bodies are capped at [`MAX_JWKS_BODY_BYTES`]
//! - Only RSA signing keys usable with RS256 become verification keys

use crate::errors::AuthError;
use crate::observability::metrics;
use common::jwt::RS256;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

/// Maximum accepted size of a JWKS response body (64 KiB).
///
/// Provider key sets hold a handful of RSA-2048 keys, a few KiB at most.
pub const MAX_JWKS_BODY_BYTES: usize = 64 * 1024;

/// Connect timeout for the key set endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the well-known key set URL for a provider user pool.
pub fn cognito_jwks_url(region: &str, user_pool_id: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/{user_pool_id}/.well-known/jwks.json")
}

/// One key as published by the provider.
///
/// Every field is optional at decode time; structure is checked by
/// [`PublishedKey::to_verification_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublishedKey {
    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Key type (must be "RSA").
    #[serde(default)]
    pub kty: Option<String>,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm (must be "RS256" when present).
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (must be "sig" when present).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// Why a published key cannot be used for verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyRejection {
    #[error("key has no kid")]
    MissingKid,

    #[error("unsupported key type {0:?}")]
    UnsupportedKeyType(Option<String>),

    #[error("RSA modulus or exponent missing")]
    MissingComponents,

    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported key use {0}")]
    UnsupportedUse(String),

    #[error("RSA components are not valid base64url")]
    InvalidComponents,
}

/// A published key converted into its locally usable form.
#[derive(Clone)]
pub struct VerificationKey {
    pub kid: String,
    pub key: DecodingKey,
}

impl PublishedKey {
    /// Validate structure and build an RS256 verification key.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyRejection`] naming the first structural problem found.
    pub fn to_verification_key(&self) -> Result<VerificationKey, KeyRejection> {
        let kid = self
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(KeyRejection::MissingKid)?;

        if self.kty.as_deref() != Some("RSA") {
            return Err(KeyRejection::UnsupportedKeyType(self.kty.clone()));
        }

        let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
            return Err(KeyRejection::MissingComponents);
        };
        if n.is_empty() || e.is_empty() {
            return Err(KeyRejection::MissingComponents);
        }

        if let Some(alg) = self.alg.as_deref().filter(|alg| *alg != RS256) {
            return Err(KeyRejection::UnsupportedAlgorithm(alg.to_string()));
        }
        if let Some(key_use) = self.key_use.as_deref().filter(|u| *u != "sig") {
            return Err(KeyRejection::UnsupportedUse(key_use.to_string()));
        }

        let key = DecodingKey::from_rsa_components(n, e)
            .map_err(|_| KeyRejection::InvalidComponents)?;

        Ok(VerificationKey {
            kid: kid.to_string(),
            key,
        })
    }
}

/// JWKS document. Entries are kept raw so each decodes on its own.
#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Value>,
}

/// Fetches the provider's published key set.
///
/// Holds no key state; caching belongs to the key material store.
pub struct KeySetFetcher {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client with bounded timeouts.
    http_client: reqwest::Client,
}

impl KeySetFetcher {
    /// Create a new fetcher.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the provider's JWKS endpoint
    /// * `timeout` - Total timeout for one fetch
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn new(jwks_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()?;

        Ok(Self {
            jwks_url,
            http_client,
        })
    }

    /// The endpoint this fetcher reads from.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch the key set with a single GET.
    ///
    /// Returns every entry that decodes as a key object. Structural
    /// validation of each key happens when the store is populated.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` on transport failure, a non-2xx
    /// status, an oversized or undecodable body, or a set with no entries.
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    pub async fn fetch(&self) -> Result<Vec<PublishedKey>, AuthError> {
        let start = Instant::now();
        let result = self.fetch_inner().await;

        let status = match &result {
            Ok(_) => "success",
            Err(_) => "error",
        };
        metrics::record_jwks_fetch(status, start.elapsed());

        result
    }

    async fn fetch_inner(&self) -> Result<Vec<PublishedKey>, AuthError> {
        tracing::debug!(target: "wishlist.auth.jwks", "Fetching JWKS from identity provider");

        let mut response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "wishlist.auth.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::KeySetUnavailable
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "wishlist.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySetUnavailable);
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_JWKS_BODY_BYTES as u64)
        {
            tracing::error!(target: "wishlist.auth.jwks", "JWKS response exceeds size limit");
            return Err(AuthError::KeySetUnavailable);
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            tracing::error!(target: "wishlist.auth.jwks", error = %e, "Failed to read JWKS response");
            AuthError::KeySetUnavailable
        })? {
            if body.len() + chunk.len() > MAX_JWKS_BODY_BYTES {
                tracing::error!(target: "wishlist.auth.jwks", "JWKS response exceeds size limit");
                return Err(AuthError::KeySetUnavailable);
            }
            body.extend_from_slice(&chunk);
        }

        let keys = parse_key_set(&body)?;

        tracing::info!(
            target: "wishlist.auth.jwks",
            key_count = keys.len(),
            "JWKS fetched"
        );

        Ok(keys)
    }
}

/// Decode a JWKS body, dropping entries that are not key objects.
fn parse_key_set(body: &[u8]) -> Result<Vec<PublishedKey>, AuthError> {
    let document: JwksDocument = serde_json::from_slice(body).map_err(|e| {
        tracing::error!(target: "wishlist.auth.jwks", error = %e, "Failed to parse JWKS response");
        AuthError::KeySetUnavailable
    })?;

    let keys: Vec<PublishedKey> = document
        .keys
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<PublishedKey>(entry) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::debug!(target: "wishlist.auth.jwks", error = %e, "Skipping undecodable JWKS entry");
                None
            }
        })
        .collect();

    if keys.is_empty() {
        tracing::error!(target: "wishlist.auth.jwks", "JWKS contains no keys");
        return Err(AuthError::KeySetUnavailable);
    }

    Ok(keys)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // Any well-formed base64url strings decode; the key is only checked
    // cryptographically when a signature is verified.
    fn rsa_key(kid: &str) -> PublishedKey {
        PublishedKey {
            kid: Some(kid.to_string()),
            kty: Some("RSA".to_string()),
            n: Some("uYsImoJKizGZtiR0HIGULTmVoPIj0X9jp1bs".to_string()),
            e: Some("AQAB".to_string()),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
        }
    }

    #[test]
    fn test_cognito_jwks_url() {
        assert_eq!(
            cognito_jwks_url("eu-west-2", "eu-west-2_AbCdEf123"),
            "https://cognito-idp.eu-west-2.amazonaws.com/eu-west-2_AbCdEf123/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_published_key_deserialization() {
        let json = r#"{
            "kid": "abc",
            "kty": "RSA",
            "n": "modulus",
            "e": "AQAB",
            "alg": "RS256",
            "use": "sig"
        }"#;

        let key: PublishedKey = serde_json::from_str(json).unwrap();

        assert_eq!(key.kid.as_deref(), Some("abc"));
        assert_eq!(key.kty.as_deref(), Some("RSA"));
        assert_eq!(key.n.as_deref(), Some("modulus"));
        assert_eq!(key.e.as_deref(), Some("AQAB"));
        assert_eq!(key.alg.as_deref(), Some("RS256"));
        assert_eq!(key.key_use.as_deref(), Some("sig"));
    }

    #[test]
    fn test_published_key_deserialization_minimal() {
        let key: PublishedKey = serde_json::from_str("{}").unwrap();
        assert_eq!(key, PublishedKey::default());
    }

    #[test]
    fn test_to_verification_key_accepts_rsa_signing_key() {
        let key = rsa_key("abc").to_verification_key().unwrap();
        assert_eq!(key.kid, "abc");
    }

    #[test]
    fn test_to_verification_key_accepts_absent_alg_and_use() {
        let key = PublishedKey {
            alg: None,
            key_use: None,
            ..rsa_key("abc")
        };
        assert!(key.to_verification_key().is_ok());
    }

    #[test]
    fn test_to_verification_key_rejects_missing_or_empty_kid() {
        let key = PublishedKey {
            kid: None,
            ..rsa_key("abc")
        };
        assert_eq!(
            key.to_verification_key().err(),
            Some(KeyRejection::MissingKid)
        );

        let key = rsa_key("");
        assert_eq!(
            key.to_verification_key().err(),
            Some(KeyRejection::MissingKid)
        );
    }

    #[test]
    fn test_to_verification_key_rejects_non_rsa_key_type() {
        let key = PublishedKey {
            kty: Some("EC".to_string()),
            ..rsa_key("abc")
        };
        assert_eq!(
            key.to_verification_key().err(),
            Some(KeyRejection::UnsupportedKeyType(Some("EC".to_string())))
        );

        let key = PublishedKey {
            kty: None,
            ..rsa_key("abc")
        };
        assert_eq!(
            key.to_verification_key().err(),
            Some(KeyRejection::UnsupportedKeyType(None))
        );
    }

    #[test]
    fn test_to_verification_key_rejects_missing_components() {
        let key = PublishedKey {
            n: None,
            ..rsa_key("abc")
        };
        assert_eq!(
            key.to_verification_key().err(),
            Some(KeyRejection::MissingComponents)
        );

        let key = PublishedKey {
            e: Some(String::new()),
            ..rsa_key("abc")
        };
        assert_eq!(
            key.to_verification_key().err(),
            Some(KeyRejection::MissingComponents)
        );
    }

    #[test]
    fn test_to_verification_key_rejects_other_algorithms() {
        let key = PublishedKey {
            alg: Some("RS512".to_string()),
            ..rsa_key("abc")
        };
        assert_eq!(
            key.to_verification_key().err(),
            Some(KeyRejection::UnsupportedAlgorithm("RS512".to_string()))
        );
    }

    #[test]
    fn test_to_verification_key_rejects_encryption_keys() {
        let key = PublishedKey {
            key_use: Some("enc".to_string()),
            ..rsa_key("abc")
        };
        assert_eq!(
            key.to_verification_key().err(),
            Some(KeyRejection::UnsupportedUse("enc".to_string()))
        );
    }

    #[test]
    fn test_to_verification_key_rejects_invalid_base64() {
        let key = PublishedKey {
            n: Some("not base64!!".to_string()),
            ..rsa_key("abc")
        };
        assert_eq!(
            key.to_verification_key().err(),
            Some(KeyRejection::InvalidComponents)
        );
    }

    #[test]
    fn test_parse_key_set_skips_non_object_entries() {
        let body = br#"{"keys": [
            {"kid": "a", "kty": "RSA", "n": "bW9k", "e": "AQAB"},
            "garbage",
            42,
            {"kid": "b", "kty": "EC"}
        ]}"#;

        let keys = parse_key_set(body).unwrap();

        assert_eq!(keys.len(), 2);
        assert_eq!(keys.first().unwrap().kid.as_deref(), Some("a"));
        assert_eq!(keys.get(1).unwrap().kid.as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_key_set_rejects_empty_set() {
        assert_eq!(
            parse_key_set(br#"{"keys": []}"#).err(),
            Some(AuthError::KeySetUnavailable)
        );
        assert_eq!(
            parse_key_set(br#"{"keys": [1, 2]}"#).err(),
            Some(AuthError::KeySetUnavailable)
        );
    }

    #[test]
    fn test_parse_key_set_rejects_bad_documents() {
        for body in [
            &b"not json"[..],
            &br#"{"keys": "nope"}"#[..],
            &br#"{"other": []}"#[..],
            &b"[]"[..],
        ] {
            assert_eq!(
                parse_key_set(body).err(),
                Some(AuthError::KeySetUnavailable)
            );
        }
    }

    #[test]
    fn test_fetcher_creation() {
        let fetcher = KeySetFetcher::new(
            "http://localhost:8082/.well-known/jwks.json".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();
        assert_eq!(
            fetcher.jwks_url(),
            "http://localhost:8082/.well-known/jwks.json"
        );
    }

    /// A key set serialized to exactly `len` bytes, padded with an extra member.
    fn key_set_of_size(len: usize) -> Vec<u8> {
        let with_padding = |padding: &str| {
            serde_json::to_vec(&serde_json::json!({
                "keys": [{
                    "kid": "k",
                    "kty": "RSA",
                    "n": "uYsImoJKizGZtiR0HIGULTmVoPIj0X9jp1bs",
                    "e": "AQAB",
                    "x-padding": padding
                }]
            }))
            .unwrap()
        };
        let overhead = with_padding("").len();
        let body = with_padding(&"a".repeat(len - overhead));
        assert_eq!(body.len(), len);
        body
    }

    /// Serve `body` once without a Content-Length, so the client has to read
    /// until the connection closes.
    async fn serve_without_length(body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\nconnection: close\r\n\r\n";
            // The client may hang up once the limit is hit
            let _ = socket.write_all(head).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}/.well-known/jwks.json")
    }

    #[tokio::test]
    async fn test_fetch_streamed_body_over_limit() {
        let url = serve_without_length(key_set_of_size(MAX_JWKS_BODY_BYTES + 1)).await;
        let fetcher = KeySetFetcher::new(url, Duration::from_secs(2)).unwrap();

        assert_eq!(fetcher.fetch().await, Err(AuthError::KeySetUnavailable));
    }

    #[tokio::test]
    async fn test_fetch_streamed_body_at_limit() {
        let url = serve_without_length(key_set_of_size(MAX_JWKS_BODY_BYTES)).await;
        let fetcher = KeySetFetcher::new(url, Duration::from_secs(2)).unwrap();

        let keys = fetcher.fetch().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.first().and_then(|k| k.kid.as_deref()), Some("k"));
    }
}
