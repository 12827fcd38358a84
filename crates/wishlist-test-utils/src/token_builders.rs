//! Builder patterns for test data construction
//!
//! Provides a fluent API for identity provider token claims.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Issuer used by default in test claims.
pub const TEST_ISSUER: &str = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_testPool";

/// Builder for identity provider ID token claims.
///
/// Defaults to a complete, valid ID token expiring in one hour.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("u1")
///     .expires_in(-1)
///     .build();
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let claims = json!({
            "sub": "test-subject",
            "cognito:username": "test-user",
            "email": "test-user@example.com",
            "email_verified": true,
            "token_use": "id",
            "iss": TEST_ISSUER,
            "aud": "test-client-id",
            "exp": (now + Duration::seconds(3600)).timestamp(),
            "iat": now.timestamp(),
        });

        let Value::Object(claims) = claims else {
            unreachable!("json! object literal");
        };

        Self { claims }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set the provider username claim
    pub fn with_username(self, username: &str) -> Self {
        self.with_claim("cognito:username", json!(username))
    }

    /// Set the email claim
    pub fn with_email(self, email: &str) -> Self {
        self.with_claim("email", json!(email))
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Set `nbf` in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        let nbf = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("nbf", json!(nbf))
    }

    /// Set an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creates_valid_claims() {
        let claims = TestTokenBuilder::new()
            .for_user("alice-sub")
            .with_username("alice")
            .with_email("alice@example.com")
            .build();

        assert_eq!(claims["sub"], "alice-sub");
        assert_eq!(claims["cognito:username"], "alice");
        assert_eq!(claims["email"], "alice@example.com");
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_default() {
        let claims = TestTokenBuilder::default().build();
        assert_eq!(claims["sub"], "test-subject");
        assert_eq!(claims["token_use"], "id");
    }

    #[test]
    fn test_builder_expired() {
        let claims = TestTokenBuilder::new().expires_in(-1).build();
        assert!(claims["exp"].as_i64().unwrap() < Utc::now().timestamp());
    }

    #[test]
    fn test_builder_without_claim() {
        let claims = TestTokenBuilder::new().without("email").build();
        assert!(claims.get("email").is_none());
    }
}
