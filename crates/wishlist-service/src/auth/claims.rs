//! Verified identity extracted from an authenticated token.
//!
//! Token payloads arrive as loosely typed JSON. They are validated once, at
//! the verifier boundary, into a [`VerifiedIdentity`] with explicit required
//! fields. Nothing downstream inspects raw claims.
//!
//! The `sub` and `email` fields are redacted in Debug output to prevent
//! exposure in logs.

use crate::errors::AuthError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Provider claim carrying the user's login name.
const USERNAME_CLAIM: &str = "cognito:username";

/// Fallback username claim used by access tokens.
const FALLBACK_USERNAME_CLAIM: &str = "username";

/// Which kind of provider token produced the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    /// OpenID Connect ID token.
    Id,
    /// OAuth access token.
    Access,
}

impl TokenUse {
    fn from_claim(value: &str) -> Option<Self> {
        match value {
            "id" => Some(TokenUse::Id),
            "access" => Some(TokenUse::Access),
            _ => None,
        }
    }
}

/// The identity established by a verified token.
///
/// Lives for the duration of one request. Never persisted or cached.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Stable subject identifier. The only field downstream collaborators
    /// use to scope data.
    pub subject: String,

    /// Login name (`cognito:username`, falling back to `username`).
    pub username: String,

    /// Email address of the user.
    pub email: String,

    /// Provider token kind, when the provider states it.
    pub token_use: Option<TokenUse>,

    /// Issuer URL, when present.
    pub issuer: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub expires_at: i64,

    /// Issued-at timestamp (Unix epoch seconds), when present.
    pub issued_at: Option<i64>,
}

impl VerifiedIdentity {
    /// Build an identity from a signature-verified claim set.
    ///
    /// # Errors
    ///
    /// - `IncompleteClaims` - `sub`, the username, `email` or `exp` is missing,
    ///   or an identity field is not a string
    /// - `MalformedToken` - `exp` or `nbf` is present but not an integer
    pub fn from_claims(claims: &Map<String, Value>) -> Result<Self, AuthError> {
        let subject = required_string(claims, "sub")?;
        let username = claims
            .get(USERNAME_CLAIM)
            .or_else(|| claims.get(FALLBACK_USERNAME_CLAIM))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                tracing::debug!(target: "wishlist.auth.jwt", claim = USERNAME_CLAIM, "Required claim missing");
                AuthError::IncompleteClaims
            })?;
        let email = required_string(claims, "email")?;

        let expires_at = numeric_date(claims, "exp")?.ok_or(AuthError::IncompleteClaims)?;

        // The signature library skips an `nbf` it cannot read as a number
        numeric_date(claims, "nbf")?;

        Ok(Self {
            subject,
            username,
            email,
            token_use: claims
                .get("token_use")
                .and_then(Value::as_str)
                .and_then(TokenUse::from_claim),
            issuer: claims
                .get("iss")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            expires_at,
            issued_at: claims.get("iat").and_then(Value::as_i64),
        })
    }
}

fn required_string(claims: &Map<String, Value>, name: &str) -> Result<String, AuthError> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            tracing::debug!(target: "wishlist.auth.jwt", claim = name, "Required claim missing");
            AuthError::IncompleteClaims
        })
}

/// Read a NumericDate claim. Absent is `None`; any non-integer value is malformed.
fn numeric_date(claims: &Map<String, Value>, name: &str) -> Result<Option<i64>, AuthError> {
    match claims.get(name) {
        None => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            tracing::debug!(target: "wishlist.auth.jwt", claim = name, "Temporal claim is not an integer");
            AuthError::MalformedToken
        }),
    }
}

/// Custom Debug implementation that redacts `subject` and `email`.
impl fmt::Debug for VerifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedIdentity")
            .field("subject", &"[REDACTED]")
            .field("username", &self.username)
            .field("email", &"[REDACTED]")
            .field("token_use", &self.token_use)
            .field("issuer", &self.issuer)
            .field("expires_at", &self.expires_at)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}
