//! Response models for the wishlist service HTTP surface.

use crate::auth::{TokenUse, VerifiedIdentity};
use serde::Serialize;

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Identity provider key set status ("available" or "unavailable").
    pub identity_keys: &'static str,

    /// Number of cached verification keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_count: Option<usize>,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for `GET /auth/profile`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    /// Subject identifier.
    pub sub: String,

    /// Login name.
    pub username: String,

    /// Email address.
    pub email: String,

    /// Provider token kind, when stated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_use: Option<TokenUse>,

    /// Token expiration timestamp.
    pub exp: i64,
}

impl From<VerifiedIdentity> for ProfileResponse {
    fn from(identity: VerifiedIdentity) -> Self {
        Self {
            sub: identity.subject,
            username: identity.username,
            email: identity.email,
            token_use: identity.token_use,
            exp: identity.expires_at,
        }
    }
}
