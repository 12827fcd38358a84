//! Authentication error types.
//!
//! Every variant maps to HTTP 401 via the `IntoResponse` impl. Messages
//! returned to clients are intentionally generic to avoid leaking which check
//! failed. The specific kind is logged server-side and recorded in metrics.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Generic client-facing message for any presented-but-rejected token.
const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// Realm advertised in `WWW-Authenticate` challenges.
const AUTH_REALM: &str = "wishlist-api";

/// Reasons a request fails authentication.
///
/// The `Display` text is for server logs only and never reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing or malformed Authorization header")]
    NoToken,

    #[error("identity provider key set unavailable")]
    KeySetUnavailable,

    #[error("malformed token")]
    MalformedToken,

    #[error("token signed with unknown key")]
    UnknownSigningKey,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    TokenExpired,

    #[error("token not yet valid")]
    TokenNotYetValid,

    #[error("token missing required identity claims")]
    IncompleteClaims,
}

impl AuthError {
    /// Bounded label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::NoToken => "no_token",
            AuthError::KeySetUnavailable => "key_set_unavailable",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownSigningKey => "unknown_signing_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::IncompleteClaims => "incomplete_claims",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (code, message, challenge) = match self {
            AuthError::NoToken => (
                "MISSING_TOKEN",
                "Authentication required",
                format!("Bearer realm=\"{AUTH_REALM}\""),
            ),
            _ => (
                "INVALID_TOKEN",
                INVALID_TOKEN_MESSAGE,
                format!("Bearer realm=\"{AUTH_REALM}\", error=\"invalid_token\""),
            ),
        };

        let body = ErrorResponse {
            error: ErrorDetail { code, message },
        };

        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();

        if let Ok(header_value) = HeaderValue::from_str(&challenge) {
            response.headers_mut().insert(WWW_AUTHENTICATE, header_value);
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    const ALL: [AuthError; 8] = [
        AuthError::NoToken,
        AuthError::KeySetUnavailable,
        AuthError::MalformedToken,
        AuthError::UnknownSigningKey,
        AuthError::InvalidSignature,
        AuthError::TokenExpired,
        AuthError::TokenNotYetValid,
        AuthError::IncompleteClaims,
    ];

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_kind_labels_are_unique() {
        let mut kinds: Vec<&str> = ALL.iter().map(AuthError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), ALL.len());
    }

    #[tokio::test]
    async fn test_provider_outage_response_matches_invalid_token() {
        let outage = AuthError::KeySetUnavailable.into_response();
        let malformed = AuthError::MalformedToken.into_response();

        assert_eq!(outage.status(), malformed.status());
        assert_eq!(
            outage.headers().get(WWW_AUTHENTICATE),
            malformed.headers().get(WWW_AUTHENTICATE)
        );
        assert_eq!(
            read_body_json(outage.into_body()).await,
            read_body_json(malformed.into_body()).await
        );
    }

    #[tokio::test]
    async fn test_into_response_no_token() {
        let response = AuthError::NoToken.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(challenge, "Bearer realm=\"wishlist-api\"");

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "MISSING_TOKEN");
        assert_eq!(body["error"]["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_into_response_hides_rejection_reason() {
        for err in ALL.into_iter().filter(|e| *e != AuthError::NoToken) {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string();
            assert!(challenge.contains("error=\"invalid_token\""));

            let body = read_body_json(response.into_body()).await;
            assert_eq!(body["error"]["code"], "INVALID_TOKEN");
            assert_eq!(body["error"]["message"], INVALID_TOKEN_MESSAGE);
        }
    }
}
