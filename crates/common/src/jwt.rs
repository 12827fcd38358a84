//! JWT utilities shared across wishlist backend components.
//!
//! This module provides the pre-verification helpers used by the token
//! verifier:
//! - Size limits for DoS prevention
//! - Clock skew bounds for temporal claim validation
//! - Header extraction (`kid` and `alg`) without signature verification
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned here is trusted until the signature has been verified
//!   with a key selected from a trusted JWKS
//! - Error messages are intentionally generic to prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_header, RS256};
//!
//! let header = extract_header(token)?;
//! let key = key_material.get(&header.kid).ok_or(UnknownSigningKey)?;
//! if header.alg != RS256 {
//!     return Err(InvalidSignature);
//! }
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity provider tokens are typically 800-1500 bytes (RS256 signature plus
/// profile claims). JWTs larger than this are rejected BEFORE any base64
/// decoding or cryptographic operation.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Maximum allowed clock skew tolerance (10 minutes).
///
/// Bounds the leeway applied to `exp` and `nbf` so a misconfiguration cannot
/// keep expired tokens alive for long.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// The only signing algorithm accepted for identity provider tokens.
pub const RS256: &str = "RS256";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT header.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing a string `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,
}

// =============================================================================
// Header Types
// =============================================================================

/// The unverified fields of a JWT header needed to select a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Key ID naming the published key that signed the token.
    pub kid: String,

    /// Algorithm claimed by the token. Must be checked against [`RS256`].
    pub alg: String,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` and `alg` from a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The `kid` value should only be used for key lookup in a trusted JWKS
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not exactly three segments, bad base64, header is not a
///   JSON object, or `alg` is missing or not a string
/// - `MissingKid` - Header `kid` is missing, empty, or not a string
pub fn extract_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(_payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(
            target: "common.jwt",
            parts = token.split('.').count(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_part)
        .map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
            JwtValidationError::MalformedToken
        })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    if !header.is_object() {
        tracing::debug!(target: "common.jwt", "Token rejected: header is not a JSON object");
        return Err(JwtValidationError::MalformedToken);
    }

    // Empty kid values are rejected, they can never match a published key
    let kid = header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)?;

    let alg = header
        .get("alg")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .ok_or_else(|| {
            tracing::debug!(target: "common.jwt", "Token rejected: header alg missing");
            JwtValidationError::MalformedToken
        })?;

    Ok(TokenHeader { kid, alg })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        format!("{header_b64}.payload.signature")
    }

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_max_clock_skew_is_10_minutes() {
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }

    #[test]
    fn test_extract_header_valid_token() {
        let token = token_with_header(r#"{"alg":"RS256","kid":"abc"}"#);

        let header = extract_header(&token).unwrap();
        assert_eq!(header.kid, "abc");
        assert_eq!(header.alg, "RS256");
    }

    #[test]
    fn test_extract_header_keeps_foreign_alg_for_caller() {
        // alg is reported verbatim; pinning is the verifier's job
        let token = token_with_header(r#"{"alg":"HS256","kid":"abc"}"#);

        let header = extract_header(&token).unwrap();
        assert_eq!(header.alg, "HS256");
    }

    #[test]
    fn test_extract_header_rejects_padded_header() {
        // 25 bytes of JSON, so standard encoding ends in "=="
        let header_b64 = base64::engine::general_purpose::URL_SAFE
            .encode(r#"{"alg":"RS256","kid":"k"}"#);
        assert!(header_b64.ends_with('='));
        let token = format!("{header_b64}.payload.signature");

        assert_eq!(extract_header(&token), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_extract_header_wrong_segment_count() {
        assert_eq!(
            extract_header("only.two"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            extract_header("a.b.c.d"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(extract_header("single"), Err(JwtValidationError::MalformedToken));
        assert_eq!(extract_header(""), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_extract_header_invalid_base64() {
        assert_eq!(
            extract_header("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_extract_header_invalid_json() {
        let token = token_with_header("not-json");
        assert_eq!(extract_header(&token), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_extract_header_json_array_rejected() {
        let token = token_with_header(r#"["RS256","abc"]"#);
        assert_eq!(extract_header(&token), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_extract_header_missing_kid() {
        let token = token_with_header(r#"{"alg":"RS256"}"#);
        assert_eq!(extract_header(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_extract_header_non_string_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":12345}"#);
        assert_eq!(extract_header(&token), Err(JwtValidationError::MissingKid));

        let token = token_with_header(r#"{"alg":"RS256","kid":null}"#);
        assert_eq!(extract_header(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_extract_header_empty_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        assert_eq!(extract_header(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_extract_header_missing_alg() {
        let token = token_with_header(r#"{"kid":"abc"}"#);
        assert_eq!(extract_header(&token), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_extract_header_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            extract_header(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_extract_header_at_size_limit() {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"key"}"#);
        let remaining = MAX_JWT_SIZE_BYTES - header_b64.len() - 2; // -2 for two dots
        let payload_len = remaining / 2;
        let sig_len = remaining - payload_len;
        let token = format!(
            "{}.{}.{}",
            header_b64,
            "a".repeat(payload_len),
            "b".repeat(sig_len)
        );

        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);
        assert_eq!(extract_header(&token).unwrap().kid, "key");
    }

    #[test]
    fn test_error_messages_are_generic() {
        for err in [
            JwtValidationError::TokenTooLarge,
            JwtValidationError::MalformedToken,
            JwtValidationError::MissingKid,
        ] {
            assert_eq!(err.to_string(), "The access token is invalid or expired");
        }
    }
}
