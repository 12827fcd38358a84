//! Token verification against cached key material.
//!
//! Verifies identity provider tokens using RS256 keys from the key material
//! store.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted; the header `alg` is pinned before any
//!   cryptography runs (algorithm-substitution prevention)
//! - The signature is verified before any claim is trusted
//! - Expiration is required; `nbf` is enforced when present
//! - Generic error messages prevent information leakage

use crate::auth::claims::VerifiedIdentity;
use crate::auth::key_store::KeyMaterial;
use crate::errors::AuthError;
use common::jwt::{extract_header, JwtValidationError, RS256};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::instrument;

/// RS256 token verifier.
///
/// Holds no key state. Verification is a pure function of the token, the
/// key material snapshot passed in, and the clock.
pub struct TokenVerifier {
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier.
    ///
    /// # Arguments
    ///
    /// * `clock_skew` - Leeway applied to `exp` and `nbf`. Zero means a token
    ///   that expired one second ago is rejected.
    pub fn new(clock_skew: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = clock_skew.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // Keys are fetched per user pool, so any key that verifies the
        // signature already pins the issuer. ID tokens carry `aud`, access
        // tokens carry `client_id`; neither is checked here.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self { validation }
    }

    /// Verify a token and return the identity it carries.
    ///
    /// # Checks, in order
    ///
    /// 1. Size and structure: three segments, decodable header with `kid`
    /// 2. `kid` lookup in `keys`
    /// 3. Header `alg` must be RS256
    /// 4. RS256 signature over header and payload
    /// 5. `exp` (required) and `nbf` (when present) against the clock
    /// 6. Required identity claims (`sub`, username, `email`) and integer
    ///    `exp`/`nbf`
    ///
    /// # Errors
    ///
    /// - `MalformedToken` - Fails structural checks, or a non-integer `nbf`
    /// - `UnknownSigningKey` - `kid` not in `keys`
    /// - `InvalidSignature` - Wrong algorithm or signature mismatch
    /// - `TokenExpired` / `TokenNotYetValid` - Temporal claim violation
    /// - `IncompleteClaims` - Required claims missing
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str, keys: &KeyMaterial) -> Result<VerifiedIdentity, AuthError> {
        let header = extract_header(token).map_err(|e| {
            tracing::debug!(target: "wishlist.auth.jwt", error = ?e, "Token header extraction failed");
            match e {
                JwtValidationError::TokenTooLarge
                | JwtValidationError::MalformedToken
                | JwtValidationError::MissingKid => AuthError::MalformedToken,
            }
        })?;

        let Some(key) = keys.get(&header.kid) else {
            tracing::debug!(target: "wishlist.auth.jwt", kid = %header.kid, "Signing key not in key material");
            return Err(AuthError::UnknownSigningKey);
        };

        if header.alg != RS256 {
            tracing::warn!(
                target: "wishlist.auth.jwt",
                kid = %header.kid,
                alg = %header.alg,
                "Token rejected: algorithm is not RS256"
            );
            return Err(AuthError::InvalidSignature);
        }

        let token_data =
            decode::<Map<String, Value>>(token, key, &self.validation).map_err(|e| {
                tracing::debug!(target: "wishlist.auth.jwt", error = %e, "Token verification failed");
                map_decode_error(e.kind())
            })?;

        let identity = VerifiedIdentity::from_claims(&token_data.claims)?;

        tracing::debug!(target: "wishlist.auth.jwt", kid = %header.kid, "Token verified successfully");
        Ok(identity)
    }
}

/// Map a `jsonwebtoken` failure onto the authentication error taxonomy.
fn map_decode_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::Base64(_) => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        ErrorKind::MissingRequiredClaim(_) => AuthError::IncompleteClaims,
        _ => AuthError::MalformedToken,
    }
}
