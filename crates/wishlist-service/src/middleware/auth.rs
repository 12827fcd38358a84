//! Authentication middleware for protected routes.
//!
//! `require_auth` runs the authentication gate on the request's
//! `Authorization` header and stores the resulting [`VerifiedIdentity`] in
//! request extensions. Rejections end the request with a 401 before any
//! handler runs.
//!
//! Handlers read the identity through [`AuthenticatedUser`], which exposes
//! only the subject, or through [`IdentityExt`] for the full identity.

use crate::auth::{AuthGate, VerifiedIdentity};
use crate::errors::AuthError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Gate shared by every protected route.
    pub gate: Arc<AuthGate>,
}

/// Authentication middleware.
///
/// # Response
///
/// - Returns 401 Unauthorized if the token is missing or rejected
/// - Continues to next handler with `VerifiedIdentity` in extensions if valid
#[instrument(skip_all, name = "wishlist.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    // A header that is not visible ASCII is treated as absent
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let identity = state.gate.authenticate(authorization).await?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// The authenticated caller, as seen by downstream collaborators.
///
/// Carries only the subject, the key that scopes user data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub subject: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .map(|identity| AuthenticatedUser {
                subject: identity.subject.clone(),
            })
            .ok_or_else(|| {
                tracing::warn!(target: "wishlist.middleware.auth", "Identity missing, is require_auth applied to this route?");
                AuthError::NoToken
            })
    }
}

/// Extension trait for reading the verified identity from a request.
pub trait IdentityExt {
    /// Get the verified identity from request extensions.
    ///
    /// Returns `None` if auth middleware was not applied to this request.
    fn identity(&self) -> Option<&VerifiedIdentity>;
}

impl<B> IdentityExt for axum::extract::Request<B> {
    fn identity(&self) -> Option<&VerifiedIdentity> {
        self.extensions().get::<VerifiedIdentity>()
    }
}
