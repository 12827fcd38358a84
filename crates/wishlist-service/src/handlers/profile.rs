//! Authenticated profile handler.

use crate::auth::VerifiedIdentity;
use crate::models::ProfileResponse;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /auth/profile
///
/// Returns the identity established by the auth middleware.
///
/// ## Response
///
/// ```json
/// {
///   "sub": "8c1d2a44-...",
///   "username": "alice",
///   "email": "alice@example.com",
///   "token_use": "id",
///   "exp": 1900000000
/// }
/// ```
#[instrument(skip_all, name = "wishlist.handlers.profile")]
pub async fn get_profile(Extension(identity): Extension<VerifiedIdentity>) -> Json<ProfileResponse> {
    tracing::debug!(target: "wishlist.handlers.profile", "Returning verified identity");

    Json(identity.into())
}
