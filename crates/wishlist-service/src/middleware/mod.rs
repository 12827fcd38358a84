//! Middleware for the wishlist service.
//!
//! # Components
//!
//! - `auth` - Authentication middleware and identity extractors
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthState, AuthenticatedUser, IdentityExt};
pub use http_metrics::http_metrics_middleware;
