//! Wishlist Service Library
//!
//! Request authentication for the wishlist backend. Every protected request
//! carries a bearer token issued by the identity provider; this crate
//! verifies it against the provider's published RS256 keys and hands the
//! verified identity to the rest of the request pipeline.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/gate.rs -> auth/jwt.rs
//!                                              |
//!                                              +-> auth/key_store.rs <- auth/jwks.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Key set fetching, key material store, token verification, gate
//! - `config` - Service configuration from environment
//! - `errors` - Authentication errors with HTTP response mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and metrics middleware
//! - `models` - Response models
//! - `observability` - Metrics definitions
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
