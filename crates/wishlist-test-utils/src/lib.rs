//! # Wishlist Test Utilities
//!
//! Shared test utilities for the wishlist service.
//!
//! This crate provides:
//! - Fixed RSA-2048 keypairs (reproducible signing keys and JWKs)
//! - Test data builders (`TestTokenBuilder`)
//! - A mocked identity provider JWKS endpoint (`MockJwksServer`)
//! - Server test harness (`TestWishlistServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wishlist_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keypair = TestKeypair::new(1, "key-1");
//!     let jwks = MockJwksServer::start().await;
//!     jwks.publish(&[&keypair]).await;
//!
//!     let token = keypair.sign_token(&TestTokenBuilder::new().for_user("u1").build());
//!     let server = TestWishlistServer::spawn(&jwks.jwks_url()).await?;
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use server_harness::*;
pub use token_builders::*;
