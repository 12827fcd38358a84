//! Request authentication for the wishlist service.
//!
//! Verifies bearer tokens issued by the identity provider against the
//! provider's published RS256 signing keys.
//!
//! # Components
//!
//! - `jwks` - Fetches the provider's published key set
//! - `key_store` - Holds verification keys from the latest fetch
//! - `jwt` - Verifies a token against a key material snapshot
//! - `claims` - Verified identity extracted from a token
//! - `gate` - Per-request orchestration of the above

pub mod claims;
pub mod gate;
pub mod jwks;
pub mod jwt;
pub mod key_store;

pub use claims::{TokenUse, VerifiedIdentity};
pub use gate::{extract_bearer_token, AuthGate};
pub use jwks::{KeySetFetcher, PublishedKey};
pub use jwt::TokenVerifier;
pub use key_store::{KeyMaterial, KeyMaterialStore};
