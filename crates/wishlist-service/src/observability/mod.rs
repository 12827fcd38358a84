//! Observability for the wishlist service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
