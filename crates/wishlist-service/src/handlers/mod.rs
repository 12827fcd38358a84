//! HTTP request handlers for the wishlist service.

pub mod health;
pub mod metrics;
pub mod profile;

pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use profile::get_profile;
