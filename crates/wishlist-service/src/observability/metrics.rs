//! Metrics definitions for the wishlist service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `wishlist_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: known routes plus `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`: `authenticated` plus one value per `AuthError::kind()`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("wishlist_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Key set fetches are bounded by the fetch timeout (max 60s)
        .set_buckets_for_metric(
            Matcher::Prefix("wishlist_jwks_fetch".to_string()),
            &[
                0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000, 30.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `wishlist_http_requests_total`, `wishlist_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("wishlist_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("wishlist_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/auth/profile" => "/auth/profile",
        _ => "/other",
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record the outcome of one authentication attempt.
///
/// Metric: `wishlist_auth_attempts_total`
/// Labels: `outcome` (`authenticated` or an `AuthError::kind()` label)
pub fn record_auth_attempt(outcome: &'static str) {
    counter!("wishlist_auth_attempts_total", "outcome" => outcome).increment(1);
}

/// Record one key set fetch.
///
/// Metric: `wishlist_jwks_fetch_total`, `wishlist_jwks_fetch_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("wishlist_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("wishlist_jwks_fetch_total", "status" => status).increment(1);
}

/// Set the number of verification keys currently cached.
///
/// Metric: `wishlist_jwks_keys_cached`
pub fn set_jwks_keys_cached(count: usize) {
    gauge!("wishlist_jwks_keys_cached").set(count as f64);
}
