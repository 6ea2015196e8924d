//! Client-side metrics
//!
//! Emitted through the `metrics` facade; they are no-ops until the host
//! installs a recorder.
//!
//! - `api_client_requests_total` (counter): labels `method`, `status`
//! - `api_client_token_refresh_total` (counter): label `outcome`
//! - `api_client_queued_requests_total` (counter)

/// Record a completed HTTP exchange.
pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "api_client_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a settled refresh, `outcome` is `success` or `failure`.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("api_client_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a request queued behind an in-flight refresh.
pub fn record_queued() {
    metrics::counter!("api_client_queued_requests_total").increment(1);
}
