//! Request metrics
//!
//! Emitted through the `metrics` facade; the host application decides whether
//! to install a recorder. Without one every call is a no-op.
//!
//! - `pokitdok_requests_total` (counter): labels `status`, `method`
//! - `pokitdok_request_duration_seconds` (histogram): label `status`
//! - `pokitdok_transport_errors_total` (counter): label `error_type`

/// Record a completed API call.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("pokitdok_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("pokitdok_request_duration_seconds", "status" => status_str)
        .record(duration_secs);
}

/// Record a call that failed before a response arrived.
pub fn record_transport_error(error_type: &str) {
    metrics::counter!("pokitdok_transport_errors_total", "error_type" => error_type.to_string())
        .increment(1);
}

/// Classify a reqwest failure for the `error_type` label.
pub fn transport_error_type(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_body() || e.is_decode() {
        "body"
    } else {
        "request"
    }
}
