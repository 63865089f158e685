//! Prometheus metrics: recorder installation, descriptors, and the counters
//! recorded by handlers.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const TOKENS_ISSUED: &str = "streamgate_tokens_issued_total";
pub const AUTH_REJECTIONS: &str = "streamgate_auth_rejections_total";
pub const STREAM_REQUESTS: &str = "streamgate_stream_requests_total";

/// Install the global Prometheus recorder and register descriptors.
///
/// Returns `None` if a recorder is already installed; metrics then go to
/// that recorder and `/metrics` reports that none is available.
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe_all();
            Some(handle)
        }
        Err(e) => {
            tracing::warn!("Failed to install Prometheus recorder: {e}");
            None
        }
    }
}

fn describe_all() {
    describe_counter!(TOKENS_ISSUED, "Stream tokens issued by /token");
    describe_counter!(
        AUTH_REJECTIONS,
        "Stream requests rejected by token auth, by reason"
    );
    describe_counter!(STREAM_REQUESTS, "Authorized stream requests, by outcome");
}

pub fn record_token_issued() {
    counter!(TOKENS_ISSUED).increment(1);
}

/// `reason` is one of `missing_token`, `expired`, `invalid_signature`,
/// `invalid_api_key`.
pub fn record_auth_rejection(reason: &'static str) {
    counter!(AUTH_REJECTIONS, "reason" => reason).increment(1);
}

/// `outcome` is one of `manifest`, `redirect`, `error`.
pub fn record_stream_request(outcome: &'static str) {
    counter!(STREAM_REQUESTS, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_through_local_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_token_issued();
            record_auth_rejection("expired");
            record_stream_request("redirect");
        });

        let rendered = handle.render();
        assert!(rendered.contains("streamgate_tokens_issued_total 1"));
        assert!(rendered.contains(r#"streamgate_auth_rejections_total{reason="expired"} 1"#));
        assert!(rendered.contains(r#"streamgate_stream_requests_total{outcome="redirect"} 1"#));
    }
}
