// Prometheus metrics for the review client
//
// - API requests (counter, by method and outcome)
// - Usage refreshes (counter, by outcome)
// - Feedback resolution updates (counter, by action)

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("api_requests_total", "Total number of review service requests"),
        &["method", "outcome"]
    ).expect("Failed to create API requests metric");

    pub static ref USAGE_REFRESH_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("usage_refresh_total", "Usage refresh calls by outcome"),
        &["outcome"]
    ).expect("Failed to create usage refresh metric");

    pub static ref FEEDBACK_RESOLUTION_UPDATES_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new(
            "feedback_resolution_updates_total",
            "Local feedback resolution changes"
        ),
        &["action"]
    ).expect("Failed to create feedback resolution metric");
}

/// Initialize metrics registry - call once at startup
pub fn init() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(API_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(USAGE_REFRESH_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FEEDBACK_RESOLUTION_UPDATES_TOTAL.clone()))?;
    Ok(())
}

/// Render all registered metrics in Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_api_request(method: &str, outcome: &str) {
    API_REQUESTS_TOTAL.with_label_values(&[method, outcome]).inc();
}

pub fn record_usage_refresh(outcome: &str) {
    USAGE_REFRESH_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_resolution_update(resolved: bool) {
    let action = if resolved { "resolved" } else { "unresolved" };
    FEEDBACK_RESOLUTION_UPDATES_TOTAL
        .with_label_values(&[action])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let before = USAGE_REFRESH_TOTAL.with_label_values(&["cached"]).get();
        record_usage_refresh("cached");
        record_usage_refresh("cached");
        let after = USAGE_REFRESH_TOTAL.with_label_values(&["cached"]).get();
        assert!(after >= before + 2);
    }

    #[test]
    fn test_gather_after_init() {
        // Registration may already have happened in another test
        let _ = init();
        record_api_request("GET", "ok");
        let text = gather();
        assert!(text.contains("api_requests_total"));
    }
}
