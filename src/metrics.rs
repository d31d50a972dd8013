use lazy_static::lazy_static;
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

lazy_static! {
    /// Client-owned registry, so host applications can use any metric names.
    pub static ref REGISTRY: Registry = Registry::new();

    // Request metrics
    pub static ref CLIENT_REQUESTS: IntCounterVec = registered(
        IntCounterVec::new(
            Opts::new(
                "rhq_client_requests_total",
                "Total number of requests issued to the metrics service",
            ),
            &["operation"],
        )
        .expect("static counter options are valid"),
    );

    pub static ref CLIENT_FAILURES: IntCounterVec = registered(
        IntCounterVec::new(
            Opts::new(
                "rhq_client_failures_total",
                "Total number of requests that resolved with an error",
            ),
            &["operation"],
        )
        .expect("static counter options are valid"),
    );

    pub static ref CLIENT_REQUEST_DURATION: HistogramVec = registered(
        HistogramVec::new(
            HistogramOpts::new(
                "rhq_client_request_duration_seconds",
                "Time from issuing a request to settling it",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
            &["operation"],
        )
        .expect("static histogram options are valid"),
    );
}

/// Adds `collector` to [`REGISTRY`]. A failed registration only loses the
/// export; the collector keeps counting.
fn registered<C: Collector + Clone + 'static>(collector: C) -> C {
    if let Err(e) = REGISTRY.register(Box::new(collector.clone())) {
        tracing::warn!("Failed to register client metric: {}", e);
    }
    collector
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Post,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Post => "post",
        }
    }
}

/// Counts a request on creation and records its duration on drop.
pub struct RequestTimer {
    operation: Operation,
    start: Instant,
}

impl RequestTimer {
    pub fn new(operation: Operation) -> Self {
        CLIENT_REQUESTS
            .with_label_values(&[operation.as_str()])
            .inc();
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        CLIENT_REQUEST_DURATION
            .with_label_values(&[self.operation.as_str()])
            .observe(duration);
    }
}

pub fn record_failure(operation: Operation) {
    CLIENT_FAILURES
        .with_label_values(&[operation.as_str()])
        .inc();
}

/// Renders [`REGISTRY`] in the Prometheus text format.
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_counts_and_observes() {
        let before = CLIENT_REQUESTS.with_label_values(&["post"]).get();
        let samples = CLIENT_REQUEST_DURATION
            .with_label_values(&["post"])
            .get_sample_count();

        drop(RequestTimer::new(Operation::Post));

        assert!(CLIENT_REQUESTS.with_label_values(&["post"]).get() > before);
        assert!(
            CLIENT_REQUEST_DURATION
                .with_label_values(&["post"])
                .get_sample_count()
                > samples
        );
    }

    #[test]
    fn test_names_free_in_default_registry() {
        prometheus::register_int_counter!(
            "rhq_client_failures_total",
            "Host application counter sharing a client metric name"
        )
        .unwrap();

        record_failure(Operation::Post);
        assert!(CLIENT_FAILURES.with_label_values(&["post"]).get() >= 1);
    }

    #[test]
    fn test_gather_text_lists_client_metrics() {
        record_failure(Operation::Get);
        let text = gather_text();
        assert!(text.contains("rhq_client_failures_total"));
    }
}
