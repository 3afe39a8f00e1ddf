use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};

/// Request level instruments. Recording is a no-op until a meter provider is
/// installed.
#[derive(Clone)]
pub struct GatewayMetrics {
    requests: Counter<u64>,
    failures: Counter<u64>,
    detections: Counter<u64>,
    duration: Histogram<f64>,
}

impl GatewayMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 2.0, 5.0, 10.0, 30.0,
        ];

        Self {
            requests: meter
                .u64_counter("detect_requests_total")
                .with_description("Total detection requests received")
                .build(),
            failures: meter
                .u64_counter("detect_failures_total")
                .with_description("Detection requests that ended in an error")
                .build(),
            detections: meter
                .u64_counter("detect_detections_total")
                .with_description("Total detections returned")
                .build(),
            duration: meter
                .f64_histogram("detect_duration_seconds")
                .with_description("Time to fetch, decode and run detection on one image")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
        }
    }

    pub fn record_request(&self) {
        self.requests.add(1, &[]);
    }

    pub fn record_success(&self, model: &str, detections: usize, elapsed_secs: f64) {
        let attributes = [KeyValue::new("model", model.to_string())];
        self.detections.add(detections as u64, &attributes);
        self.duration.record(elapsed_secs, &attributes);
    }

    pub fn record_failure(&self, kind: &'static str) {
        self.failures.add(1, &[KeyValue::new("kind", kind)]);
    }
}
