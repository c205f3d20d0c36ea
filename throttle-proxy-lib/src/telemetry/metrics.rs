use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ProxyError, Result};

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const STATUS_CODE: &str = "status_code";
    pub const METHOD: &str = "method";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

#[derive(Clone)]
pub struct Metrics {
    pub requests_forwarded_total: Counter<u64>,

    pub upstream_responses_total: Counter<u64>,
    pub upstream_duration_seconds: Histogram<f64>,
    pub upstream_errors_total: Counter<u64>,

    // Rate limiting
    pub rate_limit_rejected_total: Counter<u64>,

    pub build_info: Gauge<u64>,
}

impl Metrics {
    /// Instruments registered on `meter`
    pub fn new(meter: Meter) -> Self {
        Self {
            requests_forwarded_total: meter
                .u64_counter("throttle_requests_forwarded_total")
                .with_description("Total number of admitted requests forwarded upstream")
                .build(),

            upstream_responses_total: meter
                .u64_counter("throttle_upstream_responses_total")
                .with_description("Total number of responses received from the upstream")
                .build(),
            upstream_duration_seconds: meter
                .f64_histogram("throttle_upstream_duration_seconds")
                .with_description("Time until the upstream response head arrived, in seconds")
                .build(),
            upstream_errors_total: meter
                .u64_counter("throttle_upstream_errors_total")
                .with_description("Total number of requests that failed against the upstream")
                .build(),

            rate_limit_rejected_total: meter
                .u64_counter("throttle_rate_limit_rejected_total")
                .with_description("Total number of requests rejected with 429")
                .build(),

            build_info: meter
                .u64_gauge("throttle_build_info")
                .with_description("Build information")
                .build(),
        }
    }

    pub fn record_forwarded(&self, method: &str) {
        self.requests_forwarded_total
            .add(1, &[KeyValue::new(labels::METHOD, method.to_string())]);
    }

    pub fn record_upstream_response(&self, method: &str, status_code: u16, elapsed: Duration) {
        let attrs = [
            KeyValue::new(labels::METHOD, method.to_string()),
            KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
        ];
        self.upstream_responses_total.add(1, &attrs);
        self.upstream_duration_seconds
            .record(elapsed.as_secs_f64(), &attrs);
    }

    pub fn record_upstream_error(&self, error_type: &'static str) {
        self.upstream_errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type)]);
    }

    pub fn record_rate_limit_rejection(&self) {
        self.rate_limit_rejected_total.add(1, &[]);
    }

    fn set_build_info(&self) {
        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, env!("CARGO_PKG_VERSION")),
                KeyValue::new(labels::RUST_VERSION, env!("CARGO_PKG_RUST_VERSION")),
            ],
        );
    }
}

/// Install the Prometheus exporter as the global meter provider.
///
/// The returned registry is what `/metrics` renders.
pub fn init_metrics() -> Result<(Arc<Metrics>, Registry)> {
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(|e| ProxyError::Telemetry(format!("Failed to build prometheus exporter: {e}")))?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("throttle-proxy");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
