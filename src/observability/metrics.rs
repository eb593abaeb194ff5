use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Upstream metrics
    pub upstream_requests: IntCounterVec,
    pub upstream_failures: IntCounterVec,
    pub upstream_duration: HistogramVec,

    // Cache metrics
    pub cache_lookups: IntCounterVec,

    // Credential metrics
    pub credential_exchanges: IntCounterVec,

    // Aggregation
    pub enrichment_failures: IntCounter,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub config_parse_failures: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("trophyagent".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Upstream
            upstream_requests: IntCounterVec::new(Opts::new("upstream_requests_total", "Upstream calls by endpoint"), &["upstream", "endpoint"]).unwrap(),
            upstream_failures: IntCounterVec::new(Opts::new("upstream_failures_total", "Upstream failures by reason"), &["upstream", "reason"]).unwrap(),
            upstream_duration: HistogramVec::new(
                HistogramOpts::new("upstream_request_duration_seconds", "Upstream call duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
                &["upstream"],
            )
            .unwrap(),

            // Cache
            cache_lookups: IntCounterVec::new(Opts::new("cache_lookups_total", "Response cache lookups"), &["namespace", "result"]).unwrap(),

            // Credential
            credential_exchanges: IntCounterVec::new(Opts::new("credential_exchanges_total", "Credential exchanges by kind"), &["kind", "outcome"]).unwrap(),

            enrichment_failures: IntCounter::new("enrichment_failures_total", "Subject lookups that fell back to placeholders").unwrap(),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),
            config_parse_failures: IntCounter::new("config_parse_failures_total", "Config files that failed to parse").unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.upstream_requests.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_failures.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_duration.clone())).unwrap();
        reg.register(Box::new(metrics.cache_lookups.clone())).unwrap();
        reg.register(Box::new(metrics.credential_exchanges.clone())).unwrap();
        reg.register(Box::new(metrics.enrichment_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.config_parse_failures.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
