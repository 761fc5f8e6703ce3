use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "tiktok_proxy";

/// Process-scoped metrics. Each instance owns its own registry, so nothing is
/// registered with the prometheus default registry.
pub struct Metrics {
    registry: Registry,
    pub http_requests: IntCounterVec,
    pub upstream_duration: HistogramVec,
    pub upstream_failures: IntCounterVec,
    pub refresh_jobs: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Metrics, prometheus::Error> {
        let registry = Registry::new_custom(Some(NAMESPACE.to_owned()), None)?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Number of HTTP requests served"),
            &["route", "status"],
        )?;

        let upstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "upstream_request_duration_seconds",
                "Time taken by requests to the TikTok API",
            ),
            &["call"],
        )?;

        let upstream_failures = IntCounterVec::new(
            Opts::new(
                "upstream_failures_total",
                "Number of failed requests to the TikTok API",
            ),
            &["call"],
        )?;

        let refresh_jobs = IntCounterVec::new(
            Opts::new("refresh_jobs_total", "Number of token refresh jobs processed"),
            &["outcome"],
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(upstream_duration.clone()))?;
        registry.register(Box::new(upstream_failures.clone()))?;
        registry.register(Box::new(refresh_jobs.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Metrics {
            registry,
            http_requests,
            upstream_duration,
            upstream_failures,
            refresh_jobs,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        let metric_families = self.registry.gather();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(buffer)
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_owned()
    }
}
