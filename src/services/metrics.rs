use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::{Duration, Instant};

use crate::errors::{AppError, Result};

/// Prometheus registry shared by the request middleware and the Lino client.
#[derive(Clone)]
pub struct MetricsService {
    registry: Registry,
    http_requests: IntCounterVec,
    http_request_duration: HistogramVec,
    upstream_requests: IntCounterVec,
}

impl MetricsService {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests served by the console"),
            &["method", "status"],
        )?;
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Time spent serving console requests",
            ),
            &["method"],
        )?;
        let upstream_requests = IntCounterVec::new(
            Opts::new(
                "upstream_requests_total",
                "Calls made to the Lino API and third-party services",
            ),
            &["operation", "outcome"],
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(upstream_requests.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_request_duration,
            upstream_requests,
        })
    }

    pub fn record_request(&self, method: &str, status: u16, duration: Duration) {
        self.http_requests
            .with_label_values(&[method, &status.to_string()])
            .inc();
        self.http_request_duration
            .with_label_values(&[method])
            .observe(duration.as_secs_f64());
    }

    /// `outcome` is one of `success`, `failure` (non-2xx) or `error` (transport).
    pub fn record_upstream(&self, operation: &str, outcome: &str) {
        self.upstream_requests
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Metrics are not UTF-8: {}", e)))
    }
}

/// Records the duration of one request when dropped.
pub struct RequestTimer {
    start: Instant,
    method: String,
    metrics: MetricsService,
}

impl RequestTimer {
    pub fn new(method: String, metrics: MetricsService) -> Self {
        Self {
            start: Instant::now(),
            method,
            metrics,
        }
    }

    pub fn finish(self, status: u16) {
        self.metrics
            .record_request(&self.method, status, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_series() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_request("GET", 200, Duration::from_millis(12));
        metrics.record_upstream("search_transactions", "success");

        let text = metrics.render().unwrap();
        assert!(text.contains("http_requests_total{method=\"GET\",status=\"200\"} 1"));
        assert!(text.contains("http_request_duration_seconds_count{method=\"GET\"} 1"));
        assert!(text.contains(
            "upstream_requests_total{operation=\"search_transactions\",outcome=\"success\"} 1"
        ));
    }

    #[test]
    fn test_timer_records_on_finish() {
        let metrics = MetricsService::new().unwrap();
        RequestTimer::new("POST".to_string(), metrics.clone()).finish(401);
        assert!(metrics
            .render()
            .unwrap()
            .contains("http_requests_total{method=\"POST\",status=\"401\"} 1"));
    }
}
