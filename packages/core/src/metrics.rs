//! Prometheus metrics registry for the portal client.
//!
//! [`PortalMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it to
//! the error handler and the remote client.

use prometheus::{CounterVec, Gauge, Opts, Registry};

use crate::handler::AppError;

pub struct PortalMetrics {
    /// Classified errors, labelled by type and severity.
    pub errors_classified_total: CounterVec,
    /// Remote backend requests, labelled by operation and outcome.
    pub remote_requests_total: CounterVec,
    /// Entries currently retained in the error history.
    pub error_history_size: Gauge,
    pub registry: Registry,
}

impl PortalMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let errors_classified_total = CounterVec::new(
            Opts::new(
                "elkkana_portal_errors_classified_total",
                "Errors classified by the error pipeline",
            ),
            &["type", "severity"],
        )?;

        let remote_requests_total = CounterVec::new(
            Opts::new(
                "elkkana_portal_remote_requests_total",
                "Requests sent to the remote backend by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;

        let error_history_size = Gauge::with_opts(Opts::new(
            "elkkana_portal_error_history_size",
            "Entries retained in the error history",
        ))?;

        registry.register(Box::new(errors_classified_total.clone()))?;
        registry.register(Box::new(remote_requests_total.clone()))?;
        registry.register(Box::new(error_history_size.clone()))?;

        Ok(Self {
            errors_classified_total,
            remote_requests_total,
            error_history_size,
            registry,
        })
    }

    pub fn record_error(&self, error: &AppError, history_len: usize) {
        self.errors_classified_total
            .with_label_values(&[error.error_type().as_str(), error.severity().as_str()])
            .inc();
        self.error_history_size.set(history_len as f64);
    }

    pub fn record_request(&self, operation: &str, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.remote_requests_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{classify, RawError};
    use serde_json::json;

    #[test]
    fn all_metrics_register_without_error() {
        let metrics = PortalMetrics::new();
        assert!(metrics.is_ok(), "PortalMetrics::new() failed: {:?}", metrics.err());
    }

    #[test]
    fn record_error_counts_by_type_and_severity() {
        let metrics = PortalMetrics::new().unwrap();
        let err = classify(&RawError::from(json!({ "message": "nope", "code": 401 })));

        metrics.record_error(&err, 1);
        metrics.record_error(&err, 2);

        let count = metrics
            .errors_classified_total
            .with_label_values(&["auth", "error"])
            .get();
        assert_eq!(count, 2.0);
        assert_eq!(metrics.error_history_size.get(), 2.0);
    }

    #[test]
    fn render_contains_metric_names() {
        let metrics = PortalMetrics::new().unwrap();
        metrics.record_request("get_current_identity", true);

        let output = metrics.render().unwrap();
        assert!(output.contains("elkkana_portal_remote_requests_total"));
    }
}
