//! Diagnostic and monitoring sinks fed by the error pipeline.
//!
//! The diagnostic sink is local and synchronous. The monitoring sink is
//! network-bound: the pipeline spawns each report as a detached task and
//! discards its outcome, so sink failures never re-enter the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use super::types::AppError;
use crate::error::SinkError;

/// Structured record emitted when detailed diagnostics are enabled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRecord {
    /// Debug rendering of the raw input.
    pub raw_error: String,
    pub classified_error: AppError,
    pub user_agent: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

pub trait DiagnosticSink: Send + Sync {
    fn record(&self, record: &DiagnosticRecord);
}

/// Writes diagnostic records to the `tracing` subscriber as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn record(&self, record: &DiagnosticRecord) {
        match serde_json::to_string(record) {
            Ok(json) => tracing::error!(
                target: "elkkana_portal::diagnostics",
                record = %json,
                "{}",
                record.classified_error
            ),
            Err(err) => tracing::warn!("Failed to encode diagnostic record: {}", err),
        }
    }
}

#[async_trait]
pub trait MonitoringSink: Send + Sync {
    async fn report(&self, error: &AppError) -> Result<(), SinkError>;
}

/// Posts classified errors as JSON to an error-tracking endpoint.
#[derive(Clone)]
pub struct WebhookMonitoringSink {
    url: String,
    http: Client,
}

impl WebhookMonitoringSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MonitoringSink for WebhookMonitoringSink {
    async fn report(&self, error: &AppError) -> Result<(), SinkError> {
        let body = json!({
            "service": env!("CARGO_PKG_NAME"),
            "release": env!("CARGO_PKG_VERSION"),
            "error": error,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|err| SinkError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(SinkError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}
