//! Error classification and dispatch pipeline.
//!
//! Every failure that escapes a store action, plus anything caught at the
//! top of the binary, ends up in [`ErrorHandler::handle`]. The handler
//! classifies it, records it in the shared history and routes it:
//!
//! 1. current message / current error / history are updated
//! 2. a diagnostic record is written when detailed diagnostics are on
//! 3. a monitoring report is spawned when error tracking is on
//! 4. `auth` errors clear the local session and navigate to the login route
//!
//! The handler is the only writer of the error state. Construct it once and
//! share it behind an `Arc`.

pub mod classify;
pub mod history;
pub mod sinks;
pub mod types;


use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::config::{Config, FeatureFlags};
use crate::metrics::PortalMetrics;
use crate::navigation::{Navigator, Route};
use crate::session::SessionStorage;

pub use classify::{classify, classify_type, RawError, StructuredError, FALLBACK_MESSAGE};
pub use history::ErrorHistory;
pub use sinks::{
    DiagnosticRecord, DiagnosticSink, MonitoringSink, TracingDiagnosticSink,
    WebhookMonitoringSink,
};
pub use types::{AppError, ErrorType, Severity};

/// User agent reported in diagnostic records.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
struct ErrorState {
    current_message: Option<String>,
    current_error: Option<AppError>,
    history: ErrorHistory,
}

pub struct ErrorHandler {
    state: RwLock<ErrorState>,
    features: FeatureFlags,
    session: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    diagnostics: Arc<dyn DiagnosticSink>,
    monitoring: Option<Arc<dyn MonitoringSink>>,
    metrics: Option<Arc<PortalMetrics>>,
}

impl ErrorHandler {
    pub fn new(
        features: FeatureFlags,
        history_capacity: usize,
        session: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            state: RwLock::new(ErrorState {
                current_message: None,
                current_error: None,
                history: ErrorHistory::new(history_capacity),
            }),
            features,
            session,
            navigator,
            diagnostics: Arc::new(TracingDiagnosticSink),
            monitoring: None,
            metrics: None,
        }
    }

    /// Wire the handler from startup configuration.
    pub fn from_config(
        config: &Config,
        session: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let handler = Self::new(
            config.features,
            config.error_history_capacity,
            session,
            navigator,
        );

        match (&config.error_tracking_url, config.features.error_tracking) {
            (Some(url), true) => {
                handler.with_monitoring_sink(Arc::new(WebhookMonitoringSink::new(url.clone())))
            }
            (None, true) => {
                tracing::warn!("Error tracking enabled but ERROR_TRACKING_URL is not set");
                handler
            }
            _ => handler,
        }
    }

    pub fn with_diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn with_monitoring_sink(mut self, sink: Arc<dyn MonitoringSink>) -> Self {
        self.monitoring = Some(sink);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PortalMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Classify, record and dispatch a failure. Never fails.
    pub async fn handle(&self, raw: impl Into<RawError>) -> AppError {
        let raw = raw.into();
        let error = classify(&raw);

        let history_len = {
            let mut state = self.state.write().await;
            state.current_message = Some(error.message().to_string());
            state.current_error = Some(error.clone());
            state.history.push(error.clone());
            state.history.len()
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_error(&error, history_len);
        }

        if self.features.detailed_diagnostics {
            self.diagnostics.record(&DiagnosticRecord {
                raw_error: format!("{:?}", raw),
                classified_error: error.clone(),
                user_agent: USER_AGENT.to_string(),
                url: self.navigator.current_path(),
                timestamp: Utc::now(),
            });
        }

        if self.features.error_tracking {
            if let Some(sink) = &self.monitoring {
                let sink = Arc::clone(sink);
                let report = error.clone();
                tokio::spawn(async move {
                    if let Err(err) = sink.report(&report).await {
                        tracing::debug!("Dropping monitoring report: {}", err);
                    }
                });
            }
        }

        if error.error_type() == ErrorType::Auth {
            self.end_session();
            return error;
        }

        tracing::warn!("{}", error);
        error
    }

    fn end_session(&self) {
        if let Err(err) = self.session.clear() {
            tracing::error!("Failed to clear local session: {}", err);
        }
        self.navigator.navigate(Route::Login);
        tracing::info!("Session cleared after authentication failure");
    }

    /// Drop the current error. History is untouched.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.current_message = None;
        state.current_error = None;
    }

    pub async fn current_message(&self) -> Option<String> {
        self.state.read().await.current_message.clone()
    }

    pub async fn current_error(&self) -> Option<AppError> {
        self.state.read().await.current_error.clone()
    }

    /// Retained history, oldest first.
    pub async fn history(&self) -> Vec<AppError> {
        self.state.read().await.history.snapshot()
    }

    pub async fn total_recorded(&self) -> u64 {
        self.state.read().await.history.total_recorded()
    }
}
