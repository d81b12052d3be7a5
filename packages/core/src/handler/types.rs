//! Classified error record and its closed taxonomy.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ErrorCode;

/// Classification driving routing decisions in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Auth,
    Network,
    Validation,
    Server,
    Client,
}

impl ErrorType {
    pub const ALL: [ErrorType; 5] = [
        ErrorType::Auth,
        ErrorType::Network,
        ErrorType::Validation,
        ErrorType::Server,
        ErrorType::Client,
    ];

    /// Severity is a pure function of the type.
    pub fn severity(self) -> Severity {
        match self {
            ErrorType::Auth | ErrorType::Server | ErrorType::Client => Severity::Error,
            ErrorType::Network | ErrorType::Validation => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Auth => "auth",
            ErrorType::Network => "network",
            ErrorType::Validation => "validation",
            ErrorType::Server => "server",
            ErrorType::Client => "client",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Success => "success",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical record of a failure surfaced to the user or to monitoring.
///
/// Built once by [`classify`](super::classify) and never mutated afterwards;
/// fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppError {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
    #[serde(rename = "type")]
    error_type: ErrorType,
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<Map<String, Value>>,
}

impl AppError {
    pub(super) fn new(
        message: String,
        code: Option<ErrorCode>,
        error_type: ErrorType,
        stack: Option<String>,
        context: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            message,
            code,
            error_type,
            severity: error_type.severity(),
            stack,
            timestamp: Utc::now(),
            context,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        self.code.as_ref()
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.context.as_ref()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_mapping_matches_taxonomy() {
        assert_eq!(ErrorType::Auth.severity(), Severity::Error);
        assert_eq!(ErrorType::Server.severity(), Severity::Error);
        assert_eq!(ErrorType::Client.severity(), Severity::Error);
        assert_eq!(ErrorType::Network.severity(), Severity::Warning);
        assert_eq!(ErrorType::Validation.severity(), Severity::Warning);
    }

    #[test]
    fn serialises_with_wire_field_names() {
        let err = AppError::new(
            "Invalid credentials".into(),
            Some(ErrorCode::Status(401)),
            ErrorType::Auth,
            None,
            None,
        );
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["type"], "auth");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["code"], 401);
        assert!(json.get("stack").is_none());
    }
}
