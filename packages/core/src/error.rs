use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code attached to a failure: an HTTP-like status or a platform token
/// such as `user_invalid_credentials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Status(i64),
    Token(String),
}

impl ErrorCode {
    pub fn token(value: impl Into<String>) -> Self {
        Self::Token(value.into())
    }

    pub fn as_status(&self) -> Option<i64> {
        match self {
            ErrorCode::Status(status) => Some(*status),
            ErrorCode::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            ErrorCode::Token(token) => Some(token),
            ErrorCode::Status(_) => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Status(status) => write!(f, "{}", status),
            ErrorCode::Token(token) => f.write_str(token),
        }
    }
}

impl From<i64> for ErrorCode {
    fn from(status: i64) -> Self {
        Self::Status(status)
    }
}

impl From<&str> for ErrorCode {
    fn from(token: &str) -> Self {
        Self::Token(token.to_string())
    }
}

/// Code carried by transport-level failures (no response from the backend).
pub const NETWORK_ERROR_CODE: &str = "NetworkError";

/// Failures reported by the remote account/document/file backend.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with an error body `{message, code, type}`.
    #[error("{message}")]
    Api {
        status: u16,
        kind: Option<String>,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RemoteError {
    pub fn api(status: u16, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            kind: Some(kind.into()),
            message: message.into(),
        }
    }

    /// Whether a retry of an idempotent request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network(_) => true,
            RemoteError::Api { status, .. } => *status >= 500,
            RemoteError::Parse(_) | RemoteError::Unknown(_) => false,
        }
    }
}

/// Normalised `{code, message, type}` failure raised by domain services.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ServiceError {
    pub code: Option<ErrorCode>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            kind: None,
        }
    }

    /// Normalise a backend failure. `fallback` replaces an empty message.
    pub fn from_remote(err: RemoteError, fallback: &str) -> Self {
        let (code, kind, message) = match err {
            RemoteError::Api {
                status,
                kind,
                message,
            } => (Some(ErrorCode::Status(i64::from(status))), kind, message),
            RemoteError::Network(message) => {
                (Some(ErrorCode::token(NETWORK_ERROR_CODE)), None, message)
            }
            RemoteError::Parse(message) | RemoteError::Unknown(message) => (None, None, message),
        };

        let message = if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        };

        Self {
            code,
            message,
            kind,
        }
    }

    /// Returns a closure suitable for `map_err` with the given fallback message.
    pub fn with_fallback(fallback: &'static str) -> impl Fn(RemoteError) -> Self {
        move |err| Self::from_remote(err, fallback)
    }
}

/// Startup configuration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid {name}: {value}")]
    Invalid { name: String, value: String },
}

/// Failures of the persisted local session store.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session storage is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failure of a monitoring sink. Never re-enters the error pipeline.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Monitoring sink unreachable: {0}")]
    Transport(String),

    #[error("Monitoring sink rejected report with HTTP {0}")]
    Rejected(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_status_and_platform_token() {
        let err = RemoteError::api(409, "user_already_exists", "A user with the same email already exists");
        let normalised = ServiceError::from_remote(err, "Registration failed");

        assert_eq!(normalised.code, Some(ErrorCode::Status(409)));
        assert_eq!(normalised.kind.as_deref(), Some("user_already_exists"));
        assert_eq!(normalised.message, "A user with the same email already exists");
    }

    #[test]
    fn empty_message_is_replaced_by_fallback() {
        let err = RemoteError::Api {
            status: 500,
            kind: None,
            message: String::new(),
        };
        let normalised = ServiceError::from_remote(err, "Login failed");
        assert_eq!(normalised.message, "Login failed");
    }

    #[test]
    fn network_failures_carry_network_code() {
        let normalised =
            ServiceError::from_remote(RemoteError::Network("connection refused".into()), "Login failed");
        assert_eq!(normalised.code, Some(ErrorCode::token(NETWORK_ERROR_CODE)));
    }

    #[test]
    fn missing_config_lists_every_variable() {
        let err = ConfigError::Missing(vec!["A".into(), "B".into()]);
        assert_eq!(err.to_string(), "Missing required environment variables: A, B");
    }

    #[test]
    fn error_code_deserialises_numbers_and_strings() {
        let status: ErrorCode = serde_json::from_str("401").unwrap();
        let token: ErrorCode = serde_json::from_str("\"user_invalid_credentials\"").unwrap();
        assert_eq!(status, ErrorCode::Status(401));
        assert_eq!(token.as_token(), Some("user_invalid_credentials"));
    }

    #[test]
    fn transient_errors_are_network_and_server_side() {
        assert!(RemoteError::Network("reset".into()).is_transient());
        assert!(RemoteError::api(503, "general_unknown", "down").is_transient());
        assert!(!RemoteError::api(401, "user_invalid_credentials", "nope").is_transient());
        assert!(!RemoteError::Parse("bad json".into()).is_transient());
    }
}
