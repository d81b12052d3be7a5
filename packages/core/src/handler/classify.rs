//! Normalisation of arbitrary failure values into [`AppError`].

use serde_json::{Map, Number, Value};

use super::types::{AppError, ErrorType};
use crate::error::{ErrorCode, RemoteError, ServiceError, NETWORK_ERROR_CODE};

/// Message used when the input carries nothing usable.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Any failure value that can reach the pipeline, discriminated once here
/// instead of at every call site.
#[derive(Debug, Clone, PartialEq)]
pub enum RawError {
    /// Error-like or plain object exposing some of the known fields.
    Structured(StructuredError),
    /// A bare message.
    Message(String),
    /// Anything else, including `null`.
    Unknown(Option<Value>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredError {
    pub message: Option<String>,
    pub code: Option<ErrorCode>,
    /// Platform error token (the backend's `type` field).
    pub kind: Option<String>,
    pub stack: Option<String>,
    pub context: Option<Map<String, Value>>,
}

impl RawError {
    /// Wrap a Rust error, using its source chain as the stack.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        RawError::Structured(StructuredError {
            message: Some(err.to_string()),
            stack: (!chain.is_empty()).then(|| chain.join("\n")),
            ..StructuredError::default()
        })
    }
}

impl From<Value> for RawError {
    fn from(value: Value) -> Self {
        match value {
            Value::String(message) => RawError::Message(message),
            Value::Object(mut fields) => {
                let message = fields.remove("message").and_then(|m| match m {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                });
                let code = fields.remove("code").and_then(|c| match c {
                    Value::Number(n) => status_from_number(&n).map(ErrorCode::Status),
                    Value::String(s) => Some(ErrorCode::Token(s)),
                    _ => None,
                });
                let kind = take_string(&mut fields, "type");
                let stack = take_string(&mut fields, "stack");
                let context = match fields.remove("context") {
                    Some(Value::Object(context)) => Some(context),
                    _ => None,
                };
                RawError::Structured(StructuredError {
                    message,
                    code,
                    kind,
                    stack,
                    context,
                })
            }
            Value::Null => RawError::Unknown(None),
            other => RawError::Unknown(Some(other)),
        }
    }
}

/// Integral JSON numbers become a status; `401.0` counts, `401.5` does not.
/// Values past `i64::MAX` saturate so they still read as server errors.
fn status_from_number(n: &Number) -> Option<i64> {
    if let Some(status) = n.as_i64() {
        return Some(status);
    }
    if n.as_u64().is_some() {
        return Some(i64::MAX);
    }
    n.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i64)
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

impl From<&str> for RawError {
    fn from(message: &str) -> Self {
        RawError::Message(message.to_string())
    }
}

impl From<String> for RawError {
    fn from(message: String) -> Self {
        RawError::Message(message)
    }
}

impl From<ServiceError> for RawError {
    fn from(err: ServiceError) -> Self {
        RawError::Structured(StructuredError {
            message: Some(err.message),
            code: err.code,
            kind: err.kind,
            ..StructuredError::default()
        })
    }
}

impl From<&ServiceError> for RawError {
    fn from(err: &ServiceError) -> Self {
        RawError::from(err.clone())
    }
}

impl From<RemoteError> for RawError {
    fn from(err: RemoteError) -> Self {
        RawError::from(ServiceError::from_remote(err, FALLBACK_MESSAGE))
    }
}

/// Map an upstream code onto the taxonomy.
pub fn classify_type(code: Option<&ErrorCode>) -> ErrorType {
    match code {
        Some(ErrorCode::Status(401)) => ErrorType::Auth,
        Some(ErrorCode::Token(token)) => match token_type(token) {
            Some(error_type) => error_type,
            None => ErrorType::Client,
        },
        Some(ErrorCode::Status(status)) if *status >= 500 => ErrorType::Server,
        Some(ErrorCode::Status(status)) if *status >= 400 => ErrorType::Client,
        _ => ErrorType::Client,
    }
}

fn token_type(token: &str) -> Option<ErrorType> {
    match token {
        "user_invalid_credentials" | "UNAUTHORIZED" => Some(ErrorType::Auth),
        "user_already_exists" => Some(ErrorType::Validation),
        NETWORK_ERROR_CODE => Some(ErrorType::Network),
        _ => None,
    }
}

/// Produce a fully populated [`AppError`] from any input. Never panics.
pub fn classify(raw: &RawError) -> AppError {
    match raw {
        RawError::Structured(fields) => {
            let message = fields
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
            // A recognised platform token is more precise than the bare status.
            let error_type = fields
                .kind
                .as_deref()
                .and_then(token_type)
                .unwrap_or_else(|| classify_type(fields.code.as_ref()));
            AppError::new(
                message,
                fields.code.clone(),
                error_type,
                fields.stack.clone(),
                fields.context.clone(),
            )
        }
        RawError::Message(message) if !message.is_empty() => {
            AppError::new(message.clone(), None, ErrorType::Client, None, None)
        }
        RawError::Message(_) | RawError::Unknown(_) => AppError::new(
            FALLBACK_MESSAGE.to_string(),
            None,
            ErrorType::Client,
            None,
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::types::Severity;
    use serde_json::json;

    #[test]
    fn message_field_is_used_verbatim() {
        let raw = RawError::from(json!({ "message": "  Disk full  ", "code": 507 }));
        let err = classify(&raw);
        assert_eq!(err.message(), "  Disk full  ");
        assert_eq!(err.error_type(), ErrorType::Server);
    }

    #[test]
    fn integral_float_and_oversized_codes_keep_their_status() {
        let expired = classify(&RawError::from(json!({ "message": "expired", "code": 401.0 })));
        assert_eq!(expired.error_type(), ErrorType::Auth);
        assert_eq!(expired.code(), Some(&ErrorCode::Status(401)));

        let huge = classify(&RawError::from(json!({ "message": "overflow", "code": u64::MAX })));
        assert_eq!(huge.error_type(), ErrorType::Server);

        let fractional = RawError::from(json!({ "message": "odd", "code": 401.5 }));
        assert_eq!(classify(&fractional).error_type(), ErrorType::Client);
    }

    #[test]
    fn plain_string_becomes_the_message() {
        let err = classify(&RawError::from("Upload interrupted"));
        assert_eq!(err.message(), "Upload interrupted");
        assert_eq!(err.error_type(), ErrorType::Client);
        assert!(err.code().is_none());
    }

    #[test]
    fn unknown_shapes_use_fallback() {
        for value in [json!(null), json!(42), json!(true), json!([1, 2]), json!({})] {
            let err = classify(&RawError::from(value));
            assert_eq!(err.message(), FALLBACK_MESSAGE);
            assert_eq!(err.error_type(), ErrorType::Client);
        }
    }

    #[test]
    fn empty_message_falls_back() {
        assert_eq!(classify(&RawError::from("")).message(), FALLBACK_MESSAGE);
        let err = classify(&RawError::from(json!({ "message": "" })));
        assert_eq!(err.message(), FALLBACK_MESSAGE);
    }

    #[test]
    fn classify_type_table() {
        assert_eq!(classify_type(Some(&ErrorCode::Status(401))), ErrorType::Auth);
        assert_eq!(
            classify_type(Some(&ErrorCode::token("user_invalid_credentials"))),
            ErrorType::Auth
        );
        assert_eq!(
            classify_type(Some(&ErrorCode::token("user_already_exists"))),
            ErrorType::Validation
        );
        assert_eq!(classify_type(Some(&ErrorCode::Status(503))), ErrorType::Server);
        assert_eq!(classify_type(Some(&ErrorCode::Status(500))), ErrorType::Server);
        assert_eq!(classify_type(Some(&ErrorCode::Status(404))), ErrorType::Client);
        assert_eq!(classify_type(Some(&ErrorCode::Status(200))), ErrorType::Client);
        assert_eq!(classify_type(Some(&ErrorCode::token("storage_file_not_found"))), ErrorType::Client);
        assert_eq!(classify_type(None), ErrorType::Client);
    }

    #[test]
    fn network_code_classifies_as_network() {
        let err = classify(&RawError::from(RemoteError::Network("connection reset".into())));
        assert_eq!(err.error_type(), ErrorType::Network);
        assert_eq!(err.severity(), Severity::Warning);
    }

    #[test]
    fn platform_token_wins_over_status() {
        let service_err =
            ServiceError::from_remote(RemoteError::api(409, "user_already_exists", "Email taken"), "Registration failed");
        let err = classify(&RawError::from(&service_err));

        assert_eq!(err.error_type(), ErrorType::Validation);
        assert_eq!(err.code(), Some(&ErrorCode::Status(409)));
    }

    #[test]
    fn stack_and_context_are_carried_over() {
        let raw = RawError::from(json!({
            "message": "boom",
            "stack": "at upload (file.rs:10)",
            "context": { "documentType": "cv" }
        }));
        let err = classify(&raw);

        assert_eq!(err.stack(), Some("at upload (file.rs:10)"));
        assert_eq!(err.context().unwrap()["documentType"], "cv");
    }

    #[test]
    fn rust_errors_use_source_chain_as_stack() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = crate::error::SessionError::from(io);
        let classified = classify(&RawError::from_error(&err));

        assert_eq!(classified.message(), "Session storage I/O error: disk gone");
        assert_eq!(classified.stack(), Some("caused by: disk gone"));
    }
}
