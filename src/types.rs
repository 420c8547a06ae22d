use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing_error::SpanTrace;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn short(&self) -> &str {
        crate::str_utils::prefix_chars(&self.0, 8)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single tool invocation, as fed back to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Text form used by the MCP relay: strings pass through, everything else is JSON.
    pub fn text(&self) -> String {
        match (&self.data, &self.error) {
            (Some(Value::String(s)), _) => s.clone(),
            (Some(v), _) => v.to_string(),
            (None, Some(e)) => e.clone(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_update: Option<String>,
}

/// Running counters for the model transport, read by the readiness probe.
pub struct TransportHealth {
    pub consecutive_failures: AtomicU32,
    pub total_calls: AtomicU64,
    pub failed_calls: AtomicU64,
    pub last_success: std::sync::RwLock<Option<Instant>>,
    pub last_failure: std::sync::RwLock<Option<Instant>>,
}

impl Default for TransportHealth {
    fn default() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            total_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            last_success: std::sync::RwLock::new(None),
            last_failure: std::sync::RwLock::new(None),
        }
    }
}

impl TransportHealth {
    pub fn record_success(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        if let Ok(mut last) = self.last_success.write() {
            *last = Some(Instant::now());
        }
    }

    pub fn record_failure(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_failure.write() {
            *last = Some(Instant::now());
        }
    }

    pub fn is_degraded(&self, threshold: u32) -> bool {
        threshold > 0 && self.consecutive_failures.load(Ordering::Relaxed) >= threshold
    }
}

#[derive(Error, Debug)]
pub enum JarvisError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Model transport failed after {attempts} attempt(s): {message}")]
    ModelTransport { attempts: u32, message: String },

    #[error("Upstream error (status {0}): {1}")]
    Upstream(axum::http::StatusCode, String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Internal error: {0}")]
    Internal(String, SpanTrace),
}

impl JarvisError {
    pub fn internal(message: impl Into<String>) -> Self {
        JarvisError::Internal(message.into(), SpanTrace::capture())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        JarvisError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl axum::response::IntoResponse for ObservedError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, msg, code, details) = match &self.inner {
            JarvisError::Validation { field, .. } => (
                StatusCode::BAD_REQUEST,
                self.inner.to_string(),
                "VALIDATION_ERROR",
                serde_json::json!({ "field": field }),
            ),
            JarvisError::ModelTransport { attempts, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to get response from AI.".to_string(),
                "MODEL_TRANSPORT_ERROR",
                serde_json::json!({ "attempts": attempts }),
            ),
            JarvisError::ToolNotFound(name) => (
                StatusCode::NOT_FOUND,
                self.inner.to_string(),
                "TOOL_NOT_FOUND",
                serde_json::json!({ "tool": name }),
            ),
            JarvisError::DuplicateTool(name) => (
                StatusCode::CONFLICT,
                self.inner.to_string(),
                "DUPLICATE_TOOL",
                serde_json::json!({ "tool": name }),
            ),
            JarvisError::Upstream(s, m) => (*s, m.clone(), "UPSTREAM_ERROR", Value::Null),
            JarvisError::Network(e) => (
                StatusCode::BAD_GATEWAY,
                e.to_string(),
                "NETWORK_ERROR",
                Value::Null,
            ),
            JarvisError::Serialization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
                "SERIALIZATION_ERROR",
                Value::Null,
            ),
            JarvisError::Io(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
                "IO_ERROR",
                Value::Null,
            ),
            JarvisError::Configuration(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                m.clone(),
                "CONFIGURATION_ERROR",
                Value::Null,
            ),
            JarvisError::Protocol(m) => (
                StatusCode::BAD_GATEWAY,
                m.clone(),
                "PROTOCOL_ERROR",
                Value::Null,
            ),
            JarvisError::Internal(m, _) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                m.clone(),
                "INTERNAL_ERROR",
                Value::Null,
            ),
        };

        let mut body = serde_json::json!({
            "error": msg,
            "code": code,
        });
        if !details.is_null() {
            body["details"] = details;
        }
        (status, axum::Json(body)).into_response()
    }
}

#[derive(Debug)]
pub struct ObservedError {
    pub inner: JarvisError,
    pub span_trace: SpanTrace,
}

impl std::fmt::Display for ObservedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for ObservedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

impl<E> From<E> for ObservedError
where
    E: Into<JarvisError>,
{
    fn from(error: E) -> Self {
        Self {
            inner: error.into(),
            span_trace: SpanTrace::capture(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ObservedError>;
