//! Error types for toolguard
//!
//! Two surfaces live here:
//! - `GuardError`: crate-level failures (configuration, I/O, serialization)
//! - `ToolError` / `ToolFailure`: what a tool's `execute()` may return, with an
//!   explicit `ErrorKind` discriminator that drives retry eligibility

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for toolguard infrastructure
#[derive(Error, Debug)]
pub enum GuardError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Tool registration errors
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("toolguard error: {0}")]
    Generic(String),
}

/// Result type alias for toolguard operations
pub type Result<T> = std::result::Result<T, GuardError>;

impl From<anyhow::Error> for GuardError {
    fn from(err: anyhow::Error) -> Self {
        GuardError::Generic(err.to_string())
    }
}

/// Classification of a declared tool error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; never retried
    Validation,
    /// Missing or rejected credentials; never retried
    Authentication,
    /// Policy violation; never retried
    Security,
    /// Quota exhausted, carries `retry_after`
    RateLimit,
    /// Any other declared failure; retried with backoff
    Generic,
}

impl ErrorKind {
    /// Wire code used when a `ToolError` does not set its own
    pub fn default_code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::Security => "SECURITY_ERROR",
            ErrorKind::RateLimit => "RATE_LIMIT_EXCEEDED",
            ErrorKind::Generic => "TOOL_ERROR",
        }
    }

    /// Whether the retry loop may attempt the call again
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            ErrorKind::Validation | ErrorKind::Authentication | ErrorKind::Security
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Security => "security",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared domain error raised by a tool
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    /// Seconds the caller should wait before trying again
    pub retry_after: Option<u64>,
    pub details: Option<serde_json::Value>,
}

impl ToolError {
    /// Create error of the given kind using its default code
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.default_code().to_string(),
            message: message.into(),
            retry_after: None,
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Security, message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: u64) -> Self {
        Self::new(ErrorKind::RateLimit, message).with_retry_after(retry_after)
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }

    /// Override the wire code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Everything a tool's `execute()` can fail with
#[derive(Error, Debug)]
pub enum ToolFailure {
    /// Declared error, classified by kind
    #[error(transparent)]
    Domain(#[from] ToolError),

    /// Anything else; never retried
    #[error("unexpected failure: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl ToolFailure {
    /// Label used for the performance sink's `error_type`
    pub fn error_type(&self) -> &'static str {
        match self {
            ToolFailure::Domain(e) => e.kind.as_str(),
            ToolFailure::Unexpected(_) => "unexpected",
        }
    }
}

/// Raised by the rate limiter when a bucket cannot cover the requested cost
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Rate limit exceeded for {key} ({limit_type}), retry after {retry_after_secs}s")]
pub struct RateLimitExceeded {
    pub key: String,
    pub limit_type: String,
    pub retry_after_secs: u64,
}

impl From<RateLimitExceeded> for ToolError {
    fn from(err: RateLimitExceeded) -> Self {
        ToolError::rate_limited(err.to_string(), err.retry_after_secs).with_details(
            serde_json::json!({
                "limit_type": err.limit_type,
                "key": err.key,
            }),
        )
    }
}

/// Failure inside an analytics or performance sink
#[derive(Error, Debug)]
#[error("telemetry sink failed: {0}")]
pub struct TelemetryError(pub String);
