//! Invocation results and the response shape returned to callers

use crate::errors::ToolFailure;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Code for failures that are not declared tool errors
pub const UNEXPECTED_ERROR: &str = "UNEXPECTED_ERROR";

/// Code for lookups of unregistered tools
pub const TOOL_NOT_FOUND: &str = "TOOL_NOT_FOUND";

/// Structured description of a failed invocation
#[derive(Debug, Clone, PartialEq)]
pub struct FailureInfo {
    pub code: String,
    pub message: String,
    pub retry_after: Option<u64>,
    pub details: Option<Value>,
    pub request_id: String,
}

impl FailureInfo {
    /// Declared errors keep their own fields; anything else collapses into
    /// `UNEXPECTED_ERROR` with the original text kept in `details`.
    pub fn from_failure(failure: &ToolFailure, request_id: &str) -> Self {
        match failure {
            ToolFailure::Domain(err) => Self {
                code: err.code.clone(),
                message: err.message.clone(),
                retry_after: err.retry_after,
                details: err.details.clone(),
                request_id: request_id.to_string(),
            },
            ToolFailure::Unexpected(err) => Self {
                code: UNEXPECTED_ERROR.to_string(),
                message: "An unexpected error occurred".to_string(),
                retry_after: None,
                details: Some(serde_json::json!({ "error": format!("{:#}", err) })),
                request_id: request_id.to_string(),
            },
        }
    }
}

/// Outcome of one invocation
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success { payload: Value },
    Failure(FailureInfo),
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success { .. })
    }

    pub fn into_response(self, tool: &str, metadata: ResponseMetadata) -> ToolResponse {
        match self {
            InvocationResult::Success { payload } => ToolResponse {
                success: true,
                result: Some(payload),
                error: None,
                metadata,
            },
            InvocationResult::Failure(info) => ToolResponse {
                success: false,
                result: None,
                error: Some(ErrorBody {
                    code: info.code,
                    message: info.message,
                    tool: tool.to_string(),
                    retry_after: info.retry_after,
                    details: info.details,
                    request_id: info.request_id,
                }),
                metadata,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub tool: String,
    pub retry_after: Option<u64>,
    pub details: Option<Value>,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub request_id: String,
    pub tool: String,
    pub category: String,
    pub duration_ms: u64,
    pub cache_hit: bool,
    /// Calls made to the tool body; zero for cache hits and rejected calls
    pub attempts: u32,
    pub mock_mode: bool,
}

/// What every invocation returns, success or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<ErrorBody>,
    pub metadata: ResponseMetadata,
}

impl ToolResponse {
    /// Response for a tool name nobody registered
    pub fn not_found(tool: &str, request_id: String) -> Self {
        InvocationResult::Failure(FailureInfo {
            code: TOOL_NOT_FOUND.to_string(),
            message: format!("Unknown tool: {}", tool),
            retry_after: None,
            details: None,
            request_id: request_id.clone(),
        })
        .into_response(
            tool,
            ResponseMetadata {
                request_id,
                tool: tool.to_string(),
                category: String::new(),
                duration_ms: 0,
                cache_hit: false,
                attempts: 0,
                mock_mode: false,
            },
        )
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolError;

    fn meta() -> ResponseMetadata {
        ResponseMetadata {
            request_id: "req-1".to_string(),
            tool: "search".to_string(),
            category: "web".to_string(),
            duration_ms: 5,
            cache_hit: false,
            attempts: 1,
            mock_mode: false,
        }
    }

    #[test]
    fn test_declared_error_keeps_code() {
        let failure: ToolFailure = ToolError::generic("upstream down")
            .with_code("UPSTREAM_DOWN")
            .with_retry_after(30)
            .into();
        let info = FailureInfo::from_failure(&failure, "req-1");
        assert_eq!(info.code, "UPSTREAM_DOWN");
        assert_eq!(info.message, "upstream down");
        assert_eq!(info.retry_after, Some(30));
    }

    #[test]
    fn test_unexpected_error_is_wrapped() {
        let failure: ToolFailure = anyhow::anyhow!("index out of bounds").into();
        let info = FailureInfo::from_failure(&failure, "req-1");
        assert_eq!(info.code, UNEXPECTED_ERROR);
        assert_eq!(info.details.unwrap()["error"], "index out of bounds");
    }

    #[test]
    fn test_failure_response_shape() {
        let response = InvocationResult::Failure(FailureInfo {
            code: "VALIDATION_ERROR".to_string(),
            message: "bad".to_string(),
            retry_after: None,
            details: None,
            request_id: "req-1".to_string(),
        })
        .into_response("search", meta());

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["success"], false);
        assert!(wire["result"].is_null());
        assert_eq!(wire["error"]["tool"], "search");
        assert_eq!(wire["error"]["requestId"], "req-1");
        assert_eq!(wire["metadata"]["cacheHit"], false);
    }

    #[test]
    fn test_success_response_shape() {
        let response = InvocationResult::Success {
            payload: serde_json::json!({"answer": 42}),
        }
        .into_response("search", meta());
        assert!(response.success);
        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap()["answer"], 42);
    }

    #[test]
    fn test_not_found() {
        let response = ToolResponse::not_found("nope", "req-9".to_string());
        assert!(!response.success);
        assert_eq!(response.error_code(), Some(TOOL_NOT_FOUND));
    }
}
