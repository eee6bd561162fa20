//! Invocation lifecycle: cache, rate limit, retry, structured result

pub mod context;
pub mod executor;
pub mod response;
pub mod retry;

pub use context::InvocationContext;
pub use executor::{ExecutionEngine, DEFAULT_CACHE_TTL};
pub use response::{
    ErrorBody, FailureInfo, InvocationResult, ResponseMetadata, ToolResponse, TOOL_NOT_FOUND,
    UNEXPECTED_ERROR,
};
pub use retry::{RetryOutcome, RetryPolicy};
