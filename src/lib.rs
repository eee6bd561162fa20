//! toolguard - Guarded tool execution
//!
//! Every tool invocation runs through one engine that applies, in order:
//! result caching, token-bucket rate limiting, retry with exponential
//! backoff, and a structured response carrying telemetry metadata.
//!
//! # Architecture
//!
//! - **cache**: local / remote / no-op backends behind `CacheManager`
//! - **ratelimit**: per-key token buckets
//! - **engine**: invocation lifecycle and retry policy
//! - **telemetry**: analytics and performance sinks
//! - **tools**: `Tool` trait, registry and runtime

pub mod errors;
pub mod config;
pub mod logging;
pub mod telemetry;
pub mod ratelimit;
pub mod cache;
pub mod engine;
pub mod tools;
pub mod cli;

// Re-export commonly used types
pub use errors::{ErrorKind, GuardError, Result, ToolError, ToolFailure};
pub use config::Config;
pub use engine::{ExecutionEngine, InvocationContext, ToolResponse};
pub use tools::{Tool, ToolMetadata, ToolParams, ToolRuntime};
