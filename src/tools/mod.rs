//! Tool contract, registry and runtime
//!
//! Provides:
//! - `Tool` trait and `ToolMetadata`
//! - Registry with per-tool configuration overrides
//! - Runtime coordinator that wires cache, limiter and engine together
//! - Built-in echo tool

pub mod builtin;
pub mod registry;
pub mod runtime;
pub mod types;

// Re-export commonly used types
pub use builtin::EchoTool;
pub use registry::{RegisteredTool, ToolRegistry};
pub use runtime::ToolRuntime;
pub use types::{Tool, ToolMetadata, ToolParams};
