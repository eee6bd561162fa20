//! Built-in tools
//!
//! - echo: returns its parameters; cache-enabled, handy for smoke tests

use crate::engine::InvocationContext;
use crate::errors::{ToolError, ToolFailure};
use crate::tools::types::{Tool, ToolMetadata, ToolParams};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Returns the visible parameters it was called with
pub struct EchoTool {
    metadata: ToolMetadata,
}

impl EchoTool {
    pub fn new() -> Self {
        Self {
            metadata: ToolMetadata::new("echo", "utility")
                .with_description("Return the given parameters unchanged")
                .with_cache(Some(Duration::from_secs(300))),
        }
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(
        &self,
        params: &ToolParams,
        ctx: &InvocationContext,
    ) -> Result<Value, ToolFailure> {
        let visible: ToolParams = params
            .iter()
            .filter(|(name, _)| !name.starts_with(crate::cache::key::INTERNAL_PARAM_PREFIX))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        if visible.is_empty() {
            return Err(ToolError::validation("echo needs at least one parameter").into());
        }

        Ok(json!({
            "echo": visible,
            "mock": ctx.mock_mode,
        }))
    }
}
