//! Tool registry
//!
//! Maps tool names to implementations together with the metadata the
//! engine should apply (the tool's own, with any configured override).

use crate::config::ToolOverride;
use crate::errors::{GuardError, Result};
use crate::tools::types::{Tool, ToolMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered tool and its effective metadata
#[derive(Clone)]
pub struct RegisteredTool {
    pub tool: Arc<dyn Tool>,
    pub metadata: ToolMetadata,
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its metadata name
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        self.register_with_override(tool, None)
    }

    /// Register a tool, applying `over` to its metadata
    pub fn register_with_override(
        &mut self,
        tool: Arc<dyn Tool>,
        over: Option<&ToolOverride>,
    ) -> Result<()> {
        let metadata = match over {
            Some(over) => tool.metadata().apply_override(over),
            None => tool.metadata().clone(),
        };
        if self.tools.contains_key(&metadata.name) {
            return Err(GuardError::DuplicateTool(metadata.name));
        }
        self.tools
            .insert(metadata.name.clone(), RegisteredTool { tool, metadata });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Sorted tool names
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Effective metadata of every tool, sorted by name
    pub fn metadata(&self) -> Vec<&ToolMetadata> {
        let mut all: Vec<&ToolMetadata> = self.tools.values().map(|t| &t.metadata).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Sorted names of tools in a category
    pub fn by_category(&self, category: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .values()
            .filter(|t| t.metadata.category == category)
            .map(|t| t.metadata.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
