//! Tool runtime coordinator
//!
//! Composition root: builds the shared cache manager, rate limiter and
//! engine once from configuration, owns the registry, and dispatches
//! invocations by tool name.

use crate::cache::CacheManager;
use crate::config::Config;
use crate::engine::{ExecutionEngine, ToolResponse};
use crate::errors::Result;
use crate::ratelimit::RateLimiter;
use crate::telemetry::Recorders;
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{Tool, ToolParams};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub struct ToolRuntime {
    engine: Arc<ExecutionEngine>,
    registry: ToolRegistry,
    config: Config,
}

impl ToolRuntime {
    /// Build with tracing-backed telemetry
    pub async fn from_config(config: Config) -> Self {
        Self::with_recorders(config, Recorders::tracing()).await
    }

    pub async fn with_recorders(config: Config, recorders: Recorders) -> Self {
        let cache = Arc::new(CacheManager::from_config(&config.cache).await);
        let limiter = Arc::new(RateLimiter::with_limits(
            config.rate_limit.default_limit,
            config
                .rate_limit
                .limits
                .iter()
                .map(|(name, limit)| (name.clone(), *limit)),
        ));
        let engine = ExecutionEngine::new(cache, limiter, recorders)
            .with_mock_mode(config.engine.mock_mode)
            .with_default_ttl(Duration::from_secs(config.cache.default_ttl_secs));

        info!(
            cache = engine.cache().backend_name(),
            mock_mode = config.engine.mock_mode,
            "Tool runtime ready"
        );

        Self {
            engine: Arc::new(engine),
            registry: ToolRegistry::new(),
            config,
        }
    }

    /// Register a tool, applying any `[tools.<name>]` override
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let over = self.config.tool_override(&tool.metadata().name).cloned();
        self.registry.register_with_override(tool, over.as_ref())
    }

    /// Execute a registered tool by name
    pub async fn execute(
        &self,
        tool: &str,
        params: &ToolParams,
        user_id: Option<&str>,
    ) -> ToolResponse {
        match self.registry.get(tool) {
            Some(registered) => {
                self.engine
                    .run_with(registered.tool.as_ref(), &registered.metadata, params, user_id)
                    .await
            }
            None => ToolResponse::not_found(tool, Uuid::new_v4().to_string()),
        }
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.registry.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheBackendKind, ToolOverride};
    use crate::engine::TOOL_NOT_FOUND;
    use crate::telemetry::TelemetryCollector;
    use crate::tools::builtin::EchoTool;
    use serde_json::json;

    async fn setup_runtime(config: Config) -> (ToolRuntime, TelemetryCollector) {
        let collector = TelemetryCollector::new();
        let mut runtime =
            ToolRuntime::with_recorders(config, Recorders::collector(&collector)).await;
        runtime.register(Arc::new(EchoTool::new())).unwrap();
        (runtime, collector)
    }

    fn text(value: &str) -> ToolParams {
        let mut params = ToolParams::new();
        params.insert("text".to_string(), json!(value));
        params
    }

    #[tokio::test]
    async fn test_runtime_creation() {
        let (runtime, _) = setup_runtime(Config::default()).await;
        assert_eq!(runtime.tool_names(), vec!["echo".to_string()]);
        assert!(runtime.has_tool("echo"));
        assert_eq!(runtime.engine().cache().backend_name(), "local");
    }

    #[tokio::test]
    async fn test_execute_echo_twice_hits_cache() {
        let (runtime, collector) = setup_runtime(Config::default()).await;

        let first = runtime.execute("echo", &text("hi"), None).await;
        let second = runtime.execute("echo", &text("hi"), None).await;

        assert!(first.success);
        assert!(!first.metadata.cache_hit);
        assert!(second.metadata.cache_hit);
        assert_eq!(collector.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (runtime, _) = setup_runtime(Config::default()).await;
        let response = runtime.execute("nope", &ToolParams::new(), None).await;
        assert!(!response.success);
        assert_eq!(response.error_code(), Some(TOOL_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_override_disables_cache() {
        let mut config = Config::default();
        config.tools.insert(
            "echo".to_string(),
            ToolOverride {
                cache_enabled: Some(false),
                ..ToolOverride::default()
            },
        );
        let (runtime, _) = setup_runtime(config).await;

        runtime.execute("echo", &text("hi"), None).await;
        let second = runtime.execute("echo", &text("hi"), None).await;
        assert!(!second.metadata.cache_hit);
    }

    #[tokio::test]
    async fn test_configured_limits_apply() {
        let mut config = Config::default();
        config.cache.backend = CacheBackendKind::None;
        config.rate_limit.limits.insert("default".to_string(), 2.0);
        let (runtime, _) = setup_runtime(config).await;

        assert!(runtime.execute("echo", &text("a"), None).await.success);
        assert!(runtime.execute("echo", &text("b"), None).await.success);
        let third = runtime.execute("echo", &text("c"), None).await;
        assert_eq!(third.error_code(), Some("RATE_LIMIT_EXCEEDED"));
    }

    #[tokio::test]
    async fn test_mock_mode_from_config() {
        let mut config = Config::default();
        config.engine.mock_mode = true;
        config.rate_limit.limits.insert("default".to_string(), 1.0);
        let (runtime, _) = setup_runtime(config).await;

        for i in 0..3 {
            let response = runtime.execute("echo", &text(&i.to_string()), None).await;
            assert!(response.success);
            assert_eq!(response.result.unwrap()["mock"], true);
        }
    }
}
