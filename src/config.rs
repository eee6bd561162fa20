//! Configuration management for toolguard
//!
//! TOML-based configuration with defaults and validation.
//! Location: ~/.toolguard/config.toml

use crate::cache::MAX_CACHE_TTL;
use crate::errors::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    /// Per-tool metadata overrides, keyed by tool name
    pub tools: BTreeMap<String, ToolOverride>,
}

/// Execution engine behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Skip rate limiting; tools may also check it to return canned data
    pub mock_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    None,
    Local,
    /// Remote store, falling back to local when unreachable at startup
    Remote,
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub max_size: usize,
    pub default_ttl_secs: u64,
    pub remote_url: Option<String>,
    pub connect_timeout_ms: u64,
    pub key_prefix: String,
}

/// Token-bucket limits, in tokens per minute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub default_limit: f64,
    pub limits: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// Optional replacements for a tool's built-in metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolOverride {
    pub category: Option<String>,
    pub rate_limit_type: Option<String>,
    pub rate_limit_cost: Option<f64>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub retry_max_delay_ms: Option<u64>,
    pub retry_jitter: Option<bool>,
    pub cache_enabled: Option<bool>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_key_params: Option<Vec<String>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Local,
            max_size: 1000,
            default_ttl_secs: 3600,
            remote_url: None,
            connect_timeout_ms: 2000,
            key_prefix: "toolguard:".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut limits = BTreeMap::new();
        limits.insert("default".to_string(), 60.0);
        Self {
            default_limit: 60.0,
            limits,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(config_path) => Self::load_from_file(config_path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GuardError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| GuardError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the standard location, or built-in defaults if absent
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".toolguard").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_size == 0 {
            return Err(GuardError::ConfigError(
                "cache.max_size must be greater than 0".to_string(),
            ));
        }

        if self.cache.connect_timeout_ms == 0 || self.cache.connect_timeout_ms > 2000 {
            return Err(GuardError::ConfigError(
                "cache.connect_timeout_ms must be between 1 and 2000".to_string(),
            ));
        }

        if self.cache.backend == CacheBackendKind::Remote && self.cache.remote_url.is_none() {
            return Err(GuardError::ConfigError(
                "cache.remote_url is required for the remote backend".to_string(),
            ));
        }

        if !is_valid_limit(self.rate_limit.default_limit) {
            return Err(GuardError::ConfigError(
                "rate_limit.default_limit must be a finite number greater than 0".to_string(),
            ));
        }

        if let Some((name, _)) = self
            .rate_limit
            .limits
            .iter()
            .find(|(_, limit)| !is_valid_limit(**limit))
        {
            return Err(GuardError::ConfigError(format!(
                "rate_limit.limits.{} must be a finite number greater than 0",
                name
            )));
        }

        let max_ttl_secs = MAX_CACHE_TTL.as_secs();
        if self.cache.default_ttl_secs > max_ttl_secs {
            return Err(GuardError::ConfigError(format!(
                "cache.default_ttl_secs must not exceed {}",
                max_ttl_secs
            )));
        }

        for (tool, over) in &self.tools {
            if matches!(over.rate_limit_cost, Some(cost) if !(cost.is_finite() && cost >= 0.0)) {
                return Err(GuardError::ConfigError(format!(
                    "tools.{}.rate_limit_cost must be a finite, non-negative number",
                    tool
                )));
            }
            if matches!(over.cache_ttl_secs, Some(secs) if secs > max_ttl_secs) {
                return Err(GuardError::ConfigError(format!(
                    "tools.{}.cache_ttl_secs must not exceed {}",
                    tool, max_ttl_secs
                )));
            }
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(GuardError::ConfigError(format!(
                    "Invalid log level: {}",
                    self.logging.level
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GuardError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| GuardError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GuardError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Override for one tool, if configured
    pub fn tool_override(&self, tool: &str) -> Option<&ToolOverride> {
        self.tools.get(tool)
    }
}

fn is_valid_limit(limit: f64) -> bool {
    limit.is_finite() && limit > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.engine.mock_mode);
        assert_eq!(config.cache.backend, CacheBackendKind::Local);
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.rate_limit.default_limit, 60.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_cache() {
        let mut config = Config::default();
        config.cache.max_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_timeout_ceiling() {
        let mut config = Config::default();
        config.cache.connect_timeout_ms = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_remote_requires_url() {
        let mut config = Config::default();
        config.cache.backend = CacheBackendKind::Remote;
        assert!(config.validate().is_err());
        config.cache.remote_url = Some("http://cache.internal:8080".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_limits() {
        let mut config = Config::default();
        config.rate_limit.limits.insert("search".to_string(), 0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[engine]
mock_mode = true

[cache]
backend = "none"

[rate_limit.limits]
search = 30.0

[tools.web_search]
cache_enabled = true
cache_ttl_secs = 600
cache_key_params = ["query"]
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert!(config.engine.mock_mode);
        assert_eq!(config.cache.backend, CacheBackendKind::None);
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.rate_limit.limits.get("search"), Some(&30.0));

        let over = config.tool_override("web_search").unwrap();
        assert_eq!(over.cache_enabled, Some(true));
        assert_eq!(over.cache_ttl_secs, Some(600));
        assert_eq!(over.cache_key_params, Some(vec!["query".to_string()]));
        assert!(config.tool_override("other").is_none());
    }

    #[test]
    fn test_validation_non_finite_limits() {
        for bad in [f64::NAN, f64::INFINITY, -1.0, 0.0] {
            let mut config = Config::default();
            config.rate_limit.default_limit = bad;
            assert!(config.validate().is_err(), "default_limit {} accepted", bad);

            let mut config = Config::default();
            config.rate_limit.limits.insert("search".to_string(), bad);
            assert!(config.validate().is_err(), "limit {} accepted", bad);
        }
    }

    #[test]
    fn test_validation_non_finite_cost() {
        for bad in [f64::NAN, f64::INFINITY, -0.5] {
            let mut config = Config::default();
            config.tools.insert(
                "web_search".to_string(),
                ToolOverride {
                    rate_limit_cost: Some(bad),
                    ..ToolOverride::default()
                },
            );
            assert!(config.validate().is_err(), "cost {} accepted", bad);
        }
    }

    #[test]
    fn test_load_rejects_nan_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rate_limit]\ndefault_limit = nan").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_validation_ttl_ceiling() {
        let mut config = Config::default();
        config.cache.default_ttl_secs = i64::MAX as u64;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tools.insert(
            "web_search".to_string(),
            ToolOverride {
                cache_ttl_secs: Some(i64::MAX as u64),
                ..ToolOverride::default()
            },
        );
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.default_ttl_secs = MAX_CACHE_TTL.as_secs();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nmax_size = 0").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.rate_limit.limits.insert("image".to_string(), 10.0);
        config.save(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.rate_limit.limits.get("image"), Some(&10.0));
    }
}
