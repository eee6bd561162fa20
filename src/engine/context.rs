//! Per-invocation context

use crate::tools::ToolMetadata;
use tokio::time::Instant;
use uuid::Uuid;

/// State for one pass through the engine
///
/// Created at the start of `run()` and owned by the engine; tools receive a
/// shared reference for each attempt.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: String,
    pub tool_name: String,
    pub tool_category: String,
    pub user_id: Option<String>,
    pub start_time: Instant,
    /// Zero-based index of the attempt in flight
    pub retry_attempt: u32,
    /// Tools may return canned data when set
    pub mock_mode: bool,
}

impl InvocationContext {
    pub fn new(metadata: &ToolMetadata, user_id: Option<&str>, mock_mode: bool) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            tool_name: metadata.name.clone(),
            tool_category: metadata.category.clone(),
            user_id: user_id.map(str::to_string),
            start_time: Instant::now(),
            retry_attempt: 0,
            mock_mode,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Rate-limit bucket key: caller plus operation
    pub fn rate_key(&self) -> String {
        format!(
            "{}:{}",
            self.user_id.as_deref().unwrap_or("anonymous"),
            self.tool_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let meta = ToolMetadata::new("search", "web");
        let a = InvocationContext::new(&meta, None, false);
        let b = InvocationContext::new(&meta, None, false);
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.retry_attempt, 0);
    }

    #[test]
    fn test_rate_key() {
        let meta = ToolMetadata::new("search", "web");
        assert_eq!(
            InvocationContext::new(&meta, Some("u1"), false).rate_key(),
            "u1:search"
        );
        assert_eq!(
            InvocationContext::new(&meta, None, false).rate_key(),
            "anonymous:search"
        );
    }
}
