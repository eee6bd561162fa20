//! Telemetry sinks for tool invocations
//!
//! The engine reports two side channels: analytics events (one per state
//! transition) and a performance record (one per finished invocation).
//! Sinks are fire-and-forget; a failing sink never changes an outcome.

use crate::errors::TelemetryError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Analytics event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Start,
    Success,
    Error,
}

/// Single analytics event
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub event_type: EventType,
    pub tool_name: String,
    pub duration_ms: Option<u64>,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(event_type: EventType, tool_name: impl Into<String>) -> Self {
        Self {
            event_type,
            tool_name: tool_name.into(),
            duration_ms: None,
            success: event_type != EventType::Error,
            error_code: None,
            error_message: None,
            metadata: serde_json::Value::Null,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Per-invocation performance sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRecord {
    pub tool_name: String,
    pub duration_ms: u64,
    pub success: bool,
    pub cache_hit: bool,
    pub error_type: Option<String>,
}

/// Sink for analytics events
pub trait AnalyticsRecorder: Send + Sync {
    fn record(&self, event: AnalyticsEvent) -> Result<(), TelemetryError>;
}

/// Sink for performance samples
pub trait PerformanceRecorder: Send + Sync {
    fn record(&self, record: PerformanceRecord) -> Result<(), TelemetryError>;
}

/// Aggregate statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub invocations: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub rate_limited: usize,
}

/// Per-tool execution statistics
#[derive(Debug, Clone, Default)]
pub struct ToolStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub cache_hits: u64,
    pub total_duration_ms: u64,
}

impl ToolStats {
    fn record(&mut self, record: &PerformanceRecord) {
        self.total_executions += 1;
        if record.success {
            self.successful_executions += 1;
        } else {
            self.failed_executions += 1;
        }
        if record.cache_hit {
            self.cache_hits += 1;
        }
        self.total_duration_ms += record.duration_ms;
    }

    pub fn average_duration_ms(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / self.total_executions as f64
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.successful_executions as f64 / self.total_executions as f64
        }
    }
}

/// Events and records retained by a collector
pub const DEFAULT_HISTORY: usize = 1000;

struct CollectorState {
    events: VecDeque<AnalyticsEvent>,
    records: VecDeque<PerformanceRecord>,
    history: usize,
    stats: TelemetryStats,
    per_tool: HashMap<String, ToolStats>,
}

/// Append `item`, dropping the oldest entries beyond `limit`
fn push_bounded<T>(buffer: &mut VecDeque<T>, item: T, limit: usize) {
    buffer.push_back(item);
    while buffer.len() > limit {
        buffer.pop_front();
    }
}

/// In-memory telemetry collector
///
/// Cheap to clone; clones share the same buffers. Counters cover every
/// invocation, but only the newest `history` events and records are kept.
#[derive(Clone)]
pub struct TelemetryCollector {
    state: Arc<Mutex<CollectorState>>,
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CollectorState {
                events: VecDeque::new(),
                records: VecDeque::new(),
                history,
                stats: TelemetryStats::default(),
                per_tool: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CollectorState>, TelemetryError> {
        self.state
            .lock()
            .map_err(|_| TelemetryError("collector lock poisoned".to_string()))
    }

    /// Get current statistics
    pub fn stats(&self) -> TelemetryStats {
        self.lock().map(|s| s.stats.clone()).unwrap_or_default()
    }

    /// Statistics for one tool
    pub fn tool_stats(&self, tool: &str) -> Option<ToolStats> {
        self.lock().ok()?.per_tool.get(tool).cloned()
    }

    pub fn event_count(&self) -> usize {
        self.lock().map(|s| s.events.len()).unwrap_or(0)
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<AnalyticsEvent> {
        match self.lock() {
            Ok(state) => {
                let start = state.events.len().saturating_sub(n);
                state.events.iter().skip(start).cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn performance_records(&self) -> Vec<PerformanceRecord> {
        self.lock()
            .map(|s| s.records.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Fraction of finished invocations that succeeded
    pub fn success_rate(&self) -> f64 {
        let stats = self.stats();
        let total = stats.succeeded + stats.failed;
        if total == 0 {
            1.0
        } else {
            stats.succeeded as f64 / total as f64
        }
    }
}

impl AnalyticsRecorder for TelemetryCollector {
    fn record(&self, event: AnalyticsEvent) -> Result<(), TelemetryError> {
        let mut state = self.lock()?;
        match event.event_type {
            EventType::Start => state.stats.invocations += 1,
            EventType::Success => state.stats.succeeded += 1,
            EventType::Error => {
                state.stats.failed += 1;
                if event.error_code.as_deref() == Some("RATE_LIMIT_EXCEEDED") {
                    state.stats.rate_limited += 1;
                }
            }
        }
        let history = state.history;
        push_bounded(&mut state.events, event, history);
        Ok(())
    }
}

impl PerformanceRecorder for TelemetryCollector {
    fn record(&self, record: PerformanceRecord) -> Result<(), TelemetryError> {
        let mut state = self.lock()?;
        if record.cache_hit {
            state.stats.cache_hits += 1;
        }
        state
            .per_tool
            .entry(record.tool_name.clone())
            .or_default()
            .record(&record);
        let history = state.history;
        push_bounded(&mut state.records, record, history);
        Ok(())
    }
}

/// Emits every event as a structured `tracing` record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl AnalyticsRecorder for TracingRecorder {
    fn record(&self, event: AnalyticsEvent) -> Result<(), TelemetryError> {
        tracing::info!(
            target: "toolguard::analytics",
            event_type = ?event.event_type,
            tool = %event.tool_name,
            duration_ms = event.duration_ms,
            success = event.success,
            error_code = event.error_code.as_deref(),
            error_message = event.error_message.as_deref(),
            metadata = %event.metadata,
        );
        Ok(())
    }
}

impl PerformanceRecorder for TracingRecorder {
    fn record(&self, record: PerformanceRecord) -> Result<(), TelemetryError> {
        tracing::debug!(
            target: "toolguard::performance",
            tool = %record.tool_name,
            duration_ms = record.duration_ms,
            success = record.success,
            cache_hit = record.cache_hit,
            error_type = record.error_type.as_deref(),
        );
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl AnalyticsRecorder for NoopRecorder {
    fn record(&self, _event: AnalyticsEvent) -> Result<(), TelemetryError> {
        Ok(())
    }
}

impl PerformanceRecorder for NoopRecorder {
    fn record(&self, _record: PerformanceRecord) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// The pair of sinks handed to the engine
#[derive(Clone)]
pub struct Recorders {
    pub analytics: Arc<dyn AnalyticsRecorder>,
    pub performance: Arc<dyn PerformanceRecorder>,
}

impl Recorders {
    pub fn new(
        analytics: Arc<dyn AnalyticsRecorder>,
        performance: Arc<dyn PerformanceRecorder>,
    ) -> Self {
        Self {
            analytics,
            performance,
        }
    }

    /// Route both channels to one collector
    pub fn collector(collector: &TelemetryCollector) -> Self {
        Self::new(Arc::new(collector.clone()), Arc::new(collector.clone()))
    }

    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingRecorder), Arc::new(TracingRecorder))
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopRecorder), Arc::new(NoopRecorder))
    }
}

impl Default for Recorders {
    fn default() -> Self {
        Self::tracing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perf(tool: &str, success: bool, cache_hit: bool, duration_ms: u64) -> PerformanceRecord {
        PerformanceRecord {
            tool_name: tool.to_string(),
            duration_ms,
            success,
            cache_hit,
            error_type: None,
        }
    }

    #[test]
    fn test_collector_creation() {
        let collector = TelemetryCollector::new();
        assert_eq!(collector.event_count(), 0);
        assert_eq!(collector.stats().invocations, 0);
    }

    #[test]
    fn test_record_lifecycle_events() {
        let collector = TelemetryCollector::new();
        AnalyticsRecorder::record(&collector, AnalyticsEvent::new(EventType::Start, "search"))
            .unwrap();
        AnalyticsRecorder::record(
            &collector,
            AnalyticsEvent::new(EventType::Success, "search").with_duration(12),
        )
        .unwrap();

        let stats = collector.stats();
        assert_eq!(stats.invocations, 1);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(collector.event_count(), 2);
    }

    #[test]
    fn test_rate_limited_counted() {
        let collector = TelemetryCollector::new();
        AnalyticsRecorder::record(
            &collector,
            AnalyticsEvent::new(EventType::Error, "search")
                .with_error("RATE_LIMIT_EXCEEDED", "slow down"),
        )
        .unwrap();

        let stats = collector.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.rate_limited, 1);
    }

    #[test]
    fn test_per_tool_stats() {
        let collector = TelemetryCollector::new();
        PerformanceRecorder::record(&collector, perf("translate", true, false, 100)).unwrap();
        PerformanceRecorder::record(&collector, perf("translate", true, true, 200)).unwrap();
        PerformanceRecorder::record(&collector, perf("translate", false, false, 150)).unwrap();

        let stats = collector.tool_stats("translate").unwrap();
        assert_eq!(stats.total_executions, 3);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.average_duration_ms(), 150.0);
        assert!((stats.success_rate() - 0.666).abs() < 0.01);
        assert_eq!(collector.stats().cache_hits, 1);
    }

    #[test]
    fn test_recent_events() {
        let collector = TelemetryCollector::new();
        for i in 0..10 {
            AnalyticsRecorder::record(
                &collector,
                AnalyticsEvent::new(EventType::Start, format!("tool{}", i)),
            )
            .unwrap();
        }

        let recent = collector.recent_events(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[2].tool_name, "tool9");
    }

    #[test]
    fn test_error_event_marks_failure() {
        let event = AnalyticsEvent::new(EventType::Error, "chart").with_error("X", "y");
        assert!(!event.success);
        assert_eq!(event.error_code.as_deref(), Some("X"));
    }

    #[test]
    fn test_history_is_bounded() {
        let collector = TelemetryCollector::with_history(5);
        for i in 0..20 {
            AnalyticsRecorder::record(
                &collector,
                AnalyticsEvent::new(EventType::Start, format!("tool{}", i)),
            )
            .unwrap();
            PerformanceRecorder::record(&collector, perf("echo", true, false, i)).unwrap();
        }

        assert_eq!(collector.event_count(), 5);
        assert_eq!(collector.performance_records().len(), 5);
        assert_eq!(collector.performance_records()[0].duration_ms, 15);

        let recent = collector.recent_events(10);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].tool_name, "tool15");
        assert_eq!(recent[4].tool_name, "tool19");

        // Counters still see every invocation
        assert_eq!(collector.stats().invocations, 20);
        assert_eq!(collector.tool_stats("echo").unwrap().total_executions, 20);
    }

    #[test]
    fn test_builtin_recorders_accept_everything() {
        for recorders in [Recorders::noop(), Recorders::tracing()] {
            recorders
                .analytics
                .record(AnalyticsEvent::new(EventType::Success, "echo").with_duration(3))
                .unwrap();
            recorders
                .performance
                .record(perf("echo", true, false, 3))
                .unwrap();
        }
    }
}
