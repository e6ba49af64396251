//! Progress Event Stream
//!
//! The orchestrator narrates its work through a [`ProgressSink`]. Events are
//! opaque payloads with a `type` tag and a human-readable `content` string;
//! consumers must tolerate tags they don't know.
//!
//! Sink writes may fail at any time (peer disconnect). Every write goes
//! through [`SafeSink`], which swallows the error, reports success/failure,
//! and never lets a sink problem abort research.

mod console;

pub use console::ConsoleSink;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::types::{ResearchPlan, Result};

// =============================================================================
// Progress Events
// =============================================================================

/// One progress event. Serializes as `{"type": "...", "content": "...", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressUpdate {
    /// General narration, including streamed report chunks
    Progress { content: String },

    /// The plan changed (initial creation or rebalance)
    PlanRevision {
        content: String,
        plan: ResearchPlan,
    },

    /// A component finished with interim counts
    MidComponentResults {
        content: String,
        component: String,
        learnings: usize,
        urls: usize,
    },

    /// Saturation evaluation outcome for a component iteration
    ResearchSaturation {
        content: String,
        component: String,
        coverage: u8,
        saturated: bool,
    },

    /// Timing snapshot around a component boundary
    ComponentTiming {
        content: String,
        component: String,
        elapsed_ms: u64,
        remaining_ms: u64,
    },

    /// Scheduler decision to continue or skip a component
    TimeDecision {
        content: String,
        component: String,
        continued: bool,
    },

    /// Final result announcement
    Result { content: String },

    /// Error surfaced to the consumer (run aborted, component failed)
    Error { content: String },
}

impl ProgressUpdate {
    /// The human-readable content string every event carries
    pub fn content(&self) -> &str {
        match self {
            Self::Progress { content }
            | Self::PlanRevision { content, .. }
            | Self::MidComponentResults { content, .. }
            | Self::ResearchSaturation { content, .. }
            | Self::ComponentTiming { content, .. }
            | Self::TimeDecision { content, .. }
            | Self::Result { content }
            | Self::Error { content } => content,
        }
    }

    /// Tag string as it appears on the wire
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::PlanRevision { .. } => "plan_revision",
            Self::MidComponentResults { .. } => "mid_component_results",
            Self::ResearchSaturation { .. } => "research_saturation",
            Self::ComponentTiming { .. } => "component_timing",
            Self::TimeDecision { .. } => "time_decision",
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
        }
    }

    pub fn progress(content: impl Into<String>) -> Self {
        Self::Progress {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }
}

// =============================================================================
// Sink Trait
// =============================================================================

/// Destination for progress events (SSE stream, terminal, test buffer).
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Deliver one event. May fail; failures are handled by [`SafeSink`].
    async fn send(&self, event: &ProgressUpdate) -> Result<()>;

    /// Close the sink. Default is a no-op.
    async fn close(&self) {}
}

/// Sink that discards everything
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn send(&self, _event: &ProgressUpdate) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Safe Write Wrapper
// =============================================================================

/// Wraps any sink so that write failures are swallowed and reported as a
/// boolean instead of propagating.
#[derive(Clone)]
pub struct SafeSink {
    inner: Arc<dyn ProgressSink>,
}

impl SafeSink {
    pub fn new(inner: Arc<dyn ProgressSink>) -> Self {
        Self { inner }
    }

    pub fn null() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Emit an event; returns whether the write succeeded.
    pub async fn emit(&self, event: ProgressUpdate) -> bool {
        match self.inner.send(&event).await {
            Ok(()) => true,
            Err(e) => {
                debug!(tag = event.type_tag(), error = %e, "progress sink write failed");
                false
            }
        }
    }

    /// Convenience for plain narration events
    pub async fn progress(&self, content: impl Into<String>) -> bool {
        self.emit(ProgressUpdate::progress(content)).await
    }

    pub async fn close(&self) {
        self.inner.close().await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records every event for assertions
    #[derive(Default)]
    pub struct CollectingSink {
        pub events: Mutex<Vec<ProgressUpdate>>,
        pub fail: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl ProgressSink for CollectingSink {
        async fn send(&self, event: &ProgressUpdate) -> Result<()> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(crate::types::FathomError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "peer disconnected",
                )));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    impl CollectingSink {
        pub fn tags(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(|e| e.type_tag()).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CollectingSink;
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ProgressUpdate::progress("working");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["content"], "working");

        let event = ProgressUpdate::TimeDecision {
            content: "skipping".to_string(),
            component: "A".to_string(),
            continued: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "time_decision");
    }

    #[tokio::test]
    async fn test_safe_sink_swallows_failures() {
        let sink = Arc::new(CollectingSink::default());
        let safe = SafeSink::new(sink.clone());

        assert!(safe.progress("one").await);

        sink.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        // Write fails but does not propagate
        assert!(!safe.progress("two").await);

        assert_eq!(sink.tags(), vec!["progress"]);
    }
}
