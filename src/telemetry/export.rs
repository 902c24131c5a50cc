//! # Span Export Boundary
//!
//! Closed spans leave the tracer through a [`SpanExporter`]. Batching, wire encoding and
//! transport belong to whatever sits behind this trait.
//!
//! - [`LogExporter`] writes every closed span as one structured `tracing` event.
//! - [`InMemoryExporter`] keeps closed spans for inspection in tests.
//! - [`NoopExporter`] discards them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::id::TraceId;
use super::span::SpanData;

/// Receives every span exactly once, at the moment it ends.
#[async_trait]
pub trait SpanExporter: Send + Sync {
    /// Must not block; called from inside request handling.
    fn export(&self, span: SpanData);

    /// Flushes anything buffered. Called once at teardown.
    async fn shutdown(&self) {}
}

/// Discards every span.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExporter;

impl SpanExporter for NoopExporter {
    fn export(&self, _span: SpanData) {}
}

/// Keeps every closed span in memory, in the order they ended.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().clone()
    }

    pub fn by_trace(&self, trace_id: TraceId) -> Vec<SpanData> {
        self.spans
            .lock()
            .iter()
            .filter(|s| s.trace_id == trace_id)
            .cloned()
            .collect()
    }

    pub fn roots(&self) -> Vec<SpanData> {
        self.spans
            .lock()
            .iter()
            .filter(|s| s.is_root())
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.spans.lock().clear();
    }
}

impl SpanExporter for InMemoryExporter {
    fn export(&self, span: SpanData) {
        self.spans.lock().push(span);
    }
}

/// Emits each closed span as an `info` event on the `spans` target.
#[derive(Debug, Default)]
pub struct LogExporter {
    exported: AtomicU64,
}

impl LogExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exported(&self) -> u64 {
        self.exported.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SpanExporter for LogExporter {
    fn export(&self, span: SpanData) {
        self.exported.fetch_add(1, Ordering::Relaxed);
        let duration_ms = span
            .duration()
            .map(|d| d.num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0)
            .unwrap_or_default();
        let parent = span
            .parent_span_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let attributes = span
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        match &span.status {
            super::SpanStatus::Ok => info!(
                target: "spans",
                trace_id = %span.trace_id,
                span_id = %span.span_id,
                parent = %parent,
                duration_ms,
                attributes = %attributes,
                "{}", span.name
            ),
            super::SpanStatus::Error { message } => info!(
                target: "spans",
                trace_id = %span.trace_id,
                span_id = %span.span_id,
                parent = %parent,
                duration_ms,
                attributes = %attributes,
                error = %message,
                "{}", span.name
            ),
        }
    }

    async fn shutdown(&self) {
        debug!(exported = self.exported(), "Span log exporter shut down");
    }
}
