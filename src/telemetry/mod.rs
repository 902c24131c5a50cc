//! # Telemetry Core
//!
//! Process-scoped instrumentation objects, built once and injected into the pipeline:
//!
//! - [`Tracer`] and [`Span`]: hierarchical spans per logical request.
//! - [`MetricsRegistry`]: counters, histograms and up-down counters.
//! - [`SpanExporter`]: where closed spans go.
//!
//! [`Telemetry`] bundles them with an explicit lifecycle (`new` ... `shutdown`) so tests
//! can substitute an in-memory exporter instead of relying on globals.

pub mod export;
pub mod id;
pub mod metrics;
pub mod span;
pub mod tracer;

use std::sync::Arc;

pub use export::{InMemoryExporter, LogExporter, NoopExporter, SpanExporter};
pub use id::{SpanContext, SpanId, TraceId};
pub use metrics::{
    Counter, Histogram, InstrumentDescriptor, InstrumentKind, MetricsRegistry, MetricsSnapshot,
    UpDownCounter,
};
pub use span::{AttributeValue, Span, SpanData, SpanStatus};
pub use tracer::Tracer;

use tracing::info;

/// Tracer, metric registry and exporter with a shared lifecycle.
#[derive(Clone)]
pub struct Telemetry {
    tracer: Tracer,
    metrics: MetricsRegistry,
    exporter: Arc<dyn SpanExporter>,
}

impl Telemetry {
    pub fn new(exporter: Arc<dyn SpanExporter>) -> Self {
        Self {
            tracer: Tracer::new(exporter.clone()),
            metrics: MetricsRegistry::new(),
            exporter,
        }
    }

    /// Spans are discarded; metrics are still aggregated in memory.
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopExporter))
    }

    /// Telemetry that records every closed span, plus a handle to read them back.
    pub fn in_memory() -> (Self, InMemoryExporter) {
        let exporter = InMemoryExporter::new();
        (Self::new(Arc::new(exporter.clone())), exporter)
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Flushes the exporter. Spans ended afterwards are still passed to it.
    pub async fn shutdown(&self) {
        self.exporter.shutdown().await;
        info!("Telemetry shut down");
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
