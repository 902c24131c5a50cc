use std::sync::Arc;

use chrono::Utc;
use tracing::trace;

use super::export::SpanExporter;
use super::id::{SpanContext, SpanId, TraceId};
use super::span::{Key, Span, SpanData, SpanStatus};

/// Creates spans and hands closed ones to the exporter.
///
/// The tracer holds no "current span" state. The parent of a new span is always passed
/// in explicitly, which keeps concurrent requests on the same worker independent.
#[derive(Clone)]
pub struct Tracer {
    exporter: Arc<dyn SpanExporter>,
}

impl Tracer {
    pub fn new(exporter: Arc<dyn SpanExporter>) -> Self {
        Self { exporter }
    }

    /// Starts a new trace.
    pub fn root_span(&self, name: impl Into<Key>) -> Span<'static> {
        self.start_span(name, None)
    }

    /// Starts a span under `parent`, or a new trace when `parent` is `None`.
    pub fn start_span<'p>(&self, name: impl Into<Key>, parent: Option<&'p Span<'_>>) -> Span<'p> {
        let name = name.into();
        let (trace_id, parent_span_id, start_time) = match parent {
            None => (TraceId::random(), None, Utc::now()),
            Some(parent) if !parent.is_recording() => {
                trace!(span = %name, parent_span_id = %parent.context().span_id, "parent already closed, span not recorded");
                let context = SpanContext {
                    trace_id: parent.trace_id(),
                    span_id: SpanId::random(),
                };
                return Span::non_recording(self.clone(), context);
            }
            Some(parent) => (
                parent.trace_id(),
                Some(parent.context().span_id),
                parent.clock_now(),
            ),
        };

        let data = SpanData {
            trace_id,
            span_id: SpanId::random(),
            parent_span_id,
            name,
            attributes: Vec::new(),
            status: SpanStatus::Ok,
            start_time,
            end_time: None,
        };
        Span::recording(self.clone(), data)
    }

    pub(crate) fn export(&self, data: SpanData) {
        self.exporter.export(data);
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}
