//! # Span Model
//!
//! A [`Span`] is the live, owned handle of one traced operation. When it ends, its
//! [`SpanData`] record is frozen and handed to the tracer's exporter.
//!
//! ## Nesting
//!
//! A child span *borrows* its parent (`Span<'p>` carries the parent's lifetime). The
//! parent therefore cannot be ended, mutated, or dropped while any child is still
//! alive, so children always close before (or together with) their parent:
//!
//! ```rust,ignore
//! let mut root = tracer.root_span("POST /orders");
//! {
//!     let mut step = root.child("check_inventory");
//!     step.attribute("downstream.operation", "SELECT");
//! } // step ends here
//! root.end();
//! ```
//!
//! The span handle is also the request-scoped context: it is passed explicitly to every
//! call that may suspend, so interleaved requests never share an "active span" slot.
//!
//! ## Misuse
//!
//! Adding attributes to, or ending, an already-closed span is a silent no-op. A child
//! requested from a closed span is non-recording and is never exported.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use super::id::{SpanContext, SpanId, TraceId};
use super::tracer::Tracer;

/// Attribute and span names are mostly static strings.
pub type Key = Cow<'static, str>;

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(v) => f.write_str(v),
            AttributeValue::I64(v) => write!(f, "{v}"),
            AttributeValue::F64(v) => write!(f, "{v}"),
            AttributeValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<Cow<'static, str>> for AttributeValue {
    fn from(v: Cow<'static, str>) -> Self {
        AttributeValue::String(v.into_owned())
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::I64(v)
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        AttributeValue::I64(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        AttributeValue::I64(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::F64(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

/// Outcome of a span. Once set to `Error`, further `set_error` calls only replace the message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "code", rename_all = "UPPERCASE")]
pub enum SpanStatus {
    #[default]
    Ok,
    Error { message: String },
}

impl SpanStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SpanStatus::Error { .. })
    }
}

/// The record of one traced operation, as handed to the exporter.
#[derive(Debug, Clone, Serialize)]
pub struct SpanData {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    /// Weak reference to the parent: only its id, never the parent itself.
    pub parent_span_id: Option<SpanId>,
    pub name: Key,
    /// Insertion-ordered; setting an existing key replaces its value in place.
    pub attributes: Vec<(Key, AttributeValue)>,
    pub status: SpanStatus,
    pub start_time: DateTime<Utc>,
    /// `None` until the span ends; set exactly once.
    pub end_time: Option<DateTime<Utc>>,
}

impl SpanData {
    pub fn context(&self) -> SpanContext {
        SpanContext {
            trace_id: self.trace_id,
            span_id: self.span_id,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Live handle of an open span. Ends (and exports) itself on drop if not ended explicitly.
///
/// Timestamps are the wall-clock `anchor` taken at start plus monotonic time elapsed
/// on the runtime clock, so an end time never precedes its start and follows paused
/// test time.
pub struct Span<'p> {
    tracer: Tracer,
    context: SpanContext,
    data: Option<SpanData>,
    anchor: DateTime<Utc>,
    started: Instant,
    _parent: PhantomData<&'p ()>,
}

impl<'p> Span<'p> {
    pub(crate) fn recording(tracer: Tracer, data: SpanData) -> Self {
        Self {
            tracer,
            context: data.context(),
            anchor: data.start_time,
            started: Instant::now(),
            data: Some(data),
            _parent: PhantomData,
        }
    }

    pub(crate) fn non_recording(tracer: Tracer, context: SpanContext) -> Self {
        Self {
            tracer,
            context,
            data: None,
            anchor: Utc::now(),
            started: Instant::now(),
            _parent: PhantomData,
        }
    }

    /// The current time on this span's clock. Children start from it, so a child's
    /// timestamps are offsets from its root and never run backwards.
    pub(crate) fn clock_now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor
            .checked_add_signed(elapsed)
            .unwrap_or(self.anchor)
    }

    pub fn context(&self) -> SpanContext {
        self.context
    }

    pub fn trace_id(&self) -> TraceId {
        self.context.trace_id
    }

    /// `false` once the span has ended, or if it was created under a closed parent.
    pub fn is_recording(&self) -> bool {
        self.data.is_some()
    }

    /// Opens a child span. The child borrows `self`, so it must end first.
    pub fn child(&self, name: impl Into<Key>) -> Span<'_> {
        self.tracer.start_span(name, Some(self))
    }

    pub fn attribute(&mut self, key: impl Into<Key>, value: impl Into<AttributeValue>) {
        let Some(data) = self.data.as_mut() else {
            trace!(span_id = %self.context.span_id, "attribute on closed span ignored");
            return;
        };
        let key = key.into();
        let value = value.into();
        match data.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => data.attributes.push((key, value)),
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        let Some(data) = self.data.as_mut() else {
            trace!(span_id = %self.context.span_id, "set_error on closed span ignored");
            return;
        };
        data.status = SpanStatus::Error {
            message: message.into(),
        };
    }

    /// Records the end timestamp and exports the span. Later calls do nothing.
    pub fn end(&mut self) {
        let end_time = self.clock_now();
        if let Some(mut data) = self.data.take() {
            data.end_time = Some(end_time);
            self.tracer.export(data);
        }
    }
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        self.end();
    }
}

impl fmt::Debug for Span<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("context", &self.context)
            .field("data", &self.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::telemetry::export::InMemoryExporter;
    use crate::telemetry::{SpanStatus, Tracer};
    use std::sync::Arc;
    use std::time::Duration;

    fn tracer() -> (Tracer, InMemoryExporter) {
        let exporter = InMemoryExporter::new();
        (Tracer::new(Arc::new(exporter.clone())), exporter)
    }

    #[test]
    fn end_is_idempotent_and_exports_once() {
        let (tracer, exporter) = tracer();
        let mut span = tracer.root_span("op");
        span.end();
        span.end();
        drop(span);
        assert_eq!(exporter.spans().len(), 1);
        assert!(exporter.spans()[0].is_closed());
    }

    #[test]
    fn attribute_after_end_is_a_no_op() {
        let (tracer, exporter) = tracer();
        let mut span = tracer.root_span("op");
        span.attribute("before", 1_i64);
        span.end();
        span.attribute("after", 2_i64);
        span.set_error("too late");

        let spans = exporter.spans();
        assert!(spans[0].attribute("before").is_some());
        assert!(spans[0].attribute("after").is_none());
        assert_eq!(spans[0].status, SpanStatus::Ok);
    }

    #[test]
    fn attributes_keep_insertion_order_and_replace_in_place() {
        let (tracer, exporter) = tracer();
        let mut span = tracer.root_span("op");
        span.attribute("a", "1");
        span.attribute("b", "2");
        span.attribute("a", "3");
        span.end();

        let keys: Vec<_> = exporter.spans()[0]
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        assert_eq!(keys, vec!["a=3", "b=2"]);
    }

    #[test]
    fn set_error_overwrites_message_but_stays_error() {
        let (tracer, exporter) = tracer();
        let mut span = tracer.root_span("op");
        span.set_error("first");
        span.set_error("second");
        span.end();
        assert_eq!(
            exporter.spans()[0].status,
            SpanStatus::Error {
                message: "second".into()
            }
        );
    }

    #[test]
    fn dropping_an_open_span_closes_it() {
        let (tracer, exporter) = tracer();
        {
            let _span = tracer.root_span("scoped");
        }
        assert!(exporter.spans()[0].is_closed());
    }

    #[test]
    fn child_closes_before_parent() {
        let (tracer, exporter) = tracer();
        let mut root = tracer.root_span("root");
        {
            let mut child = root.child("child");
            child.attribute("k", "v");
        }
        root.end();

        let spans = exporter.spans();
        assert_eq!(spans[0].name, "child");
        assert_eq!(spans[1].name, "root");
        assert_eq!(spans[0].parent_span_id, Some(spans[1].span_id));
        assert_eq!(spans[0].trace_id, spans[1].trace_id);
        assert!(spans[0].end_time <= spans[1].end_time);
    }

    #[tokio::test(start_paused = true)]
    async fn durations_follow_the_runtime_clock() {
        let (tracer, exporter) = tracer();
        let root = tracer.root_span("root");
        tokio::time::sleep(Duration::from_millis(100)).await;
        {
            let _child = root.child("child");
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(root);

        let spans = exporter.spans();
        let (child, root) = (&spans[0], &spans[1]);
        assert_eq!(child.duration(), Some(chrono::Duration::milliseconds(250)));
        assert_eq!(root.duration(), Some(chrono::Duration::milliseconds(400)));
        assert_eq!(
            child.start_time - root.start_time,
            chrono::Duration::milliseconds(100)
        );
        assert!(child.end_time <= root.end_time);
    }

    #[test]
    fn child_of_closed_span_is_not_recorded() {
        let (tracer, exporter) = tracer();
        let mut root = tracer.root_span("root");
        root.end();
        let mut late = root.child("late");
        assert!(!late.is_recording());
        assert_eq!(late.trace_id(), root.trace_id());
        late.end();
        assert_eq!(exporter.spans().len(), 1);
    }
}
