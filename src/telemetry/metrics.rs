//! Metric instruments and registry.
//!
//! Three instrument kinds share one registry: [`Counter`] (monotonic, per label set),
//! [`Histogram`] (bucketed distribution) and [`UpDownCounter`] (net sum, used for
//! in-flight gauges). Every update is an atomic add or a short critical section, so
//! handles can be cloned freely across interleaved requests.
//!
//! Aggregation state lives here; an external collector reads it through
//! [`MetricsRegistry::snapshot`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

/// Label key/value pairs identifying one counter series.
pub type LabelSet = BTreeMap<String, String>;

/// Upper bounds (seconds) of the histogram buckets. A final `+Inf` bucket is implied.
pub const DEFAULT_BOUNDARIES: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Counter,
    Histogram,
    UpDownCounter,
}

/// Name, description and unit, fixed when the instrument is first registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentDescriptor {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub kind: InstrumentKind,
}

impl InstrumentDescriptor {
    fn new(name: &str, description: &str, unit: &str, kind: InstrumentKind) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            unit: unit.to_owned(),
            kind,
        }
    }
}

fn label_set(labels: &[(&str, &str)]) -> LabelSet {
    labels
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

/// A monotonically non-decreasing counter, summed per label set.
#[derive(Debug, Clone)]
pub struct Counter {
    descriptor: Arc<InstrumentDescriptor>,
    series: Arc<DashMap<LabelSet, AtomicU64>>,
}

impl Counter {
    fn new(descriptor: InstrumentDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            series: Arc::new(DashMap::new()),
        }
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    pub fn add(&self, delta: u64, labels: &[(&str, &str)]) {
        self.series
            .entry(label_set(labels))
            .or_default()
            .fetch_add(delta, Ordering::Relaxed);
    }

    /// Sum recorded under exactly this label set.
    pub fn value(&self, labels: &[(&str, &str)]) -> u64 {
        self.series
            .get(&label_set(labels))
            .map_or(0, |v| v.load(Ordering::Relaxed))
    }

    /// Sum across every label set.
    pub fn total(&self) -> u64 {
        self.series
            .iter()
            .map(|entry| entry.value().load(Ordering::Relaxed))
            .sum()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let mut series: Vec<SeriesPoint> = self
            .series
            .iter()
            .map(|entry| SeriesPoint {
                labels: entry.key().clone(),
                value: entry.value().load(Ordering::Relaxed),
            })
            .collect();
        series.sort_by(|a, b| a.labels.cmp(&b.labels));
        CounterSnapshot {
            descriptor: (*self.descriptor).clone(),
            series,
        }
    }
}

#[derive(Debug)]
struct HistogramState {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    buckets: [u64; DEFAULT_BOUNDARIES.len() + 1],
}

impl HistogramState {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            buckets: [0; DEFAULT_BOUNDARIES.len() + 1],
        }
    }
}

/// A distribution of real-valued observations.
#[derive(Debug, Clone)]
pub struct Histogram {
    descriptor: Arc<InstrumentDescriptor>,
    state: Arc<Mutex<HistogramState>>,
}

impl Histogram {
    fn new(descriptor: InstrumentDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            state: Arc::new(Mutex::new(HistogramState::new())),
        }
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    /// Records one observation. NaN and infinities are dropped.
    pub fn record(&self, value: f64) {
        if !value.is_finite() {
            trace!(instrument = %self.descriptor.name, value, "non-finite observation dropped");
            return;
        }
        let bucket = DEFAULT_BOUNDARIES
            .iter()
            .position(|bound| value <= *bound)
            .unwrap_or(DEFAULT_BOUNDARIES.len());

        let mut state = self.state.lock();
        state.count += 1;
        state.sum += value;
        state.min = state.min.min(value);
        state.max = state.max.max(value);
        state.buckets[bucket] += 1;
    }

    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    pub fn sum(&self) -> f64 {
        self.state.lock().sum
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let state = self.state.lock();
        let buckets = state
            .buckets
            .iter()
            .enumerate()
            .map(|(i, count)| BucketCount {
                le: DEFAULT_BOUNDARIES.get(i).copied(),
                count: *count,
            })
            .collect();
        let observed = state.count > 0;
        HistogramSnapshot {
            descriptor: (*self.descriptor).clone(),
            count: state.count,
            sum: state.sum,
            min: observed.then_some(state.min),
            max: observed.then_some(state.max),
            buckets,
        }
    }
}

/// A counter that accepts negative deltas; reads as the net sum since creation.
#[derive(Debug, Clone)]
pub struct UpDownCounter {
    descriptor: Arc<InstrumentDescriptor>,
    value: Arc<AtomicI64>,
}

impl UpDownCounter {
    fn new(descriptor: InstrumentDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            value: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    pub fn add(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Registry for creating and retrieving named instruments.
///
/// Registering a name a second time returns the instrument created first; its
/// description and unit are not changed.
///
/// # Examples
///
/// ```
/// use order_telemetry::telemetry::MetricsRegistry;
///
/// let registry = MetricsRegistry::new();
/// let processed = registry.counter("orders.processed", "Orders processed", "{orders}");
/// processed.add(1, &[("status", "success")]);
///
/// let same = registry.counter("orders.processed", "ignored", "ignored");
/// assert_eq!(same.value(&[("status", "success")]), 1);
/// assert_eq!(same.descriptor().description, "Orders processed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<DashMap<String, Counter>>,
    histograms: Arc<DashMap<String, Histogram>>,
    up_down_counters: Arc<DashMap<String, UpDownCounter>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a counter by name.
    pub fn counter(&self, name: &str, description: &str, unit: &str) -> Counter {
        let counter = self
            .counters
            .entry(name.to_owned())
            .or_insert_with(|| {
                Counter::new(InstrumentDescriptor::new(
                    name,
                    description,
                    unit,
                    InstrumentKind::Counter,
                ))
            })
            .value()
            .clone();
        note_mismatch(counter.descriptor(), description, unit);
        counter
    }

    /// Get or create a histogram by name.
    pub fn histogram(&self, name: &str, description: &str, unit: &str) -> Histogram {
        let histogram = self
            .histograms
            .entry(name.to_owned())
            .or_insert_with(|| {
                Histogram::new(InstrumentDescriptor::new(
                    name,
                    description,
                    unit,
                    InstrumentKind::Histogram,
                ))
            })
            .value()
            .clone();
        note_mismatch(histogram.descriptor(), description, unit);
        histogram
    }

    /// Get or create an up-down counter by name.
    pub fn up_down_counter(&self, name: &str, description: &str, unit: &str) -> UpDownCounter {
        let gauge = self
            .up_down_counters
            .entry(name.to_owned())
            .or_insert_with(|| {
                UpDownCounter::new(InstrumentDescriptor::new(
                    name,
                    description,
                    unit,
                    InstrumentKind::UpDownCounter,
                ))
            })
            .value()
            .clone();
        note_mismatch(gauge.descriptor(), description, unit);
        gauge
    }

    /// Point-in-time view of every instrument, sorted by name.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut counters: Vec<_> = self.counters.iter().map(|e| e.value().snapshot()).collect();
        counters.sort_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name));

        let mut histograms: Vec<_> = self
            .histograms
            .iter()
            .map(|e| e.value().snapshot())
            .collect();
        histograms.sort_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name));

        let mut up_down_counters: Vec<_> = self
            .up_down_counters
            .iter()
            .map(|e| UpDownSnapshot {
                descriptor: e.value().descriptor().clone(),
                value: e.value().value(),
            })
            .collect();
        up_down_counters.sort_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name));

        MetricsSnapshot {
            counters,
            histograms,
            up_down_counters,
        }
    }
}

fn note_mismatch(existing: &InstrumentDescriptor, description: &str, unit: &str) {
    if existing.description != description || existing.unit != unit {
        debug!(
            instrument = %existing.name,
            requested_unit = unit,
            "instrument already registered, keeping original descriptor"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub labels: LabelSet,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSnapshot {
    pub descriptor: InstrumentDescriptor,
    pub series: Vec<SeriesPoint>,
}

/// Count of observations in one bucket (not cumulative). `le: None` is `+Inf`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub le: Option<f64>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub descriptor: InstrumentDescriptor,
    pub count: u64,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub buckets: Vec<BucketCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpDownSnapshot {
    pub descriptor: InstrumentDescriptor,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: Vec<CounterSnapshot>,
    pub histograms: Vec<HistogramSnapshot>,
    pub up_down_counters: Vec<UpDownSnapshot>,
}

impl MetricsSnapshot {
    pub fn counter(&self, name: &str) -> Option<&CounterSnapshot> {
        self.counters.iter().find(|c| c.descriptor.name == name)
    }

    pub fn histogram(&self, name: &str) -> Option<&HistogramSnapshot> {
        self.histograms.iter().find(|h| h.descriptor.name == name)
    }

    pub fn up_down_counter(&self, name: &str) -> Option<&UpDownSnapshot> {
        self.up_down_counters
            .iter()
            .find(|g| g.descriptor.name == name)
    }
}
