use tokio::time::Instant;

use crate::telemetry::{Counter, Histogram, MetricsRegistry, UpDownCounter};

pub const PROCESSED_COUNTER: &str = "orders.processed";
pub const PROCESSING_TIME_HISTOGRAM: &str = "orders.processing_time";
pub const IN_FLIGHT_GAUGE: &str = "orders.in_flight";

/// The pipeline's instruments, registered once.
#[derive(Debug, Clone)]
pub struct PipelineInstruments {
    pub processed: Counter,
    pub processing_time: Histogram,
    pub in_flight: UpDownCounter,
}

impl PipelineInstruments {
    pub fn register(metrics: &MetricsRegistry) -> Self {
        Self {
            processed: metrics.counter(
                PROCESSED_COUNTER,
                "Orders processed, by outcome",
                "{orders}",
            ),
            processing_time: metrics.histogram(
                PROCESSING_TIME_HISTOGRAM,
                "Wall-clock time to process an order request",
                "s",
            ),
            in_flight: metrics.up_down_counter(
                IN_FLIGHT_GAUGE,
                "Order requests currently being processed",
                "{orders}",
            ),
        }
    }
}

/// Bumps the in-flight gauge on entry. On drop, whatever the exit path (success,
/// error, early return, cancellation, panic), decrements it and records the elapsed
/// time exactly once.
#[must_use = "dropping the guard immediately ends the in-flight window"]
pub struct InFlightGuard<'a> {
    instruments: &'a PipelineInstruments,
    started: Instant,
}

impl<'a> InFlightGuard<'a> {
    pub fn enter(instruments: &'a PipelineInstruments) -> Self {
        instruments.in_flight.add(1);
        Self {
            instruments,
            started: Instant::now(),
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.instruments.in_flight.add(-1);
        self.instruments
            .processing_time
            .record(self.started.elapsed().as_secs_f64());
    }
}
