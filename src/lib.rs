//! # Order Telemetry
//!
//! An order-processing service whose downstream calls are simulated, used to exercise
//! an in-process telemetry core: hierarchical spans, aggregated metrics, and
//! randomized latency and failure injection.
//!
//! ## 🏗️ Design
//!
//! ### Explicit context
//! There is no ambient "current span". A request's root [`Span`](telemetry::Span) is
//! passed by reference to every step, and a child span borrows its parent. Many
//! requests can be interleaved on one worker without their spans crossing, and a
//! parent cannot end while one of its children is still open.
//!
//! ### Process-scoped telemetry
//! The tracer, metric registry and span exporter are built once in a
//! [`Telemetry`](telemetry::Telemetry) value and injected. Tests swap in an
//! [`InMemoryExporter`](telemetry::InMemoryExporter) instead of touching globals.
//!
//! ### Injectable faults
//! Delays and failures come from a [`FaultSource`](fault::FaultSource). Production
//! uses seeded or entropy-based [`RandomFaults`](fault::RandomFaults); tests queue
//! exact outcomes on [`ScriptedFaults`](fault::ScriptedFaults).
//!
//! ### Scoped cleanup
//! The in-flight gauge and processing-time histogram are maintained by a drop guard,
//! so they are updated on every exit path of a request, including cancellation.
//!
//! ## 🗺️ Module Tour
//!
//! - [`telemetry`]: spans, tracer, metrics, exporters.
//! - [`fault`]: fault profiles, sources and the injector.
//! - [`pipeline`]: the create-order state machine.
//! - [`store`]: the actor-owned in-memory order store.
//! - [`service`]: the inbound operations and their replies.
//! - [`lifecycle`]: logging setup and [`OrderSystem`](lifecycle::OrderSystem) wiring.
//! - [`config`] and [`model`]: settings and plain data.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ORDERS_SEED=7 ORDERS_PAYMENT_FAILURE_PROBABILITY=0.5 cargo run
//! ```

pub mod config;
pub mod fault;
pub mod lifecycle;
pub mod model;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod telemetry;
