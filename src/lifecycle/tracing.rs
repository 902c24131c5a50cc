//! # Logging
//!
//! [`setup_tracing`] installs the structured log subscriber for the whole process.
//! Log events are separate from the exported span model: they are the channel where
//! closed spans (through [`LogExporter`](crate::telemetry::LogExporter)) and
//! per-request outcomes are written.
//!
//! ## Configuration
//!
//! Levels come from `RUST_LOG`. The format is compact and hides the module path
//! (`with_target(false)`); pipeline events carry `trace_id` and `order_id` fields
//! instead.
//!
//! ```bash
//! # Order outcomes and one line per closed span
//! RUST_LOG=info cargo run
//!
//! # Also every downstream call and store request
//! RUST_LOG=debug cargo run
//!
//! # Only the span export channel
//! RUST_LOG=spans=info cargo run
//! ```
//!
//! With `RUST_LOG=info` a confirmed order reads:
//!
//! ```text
//! INFO check_inventory trace_id=4bf9...a1 span_id=00f0...7c parent=9d3e...02 duration_ms=87
//! ...
//! INFO Order confirmed trace_id=4bf9...a1 order_id=0d6c... amount=118.4
//! INFO POST /orders trace_id=4bf9...a1 span_id=9d3e...02 parent=none duration_ms=412
//! ```

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Panics if one is already set.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Like [`setup_tracing`], but returns an error when a subscriber is already
/// installed. Safe to call from several tests.
pub fn try_setup_tracing() -> Result<(), TryInitError> {
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_test_writer()
        .finish()
        .try_init()
}
