//! # Fault Injection
//!
//! Simulated downstream calls with randomized latency and failure.
//!
//! - [`FaultProfile`] describes a dependency: normal delay range, optional slow path,
//!   failure probability.
//! - [`FaultSource`] draws outcomes: [`RandomFaults`] in production,
//!   [`ScriptedFaults`] in tests.
//! - [`FaultInjector`] waits out a draw inside a child span.

pub mod injector;
pub mod mock;
pub mod profile;
pub mod source;

pub use injector::FaultInjector;
pub use mock::ScriptedFaults;
pub use profile::{DelayRange, DownstreamCall, Draw, FaultProfile, SlowPath};
pub use source::{FaultSource, RandomFaults};

use thiserror::Error;

/// A failure the injector was told to produce.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FaultError {
    #[error("{call} failed: {message}")]
    Declared { call: String, message: String },
}
