use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Inclusive delay range in milliseconds, drawn uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }

    pub fn contains(&self, delay: Duration) -> bool {
        let ms = delay.as_millis();
        ms >= u128::from(self.min_ms) && ms <= u128::from(self.max_ms)
    }

    /// `true` when every value of `self` is greater than every value of `other`.
    pub fn is_above(&self, other: &DelayRange) -> bool {
        self.min_ms > other.max_ms
    }
}

/// The degraded path of a dependency: taken with `probability`, using `delay`
/// instead of the normal range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlowPath {
    pub probability: f64,
    pub delay: DelayRange,
}

/// How one simulated dependency behaves.
///
/// Slowness and failure are independent draws: a call can be slow, failing, both,
/// or neither.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultProfile {
    pub delay: DelayRange,
    pub slow: Option<SlowPath>,
    pub failure_probability: f64,
    pub failure_message: Cow<'static, str>,
}

impl FaultProfile {
    /// Delay only; the call never fails.
    pub fn delay_only(delay: DelayRange) -> Self {
        Self {
            delay,
            slow: None,
            failure_probability: 0.0,
            failure_message: Cow::Borrowed("simulated failure"),
        }
    }

    pub fn with_slow_path(mut self, probability: f64, delay: DelayRange) -> Self {
        self.slow = Some(SlowPath { probability, delay });
        self
    }

    pub fn with_failure(mut self, probability: f64, message: impl Into<Cow<'static, str>>) -> Self {
        self.failure_probability = probability;
        self.failure_message = message.into();
        self
    }
}

/// A simulated downstream call: how it is traced and how it misbehaves.
#[derive(Debug, Clone, PartialEq)]
pub struct DownstreamCall {
    /// Name of the child span opened around the call.
    pub span_name: Cow<'static, str>,
    /// The remote system, e.g. `postgresql` or `payment-gateway`.
    pub system: Cow<'static, str>,
    /// The operation against that system, e.g. `SELECT` or `charge`.
    pub operation: Cow<'static, str>,
    pub profile: FaultProfile,
}

/// One drawn outcome: how long the call takes, and whether it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub delay: Duration,
    pub slow: bool,
    pub fail: bool,
}

impl Draw {
    pub const fn succeed(delay: Duration) -> Self {
        Self {
            delay,
            slow: false,
            fail: false,
        }
    }

    pub const fn fail(delay: Duration) -> Self {
        Self {
            delay,
            slow: false,
            fail: true,
        }
    }

    pub const fn slow(mut self) -> Self {
        self.slow = true;
        self
    }
}
