//! # Scripted Faults
//!
//! A deterministic [`FaultSource`] for tests. Queue the outcomes you expect, run the
//! code under test, then call [`ScriptedFaults::verify`].
//!
//! ```rust,ignore
//! let faults = ScriptedFaults::new();
//! faults.expect("check_inventory").succeed();
//! faults.expect("process_payment").fail_after(Duration::from_millis(5));
//!
//! // ... run one request ...
//! faults.verify(); // every expectation was consumed
//! ```
//!
//! Calls that arrive when the queue is empty use the fallback set with
//! [`ScriptedFaults::otherwise`]; without one, they panic.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::profile::{DownstreamCall, Draw};
use super::source::FaultSource;

struct Expectation {
    span_name: Option<String>,
    draw: Draw,
}

/// Replays queued outcomes in order.
#[derive(Clone, Default)]
pub struct ScriptedFaults {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    fallback: Arc<Mutex<Option<Draw>>>,
}

impl ScriptedFaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call succeeds immediately.
    pub fn always_succeed() -> Self {
        let faults = Self::new();
        faults.otherwise(Draw::succeed(Duration::ZERO));
        faults
    }

    /// Outcome for calls that have no queued expectation.
    pub fn otherwise(&self, draw: Draw) {
        *self.fallback.lock() = Some(draw);
    }

    /// Expects the next call to be the one whose span is named `span_name`.
    pub fn expect(&self, span_name: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            span_name: Some(span_name.into()),
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a next call, whichever it is.
    pub fn expect_any(&self) -> ExpectationBuilder {
        ExpectationBuilder {
            span_name: None,
            expectations: self.expectations.clone(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.expectations.lock().len()
    }

    /// Panics if any queued expectation was not consumed.
    pub fn verify(&self) {
        let remaining = self.remaining();
        if remaining != 0 {
            panic!("Not all fault expectations were met. {remaining} remaining");
        }
    }
}

impl FaultSource for ScriptedFaults {
    fn draw(&self, call: &DownstreamCall) -> Draw {
        let next = self.expectations.lock().pop_front();
        match next {
            Some(Expectation {
                span_name: Some(expected),
                ..
            }) if expected != call.span_name => {
                panic!(
                    "Unexpected call: expected `{expected}`, got `{}`",
                    call.span_name
                );
            }
            Some(expectation) => expectation.draw,
            None => match *self.fallback.lock() {
                Some(draw) => draw,
                None => panic!("Unexpected call `{}`: no expectation queued", call.span_name),
            },
        }
    }
}

/// Builder returned by [`ScriptedFaults::expect`].
pub struct ExpectationBuilder {
    span_name: Option<String>,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl ExpectationBuilder {
    pub fn succeed(self) {
        self.returns(Draw::succeed(Duration::ZERO));
    }

    pub fn succeed_after(self, delay: Duration) {
        self.returns(Draw::succeed(delay));
    }

    pub fn fail_after(self, delay: Duration) {
        self.returns(Draw::fail(delay));
    }

    pub fn returns(self, draw: Draw) {
        self.expectations.lock().push_back(Expectation {
            span_name: self.span_name,
            draw,
        });
    }
}
