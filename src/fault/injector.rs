use std::sync::Arc;

use tracing::debug;

use super::profile::{DownstreamCall, Draw};
use super::source::FaultSource;
use super::FaultError;
use crate::telemetry::Span;

/// Runs simulated downstream calls: waits out the drawn delay inside a child span and
/// resolves to success or a declared failure.
#[derive(Clone)]
pub struct FaultInjector {
    source: Arc<dyn FaultSource>,
}

impl FaultInjector {
    pub fn new(source: Arc<dyn FaultSource>) -> Self {
        Self { source }
    }

    /// Simulates `call` under `parent`.
    ///
    /// The child span covers exactly the delay window and is closed whatever the
    /// outcome. A failing draw marks it `ERROR` with the profile's failure message.
    pub async fn call(&self, parent: &Span<'_>, call: &DownstreamCall) -> Result<Draw, FaultError> {
        let draw = self.source.draw(call);

        let mut span = parent.child(call.span_name.clone());
        span.attribute("downstream.system", call.system.clone());
        span.attribute("downstream.operation", call.operation.clone());
        span.attribute("downstream.delay_ms", draw.delay.as_millis() as u64);
        if draw.slow {
            span.attribute("downstream.slow", true);
        }

        tokio::time::sleep(draw.delay).await;

        let result = if draw.fail {
            span.set_error(call.profile.failure_message.clone());
            Err(FaultError::Declared {
                call: call.span_name.to_string(),
                message: call.profile.failure_message.to_string(),
            })
        } else {
            Ok(draw)
        };
        span.end();

        debug!(
            trace_id = %parent.trace_id(),
            call = %call.span_name,
            delay_ms = draw.delay.as_millis() as u64,
            slow = draw.slow,
            failed = draw.fail,
            "Downstream call finished"
        );
        result
    }
}

impl std::fmt::Debug for FaultInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultInjector").finish_non_exhaustive()
    }
}
