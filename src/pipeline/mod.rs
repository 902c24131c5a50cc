//! # Order Pipeline
//!
//! Drives one create-order request through its fixed sequence of simulated
//! sub-operations:
//!
//! ```text
//! started -> inventory_checked -> order_inserted -> payment_processed
//!         -> status_updated -> confirmed
//! ```
//!
//! Any failed step moves the request to `error`. Each step runs inside a child span
//! of the request's root span, and the in-flight gauge and processing-time histogram
//! are maintained by an [`InFlightGuard`] held for the whole request.

pub mod error;
pub mod guard;
pub mod state;
pub mod steps;

use std::sync::Arc;

use tracing::{error, info};

pub use error::OrderError;
pub use guard::{
    InFlightGuard, PipelineInstruments, IN_FLIGHT_GAUGE, PROCESSED_COUNTER,
    PROCESSING_TIME_HISTOGRAM,
};
pub use state::OrderState;
pub use steps::{PipelineStep, PipelineSteps};

use crate::fault::{FaultError, FaultInjector};
use crate::model::{normalize_amount, Order, OrderId};
use crate::store::OrderStoreClient;
use crate::telemetry::{Span, Telemetry};

/// Name of the root span opened for every create-order request.
pub const CREATE_ORDER_SPAN: &str = "POST /orders";

/// Where a request stopped and why.
struct Failure {
    state: OrderState,
    step: &'static str,
    error: OrderError,
}

#[derive(Clone, Debug)]
pub struct OrderPipeline {
    telemetry: Telemetry,
    injector: FaultInjector,
    store: OrderStoreClient,
    steps: Arc<PipelineSteps>,
    instruments: PipelineInstruments,
}

impl OrderPipeline {
    pub fn new(
        telemetry: Telemetry,
        injector: FaultInjector,
        store: OrderStoreClient,
        steps: PipelineSteps,
    ) -> Self {
        let instruments = PipelineInstruments::register(telemetry.metrics());
        Self {
            telemetry,
            injector,
            store,
            steps: Arc::new(steps),
            instruments,
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn store(&self) -> &OrderStoreClient {
        &self.store
    }

    pub fn instruments(&self) -> &PipelineInstruments {
        &self.instruments
    }

    /// Runs one create-order request for `amount`, rounded to cents.
    ///
    /// Every request, including one rejected for a non-positive or non-finite amount,
    /// is counted, timed and traced. The root span is closed before this returns,
    /// after all of its step spans. Failures never escape as anything but an
    /// [`OrderError`].
    pub async fn create_order(&self, amount: f64) -> Result<Order, OrderError> {
        let _in_flight = InFlightGuard::enter(&self.instruments);
        let id = OrderId::new();

        let mut root = self.telemetry.tracer().root_span(CREATE_ORDER_SPAN);
        root.attribute("order.id", id.to_string());
        root.attribute("order.amount", amount);
        let trace_id = root.trace_id();

        let outcome = match normalize_amount(amount) {
            Some(amount) => self.process(&root, id, amount).await,
            None => Err(Failure {
                state: OrderState::Started,
                step: "validate",
                error: OrderError::InvalidAmount(amount),
            }),
        };
        let result = match outcome {
            Ok(order) => {
                self.instruments
                    .processed
                    .add(1, &[("status", "success")]);
                root.attribute("order.state", OrderState::Confirmed.as_str());
                info!(
                    trace_id = %trace_id,
                    order_id = %order.id,
                    amount = order.amount,
                    "Order confirmed"
                );
                Ok(order)
            }
            Err(failure) => {
                self.instruments.processed.add(1, &[("status", "error")]);
                root.attribute("order.state", OrderState::Error.as_str());
                root.attribute("order.failed_step", failure.step);
                root.set_error(failure.error.to_string());
                error!(
                    trace_id = %trace_id,
                    order_id = %id,
                    step = failure.step,
                    last_state = %failure.state,
                    code = failure.error.code(),
                    error = %failure.error,
                    "Order failed"
                );
                Err(failure.error)
            }
        };
        root.end();
        result
    }

    async fn process(&self, root: &Span<'_>, id: OrderId, amount: f64) -> Result<Order, Failure> {
        let mut state = OrderState::Started;
        for step in PipelineStep::ALL {
            if let Err(fault) = self.injector.call(root, self.steps.call(step)).await {
                return Err(Failure {
                    state,
                    step: step.as_str(),
                    error: step_error(step, fault),
                });
            }
            state = state.after(step);
        }

        let order = Order::confirmed(id, amount);
        self.store
            .insert(order.clone())
            .await
            .map_err(|err| Failure {
                state,
                step: "persist",
                error: err.into(),
            })?;
        state = state.confirm();
        debug_assert_eq!(state, OrderState::Confirmed);
        Ok(order)
    }
}

fn step_error(step: PipelineStep, fault: FaultError) -> OrderError {
    match (step, fault) {
        (PipelineStep::ProcessPayment, _) => OrderError::PaymentDeclined,
        (step, FaultError::Declared { message, .. }) => OrderError::StepFailed { step, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fault::ScriptedFaults;
    use crate::store::OrderStore;
    use crate::telemetry::{InMemoryExporter, SpanStatus};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn pipeline(faults: &ScriptedFaults) -> (OrderPipeline, InMemoryExporter) {
        let (telemetry, exporter) = Telemetry::in_memory();
        let (store, client) = OrderStore::new(16);
        tokio::spawn(store.run());
        let pipeline = OrderPipeline::new(
            telemetry,
            FaultInjector::new(Arc::new(faults.clone())),
            client,
            PipelineSteps::from_config(&Config::default()),
        );
        (pipeline, exporter)
    }

    #[tokio::test(start_paused = true)]
    async fn steps_run_in_order_under_one_root() {
        let faults = ScriptedFaults::new();
        for step in PipelineStep::ALL {
            faults
                .expect(step.as_str())
                .succeed_after(Duration::from_millis(10));
        }
        let (pipeline, exporter) = pipeline(&faults);

        let order = pipeline.create_order(42.5).await.unwrap();
        faults.verify();

        let names: Vec<_> = exporter.spans().iter().map(|s| s.name.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "check_inventory",
                "insert_order",
                "process_payment",
                "update_order_status",
                CREATE_ORDER_SPAN,
            ]
        );
        for step in exporter.spans().iter().filter(|s| !s.is_root()) {
            assert_eq!(step.duration(), Some(chrono::Duration::milliseconds(10)));
        }
        let root = exporter.roots().remove(0);
        assert_eq!(root.status, SpanStatus::Ok);
        assert!(root.duration() >= Some(chrono::Duration::milliseconds(40)));
        assert_eq!(
            root.attribute("order.id").map(ToString::to_string),
            Some(order.id.to_string())
        );
        assert_eq!(pipeline.store().get(order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn rejected_amount_is_still_counted_timed_and_traced() {
        let faults = ScriptedFaults::new();
        let (pipeline, exporter) = pipeline(&faults);

        let err = pipeline.create_order(-4.0).await.unwrap_err();
        assert_eq!(err, OrderError::InvalidAmount(-4.0));
        faults.verify();

        let instruments = pipeline.instruments();
        assert_eq!(instruments.processed.value(&[("status", "error")]), 1);
        assert_eq!(instruments.processing_time.count(), 1);
        assert_eq!(instruments.in_flight.value(), 0);

        let spans = exporter.spans();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].status.is_error());
        assert_eq!(
            spans[0].attribute("order.failed_step").map(ToString::to_string),
            Some("validate".into())
        );
        assert_eq!(pipeline.store().count().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn database_failure_is_a_step_failure() {
        let faults = ScriptedFaults::new();
        faults.expect("check_inventory").succeed();
        faults
            .expect("insert_order")
            .fail_after(Duration::from_millis(5));
        let (pipeline, exporter) = pipeline(&faults);

        let err = pipeline.create_order(10.0).await.unwrap_err();
        assert_eq!(
            err,
            OrderError::StepFailed {
                step: PipelineStep::InsertOrder,
                message: steps::DB_FAILURE_MESSAGE.into(),
            }
        );
        faults.verify();

        let root = exporter.roots().remove(0);
        assert!(root.status.is_error());
        assert_eq!(
            root.attribute("order.failed_step").map(ToString::to_string),
            Some("insert_order".into())
        );
        assert_eq!(pipeline.store().count().await.unwrap(), 0);
    }
}
