use std::borrow::Cow;
use std::fmt;

use crate::config::Config;
use crate::fault::{DownstreamCall, FaultProfile};

pub const PAYMENT_DECLINED_MESSAGE: &str = "Payment declined";
pub const DB_FAILURE_MESSAGE: &str = "Database operation failed";

/// The four simulated sub-operations of order creation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStep {
    CheckInventory,
    InsertOrder,
    ProcessPayment,
    UpdateStatus,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 4] = [
        PipelineStep::CheckInventory,
        PipelineStep::InsertOrder,
        PipelineStep::ProcessPayment,
        PipelineStep::UpdateStatus,
    ];

    /// Also the name of the step's child span.
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::CheckInventory => "check_inventory",
            PipelineStep::InsertOrder => "insert_order",
            PipelineStep::ProcessPayment => "process_payment",
            PipelineStep::UpdateStatus => "update_order_status",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Downstream call definitions for every step, built from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSteps {
    inventory: DownstreamCall,
    insert: DownstreamCall,
    payment: DownstreamCall,
    update: DownstreamCall,
}

impl PipelineSteps {
    pub fn from_config(config: &Config) -> Self {
        let database = |step: PipelineStep, operation: &'static str, profile: FaultProfile| {
            DownstreamCall {
                span_name: Cow::Borrowed(step.as_str()),
                system: Cow::Borrowed("postgresql"),
                operation: Cow::Borrowed(operation),
                profile: profile.with_failure(config.db_failure_probability, DB_FAILURE_MESSAGE),
            }
        };
        let payment = &config.payment;

        Self {
            inventory: database(
                PipelineStep::CheckInventory,
                "SELECT",
                FaultProfile::delay_only(config.inventory_delay),
            ),
            insert: database(
                PipelineStep::InsertOrder,
                "INSERT",
                FaultProfile::delay_only(config.insert_delay),
            ),
            payment: DownstreamCall {
                span_name: Cow::Borrowed(PipelineStep::ProcessPayment.as_str()),
                system: Cow::Borrowed("payment-gateway"),
                operation: Cow::Borrowed("charge"),
                profile: FaultProfile::delay_only(payment.delay)
                    .with_slow_path(payment.slow_probability, payment.slow_delay)
                    .with_failure(payment.failure_probability, PAYMENT_DECLINED_MESSAGE),
            },
            update: database(
                PipelineStep::UpdateStatus,
                "UPDATE",
                FaultProfile::delay_only(config.update_delay),
            ),
        }
    }

    pub fn call(&self, step: PipelineStep) -> &DownstreamCall {
        match step {
            PipelineStep::CheckInventory => &self.inventory,
            PipelineStep::InsertOrder => &self.insert,
            PipelineStep::ProcessPayment => &self.payment,
            PipelineStep::UpdateStatus => &self.update,
        }
    }
}
