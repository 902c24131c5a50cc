use std::fmt;

use super::steps::PipelineStep;

/// Per-request progress through the pipeline.
///
/// `Confirmed` and `Error` are terminal; `Error` is reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Started,
    InventoryChecked,
    OrderInserted,
    PaymentProcessed,
    StatusUpdated,
    Confirmed,
    Error,
}

impl OrderState {
    /// The state reached when `step` succeeds from `self`. A step run out of order
    /// lands in `Error`.
    pub fn after(self, step: PipelineStep) -> OrderState {
        match (self, step) {
            (OrderState::Started, PipelineStep::CheckInventory) => OrderState::InventoryChecked,
            (OrderState::InventoryChecked, PipelineStep::InsertOrder) => OrderState::OrderInserted,
            (OrderState::OrderInserted, PipelineStep::ProcessPayment) => OrderState::PaymentProcessed,
            (OrderState::PaymentProcessed, PipelineStep::UpdateStatus) => OrderState::StatusUpdated,
            _ => OrderState::Error,
        }
    }

    /// Only `StatusUpdated` can be confirmed.
    pub fn confirm(self) -> OrderState {
        match self {
            OrderState::StatusUpdated => OrderState::Confirmed,
            _ => OrderState::Error,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Confirmed | OrderState::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderState::Started => "started",
            OrderState::InventoryChecked => "inventory_checked",
            OrderState::OrderInserted => "order_inserted",
            OrderState::PaymentProcessed => "payment_processed",
            OrderState::StatusUpdated => "status_updated",
            OrderState::Confirmed => "confirmed",
            OrderState::Error => "error",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
