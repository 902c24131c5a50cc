//! Error types for order operations.

use thiserror::Error;

use super::steps::PipelineStep;
use crate::model::OrderId;
use crate::store::StoreError;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// The simulated payment gateway declined the charge.
    #[error("Payment declined")]
    PaymentDeclined,

    /// A simulated database step failed.
    #[error("{step} failed: {message}")]
    StepFailed { step: PipelineStep, message: String },

    /// The requested order was not found.
    #[error("Order not found: {0}")]
    NotFound(String),

    /// The requested amount is not a positive, finite value.
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    /// The order store could not be reached.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}

impl OrderError {
    /// Stable machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::PaymentDeclined => "PAYMENT_DECLINED",
            OrderError::StepFailed { .. } => "STEP_FAILED",
            OrderError::NotFound(_) => "NOT_FOUND",
            OrderError::InvalidAmount(_) => "INVALID_AMOUNT",
            OrderError::Store(_) => "STORE_UNAVAILABLE",
        }
    }

    pub fn not_found(id: &OrderId) -> Self {
        OrderError::NotFound(id.to_string())
    }
}
