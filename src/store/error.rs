//! Errors that can occur when talking to the order store actor.

use crate::model::OrderId;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Order store closed")]
    ActorClosed,
    #[error("Order store dropped response channel")]
    ActorDropped,
    #[error("Order already exists: {0}")]
    AlreadyExists(OrderId),
}
