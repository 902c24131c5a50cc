//! In-memory order store, owned by a single actor task.

pub mod actor;
pub mod client;
pub mod error;
pub mod message;

pub use actor::OrderStore;
pub use client::OrderStoreClient;
pub use error::StoreError;
pub use message::{Response, StoreRequest};
