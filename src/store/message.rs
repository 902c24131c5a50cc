use tokio::sync::oneshot;

use super::StoreError;
use crate::model::{Order, OrderId};

/// One-shot response channel used by the store actor.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// Messages understood by the store actor.
///
/// No update or delete: stored orders live as long as the process.
#[derive(Debug)]
pub enum StoreRequest {
    Insert {
        order: Order,
        respond_to: Response<()>,
    },
    Get {
        id: OrderId,
        respond_to: Response<Option<Order>>,
    },
    List {
        respond_to: Response<Vec<Order>>,
    },
    Count {
        respond_to: Response<usize>,
    },
}
