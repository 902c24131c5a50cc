use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

use super::{StoreError, StoreRequest};
use crate::model::{Order, OrderId};

/// A cloneable handle to the [`OrderStore`](super::OrderStore) actor.
#[derive(Clone, Debug)]
pub struct OrderStoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl OrderStoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn insert(&self, order: Order) -> Result<(), StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Insert { order, respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Get { id, respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::List { respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Count { respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }
}
