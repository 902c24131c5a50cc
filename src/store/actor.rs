//! # Order Store Actor
//!
//! The store owns its map inside one Tokio task and processes requests sequentially,
//! so no lock guards the orders themselves. Every request handler talks to it
//! through a cloned [`OrderStoreClient`].

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{OrderStoreClient, StoreError, StoreRequest};
use crate::model::{Order, OrderId};

pub struct OrderStore {
    receiver: mpsc::Receiver<StoreRequest>,
    orders: HashMap<OrderId, Order>,
    /// Insertion order, for listing.
    sequence: Vec<OrderId>,
}

impl OrderStore {
    pub fn new(buffer_size: usize) -> (Self, OrderStoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            orders: HashMap::new(),
            sequence: Vec::new(),
        };
        (store, OrderStoreClient::new(sender))
    }

    /// Processes requests until every client has been dropped.
    pub async fn run(mut self) {
        info!("Order store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Insert { order, respond_to } => {
                    let id = order.id;
                    if self.orders.contains_key(&id) {
                        warn!(order_id = %id, "Insert rejected, id already stored");
                        let _ = respond_to.send(Err(StoreError::AlreadyExists(id)));
                        continue;
                    }
                    self.orders.insert(id, order);
                    self.sequence.push(id);
                    debug!(order_id = %id, size = self.orders.len(), "Inserted");
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::Get { id, respond_to } => {
                    let order = self.orders.get(&id).cloned();
                    debug!(order_id = %id, found = order.is_some(), "Get");
                    let _ = respond_to.send(Ok(order));
                }
                StoreRequest::List { respond_to } => {
                    let orders = self
                        .sequence
                        .iter()
                        .filter_map(|id| self.orders.get(id).cloned())
                        .collect();
                    let _ = respond_to.send(Ok(orders));
                }
                StoreRequest::Count { respond_to } => {
                    let _ = respond_to.send(Ok(self.orders.len()));
                }
            }
        }

        info!(size = self.orders.len(), "Order store shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderId;

    #[tokio::test]
    async fn insert_get_list_in_insertion_order() {
        let (store, client) = OrderStore::new(8);
        let handle = tokio::spawn(store.run());

        let a = Order::confirmed(OrderId::new(), 10.0);
        let b = Order::confirmed(OrderId::new(), 20.0);
        client.insert(a.clone()).await.unwrap();
        client.insert(b.clone()).await.unwrap();

        assert_eq!(client.get(a.id).await.unwrap(), Some(a.clone()));
        assert_eq!(client.list().await.unwrap(), vec![a, b]);
        assert_eq!(client.count().await.unwrap(), 2);

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected_without_overwriting() {
        let (store, client) = OrderStore::new(8);
        tokio::spawn(store.run());

        let id = OrderId::new();
        client.insert(Order::confirmed(id, 1.0)).await.unwrap();
        let err = client.insert(Order::confirmed(id, 2.0)).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists(id));
        assert_eq!(client.get(id).await.unwrap().map(|o| o.amount), Some(1.0));
    }

    #[tokio::test]
    async fn missing_order_is_none_and_store_unchanged() {
        let (store, client) = OrderStore::new(8);
        tokio::spawn(store.run());
        assert_eq!(client.get(OrderId::new()).await.unwrap(), None);
        assert_eq!(client.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn closed_store_reports_actor_closed() {
        let (store, client) = OrderStore::new(8);
        drop(store);
        assert_eq!(client.list().await.unwrap_err(), StoreError::ActorClosed);
    }
}
