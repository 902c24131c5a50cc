//! # Service Boundary
//!
//! The four inbound operations a routing layer maps its routes to. Each runs under
//! its own root span named after the route, and always resolves to a [`Reply`],
//! never an error.

pub mod reply;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, instrument, warn};

pub use reply::{ErrorBody, Reply};

use crate::model::{Order, OrderId, OrderRequest};
use crate::pipeline::{OrderError, OrderPipeline};
use crate::telemetry::Span;

pub const LIST_ORDERS_SPAN: &str = "GET /orders";
pub const GET_ORDER_SPAN: &str = "GET /orders/:id";
pub const HEALTH_SPAN: &str = "GET /health";

/// Bounds of the amount drawn when a request carries none.
pub const RANDOM_AMOUNT_MIN: f64 = 10.0;
pub const RANDOM_AMOUNT_MAX: f64 = 500.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub orders: usize,
    pub in_flight: i64,
}

#[derive(Clone, Debug)]
pub struct OrderService {
    pipeline: OrderPipeline,
}

impl OrderService {
    pub fn new(pipeline: OrderPipeline) -> Self {
        Self { pipeline }
    }

    /// A non-positive or non-finite amount is rejected by the pipeline as a 400,
    /// after being counted and timed like any other request.
    #[instrument(skip(self))]
    pub async fn create_order(&self, request: OrderRequest) -> Reply<Order> {
        match self.pipeline.create_order(requested_amount(&request)).await {
            Ok(order) => Reply::Created(order),
            Err(err) => Reply::from_error(&err),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Reply<Vec<Order>> {
        let mut span = self.root_span(LIST_ORDERS_SPAN);
        let reply = match self.pipeline.store().list().await {
            Ok(orders) => {
                span.attribute("orders.count", orders.len());
                Reply::Ok(orders)
            }
            Err(err) => {
                let err = OrderError::from(err);
                span.set_error(err.to_string());
                Reply::from_error(&err)
            }
        };
        self.finish(span, reply)
    }

    /// Unknown and malformed identifiers are both not-found.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: &str) -> Reply<Order> {
        let mut span = self.root_span(GET_ORDER_SPAN);
        span.attribute("order.id", id.to_owned());

        let found = match id.parse::<OrderId>() {
            Ok(order_id) => self
                .pipeline
                .store()
                .get(order_id)
                .await
                .map_err(OrderError::from)
                .and_then(|order| order.ok_or_else(|| OrderError::not_found(&order_id))),
            Err(_) => Err(OrderError::NotFound(id.to_owned())),
        };
        let reply = match found {
            Ok(order) => Reply::Ok(order),
            Err(err) => {
                if !matches!(err, OrderError::NotFound(_)) {
                    span.set_error(err.to_string());
                }
                debug!(trace_id = %span.trace_id(), order_id = id, error = %err, "Order lookup failed");
                Reply::from_error(&err)
            }
        };
        self.finish(span, reply)
    }

    #[instrument(skip(self))]
    pub async fn health(&self) -> Reply<Health> {
        let mut span = self.root_span(HEALTH_SPAN);
        let in_flight = self.pipeline.instruments().in_flight.value();
        let reply = match self.pipeline.store().count().await {
            Ok(orders) => Reply::Ok(Health {
                status: "ok",
                orders,
                in_flight,
            }),
            Err(err) => {
                let err = OrderError::from(err);
                warn!(trace_id = %span.trace_id(), error = %err, "Health check could not reach the order store");
                span.set_error(err.to_string());
                Reply::from_error(&err)
            }
        };
        self.finish(span, reply)
    }

    fn root_span(&self, route: &'static str) -> Span<'static> {
        let mut span = self.pipeline.telemetry().tracer().root_span(route);
        span.attribute("http.route", route);
        span
    }

    fn finish<T>(&self, mut span: Span<'_>, reply: Reply<T>) -> Reply<T> {
        span.attribute("http.status_code", i64::from(reply.status_code()));
        span.end();
        reply
    }
}

/// The request's amount, or a random one when absent.
fn requested_amount(request: &OrderRequest) -> f64 {
    request.amount.unwrap_or_else(|| {
        rand::thread_rng().gen_range(RANDOM_AMOUNT_MIN..=RANDOM_AMOUNT_MAX)
    })
}
