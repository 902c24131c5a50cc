//! Demo: a batch of interleaved order requests on a single-threaded runtime, then
//! lookups, a health check, and the resulting metric snapshot.

use std::sync::Arc;

use anyhow::Context;
use order_telemetry::config::Config;
use order_telemetry::lifecycle::{setup_tracing, OrderSystem};
use order_telemetry::model::OrderRequest;
use order_telemetry::telemetry::{LogExporter, Telemetry};
use tokio::task::JoinSet;
use tracing::{info, warn};

const DEMO_ORDERS: usize = 20;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let config = Config::from_env().context("loading configuration")?;
    let telemetry = Telemetry::new(Arc::new(LogExporter::new()));
    let system = OrderSystem::new(&config, telemetry.clone());

    info!(orders = DEMO_ORDERS, "Starting demo");

    let mut requests = JoinSet::new();
    for _ in 0..DEMO_ORDERS {
        let service = system.service.clone();
        requests.spawn(async move { service.create_order(OrderRequest::default()).await });
    }

    let mut created = Vec::new();
    while let Some(joined) = requests.join_next().await {
        let reply = joined.context("order task panicked")?;
        if let Some(body) = reply.error() {
            warn!(status = reply.status_code(), code = body.code, "Order rejected");
            continue;
        }
        created.extend(reply.into_body());
    }
    info!(created = created.len(), failed = DEMO_ORDERS - created.len(), "Batch finished");

    let listed = system.service.list_orders().await;
    info!(status = listed.status_code(), "Listed orders");

    if let Some(order) = created.first() {
        let found = system.service.get_order(&order.id.to_string()).await;
        info!(status = found.status_code(), order_id = %order.id, "Fetched order");
    }
    let missing = system.service.get_order("00000000-0000-0000-0000-000000000000").await;
    info!(status = missing.status_code(), "Fetched unknown order");

    let health = system.service.health().await;
    println!("{}", serde_json::to_string_pretty(&health)?);
    println!(
        "{}",
        serde_json::to_string_pretty(&telemetry.metrics().snapshot())?
    );

    system
        .shutdown()
        .await
        .map_err(anyhow::Error::msg)
        .context("shutting down")?;
    Ok(())
}
