use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::fault::{FaultInjector, FaultSource, RandomFaults};
use crate::pipeline::{OrderPipeline, PipelineSteps};
use crate::service::OrderService;
use crate::store::OrderStore;
use crate::telemetry::Telemetry;

const STORE_BUFFER: usize = 256;

/// Wires the running system together.
///
/// - Spawns the order store actor.
/// - Builds the fault injector and pipeline steps from [`Config`].
/// - Exposes the resulting [`OrderService`].
///
/// # Example
///
/// ```ignore
/// let system = OrderSystem::new(&Config::from_env()?, Telemetry::noop());
/// let reply = system.service.create_order(OrderRequest::default()).await;
/// system.shutdown().await?;
/// ```
pub struct OrderSystem {
    pub service: OrderService,
    telemetry: Telemetry,
    store_handle: JoinHandle<()>,
}

impl OrderSystem {
    /// Fault draws come from a [`RandomFaults`] seeded by `config.seed`, or from
    /// entropy when unset. Must be called inside a tokio runtime.
    pub fn new(config: &Config, telemetry: Telemetry) -> Self {
        let faults = match config.seed {
            Some(seed) => RandomFaults::seeded(seed),
            None => RandomFaults::from_entropy(),
        };
        Self::with_faults(config, telemetry, Arc::new(faults))
    }

    /// Same as [`OrderSystem::new`] with an explicit fault source.
    pub fn with_faults(
        config: &Config,
        telemetry: Telemetry,
        faults: Arc<dyn FaultSource>,
    ) -> Self {
        let (store, store_client) = OrderStore::new(STORE_BUFFER);
        let store_handle = tokio::spawn(store.run());

        let pipeline = OrderPipeline::new(
            telemetry.clone(),
            FaultInjector::new(faults),
            store_client,
            PipelineSteps::from_config(config),
        );
        info!(port = config.port, seed = ?config.seed, "Order system started");

        Self {
            service: OrderService::new(pipeline),
            telemetry,
            store_handle,
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Stops the store actor and flushes telemetry.
    ///
    /// The store only stops once every clone of the service has been dropped, so
    /// callers must drop the clones they handed out first.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        // Dropping the last store client closes the actor's channel.
        drop(self.service);

        if let Err(e) = self.store_handle.await {
            error!("Order store task failed: {:?}", e);
            return Err(format!("Order store task failed: {:?}", e));
        }

        self.telemetry.shutdown().await;
        info!("System shutdown complete.");
        Ok(())
    }
}
