use crate::access::{AccessGuard, CredentialVerifier};
use crate::api::OrderApi;
use crate::catalog::{ConfiguredCatalog, ProductCatalog};
use crate::clients::OrderClient;
use crate::config::{ConfigError, PipelineConfig};
use crate::duplicate::DuplicateDetector;
use crate::fulfillment::OrderManager;
use crate::order_id::OrderIdGenerator;
use crate::pricing::GeoPricer;
use crate::query::QueryEngine;
use std::sync::Arc;
use tracing::{error, info};

/// The runtime orchestrator for the order pipeline.
///
/// `OrderSystem` is responsible for:
/// - **Lifecycle Management**: Starting and stopping the order store actor
/// - **Dependency Wiring**: Handing the store client to the duplicate detector,
///   the lifecycle manager and the query engine
///
/// # Example
///
/// ```ignore
/// let registry = Arc::new(TokenRegistry::new());
/// let system = OrderSystem::start(PipelineConfig::default(), registry)?;
///
/// let response = system.api.create_order(&body, None).await;
///
/// // Gracefully shut down when done
/// system.shutdown().await?;
/// ```
pub struct OrderSystem {
    /// JSON facade over every operation
    pub api: OrderApi,

    pub manager: Arc<OrderManager>,

    pub query: QueryEngine,

    /// Direct store access, mainly for tests and tooling
    pub order_client: OrderClient,

    handle: tokio::task::JoinHandle<()>,
}

impl OrderSystem {
    /// Validates `config`, spawns the order store and wires the pipeline with
    /// the catalog from configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: PipelineConfig,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self, ConfigError> {
        let catalog = Arc::new(ConfiguredCatalog::from(&config.catalog));
        Self::start_with_catalog(config, verifier, catalog)
    }

    pub fn start_with_catalog(
        config: PipelineConfig,
        verifier: Arc<dyn CredentialVerifier>,
        catalog: Arc<dyn ProductCatalog>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let (order_actor, order_client) =
            crate::order_actor::new(config.store.buffer, config.store_timeout());
        let handle = tokio::spawn(order_actor.run());

        let manager = Arc::new(OrderManager::new(
            order_client.clone(),
            catalog,
            DuplicateDetector::new(order_client.clone(), config.duplicates.clone()),
            GeoPricer::new(config.warehouse, config.pricing.clone()),
            OrderIdGenerator::new(config.ids.reset),
            config.ids.reservation_attempts,
        ));
        let query = QueryEngine::new(order_client.clone(), config.listing.clone());
        let api = OrderApi::new(manager.clone(), query.clone(), AccessGuard::new(verifier));

        info!(
            warehouse_lat = config.warehouse.lat,
            warehouse_lng = config.warehouse.lng,
            unit = ?config.pricing.unit,
            "Order system started"
        );

        Ok(Self {
            api,
            manager,
            query,
            order_client,
            handle,
        })
    }

    /// Gracefully shuts down the system.
    ///
    /// Dropping the clients closes the store channel; the actor drains what is
    /// queued and exits. Clones of the API or clients held elsewhere keep the
    /// store alive, so drop them first.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        drop(self.api);
        drop(self.manager);
        drop(self.query);
        drop(self.order_client);

        if let Err(e) = self.handle.await {
            error!("Order store task failed: {:?}", e);
            return Err(format!("Order store task failed: {:?}", e));
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
