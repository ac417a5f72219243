//! Demo: places the New York example order, resubmits it, then ships,
//! delivers and lists it as an admin.
//!
//! Set `ORDER_CONFIG` to a TOML file to override the built-in configuration;
//! `ORDER_*` variables override both.

use chrono::{Duration, Utc};
use order_intake::access::{Claims, TokenRegistry};
use order_intake::config::PipelineConfig;
use order_intake::model::Role;
use order_intake::query::ListParams;
use order_intake::runtime::{setup_tracing, OrderSystem};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, Instrument};

const ADMIN_TOKEN: &str = "demo-admin-token";

fn load_config() -> Result<PipelineConfig, String> {
    match std::env::var("ORDER_CONFIG") {
        Ok(path) => PipelineConfig::load(Path::new(&path)).map_err(|e| e.to_string()),
        Err(_) => {
            let mut config = PipelineConfig::default();
            config.merge_env_vars();
            config.validate().map_err(|e| e.to_string())?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    info!("Starting order intake demo");

    let registry = Arc::new(TokenRegistry::new());
    registry.issue(
        ADMIN_TOKEN,
        Claims {
            subject: "ops@example.com".into(),
            role: Role::Admin,
            expires_at: Some(Utc::now() + Duration::hours(1)),
        },
    );

    let system = OrderSystem::start(load_config()?, registry).map_err(|e| e.to_string())?;

    let body = json!({
        "product": "bag",
        "amount": 180.50,
        "name": "John Doe",
        "email": "john@example.com",
        "shippingAddress": "123 Main Street, New York, NY 10001",
        "location": { "lat": 40.7306, "lng": -73.9352, "accuracy": 10 },
        "timestamp": Utc::now().to_rfc3339()
    });

    let span = tracing::info_span!("order_intake");
    let created = async {
        info!("Placing order");
        system.api.create_order(&body, None).await
    }
    .instrument(span)
    .await;

    if !created.is_success() {
        error!(response = %created.body, "Order placement failed");
        system.shutdown().await?;
        return Err("order placement failed".into());
    }
    info!(response = %created.body, "Order placed");

    let order_id = created.body["order_id"].as_str().unwrap_or_default().to_string();

    let again = system.api.create_order(&body, None).await;
    info!(status = again.status, response = %again.body, "Resubmitted order");

    let span = tracing::info_span!("fulfillment");
    async {
        let shipped = system
            .api
            .mark_shipped(&order_id, "1Z999AA10123456784", Some(ADMIN_TOKEN))
            .await;
        info!(status = shipped.status, "Order shipped");

        let delivered = system.api.mark_delivered(&order_id, Some(ADMIN_TOKEN)).await;
        info!(status = delivered.status, "Order delivered");

        let cancelled = system.api.cancel_order(&order_id, Some(ADMIN_TOKEN)).await;
        info!(status = cancelled.status, code = %cancelled.body["code"], "Cancel after delivery");
    }
    .instrument(span)
    .await;

    let listed = system
        .api
        .list_orders(&ListParams::default().limit(10), Some(ADMIN_TOKEN))
        .await;
    info!(count = %listed.body["count"], total = %listed.body["total"], "Listed orders");

    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
