//! # Pipeline Configuration
//!
//! Every tunable policy of the pipeline lives in [`PipelineConfig`]: warehouse
//! origin, distance unit and price tiers, the duplicate window, the ID reset
//! policy, listing limits, store sizing and the product catalog.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `ORDER_*` environment variables.
//!
//! ```toml
//! [warehouse]
//! lat = 40.7128
//! lng = -74.0060
//!
//! [pricing]
//! unit = "miles"
//! default_cost = 7.99
//!
//! [[pricing.tiers]]
//! up_to = 5.0
//! cost = 5.00
//! tier = "local"
//!
//! [duplicates]
//! window_secs = 60
//! ```

use crate::model::ShippingTier;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub warehouse: Warehouse,
    pub pricing: PricingConfig,
    pub duplicates: DuplicateConfig,
    pub ids: IdConfig,
    pub listing: ListingConfig,
    pub store: StoreConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub lat: f64,
    pub lng: f64,
}

impl Default for Warehouse {
    fn default() -> Self {
        // Lower Manhattan
        Self {
            lat: 40.7128,
            lng: -74.0060,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Miles,
    Kilometers,
}

impl DistanceUnit {
    /// Mean Earth radius in this unit.
    pub fn earth_radius(self) -> f64 {
        match self {
            DistanceUnit::Miles => 3959.0,
            DistanceUnit::Kilometers => 6371.0,
        }
    }
}

/// One pricing band. `up_to` is inclusive; the last band has no bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    pub up_to: Option<f64>,
    pub cost: f64,
    pub tier: ShippingTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryEstimates {
    pub local: String,
    pub regional: String,
    pub long_haul: String,
    pub flat: String,
}

impl Default for DeliveryEstimates {
    fn default() -> Self {
        Self {
            local: "1-2 business days".into(),
            regional: "2-3 business days".into(),
            long_haul: "3-5 business days".into(),
            flat: "3-7 business days".into(),
        }
    }
}

impl DeliveryEstimates {
    pub fn for_tier(&self, tier: ShippingTier) -> &str {
        match tier {
            ShippingTier::Local => &self.local,
            ShippingTier::Regional => &self.regional,
            ShippingTier::LongHaul => &self.long_haul,
            ShippingTier::Flat => &self.flat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub unit: DistanceUnit,
    pub tiers: Vec<PriceTier>,
    /// Cost applied when the order carries no coordinates.
    pub default_cost: f64,
    pub delivery: DeliveryEstimates,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            unit: DistanceUnit::Miles,
            tiers: vec![
                PriceTier {
                    up_to: Some(5.0),
                    cost: 5.00,
                    tier: ShippingTier::Local,
                },
                PriceTier {
                    up_to: Some(15.0),
                    cost: 9.99,
                    tier: ShippingTier::Regional,
                },
                PriceTier {
                    up_to: None,
                    cost: 14.99,
                    tier: ShippingTier::LongHaul,
                },
            ],
            default_cost: 7.99,
            delivery: DeliveryEstimates::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    pub window_secs: u64,
    /// Largest amount difference still treated as the same order.
    pub amount_tolerance: f64,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            amount_tolerance: 0.0,
        }
    }
}

impl DuplicateConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// When the order sequence starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceReset {
    /// Every year starts at 1 (`ORD-2026-000001`, `ORD-2027-000001`).
    PerYear,
    /// One sequence for the lifetime of the deployment.
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    pub reset: SequenceReset,
    /// Candidates tried before giving up when the store reports IDs as taken.
    pub reservation_attempts: u32,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            reset: SequenceReset::PerYear,
            reservation_attempts: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Channel capacity in front of the store actor.
    pub buffer: usize,
    pub timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            buffer: 1024,
            timeout_ms: Some(5_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub products: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            products: ["bag", "shoes", "watch", "wallet", "jacket"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, applies `ORDER_*` overrides, and validates the result.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: PipelineConfig = toml::from_str(&content)?;
        config.merge_env_vars();
        config.validate()?;
        tracing::info!(path = %path.display(), "Loaded pipeline configuration");
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) {
        if let Some(lat) = env_parse("ORDER_WAREHOUSE_LAT") {
            self.warehouse.lat = lat;
        }
        if let Some(lng) = env_parse("ORDER_WAREHOUSE_LNG") {
            self.warehouse.lng = lng;
        }
        if let Ok(unit) = std::env::var("ORDER_DISTANCE_UNIT") {
            match unit.to_ascii_lowercase().as_str() {
                "miles" | "mi" => self.pricing.unit = DistanceUnit::Miles,
                "kilometers" | "km" => self.pricing.unit = DistanceUnit::Kilometers,
                other => tracing::warn!(unit = other, "Ignoring unknown ORDER_DISTANCE_UNIT"),
            }
        }
        if let Some(cost) = env_parse("ORDER_DEFAULT_SHIPPING_COST") {
            self.pricing.default_cost = cost;
        }
        if let Some(secs) = env_parse("ORDER_DUPLICATE_WINDOW_SECS") {
            self.duplicates.window_secs = secs;
        }
        if let Some(max) = env_parse("ORDER_LIST_MAX_LIMIT") {
            self.listing.max_limit = max;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(-90.0..=90.0).contains(&self.warehouse.lat)
            || !(-180.0..=180.0).contains(&self.warehouse.lng)
        {
            return invalid(format!(
                "warehouse coordinates out of range: ({}, {})",
                self.warehouse.lat, self.warehouse.lng
            ));
        }

        let tiers = &self.pricing.tiers;
        let Some(last) = tiers.last() else {
            return invalid("pricing.tiers must not be empty".into());
        };
        if last.up_to.is_some() {
            return invalid("the last pricing tier must have no upper bound".into());
        }
        let mut previous = 0.0;
        for tier in &tiers[..tiers.len() - 1] {
            match tier.up_to {
                Some(bound) if bound > previous => previous = bound,
                Some(bound) => {
                    return invalid(format!("pricing tier bounds must increase, got {bound}"))
                }
                None => return invalid("only the last pricing tier may be unbounded".into()),
            }
        }
        if tiers.iter().any(|t| t.tier == ShippingTier::Flat) {
            return invalid("the flat tier is reserved for orders without coordinates".into());
        }
        if tiers.iter().any(|t| !non_negative(t.cost)) || !non_negative(self.pricing.default_cost) {
            return invalid("shipping costs must be non-negative".into());
        }

        if !non_negative(self.duplicates.amount_tolerance) {
            return invalid("duplicates.amount_tolerance must be non-negative".into());
        }
        if self.ids.reservation_attempts == 0 {
            return invalid("ids.reservation_attempts must be at least 1".into());
        }
        if self.listing.default_limit == 0 || self.listing.max_limit == 0 {
            return invalid("listing limits must be positive".into());
        }
        if self.listing.default_limit > self.listing.max_limit {
            return invalid("listing.default_limit exceeds listing.max_limit".into());
        }
        if self.store.buffer == 0 {
            return invalid("store.buffer must be positive".into());
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        self.store.timeout_ms.map(Duration::from_millis)
    }
}

/// False for negatives and NaN.
fn non_negative(value: f64) -> bool {
    value >= 0.0
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(name, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
