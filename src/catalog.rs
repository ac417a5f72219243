//! Product catalog lookup used to reject orders for unknown products.

use crate::config::CatalogConfig;
use std::collections::HashSet;

pub trait ProductCatalog: Send + Sync {
    fn contains(&self, product: &str) -> bool;
}

/// A catalog backed by the product keys in configuration. Keys match
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredCatalog {
    products: HashSet<String>,
}

impl ConfiguredCatalog {
    pub fn new<I, S>(products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            products: products
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl From<&CatalogConfig> for ConfiguredCatalog {
    fn from(config: &CatalogConfig) -> Self {
        Self::new(&config.products)
    }
}

impl ProductCatalog for ConfiguredCatalog {
    fn contains(&self, product: &str) -> bool {
        self.products.contains(&product.trim().to_lowercase())
    }
}
