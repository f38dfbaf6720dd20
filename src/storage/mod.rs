pub mod postgres;

use crate::domain::Product;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Destination for normalized catalog records.
///
/// Implementations must make `upsert_products` idempotent: replaying the same
/// batch replaces rows instead of duplicating them, keyed by `product_id`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Create-if-absent for the catalog table. Safe to call on every run.
    async fn ensure_schema(&self) -> Result<()>;

    /// Writes one batch, replacing existing rows with the same product id.
    /// Returns the number of rows written.
    async fn upsert_products(&self, products: &[Product]) -> Result<u64>;

    /// Current number of rows in the catalog.
    async fn count_products(&self) -> Result<u64>;
}

/// In-memory store for tests and dry development runs.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: Arc<Mutex<HashMap<String, Product>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_products(&self, products: &[Product]) -> Result<u64> {
        let mut table = self.products.lock().unwrap();
        for product in products {
            table.insert(product.product_id.clone(), product.clone());
        }
        debug!(batch = products.len(), total = table.len(), "Upserted batch into memory");
        Ok(products.len() as u64)
    }

    async fn count_products(&self) -> Result<u64> {
        Ok(self.products.lock().unwrap().len() as u64)
    }
}
