use crate::domain::Product;
use crate::error::Result;
use crate::storage::CatalogStore;
use tracing::{debug, info, warn};

/// Rows per INSERT statement; bounds memory and round-trip count.
pub const BATCH_SIZE: usize = 500;

/// Writes normalized records into a catalog store in batches.
pub struct Loader<'a> {
    store: &'a dyn CatalogStore,
    batch_size: usize,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self {
            store,
            batch_size: BATCH_SIZE,
        }
    }

    #[cfg(test)]
    fn with_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0);
        self.batch_size = batch_size;
        self
    }

    /// Ensures the table exists, then upserts every batch in order. Batches
    /// commit independently; on a mid-run failure the log shows how many rows
    /// were durably written before the error.
    pub async fn load(&self, products: &[Product]) -> Result<u64> {
        self.store.ensure_schema().await?;

        let mut written: u64 = 0;
        for (index, batch) in products.chunks(self.batch_size).enumerate() {
            match self.store.upsert_products(batch).await {
                Ok(rows) => written += rows,
                Err(e) => {
                    // Batches commit independently; record what survived.
                    warn!(written, "Load failed with {written} rows durably written");
                    return Err(e);
                }
            }
            debug!(batch = index + 1, rows = batch.len(), written, "Batch committed");
        }

        info!(rows = written, "Load complete");
        Ok(written)
    }
}
