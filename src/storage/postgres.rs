use crate::config::DbConfig;
use crate::domain::Product;
use crate::error::{EtlError, Result};
use crate::storage::CatalogStore;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS products (
    product_id     TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    brand          TEXT NOT NULL,
    gender         TEXT NOT NULL,
    price          DOUBLE PRECISION NOT NULL,
    rating         DOUBLE PRECISION NOT NULL,
    num_images     INTEGER NOT NULL,
    description    TEXT NOT NULL,
    primary_color  TEXT NOT NULL,
    price_category TEXT,
    loaded_at      TIMESTAMPTZ NOT NULL DEFAULT now()
)";

/// Bounded backoff for the cross-service startup race: when both containers
/// start together the database is usually not accepting connections yet.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub total_budget: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            total_budget: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// The full wait schedule: doubling delays, each capped at `max_delay`,
    /// with the tail truncated so the total never exceeds `total_budget`.
    pub fn delays(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut next = self.initial_delay;
        let mut waited = Duration::ZERO;
        while waited < self.total_budget {
            let delay = next.min(self.max_delay).min(self.total_budget - waited);
            if delay.is_zero() {
                break;
            }
            delays.push(delay);
            waited += delay;
            next = next.saturating_mul(2);
        }
        delays
    }
}

/// Catalog store backed by the target Postgres database. The pool is owned
/// here and closed when the value drops, on every exit path.
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Connects, retrying with backoff until the policy's budget runs out.
    pub async fn connect(config: &DbConfig, retry: &RetryPolicy) -> Result<Self> {
        let url = config.url();
        let pool = connect_with(retry, move || Self::try_connect(url.clone())).await?;
        info!(target_db = %config.display_target(), "Connected to database");
        Ok(Self { pool })
    }

    async fn try_connect(url: String) -> std::result::Result<PgPool, sqlx::Error> {
        // One sequential pass needs exactly one connection.
        PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&url)
            .await
    }
}

/// Drives connection attempts through the retry schedule. Generic over the
/// attempt so the loop itself can be exercised without a live database.
async fn connect_with<T, Fut>(
    retry: &RetryPolicy,
    mut attempt: impl FnMut() -> Fut,
) -> Result<T>
where
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let delays = retry.delays();
    let mut waited = Duration::ZERO;

    for (tried, delay) in delays.iter().enumerate() {
        match attempt().await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                warn!(
                    attempt = tried + 1,
                    max_attempts = delays.len() + 1,
                    retry_in_secs = delay.as_secs(),
                    "Database not ready: {e}"
                );
                sleep(*delay).await;
                waited += *delay;
            }
        }
    }

    // Last try after the schedule is exhausted.
    attempt().await.map_err(|e| EtlError::Connection {
        attempts: delays.len() as u32 + 1,
        waited_secs: waited.as_secs(),
        message: e.to_string(),
    })
}

#[async_trait]
impl CatalogStore for PostgresCatalog {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn upsert_products(&self, products: &[Product]) -> Result<u64> {
        if products.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO products (product_id, name, brand, gender, price, rating, \
             num_images, description, primary_color, price_category) ",
        );
        builder.push_values(products, |mut row, product| {
            row.push_bind(&product.product_id)
                .push_bind(&product.name)
                .push_bind(&product.brand)
                .push_bind(&product.gender)
                .push_bind(product.price)
                .push_bind(product.rating)
                .push_bind(product.num_images)
                .push_bind(&product.description)
                .push_bind(&product.primary_color)
                .push_bind(product.price_category.map(|c| c.as_str()));
        });
        builder.push(
            " ON CONFLICT (product_id) DO UPDATE SET \
             name = EXCLUDED.name, brand = EXCLUDED.brand, gender = EXCLUDED.gender, \
             price = EXCLUDED.price, rating = EXCLUDED.rating, \
             num_images = EXCLUDED.num_images, description = EXCLUDED.description, \
             primary_color = EXCLUDED.primary_color, \
             price_category = EXCLUDED.price_category, loaded_at = now()",
        );

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn count_products(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(count as u64)
    }
}

/// Constraint violations the upsert does not absorb are integrity errors;
/// everything else is a plain database failure.
fn map_db_error(e: sqlx::Error) -> EtlError {
    match &e {
        sqlx::Error::Database(db) if !matches!(db.kind(), sqlx::error::ErrorKind::Other) => {
            EtlError::Integrity(db.to_string())
        }
        _ => EtlError::Database(e.to_string()),
    }
}
