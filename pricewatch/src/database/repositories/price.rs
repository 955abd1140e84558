//! Price history repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{Error, Result};
use crate::database::models::PriceDbModel;
use crate::database::retry::retry_on_sqlite_busy;

/// Price history repository trait.
#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Append a sample.
    async fn record_price(
        &self,
        product_id: i64,
        price: f64,
        timestamp: i64,
    ) -> Result<PriceDbModel>;
    /// All samples for a product, newest first.
    async fn list_prices(&self, product_id: i64) -> Result<Vec<PriceDbModel>>;
    async fn latest_price(&self, product_id: i64) -> Result<Option<PriceDbModel>>;
}

/// SQLx implementation of PriceRepository.
pub struct SqlxPriceRepository {
    pool: SqlitePool,
}

impl SqlxPriceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceRepository for SqlxPriceRepository {
    async fn record_price(
        &self,
        product_id: i64,
        price: f64,
        timestamp: i64,
    ) -> Result<PriceDbModel> {
        let pool = &self.pool;
        let id = retry_on_sqlite_busy("record_price", || async move {
            let done = sqlx::query(
                "INSERT INTO price_history (product_id, price, timestamp) VALUES (?, ?, ?)",
            )
            .bind(product_id)
            .bind(price)
            .bind(timestamp)
            .execute(pool)
            .await?;
            Ok::<_, Error>(done.last_insert_rowid())
        })
        .await?;

        Ok(PriceDbModel {
            id,
            product_id,
            price,
            timestamp,
        })
    }

    async fn list_prices(&self, product_id: i64) -> Result<Vec<PriceDbModel>> {
        let prices = sqlx::query_as::<_, PriceDbModel>(
            "SELECT * FROM price_history WHERE product_id = ? ORDER BY timestamp DESC, id DESC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(prices)
    }

    async fn latest_price(&self, product_id: i64) -> Result<Option<PriceDbModel>> {
        let price = sqlx::query_as::<_, PriceDbModel>(
            "SELECT * FROM price_history WHERE product_id = ? ORDER BY timestamp DESC, id DESC LIMIT 1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(price)
    }
}
