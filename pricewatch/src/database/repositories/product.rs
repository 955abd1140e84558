//! Product repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::{ProductDbModel, ProductWithLatestDbModel};
use crate::{Error, Result};

/// Product repository trait.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a product and return it with its assigned id.
    async fn create_product(&self, product: &ProductDbModel) -> Result<ProductDbModel>;
    async fn get_product(&self, id: i64) -> Result<ProductDbModel>;
    async fn get_product_by_url(&self, url: &str) -> Result<ProductDbModel>;
    async fn list_products(&self) -> Result<Vec<ProductDbModel>>;
    async fn list_products_with_latest(&self) -> Result<Vec<ProductWithLatestDbModel>>;
    /// Delete a product and all of its price samples.
    async fn delete_product(&self, id: i64) -> Result<()>;
}

/// SQLx implementation of ProductRepository.
pub struct SqlxProductRepository {
    pool: SqlitePool,
}

impl SqlxProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn create_product(&self, product: &ProductDbModel) -> Result<ProductDbModel> {
        let result = sqlx::query(
            r#"
            INSERT INTO products (name, url, selector, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&product.name)
        .bind(&product.url)
        .bind(&product.selector)
        .bind(product.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(ProductDbModel {
                id: done.last_insert_rowid(),
                ..product.clone()
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Error::duplicate_url(&product.url))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_product(&self, id: i64) -> Result<ProductDbModel> {
        sqlx::query_as::<_, ProductDbModel>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("Product", id))
    }

    async fn get_product_by_url(&self, url: &str) -> Result<ProductDbModel> {
        sqlx::query_as::<_, ProductDbModel>("SELECT * FROM products WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("Product", url))
    }

    async fn list_products(&self) -> Result<Vec<ProductDbModel>> {
        let products = sqlx::query_as::<_, ProductDbModel>("SELECT * FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn list_products_with_latest(&self) -> Result<Vec<ProductWithLatestDbModel>> {
        let products = sqlx::query_as::<_, ProductWithLatestDbModel>(
            r#"
            SELECT
                p.id, p.name, p.url, p.selector, p.created_at,
                (SELECT ph.price FROM price_history ph
                  WHERE ph.product_id = p.id
                  ORDER BY ph.timestamp DESC, ph.id DESC LIMIT 1) AS latest_price,
                (SELECT ph.timestamp FROM price_history ph
                  WHERE ph.product_id = p.id
                  ORDER BY ph.timestamp DESC, ph.id DESC LIMIT 1) AS last_checked
            FROM products p
            ORDER BY p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn delete_product(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM price_history WHERE product_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            // Dropping the transaction rolls it back.
            return Err(Error::not_found("Product", id));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_memory_pool;

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = init_memory_pool().await.unwrap();
        let repo = SqlxProductRepository::new(pool);

        let created = repo
            .create_product(&ProductDbModel::new(
                "Widget",
                "http://shop.test/widget",
                "#price",
            ))
            .await
            .unwrap();
        assert!(created.id > 0);

        let fetched = repo.get_product(created.id).await.unwrap();
        assert_eq!(fetched, created);

        let by_url = repo
            .get_product_by_url("http://shop.test/widget")
            .await
            .unwrap();
        assert_eq!(by_url.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected() {
        let pool = init_memory_pool().await.unwrap();
        let repo = SqlxProductRepository::new(pool);

        let product = ProductDbModel::new("Widget", "http://shop.test/widget", "#price");
        repo.create_product(&product).await.unwrap();

        let err = repo.create_product(&product).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateUrl { .. }));
        assert_eq!(repo.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let pool = init_memory_pool().await.unwrap();
        let repo = SqlxProductRepository::new(pool);

        assert!(repo.get_product(42).await.unwrap_err().is_not_found());
        assert!(repo.delete_product(42).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_with_latest_without_samples() {
        let pool = init_memory_pool().await.unwrap();
        let repo = SqlxProductRepository::new(pool);

        repo.create_product(&ProductDbModel::new("A", "http://shop.test/a", ".p"))
            .await
            .unwrap();

        let listed = repo.list_products_with_latest().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].latest_price, None);
        assert_eq!(listed[0].last_checked, None);
    }
}
