use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;

use crate::models::Product;

/// Errors from the catalog read path. The catalog is the one dependency
/// matching cannot degrade around; callers surface these as service errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only PostgreSQL client for the product catalog.
///
/// Catalog rows are owned and mutated by external catalog management; the
/// matching engine only reads them, always scoped to an explicit tenant.
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    /// Connect and run migrations on startup.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Shared pool handle for the training store.
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Fetch every catalog product in the tenant's scope, ordered by SKU so
    /// the retriever sees a stable catalog order.
    pub async fn products_for_tenant(&self, tenant_id: &str) -> Result<Vec<Product>, CatalogError> {
        let query = r#"
            SELECT id, tenant_id, sku, name, manufacturer, category, embedding
            FROM products
            WHERE tenant_id = $1
            ORDER BY sku, id
        "#;

        let products = sqlx::query_as::<_, Product>(query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Fetched {} products for tenant {}", products.len(), tenant_id);

        Ok(products)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, CatalogError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
