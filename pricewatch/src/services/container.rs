//! Service container for dependency injection.
//!
//! The ServiceContainer holds references to all application services
//! and manages their lifecycle.

use std::sync::Arc;

use price_extractor::{ValueExtractor, ValueSource};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::Result;
use crate::config::AppConfig;
use crate::database::repositories::{SqlxPriceRepository, SqlxProductRepository};
use crate::scheduler::{JobRegistry, Scheduler, SchedulerConfig};
use crate::services::ProductService;

/// Service container holding all application services.
pub struct ServiceContainer {
    /// Database connection pool.
    pub pool: SqlitePool,
    pub product_repository: Arc<SqlxProductRepository>,
    pub price_repository: Arc<SqlxPriceRepository>,
    pub scheduler: Arc<Scheduler>,
    pub product_service: Arc<ProductService>,
    /// Cancellation token for graceful shutdown. Parent of every schedule token.
    cancellation_token: CancellationToken,
}

impl ServiceContainer {
    /// Build the container with the real extractor (HTTP plus headless Chromium).
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Result<Self> {
        let extractor = ValueExtractor::with_renderer_config(config.renderer.clone())?;
        Ok(Self::with_source(
            pool,
            Arc::new(extractor),
            config.scheduler.clone(),
        ))
    }

    /// Build the container around any [`ValueSource`].
    pub fn with_source(
        pool: SqlitePool,
        source: Arc<dyn ValueSource>,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        info!("Initializing service container");

        let cancellation_token = CancellationToken::new();

        let product_repository = Arc::new(SqlxProductRepository::new(pool.clone()));
        let price_repository = Arc::new(SqlxPriceRepository::new(pool.clone()));

        let registry = Arc::new(JobRegistry::new(cancellation_token.child_token()));
        let scheduler = Arc::new(Scheduler::with_registry(
            product_repository.clone(),
            price_repository.clone(),
            source.clone(),
            registry,
            scheduler_config,
        ));

        let product_service = Arc::new(ProductService::new(
            product_repository.clone(),
            price_repository.clone(),
            source,
            scheduler.clone(),
        ));

        Self {
            pool,
            product_repository,
            price_repository,
            scheduler,
            product_service,
            cancellation_token,
        }
    }

    /// Schedule every stored product with the default cadence.
    pub async fn start(&self) -> Result<usize> {
        let cadence = self.scheduler.default_cadence().clone();
        self.scheduler.schedule_all(&cadence).await
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Stop all schedules and background tasks.
    pub async fn shutdown(&self) {
        info!("Shutting down services");
        self.scheduler.shutdown();
        self.cancellation_token.cancel();
    }
}
