//! Scheduler service.
//!
//! Each scheduled product gets its own tokio task that sleeps until the next
//! cadence fire time, runs one extraction cycle and repeats until its handle is
//! cancelled. Cycles for the same product never overlap: a scheduled firing
//! that finds a cycle in flight is skipped, an on-demand trigger waits.

use std::sync::Arc;

use futures::StreamExt;
use price_extractor::ValueSource;
use tracing::{debug, error, info, warn};

use super::cadence::Cadence;
use super::cycle::{CheckResult, CycleGuards};
use super::handle::ScheduleHandle;
use super::registry::JobRegistry;
use crate::Result;
use crate::database::models::ProductDbModel;
use crate::database::repositories::{PriceRepository, ProductRepository};
use crate::database::time::now_ms;

/// Default number of products checked in parallel by [`Scheduler::trigger_all_now`].
const DEFAULT_CHECK_CONCURRENCY: usize = 4;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Cadence for products registered at runtime and for startup scheduling.
    pub default_cadence: Cadence,
    /// Parallelism for on-demand checks of every product.
    pub check_concurrency: usize,
}

impl SchedulerConfig {
    pub fn new(default_cadence: Cadence) -> Self {
        Self {
            default_cadence,
            check_concurrency: DEFAULT_CHECK_CONCURRENCY,
        }
    }

    pub fn with_check_concurrency(mut self, concurrency: usize) -> Self {
        self.check_concurrency = concurrency.max(1);
        self
    }
}

/// What a scheduled firing ended up doing.
enum ScheduledCycle {
    Ran,
    Skipped,
    /// The product was deleted; the schedule should end.
    Gone,
}

/// Drives the [`JobRegistry`] and runs extraction cycles.
#[derive(Clone)]
pub struct Scheduler {
    products: Arc<dyn ProductRepository>,
    prices: Arc<dyn PriceRepository>,
    source: Arc<dyn ValueSource>,
    registry: Arc<JobRegistry>,
    guards: Arc<CycleGuards>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        prices: Arc<dyn PriceRepository>,
        source: Arc<dyn ValueSource>,
        config: SchedulerConfig,
    ) -> Self {
        Self::with_registry(
            products,
            prices,
            source,
            Arc::new(JobRegistry::default()),
            config,
        )
    }

    pub fn with_registry(
        products: Arc<dyn ProductRepository>,
        prices: Arc<dyn PriceRepository>,
        source: Arc<dyn ValueSource>,
        registry: Arc<JobRegistry>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            products,
            prices,
            source,
            registry,
            guards: Arc::new(CycleGuards::new()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn guards(&self) -> &Arc<CycleGuards> {
        &self.guards
    }

    pub fn default_cadence(&self) -> &Cadence {
        &self.config.default_cadence
    }

    /// Schedule every stored product on `cadence`. Returns the number scheduled.
    pub async fn schedule_all(&self, cadence: &Cadence) -> Result<usize> {
        let products = self.products.list_products().await?;
        for product in &products {
            self.schedule_one(product, cadence.clone());
        }

        info!(
            count = products.len(),
            cadence = %cadence,
            "Scheduled price checks for all products"
        );
        Ok(products.len())
    }

    /// Start (or restart) the recurring trigger for one product.
    ///
    /// An existing schedule for the same product is cancelled first.
    pub fn schedule_one(&self, product: &ProductDbModel, cadence: Cadence) -> ScheduleHandle {
        let (handle, previous) = self.registry.register(product.id, cadence);

        if handle.is_cancelled() {
            warn!(product_id = product.id, "Scheduler is shut down, not scheduling");
            return handle;
        }

        if previous.is_some() {
            info!(
                product_id = product.id,
                name = %product.name,
                cadence = %handle.cadence,
                "Rescheduled price check"
            );
        } else {
            info!(
                product_id = product.id,
                name = %product.name,
                cadence = %handle.cadence,
                "Scheduled price check"
            );
        }

        let scheduler = self.clone();
        let task_handle = handle.clone();
        tokio::spawn(async move {
            scheduler.run_schedule(task_handle).await;
        });

        handle
    }

    /// Schedule with the configured default cadence.
    pub fn schedule_default(&self, product: &ProductDbModel) -> ScheduleHandle {
        self.schedule_one(product, self.config.default_cadence.clone())
    }

    /// Cancel the schedule for one product. Returns whether it was scheduled.
    pub fn unschedule(&self, product_id: i64) -> bool {
        let cancelled = self.registry.cancel(product_id);
        if cancelled {
            info!(product_id, "Cancelled price check schedule");
        }
        cancelled
    }

    /// Cancel every schedule. Idempotent.
    pub fn stop_all(&self) -> usize {
        let stopped = self.registry.cancel_all();
        if stopped > 0 {
            info!(count = stopped, "Stopped all scheduled price checks");
        }
        stopped
    }

    /// Stop all schedules and refuse new ones.
    pub fn shutdown(&self) {
        let active = self.registry.len();
        self.registry.shutdown();
        info!(stopped = active, "Scheduler shut down");
    }

    /// Run one cycle for every product now, independent of their schedules.
    ///
    /// Results are returned in product order.
    pub async fn trigger_all_now(&self) -> Result<Vec<CheckResult>> {
        let products = self.products.list_products().await?;
        info!(count = products.len(), "Running price check for all products");

        let results = futures::stream::iter(products)
            .map(|product| async move {
                let _guard = self.guards.acquire(product.id).await;
                self.run_cycle(&product).await
            })
            .buffered(self.config.check_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let failed = results.iter().filter(|r| !r.success).count();
        info!(
            total = results.len(),
            failed, "Finished price check for all products"
        );
        Ok(results)
    }

    /// Run one cycle for one product now. Waits for an in-flight cycle first.
    pub async fn trigger_one_now(&self, product_id: i64) -> Result<CheckResult> {
        let product = self.products.get_product(product_id).await?;
        let _guard = self.guards.acquire(product_id).await;
        Ok(self.run_cycle(&product).await)
    }

    /// Extract the product's price and append it to its history.
    ///
    /// Failures are logged and returned as an unsuccessful [`CheckResult`];
    /// nothing is written for them. Callers are responsible for run exclusion.
    pub async fn run_cycle(&self, product: &ProductDbModel) -> CheckResult {
        debug!(product_id = product.id, url = %product.url, "Checking price");

        let price = match self.source.extract(&product.url, &product.selector).await {
            Ok(price) => price,
            Err(e) => {
                warn!(
                    product_id = product.id,
                    name = %product.name,
                    url = %product.url,
                    strategy = %e.strategy(),
                    kind = e.kind(),
                    error = %e,
                    "Price check failed"
                );
                return CheckResult::failure(product, e);
            }
        };

        match self.prices.record_price(product.id, price, now_ms()).await {
            Ok(_) => {
                info!(product_id = product.id, name = %product.name, price, "Recorded price");
                CheckResult::success(product, price)
            }
            Err(e) => {
                error!(
                    product_id = product.id,
                    name = %product.name,
                    error = %e,
                    "Failed to record price"
                );
                CheckResult::failure(product, e)
            }
        }
    }

    async fn scheduled_cycle(&self, product_id: i64) -> ScheduledCycle {
        let Some(_guard) = self.guards.try_acquire(product_id) else {
            debug!(product_id, "Previous check still running, skipping tick");
            return ScheduledCycle::Skipped;
        };

        let product = match self.products.get_product(product_id).await {
            Ok(product) => product,
            Err(e) if e.is_not_found() => return ScheduledCycle::Gone,
            Err(e) => {
                warn!(product_id, error = %e, "Failed to load product for scheduled check");
                return ScheduledCycle::Skipped;
            }
        };

        self.run_cycle(&product).await;
        ScheduledCycle::Ran
    }

    async fn run_schedule(self, handle: ScheduleHandle) {
        let product_id = handle.product_id;
        let token = handle.cancellation_token.clone();
        debug!(product_id, handle_id = %handle.id, "Schedule task started");

        loop {
            let Some(delay) = handle.cadence.until_next() else {
                warn!(product_id, cadence = %handle.cadence, "Cadence never fires again, ending schedule");
                self.registry.remove_if_current(product_id, &handle.id);
                break;
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            if token.is_cancelled() {
                break;
            }

            match self.scheduled_cycle(product_id).await {
                ScheduledCycle::Ran | ScheduledCycle::Skipped => {}
                ScheduledCycle::Gone => {
                    info!(product_id, "Product no longer exists, ending its schedule");
                    self.registry.remove_if_current(product_id, &handle.id);
                    break;
                }
            }
        }

        debug!(product_id, handle_id = %handle.id, "Schedule task exited");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use price_extractor::ExtractError;

    use crate::database::init_memory_pool;
    use crate::database::repositories::{SqlxPriceRepository, SqlxProductRepository};

    /// Source that returns a fixed price and counts calls.
    struct FixedSource {
        price: f64,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(price: f64) -> Arc<Self> {
            Self::slow(price, Duration::ZERO)
        }

        fn slow(price: f64, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                price,
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ValueSource for FixedSource {
        async fn extract(
            &self,
            location: &str,
            _selector: &str,
        ) -> std::result::Result<f64, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if location.contains("missing") {
                return Err(ExtractError::NotFound);
            }
            Ok(self.price)
        }
    }

    async fn setup(source: Arc<FixedSource>) -> (Scheduler, Arc<SqlxProductRepository>) {
        let pool = init_memory_pool().await.unwrap();
        let products = Arc::new(SqlxProductRepository::new(pool.clone()));
        let prices = Arc::new(SqlxPriceRepository::new(pool));
        let scheduler = Scheduler::new(
            products.clone(),
            prices,
            source,
            SchedulerConfig::new(Cadence::parse("0 0 * * *").unwrap()),
        );
        (scheduler, products)
    }

    async fn add(products: &SqlxProductRepository, url: &str) -> ProductDbModel {
        products
            .create_product(&ProductDbModel::new("Widget", url, "#price"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_trigger_one_unknown_is_not_found() {
        let (scheduler, _) = setup(FixedSource::new(1.0)).await;
        let err = scheduler.trigger_one_now(99).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_trigger_all_reports_each_product() {
        let source = FixedSource::new(9.5);
        let (scheduler, products) = setup(source.clone()).await;
        let ok = add(&products, "http://shop.test/ok").await;
        let missing = add(&products, "http://shop.test/missing").await;

        let results = scheduler.trigger_all_now().await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].product_id, ok.id);
        assert!(results[0].success);
        assert_eq!(results[0].price, Some(9.5));
        assert_eq!(results[1].product_id, missing.id);
        assert!(!results[1].success);
        assert!(results[1].error.as_deref().unwrap().contains("404"));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_schedule_one_twice_keeps_single_schedule() {
        let (scheduler, products) = setup(FixedSource::new(1.0)).await;
        let product = add(&products, "http://shop.test/a").await;

        let first = scheduler.schedule_default(&product);
        let second = scheduler.schedule_default(&product);

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(scheduler.registry().len(), 1);
        assert_eq!(scheduler.registry().get(product.id).unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_replaced_schedule_stops_firing() {
        let source = FixedSource::new(1.0);
        let (scheduler, products) = setup(source.clone()).await;
        let product = add(&products, "http://shop.test/a").await;

        // The every-second schedule is replaced by a daily one before it can fire.
        scheduler.schedule_one(&product, Cadence::parse("* * * * * *").unwrap());
        scheduler.schedule_default(&product);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(source.calls(), 0);
        assert_eq!(scheduler.registry().len(), 1);
        scheduler.stop_all();
    }

    #[tokio::test]
    async fn test_reschedule_onto_faster_cadence_fires_once_per_tick() {
        let source = FixedSource::new(1.0);
        let (scheduler, products) = setup(source.clone()).await;
        let product = add(&products, "http://shop.test/a").await;

        let every_two_seconds = Cadence::parse("*/2 * * * * *").unwrap();
        scheduler.schedule_one(&product, every_two_seconds.clone());
        scheduler.schedule_one(&product, every_two_seconds);

        tokio::time::sleep(Duration::from_millis(4500)).await;
        scheduler.stop_all();

        // 4.5s covers two or three even-second boundaries.
        let calls = source.calls();
        assert!((2..=3).contains(&calls), "calls = {calls}");
    }

    #[tokio::test]
    async fn test_schedule_after_shutdown_is_not_registered() {
        let source = FixedSource::new(1.0);
        let (scheduler, products) = setup(source.clone()).await;
        let product = add(&products, "http://shop.test/a").await;

        scheduler.shutdown();
        let handle = scheduler.schedule_one(&product, Cadence::parse("* * * * * *").unwrap());

        assert!(handle.is_cancelled());
        assert!(scheduler.registry().is_empty());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_scheduled_firing_records_price() {
        let source = FixedSource::new(3.25);
        let (scheduler, products) = setup(source.clone()).await;
        let product = add(&products, "http://shop.test/a").await;

        scheduler.schedule_one(&product, Cadence::parse("* * * * * *").unwrap());
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop_all();

        assert!(source.calls() >= 1);
    }

    #[tokio::test]
    async fn test_stop_all_prevents_future_cycles() {
        let source = FixedSource::new(1.0);
        let (scheduler, products) = setup(source.clone()).await;
        let a = add(&products, "http://shop.test/a").await;
        let b = add(&products, "http://shop.test/b").await;

        let every_second = Cadence::parse("* * * * * *").unwrap();
        scheduler.schedule_one(&a, every_second.clone());
        scheduler.schedule_one(&b, every_second);
        assert_eq!(scheduler.stop_all(), 2);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(source.calls(), 0);
        assert!(scheduler.registry().is_empty());
        assert_eq!(scheduler.stop_all(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let source = FixedSource::slow(1.0, Duration::from_millis(2500));
        let (scheduler, products) = setup(source.clone()).await;
        let product = add(&products, "http://shop.test/slow").await;

        scheduler.schedule_one(&product, Cadence::parse("* * * * * *").unwrap());
        tokio::time::sleep(Duration::from_millis(2200)).await;

        // The first cycle is still sleeping; no second cycle may have started.
        assert_eq!(source.calls(), 1);
        assert!(scheduler.guards().is_running(product.id));
        scheduler.stop_all();
    }

    #[tokio::test]
    async fn test_schedule_ends_when_product_deleted() {
        let source = FixedSource::new(1.0);
        let (scheduler, products) = setup(source.clone()).await;
        let product = add(&products, "http://shop.test/a").await;

        scheduler.schedule_one(&product, Cadence::parse("* * * * * *").unwrap());
        products.delete_product(product.id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2200)).await;
        assert!(!scheduler.registry().contains(product.id));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_schedule_all() {
        let (scheduler, products) = setup(FixedSource::new(1.0)).await;
        add(&products, "http://shop.test/a").await;
        add(&products, "http://shop.test/b").await;

        let cadence = scheduler.default_cadence().clone();
        assert_eq!(scheduler.schedule_all(&cadence).await.unwrap(), 2);
        assert_eq!(scheduler.registry().len(), 2);

        scheduler.shutdown();
        assert!(scheduler.registry().is_empty());
    }
}
