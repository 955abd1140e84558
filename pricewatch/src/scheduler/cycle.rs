//! Extraction cycles and per-product run exclusion.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use utoipa::ToSchema;

use crate::database::models::ProductDbModel;

/// Outcome of one extraction cycle for one product.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CheckResult {
    pub product_id: i64,
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    pub fn success(product: &ProductDbModel, price: f64) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            success: true,
            price: Some(price),
            error: None,
        }
    }

    pub fn failure(product: &ProductDbModel, error: impl ToString) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            success: false,
            price: None,
            error: Some(error.to_string()),
        }
    }
}

/// One async mutex per product. Holding the guard means a cycle for that
/// product is in flight.
#[derive(Debug, Default)]
pub struct CycleGuards {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl CycleGuards {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, product_id: i64) -> Arc<Mutex<()>> {
        self.locks.entry(product_id).or_default().clone()
    }

    /// Acquire without waiting. `None` if a cycle is already running.
    pub fn try_acquire(&self, product_id: i64) -> Option<OwnedMutexGuard<()>> {
        self.lock_for(product_id).try_lock_owned().ok()
    }

    /// Wait for any in-flight cycle, then acquire.
    pub async fn acquire(&self, product_id: i64) -> OwnedMutexGuard<()> {
        self.lock_for(product_id).lock_owned().await
    }

    pub fn is_running(&self, product_id: i64) -> bool {
        self.locks
            .get(&product_id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Forget a product's lock. An in-flight holder keeps its own `Arc`.
    pub fn remove(&self, product_id: i64) {
        self.locks.remove(&product_id);
    }
}
