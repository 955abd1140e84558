//! Job registry: at most one active schedule per product.
//!
//! The registry only stores [`ScheduleHandle`]s. The schedule tasks themselves
//! watch their handle's cancellation token and exit when it fires.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::cadence::Cadence;
use super::handle::{ScheduleHandle, ScheduleInfo};

pub struct JobRegistry {
    handles: RwLock<HashMap<i64, ScheduleHandle>>,
    /// Parent of every handle token.
    root_token: CancellationToken,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl JobRegistry {
    pub fn new(root_token: CancellationToken) -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
            root_token,
        }
    }

    /// Create a handle for `product_id` and make it the active one.
    ///
    /// Any previous handle for the product is cancelled and returned. Creation
    /// and replacement happen under one write lock, so readers never observe two
    /// handles or none for a product that was already scheduled.
    ///
    /// After [`JobRegistry::shutdown`] the returned handle is already cancelled
    /// and is not stored.
    pub fn register(
        &self,
        product_id: i64,
        cadence: Cadence,
    ) -> (ScheduleHandle, Option<ScheduleHandle>) {
        let handle = ScheduleHandle::new(product_id, cadence, &self.root_token);
        if self.root_token.is_cancelled() {
            debug!(product_id, "Registry shut down, schedule not stored");
            return (handle, None);
        }

        let previous = {
            let mut handles = self.handles.write();
            handles.insert(product_id, handle.clone())
        };

        if let Some(old) = &previous {
            old.cancel();
            debug!(product_id, old_handle = %old.id, new_handle = %handle.id, "Replaced schedule");
        }

        (handle, previous)
    }

    /// Cancel and remove the schedule for `product_id`. Returns whether one existed.
    pub fn cancel(&self, product_id: i64) -> bool {
        let removed = self.handles.write().remove(&product_id);
        match removed {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every schedule and clear the registry. Returns how many were active.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<ScheduleHandle> = {
            let mut handles = self.handles.write();
            handles.drain().map(|(_, handle)| handle).collect()
        };

        for handle in &drained {
            handle.cancel();
        }
        drained.len()
    }

    /// Remove the entry for `product_id` only if it is still `handle_id`.
    ///
    /// Used by a schedule task that exits on its own, so it cannot evict a
    /// newer replacement.
    pub fn remove_if_current(&self, product_id: i64, handle_id: &str) -> bool {
        let mut handles = self.handles.write();
        match handles.get(&product_id) {
            Some(current) if current.id == handle_id => {
                if let Some(handle) = handles.remove(&product_id) {
                    handle.cancel();
                }
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, product_id: i64) -> bool {
        self.handles.read().contains_key(&product_id)
    }

    pub fn get(&self, product_id: i64) -> Option<ScheduleHandle> {
        self.handles.read().get(&product_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }

    /// All active schedules ordered by product id.
    pub fn snapshot(&self) -> Vec<ScheduleInfo> {
        let mut infos: Vec<ScheduleInfo> =
            self.handles.read().values().map(|h| h.info()).collect();
        infos.sort_by_key(|info| info.product_id);
        infos
    }

    /// Cancel everything, including handles registered later.
    pub fn shutdown(&self) {
        self.root_token.cancel();
        self.cancel_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.root_token.is_cancelled()
    }
}
