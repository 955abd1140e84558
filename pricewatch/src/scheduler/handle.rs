//! Schedule handle definitions.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::cadence::Cadence;

/// A cancellable reference to one product's recurring trigger.
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    /// Unique handle identifier. Changes every time a product is rescheduled.
    pub id: String,
    /// Product this schedule drives.
    pub product_id: i64,
    pub cadence: Cadence,
    /// When the handle was created.
    pub created_at: Instant,
    /// Cancellation token for the schedule task.
    pub cancellation_token: CancellationToken,
}

impl ScheduleHandle {
    /// Create a new handle whose token is a child of `parent_token`.
    pub fn new(product_id: i64, cadence: Cadence, parent_token: &CancellationToken) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            product_id,
            cadence,
            created_at: Instant::now(),
            cancellation_token: parent_token.child_token(),
        }
    }

    /// Cancel future firings.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn info(&self) -> ScheduleInfo {
        ScheduleInfo {
            id: self.id.clone(),
            product_id: self.product_id,
            cadence: self.cadence.expression().to_string(),
            age_secs: self.elapsed().as_secs(),
        }
    }
}

/// Read-only view of a registered schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleInfo {
    pub id: String,
    pub product_id: i64,
    pub cadence: String,
    pub age_secs: u64,
}
