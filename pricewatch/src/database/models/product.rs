//! Product database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Product database model.
/// A tracked page plus the CSS selector that locates its price.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProductDbModel {
    /// Assigned by the database; `0` until inserted.
    pub id: i64,
    pub name: String,
    /// Page URL, unique across products.
    pub url: String,
    pub selector: String,
    /// Unix epoch milliseconds (UTC) when created.
    pub created_at: i64,
}

impl ProductDbModel {
    /// Create an unsaved product stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            url: url.into(),
            selector: selector.into(),
            created_at: crate::database::time::now_ms(),
        }
    }
}

/// Product row joined with its newest price sample.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ProductWithLatestDbModel {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub selector: String,
    pub created_at: i64,
    pub latest_price: Option<f64>,
    /// Timestamp of the newest sample (epoch ms).
    pub last_checked: Option<i64>,
}
