//! Price sample database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One recorded price for a product. Append-only.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PriceDbModel {
    pub id: i64,
    pub product_id: i64,
    pub price: f64,
    /// Unix epoch milliseconds (UTC) when the price was captured.
    pub timestamp: i64,
}
