//! Wire types for the price-history endpoint.

use crate::shared::serde_util::iso_instant;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// One row from `/prices`.
///
/// `priceAt` is accepted as an alias: camel-cased payloads exist where a
/// proxy re-keys the backend's snake_case.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceRecord {
    pub id: i64,
    pub price: Decimal,
    #[serde(alias = "priceAt", with = "iso_instant")]
    pub price_at: DateTime<Utc>,
}
