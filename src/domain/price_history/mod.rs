//! Price-history domain — observations, series state, history loading.

pub mod client;
pub mod state;
pub mod wire;

pub use state::PriceSeries;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// One (timestamp, price) data point in a product's time series.
///
/// Immutable once created. Ordering key is the timestamp; ties keep arrival
/// order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceObservation {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

impl From<wire::PriceRecord> for PriceObservation {
    fn from(record: wire::PriceRecord) -> Self {
        Self {
            timestamp: record.price_at,
            price: record.price,
        }
    }
}
