//! History loader — one-shot fetch that seeds a series before live updates.

use crate::client::TrackerClient;
use crate::domain::price_history::wire::PriceRecord;
use crate::domain::price_history::PriceObservation;
use crate::error::HistoryError;
use crate::shared::{ProductId, UserId};

/// Sub-client for the price-history endpoint.
pub struct PriceHistory<'a> {
    pub(crate) client: &'a TrackerClient,
}

impl<'a> PriceHistory<'a> {
    /// Load the stored observations for one `(user, product)` pair.
    ///
    /// A single request/response with no retry in this layer. Any
    /// non-success response, transport failure, or a response that is not
    /// the expected list shape (the backend answers `{"message": ...}` when
    /// it has no rows) is a [`HistoryError::Unavailable`] — the caller
    /// decides whether to degrade to an empty series.
    pub async fn load(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Vec<PriceObservation>, HistoryError> {
        let value = self
            .client
            .http
            .get_price_history(user_id, product_id)
            .await
            .map_err(|e| HistoryError::Unavailable(e.to_string()))?;

        let records: Vec<PriceRecord> = serde_json::from_value(value)
            .map_err(|e| HistoryError::Unavailable(format!("unexpected response shape: {}", e)))?;

        Ok(records.into_iter().map(PriceObservation::from).collect())
    }
}
