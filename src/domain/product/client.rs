//! Tracked-product sub-client.

use crate::client::TrackerClient;
use crate::domain::product::wire::{ProductRecord, TrackProductRequest};
use crate::domain::product::TrackedProduct;
use crate::error::{HttpError, SdkError};
use crate::shared::{ProductId, UserId};

/// Sub-client for watch-list operations.
pub struct Products<'a> {
    pub(crate) client: &'a TrackerClient,
}

impl<'a> Products<'a> {
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<TrackedProduct>, SdkError> {
        let records = self.client.http.get_products(user_id).await?;
        Ok(records.into_iter().map(TrackedProduct::from).collect())
    }

    /// Fetch one tracked product.
    ///
    /// The backend answers a `{"message": ...}` object for an unknown id, so
    /// a shape mismatch here means "not found" rather than a protocol error.
    pub async fn get(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<TrackedProduct, SdkError> {
        let value = self.client.http.get_product(user_id, product_id).await?;
        match serde_json::from_value::<ProductRecord>(value) {
            Ok(record) => Ok(record.into()),
            Err(_) => Err(HttpError::NotFound(format!("product {}", product_id)).into()),
        }
    }

    /// Start tracking a product URL; returns the allocated id.
    pub async fn track(&self, user_id: &UserId, product_url: &str) -> Result<ProductId, SdkError> {
        let resp = self
            .client
            .http
            .track_product(&TrackProductRequest {
                product_url: product_url.to_string(),
                issued_by_id: *user_id,
            })
            .await?;
        Ok(resp.id)
    }

    pub async fn delete(&self, user_id: &UserId, product_id: &ProductId) -> Result<(), SdkError> {
        self.client.http.delete_product(user_id, product_id).await?;
        Ok(())
    }
}
