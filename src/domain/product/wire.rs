//! Wire types for the tracked-product endpoints.

use crate::shared::{ProductId, UserId};
use serde::{Deserialize, Serialize};

/// One row from `/products`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub amazon_url: String,
    #[serde(default)]
    pub issued_by_id: Option<UserId>,
}

/// Body for `POST /track-product`.
#[derive(Debug, Clone, Serialize)]
pub struct TrackProductRequest {
    pub product_url: String,
    pub issued_by_id: UserId,
}

/// Response from `POST /track-product`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackProductResponse {
    pub message: String,
    pub id: ProductId,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}
