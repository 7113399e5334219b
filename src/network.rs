//! Network URL constants for the Pricewatch SDK.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.pricewatch.app";

/// Default live price-stream (SSE) endpoint.
pub const DEFAULT_STREAM_URL: &str = "https://api.pricewatch.app/track-price";
