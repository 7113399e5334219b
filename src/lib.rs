//! # Pricewatch SDK
//!
//! A Rust client for the Pricewatch tracker: REST API access plus the live
//! price-update stream that feeds product detail views.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — shared newtypes, domain models, errors
//! 2. **HTTP API** — `TrackerHttp` with per-endpoint retry policies
//! 3. **Stream** — SSE transport, frame codec, connection state machine
//! 4. **Views** — chart projection and the product-detail controller
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pricewatch_sdk::prelude::*;
//! use std::sync::Arc;
//!
//! let client = TrackerClient::builder()
//!     .base_url("http://localhost:8000")
//!     .build()?;
//!
//! let session = Arc::new(MemorySession::new());
//! let user_id = client.sessions().signin("me@example.com", "secret").await?;
//! session.set_user(user_id);
//!
//! let mut detail = ProductDetailController::new(client, session);
//! detail.mount(ProductId::new(5)).await?;
//! let chart = detail.chart().await;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Domain modules (vertical slices): wire types, conversions, state.
pub mod domain;

/// Unified SDK error types.
pub mod error;

/// Network URL constants.
pub mod network;

/// Session identity: explicit provider capability + account endpoints.
pub mod session;

// ── Layer 2: HTTP API ────────────────────────────────────────────────────────

/// HTTP client with retry policies.
pub mod http;

// ── Layer 3: Stream ──────────────────────────────────────────────────────────

/// Live price stream: protocol messages, codec, connection lifecycle.
pub mod stream;

// ── Layer 4: Views ───────────────────────────────────────────────────────────

/// Chart projection for the rendering surface.
pub mod chart;

/// Product-detail controller composing history, stream, and chart.
pub mod controller;

/// `TrackerClient` — the primary entry point.
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{ProductId, UserId};

    // Domain types
    pub use crate::domain::price_history::{PriceObservation, PriceSeries};
    pub use crate::domain::product::TrackedProduct;

    // Errors
    pub use crate::error::{HistoryError, HttpError, SdkError, SessionError, StreamError};

    // Network
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_STREAM_URL};

    // Session identity
    pub use crate::session::{MemorySession, SessionProvider};

    // HTTP client + sub-clients
    pub use crate::client::{TrackerClient, TrackerClientBuilder};
    pub use crate::http::retry::{RetryConfig, RetryPolicy};

    // Stream types
    pub use crate::stream::{
        ConnectionState, PriceData, ReconnectPolicy, ScrapeOutcome, StreamConfig,
        StreamConnection, StreamEvent, StreamHandle, StreamMessage,
    };

    // Views
    pub use crate::chart::{project, ChartRenderer, ChartSeries};
    pub use crate::controller::{IntervalError, ProductDetailController};
}
