//! Live price-stream layer — protocol messages, codec, connection lifecycle.
//!
//! The tracker pushes one UTF-8 JSON payload per SSE frame over a long-lived
//! `GET /track-price?user_id=..&product_id=..` response. This module defines
//! the shared message/event types; `codec` decodes payloads, `sse` handles
//! the framing, and `native` owns the connection state machine.

pub mod codec;
pub mod native;
pub mod sse;

pub use native::{StreamConnection, StreamHandle};

use crate::network::DEFAULT_STREAM_URL;
use crate::shared::ProductId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

// ─── Protocol messages ───────────────────────────────────────────────────────

/// A decoded frame from the price stream.
///
/// Closed variant set: the decoder rejects anything else, so downstream
/// matches are exhaustive by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Emitted once at stream establishment; carries no price data.
    Connected {
        connection_id: String,
        timestamp: DateTime<Utc>,
    },
    /// One scrape attempt, successful or not.
    PriceData(PriceData),
    /// Liveness signal; no state change.
    Keepalive {
        timestamp: DateTime<Utc>,
        /// Prose interval description, carried opaquely
        /// (e.g. `"30 minutes from last price update"`).
        next_update_in: String,
    },
}

/// Payload of a `price_data` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceData {
    pub product_id: ProductId,
    pub timestamp: DateTime<Utc>,
    pub outcome: ScrapeOutcome,
}

/// Result of one scrape interval, discriminated by `status` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Success {
        price: Decimal,
        selector_used: String,
    },
    /// A failed attempt carries no usable price.
    Failed { error: String },
}

impl PriceData {
    /// The scraped price, if this interval succeeded.
    pub fn price(&self) -> Option<Decimal> {
        match &self.outcome {
            ScrapeOutcome::Success { price, .. } => Some(*price),
            ScrapeOutcome::Failed { .. } => None,
        }
    }
}

// ─── Subscriber events ───────────────────────────────────────────────────────

/// Events delivered to the subscriber of an open connection.
///
/// Per-frame decode failures are logged and dropped, never delivered — one
/// bad frame must not disturb a live view.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A decoded message from the server.
    Message(StreamMessage),
    /// The connection hit a terminal transport fault; no further events
    /// follow.
    Faulted { reason: String },
}

// ─── Connection lifecycle ────────────────────────────────────────────────────

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Idle = 0,
    Connecting = 1,
    Open = 2,
    Closed = 3,
    Faulted = 4,
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Closed,
            4 => ConnectionState::Faulted,
            _ => ConnectionState::Idle,
        }
    }
}

/// What to do when an open connection faults.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconnectPolicy {
    /// Fault immediately; the owner decides whether to re-open.
    None,
    /// Bounded exponential backoff with jitter. Never retries forever.
    Backoff {
        base_delay_ms: u64,
        max_attempts: u32,
    },
}

/// Configuration for the stream connection.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// SSE endpoint; `user_id`/`product_id` are appended at open time.
    pub url: String,
    pub connect_timeout_ms: u64,
    pub reconnect: ReconnectPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            connect_timeout_ms: 30_000,
            reconnect: ReconnectPolicy::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_round_trips_through_u8() {
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closed,
            ConnectionState::Faulted,
        ] {
            assert_eq!(ConnectionState::from(state as u8), state);
        }
    }

    #[test]
    fn test_price_accessor_only_on_success() {
        let success = PriceData {
            product_id: ProductId::new(1),
            timestamp: Utc::now(),
            outcome: ScrapeOutcome::Success {
                price: Decimal::new(9999, 2),
                selector_used: "span.a-price-whole".into(),
            },
        };
        assert_eq!(success.price(), Some(Decimal::new(9999, 2)));

        let failed = PriceData {
            product_id: ProductId::new(1),
            timestamp: Utc::now(),
            outcome: ScrapeOutcome::Failed {
                error: "Price not found with any selector".into(),
            },
        };
        assert_eq!(failed.price(), None);
    }

    #[test]
    fn test_default_config_does_not_reconnect() {
        let config = StreamConfig::default();
        assert_eq!(config.reconnect, ReconnectPolicy::None);
    }
}
