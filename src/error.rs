//! Unified SDK error types.

use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// HTTP-layer errors.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Timeout")]
    Timeout,

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

/// Live-stream errors.
///
/// `MalformedFrame` and `UnknownKind` are per-frame decode failures — the
/// connection survives them. `TransportFault` terminates the connection.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Unknown message kind: {0}")]
    UnknownKind(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Transport fault: {0}")]
    TransportFault(String),
}

/// Session-identity errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not authenticated")]
    Unauthenticated,
}

/// Price-history errors.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History unavailable: {0}")]
    Unavailable(String),
}
