//! Stream connection lifecycle — background tokio task per connection.
//!
//! One [`StreamConnection`] exists per mounted product view and owns at most
//! one live connection at a time. Opening is non-blocking: the caller
//! registers a subscriber and gets back a [`StreamHandle`]; a background
//! task dials the endpoint, reads the SSE body, and invokes the subscriber
//! with each decoded message. Subscriber invocations are sequential — the
//! task never runs them concurrently.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::Notify;

use crate::error::StreamError;
use crate::shared::{ProductId, UserId};
use crate::stream::sse::SseParser;
use crate::stream::{codec, ConnectionState, ReconnectPolicy, StreamConfig, StreamEvent};

/// Owner of the live push connection for one product view.
pub struct StreamConnection {
    config: StreamConfig,
    current: Option<StreamHandle>,
}

impl StreamConnection {
    /// Does not connect yet; the connection is `Idle` until [`open`] is
    /// called.
    ///
    /// [`open`]: StreamConnection::open
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.current
            .as_ref()
            .map(StreamHandle::state)
            .unwrap_or(ConnectionState::Idle)
    }

    /// Open the stream for one `(user, product)` pair.
    ///
    /// Any previous connection is closed first, so at most one stream is
    /// live per view and a stale subscriber can never receive another
    /// frame. Must be called from within a tokio runtime; the caller does
    /// not block.
    pub fn open<F>(
        &mut self,
        user_id: &UserId,
        product_id: &ProductId,
        subscriber: F,
    ) -> StreamHandle
    where
        F: FnMut(StreamEvent) + Send + 'static,
    {
        self.close();

        let url = format!(
            "{}?user_id={}&product_id={}",
            self.config.url, user_id, product_id
        );
        let shared = Arc::new(HandleShared {
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            shutdown: Notify::new(),
        });

        tokio::spawn(run_stream(
            self.config.clone(),
            url,
            subscriber,
            Arc::clone(&shared),
        ));

        let handle = StreamHandle { shared };
        self.current = Some(handle.clone());
        handle
    }

    /// Close the current connection, if any. Idempotent.
    pub fn close(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.close();
        }
    }
}

/// Cheap, cloneable handle to an opened connection.
#[derive(Clone)]
pub struct StreamHandle {
    shared: Arc<HandleShared>,
}

impl StreamHandle {
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Close the connection. Idempotent, and safe to call from inside the
    /// subscriber: delivery stops before the next frame.
    pub fn close(&self) {
        if self.shared.transition(ConnectionState::Closed) {
            self.shared.shutdown.notify_one();
        }
    }
}

struct HandleShared {
    state: AtomicU8,
    shutdown: Notify,
}

impl HandleShared {
    fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Closed | ConnectionState::Faulted
        )
    }

    /// Move to `to` unless already terminal. `Closed` and `Faulted` are
    /// absorbing states, which is what makes `close()` idempotent.
    fn transition(&self, to: ConnectionState) -> bool {
        loop {
            let current = self.state.load(Ordering::SeqCst);
            if matches!(
                ConnectionState::from(current),
                ConnectionState::Closed | ConnectionState::Faulted
            ) {
                return false;
            }
            if self
                .state
                .compare_exchange(current, to as u8, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_stream<F>(
    config: StreamConfig,
    url: String,
    mut subscriber: F,
    shared: Arc<HandleShared>,
) where
    F: FnMut(StreamEvent) + Send + 'static,
{
    let client = match reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            fault(&shared, &mut subscriber, format!("client build failed: {}", e));
            return;
        }
    };

    let mut attempts: u32 = 0;

    loop {
        if shared.is_terminal() {
            return;
        }

        let outcome = match dial(&client, &url).await {
            Ok(response) => {
                if !shared.transition(ConnectionState::Open) {
                    return;
                }
                attempts = 0;
                tracing::info!(%url, "price stream open");
                read_frames(&shared, response, &mut subscriber).await
            }
            Err(e) => Some(e),
        };

        // `None` means the owner closed the stream: stop without an event.
        let Some(error) = outcome else { return };
        let reason = error.to_string();

        match config.reconnect {
            ReconnectPolicy::Backoff {
                base_delay_ms,
                max_attempts,
            } if attempts < max_attempts => {
                attempts += 1;
                if !shared.transition(ConnectionState::Connecting) {
                    return;
                }
                backoff_sleep(&shared, base_delay_ms, attempts, &reason).await;
            }
            _ => {
                fault(&shared, &mut subscriber, reason);
                return;
            }
        }
    }
}

async fn dial(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, StreamError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(StreamError::ConnectionFailed(format!(
            "server answered {}",
            status
        )));
    }
    Ok(response)
}

/// Read frames until the connection breaks.
///
/// Returns `None` if the owner closed the stream, `Some(error)` on a
/// transport fault.
async fn read_frames<F>(
    shared: &HandleShared,
    response: reqwest::Response,
    subscriber: &mut F,
) -> Option<StreamError>
where
    F: FnMut(StreamEvent),
{
    let mut parser = SseParser::new();
    let mut body = response.bytes_stream();

    loop {
        tokio::select! {
            _ = shared.shutdown.notified() => return None,

            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for payload in parser.feed(&bytes) {
                        if shared.state() != ConnectionState::Open {
                            return None;
                        }
                        match codec::decode(&payload) {
                            Ok(message) => subscriber(StreamEvent::Message(message)),
                            Err(e) => {
                                // One bad frame must not take down a live view.
                                tracing::warn!(error = %e, raw = %payload, "dropping undecodable frame");
                            }
                        }
                    }
                }
                Some(Err(e)) => return Some(StreamError::TransportFault(e.to_string())),
                None => return Some(StreamError::TransportFault("stream ended".into())),
            }
        }
    }
}

fn fault<F>(shared: &HandleShared, subscriber: &mut F, reason: String)
where
    F: FnMut(StreamEvent),
{
    if shared.transition(ConnectionState::Faulted) {
        tracing::warn!(%reason, "price stream faulted");
        subscriber(StreamEvent::Faulted { reason });
    }
}

async fn backoff_sleep(shared: &HandleShared, base_delay_ms: u64, attempt: u32, reason: &str) {
    let exp = (attempt - 1).min(10);
    let base = base_delay_ms.saturating_mul(1u64 << exp);
    let jitter = rand::random::<u64>() % 250;
    let delay = base.saturating_add(jitter).min(60_000);

    tracing::info!(attempt, delay_ms = delay, %reason, "reconnecting price stream");

    tokio::select! {
        _ = shared.shutdown.notified() => {}
        _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamMessage;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SSE_BODY: &str = concat!(
        "data: {\"type\": \"connected\", \"connection_id\": \"c1\", \"timestamp\": \"2024-01-01T00:00:00Z\"}\n\n",
        "data: {\"type\": \"mystery\", \"timestamp\": \"2024-01-01T00:01:00Z\"}\n\n",
        "data: {\"type\": \"price_data\", \"product_id\": 5, \"price\": 105.0, ",
        "\"selector_used\": \"span.a-price-whole\", \"timestamp\": \"2024-01-01T00:05:00Z\", \"status\": \"success\"}\n\n",
    );

    fn collecting_subscriber() -> (
        impl FnMut(StreamEvent) + Send + 'static,
        mpsc::UnboundedReceiver<StreamEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (move |event| drop(tx.send(event)), rx)
    }

    async fn sse_server(body: &str) -> MockServer {
        sse_server_with_delay(body, Duration::ZERO).await
    }

    /// A delayed body keeps the connection in `Connecting` long enough for
    /// tests that must act before any frame arrives.
    async fn sse_server_with_delay(body: &str, delay: Duration) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/track-price"))
            .and(query_param("user_id", "7"))
            .and(query_param("product_id", "5"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(delay)
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer) -> StreamConfig {
        StreamConfig {
            url: format!("{}/track-price", server.uri()),
            ..StreamConfig::default()
        }
    }

    #[test]
    fn test_unopened_connection_is_idle() {
        let connection = StreamConnection::new(StreamConfig::default());
        assert_eq!(connection.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_delivers_decoded_frames_then_faults_on_eof() {
        let server = sse_server(SSE_BODY).await;
        let mut connection = StreamConnection::new(config_for(&server));
        let (subscriber, mut rx) = collecting_subscriber();

        connection.open(&UserId::new(7), &ProductId::new(5), subscriber);

        let first = rx.recv().await.expect("connected frame");
        assert!(matches!(
            first,
            StreamEvent::Message(StreamMessage::Connected { .. })
        ));

        // The unknown-kind frame is dropped, so the next delivery is the
        // price frame.
        let second = rx.recv().await.expect("price frame");
        match second {
            StreamEvent::Message(StreamMessage::PriceData(data)) => {
                assert_eq!(data.product_id, ProductId::new(5));
            }
            other => panic!("expected PriceData, got {:?}", other),
        }

        // Body EOF is a transport fault under ReconnectPolicy::None.
        let third = rx.recv().await.expect("fault event");
        assert!(matches!(third, StreamEvent::Faulted { .. }));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_stops_delivery() {
        let server = sse_server_with_delay(SSE_BODY, Duration::from_millis(500)).await;
        let mut connection = StreamConnection::new(config_for(&server));
        let (subscriber, mut rx) = collecting_subscriber();

        let handle = connection.open(&UserId::new(7), &ProductId::new(5), subscriber);
        handle.close();
        handle.close();
        assert_eq!(handle.state(), ConnectionState::Closed);

        // No events at all after an explicit close; the channel just drains
        // once the background task notices the shutdown.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_refused_faults_without_reconnect() {
        let mut connection = StreamConnection::new(StreamConfig {
            url: "http://127.0.0.1:9/track-price".into(),
            connect_timeout_ms: 1_000,
            ..StreamConfig::default()
        });
        let (subscriber, mut rx) = collecting_subscriber();

        let handle = connection.open(&UserId::new(7), &ProductId::new(5), subscriber);

        let event = rx.recv().await.expect("fault event");
        assert!(matches!(event, StreamEvent::Faulted { .. }));
        assert_eq!(handle.state(), ConnectionState::Faulted);
    }

    #[tokio::test]
    async fn test_bounded_backoff_exhausts_then_faults() {
        let mut connection = StreamConnection::new(StreamConfig {
            url: "http://127.0.0.1:9/track-price".into(),
            connect_timeout_ms: 1_000,
            reconnect: ReconnectPolicy::Backoff {
                base_delay_ms: 1,
                max_attempts: 2,
            },
            ..StreamConfig::default()
        });
        let (subscriber, mut rx) = collecting_subscriber();

        connection.open(&UserId::new(7), &ProductId::new(5), subscriber);

        let event = rx.recv().await.expect("fault event after retries");
        assert!(matches!(event, StreamEvent::Faulted { .. }));
    }

    #[tokio::test]
    async fn test_reopen_closes_previous_connection() {
        let server = sse_server_with_delay(SSE_BODY, Duration::from_millis(500)).await;
        let mut connection = StreamConnection::new(config_for(&server));
        let (first_subscriber, _first_rx) = collecting_subscriber();
        let (second_subscriber, _second_rx) = collecting_subscriber();

        let first = connection.open(&UserId::new(7), &ProductId::new(5), first_subscriber);
        let second = connection.open(&UserId::new(7), &ProductId::new(5), second_subscriber);

        assert_eq!(first.state(), ConnectionState::Closed);
        assert_ne!(second.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_close_from_within_subscriber_is_reentrant() {
        let server = sse_server_with_delay(SSE_BODY, Duration::from_millis(300)).await;
        let mut connection = StreamConnection::new(config_for(&server));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle_slot: Arc<std::sync::Mutex<Option<StreamHandle>>> =
            Arc::new(std::sync::Mutex::new(None));
        let slot = Arc::clone(&handle_slot);

        let handle = connection.open(&UserId::new(7), &ProductId::new(5), move |event| {
            drop(tx.send(event));
            // Close on the very first delivery, from inside the handler.
            if let Ok(guard) = slot.lock() {
                if let Some(h) = guard.as_ref() {
                    h.close();
                }
            }
        });
        if let Ok(mut guard) = handle_slot.lock() {
            *guard = Some(handle.clone());
        }

        let first = rx.recv().await.expect("first frame");
        assert!(matches!(first, StreamEvent::Message(_)));
        // Delivery stopped after the in-handler close: the channel closes
        // without further message or fault events.
        assert!(rx.recv().await.is_none());
        assert_eq!(handle.state(), ConnectionState::Closed);
    }
}
