//! Product-detail controller — composes session, history, stream, and chart.
//!
//! One controller drives one product view. Mounting resolves the user
//! identity, seeds the series from history, and only then opens the live
//! stream, so seeding always precedes the first live append. Changing the
//! observed product tears the previous view and its connection down
//! together: no frame from the old product can reach the new series.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_lock::Mutex;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::chart::{project, ChartRenderer, ChartSeries};
use crate::client::TrackerClient;
use crate::domain::price_history::{PriceObservation, PriceSeries};
use crate::error::{SdkError, SessionError};
use crate::session::SessionProvider;
use crate::shared::ProductId;
use crate::stream::{
    ScrapeOutcome, StreamConnection, StreamEvent, StreamHandle, StreamMessage,
};

/// A failed scrape interval, surfaced without a price point.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalError {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// State shared between the controller and the stream subscriber for one
/// mounted product.
struct ViewShared {
    product_id: ProductId,
    series: Mutex<PriceSeries>,
    last_error: Mutex<Option<IntervalError>>,
    last_seen: Mutex<Option<DateTime<Utc>>>,
    live: AtomicBool,
}

struct ProductView {
    shared: Arc<ViewShared>,
    handle: StreamHandle,
}

/// Controller for one mounted product-detail view.
pub struct ProductDetailController {
    client: TrackerClient,
    session: Arc<dyn SessionProvider>,
    stream: StreamConnection,
    view: Option<ProductView>,
}

impl ProductDetailController {
    pub fn new(client: TrackerClient, session: Arc<dyn SessionProvider>) -> Self {
        let stream = client.stream();
        Self {
            client,
            session,
            stream,
            view: None,
        }
    }

    /// Mount a product view, or switch an already-mounted controller to a
    /// different product.
    ///
    /// Fails with [`SessionError::Unauthenticated`] before any network call
    /// when no identity is available — the caller redirects. A history
    /// failure degrades to an empty series instead of blocking the view.
    pub async fn mount(&mut self, product_id: ProductId) -> Result<(), SdkError> {
        let user_id = self
            .session
            .current_user_id()
            .ok_or(SessionError::Unauthenticated)?;

        // Discard the previous view and its connection together, before
        // anything for the new product starts.
        self.unmount();

        let mut series = PriceSeries::new(product_id);
        match self.client.price_history().load(&user_id, &product_id).await {
            Ok(history) => series.seed(history),
            Err(e) => {
                tracing::warn!(%product_id, error = %e, "history unavailable, starting with empty series");
            }
        }

        let shared = Arc::new(ViewShared {
            product_id,
            series: Mutex::new(series),
            last_error: Mutex::new(None),
            last_seen: Mutex::new(None),
            live: AtomicBool::new(true),
        });

        // Opened only after the history load settled.
        let handle = self
            .stream
            .open(&user_id, &product_id, view_subscriber(Arc::clone(&shared)));

        self.view = Some(ProductView { shared, handle });
        Ok(())
    }

    /// Tear the current view down. Idempotent; also invoked by `mount` on a
    /// product switch.
    pub fn unmount(&mut self) {
        if let Some(view) = self.view.take() {
            view.handle.close();
        }
        self.stream.close();
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.view.as_ref().map(|view| view.shared.product_id)
    }

    /// Copy of the mounted series; empty when nothing is mounted.
    pub async fn snapshot(&self) -> Vec<PriceObservation> {
        match &self.view {
            Some(view) => view.shared.series.lock().await.snapshot(),
            None => Vec::new(),
        }
    }

    pub async fn chart(&self) -> ChartSeries {
        project(&self.snapshot().await)
    }

    pub async fn render_into(&self, renderer: &dyn ChartRenderer) {
        renderer.render(&self.chart().await);
    }

    /// Change notifications for the mounted series.
    pub fn changes(&self) -> Option<watch::Receiver<u64>> {
        self.view
            .as_ref()
            .map(|view| view.shared.series.lock_blocking().changes())
    }

    /// Whether live updates are still flowing (false after a transport
    /// fault; the already-rendered history stays visible).
    pub fn is_live(&self) -> bool {
        self.view
            .as_ref()
            .map(|view| view.shared.live.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub async fn last_error(&self) -> Option<IntervalError> {
        match &self.view {
            Some(view) => view.shared.last_error.lock().await.clone(),
            None => None,
        }
    }

    /// Instant of the most recent liveness signal (`connected`/`keepalive`).
    pub async fn last_seen(&self) -> Option<DateTime<Utc>> {
        match &self.view {
            Some(view) => *view.shared.last_seen.lock().await,
            None => None,
        }
    }
}

impl Drop for ProductDetailController {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Route decoded stream events into the view state.
fn view_subscriber(shared: Arc<ViewShared>) -> impl FnMut(StreamEvent) + Send + 'static {
    move |event| match event {
        StreamEvent::Message(StreamMessage::PriceData(data)) => {
            if data.product_id != shared.product_id {
                tracing::warn!(
                    got = %data.product_id,
                    mounted = %shared.product_id,
                    "dropping frame for another product"
                );
                return;
            }
            match data.outcome {
                ScrapeOutcome::Success { price, .. } => {
                    shared.series.lock_blocking().append(PriceObservation {
                        timestamp: data.timestamp,
                        price,
                    });
                }
                ScrapeOutcome::Failed { error } => {
                    *shared.last_error.lock_blocking() = Some(IntervalError {
                        timestamp: data.timestamp,
                        message: error,
                    });
                }
            }
        }
        StreamEvent::Message(StreamMessage::Connected { timestamp, .. })
        | StreamEvent::Message(StreamMessage::Keepalive { timestamp, .. }) => {
            *shared.last_seen.lock_blocking() = Some(timestamp);
        }
        StreamEvent::Faulted { reason } => {
            shared.live.store(false, Ordering::SeqCst);
            tracing::warn!(product_id = %shared.product_id, %reason, "live updates stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;
    use crate::shared::UserId;
    use crate::stream::PriceData;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()
    }

    fn view_shared(product_id: i64) -> Arc<ViewShared> {
        Arc::new(ViewShared {
            product_id: ProductId::new(product_id),
            series: Mutex::new(PriceSeries::new(ProductId::new(product_id))),
            last_error: Mutex::new(None),
            last_seen: Mutex::new(None),
            live: AtomicBool::new(true),
        })
    }

    fn price_frame(product_id: i64, minute: u32, price: i64) -> StreamEvent {
        StreamEvent::Message(StreamMessage::PriceData(PriceData {
            product_id: ProductId::new(product_id),
            timestamp: ts(minute),
            outcome: ScrapeOutcome::Success {
                price: Decimal::new(price, 0),
                selector_used: "span.a-price-whole".into(),
            },
        }))
    }

    #[test]
    fn test_successful_price_appends() {
        let shared = view_shared(5);
        let mut subscriber = view_subscriber(Arc::clone(&shared));
        subscriber(price_frame(5, 5, 105));
        assert_eq!(shared.series.lock_blocking().len(), 1);
    }

    #[test]
    fn test_failed_scrape_marks_error_without_appending() {
        let shared = view_shared(5);
        let mut subscriber = view_subscriber(Arc::clone(&shared));
        subscriber(StreamEvent::Message(StreamMessage::PriceData(PriceData {
            product_id: ProductId::new(5),
            timestamp: ts(10),
            outcome: ScrapeOutcome::Failed {
                error: "selector not found".into(),
            },
        })));

        assert!(shared.series.lock_blocking().is_empty());
        let marker = shared.last_error.lock_blocking().clone().expect("marker");
        assert_eq!(marker.message, "selector not found");
        assert_eq!(marker.timestamp, ts(10));
    }

    #[test]
    fn test_liveness_signals_do_not_touch_the_series() {
        let shared = view_shared(5);
        let mut subscriber = view_subscriber(Arc::clone(&shared));
        subscriber(StreamEvent::Message(StreamMessage::Connected {
            connection_id: "c1".into(),
            timestamp: ts(0),
        }));
        subscriber(StreamEvent::Message(StreamMessage::Keepalive {
            timestamp: ts(1),
            next_update_in: "30 minutes from last price update".into(),
        }));

        assert!(shared.series.lock_blocking().is_empty());
        assert_eq!(*shared.last_seen.lock_blocking(), Some(ts(1)));
    }

    #[test]
    fn test_fault_stops_liveness_but_keeps_data() {
        let shared = view_shared(5);
        let mut subscriber = view_subscriber(Arc::clone(&shared));
        subscriber(price_frame(5, 5, 105));
        subscriber(StreamEvent::Faulted {
            reason: "stream ended".into(),
        });

        assert!(!shared.live.load(Ordering::SeqCst));
        assert_eq!(shared.series.lock_blocking().len(), 1);
    }

    #[test]
    fn test_frames_for_other_products_are_dropped() {
        let shared = view_shared(5);
        let mut subscriber = view_subscriber(Arc::clone(&shared));
        subscriber(price_frame(6, 5, 105));
        assert!(shared.series.lock_blocking().is_empty());
    }

    #[test]
    fn test_end_to_end_frame_sequence() {
        // History seeds one point, then: connected (no change), a successful
        // price, and a failed interval that must not append.
        let shared = view_shared(5);
        shared.series.lock_blocking().seed(vec![PriceObservation {
            timestamp: ts(0),
            price: Decimal::new(100, 0),
        }]);

        let mut subscriber = view_subscriber(Arc::clone(&shared));
        subscriber(StreamEvent::Message(StreamMessage::Connected {
            connection_id: "c1".into(),
            timestamp: ts(0),
        }));
        assert_eq!(shared.series.lock_blocking().len(), 1);

        subscriber(price_frame(5, 5, 105));
        let snapshot = shared.series.lock_blocking().snapshot();
        assert_eq!(
            snapshot.iter().map(|o| o.price).collect::<Vec<_>>(),
            vec![Decimal::new(100, 0), Decimal::new(105, 0)]
        );

        subscriber(StreamEvent::Message(StreamMessage::PriceData(PriceData {
            product_id: ProductId::new(5),
            timestamp: ts(35),
            outcome: ScrapeOutcome::Failed {
                error: "selector not found".into(),
            },
        })));
        assert_eq!(shared.series.lock_blocking().len(), 2);
        assert!(shared.last_error.lock_blocking().is_some());
    }

    #[tokio::test]
    async fn test_mount_without_identity_aborts_before_any_request() {
        let client = TrackerClient::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let mut controller =
            ProductDetailController::new(client, Arc::new(MemorySession::new()));

        let result = controller.mount(ProductId::new(5)).await;
        assert!(matches!(
            result,
            Err(SdkError::Session(SessionError::Unauthenticated))
        ));
        assert!(controller.product_id().is_none());
    }

    // ── Full mount/switch flow against a mock backend ────────────────────

    fn sse_frame(product_id: i64, minute: u32, price: f64) -> String {
        format!(
            "data: {{\"type\": \"price_data\", \"product_id\": {}, \"price\": {}, \
             \"selector_used\": \"s\", \"timestamp\": \"2024-01-01T00:{:02}:00Z\", \
             \"status\": \"success\"}}\n\n",
            product_id, price, minute
        )
    }

    async fn mock_backend() -> MockServer {
        let server = MockServer::start().await;

        // History is empty for every product.
        Mock::given(method("GET"))
            .and(path("/prices"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "message": "No prices found" })),
            )
            .mount(&server)
            .await;

        for product_id in [1i64, 2] {
            Mock::given(method("GET"))
                .and(path("/track-price"))
                .and(query_param("product_id", product_id.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_raw(
                    sse_frame(product_id, 5, 100.0 + product_id as f64),
                    "text/event-stream",
                ))
                .mount(&server)
                .await;
        }

        server
    }

    async fn wait_for_len(series: &Arc<ViewShared>, want: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if series.series.lock().await.len() == want {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("series never reached the expected length");
    }

    #[tokio::test]
    async fn test_switching_products_isolates_their_series() {
        let server = mock_backend().await;
        let client = TrackerClient::builder()
            .base_url(&server.uri())
            .build()
            .unwrap();
        let session = Arc::new(MemorySession::with_user(UserId::new(7)));
        let mut controller = ProductDetailController::new(client, session);

        controller.mount(ProductId::new(1)).await.unwrap();
        let first_view = Arc::clone(&controller.view.as_ref().expect("mounted").shared);
        wait_for_len(&first_view, 1).await;

        controller.mount(ProductId::new(2)).await.unwrap();
        let second_view = Arc::clone(&controller.view.as_ref().expect("mounted").shared);
        wait_for_len(&second_view, 1).await;

        // The old series kept exactly its one observation; nothing tagged
        // for product 1 leaked into product 2's series or vice versa.
        assert_eq!(first_view.series.lock().await.len(), 1);
        let second_snapshot = second_view.series.lock().await.snapshot();
        assert_eq!(second_snapshot.len(), 1);
        assert_eq!(second_snapshot[0].price, Decimal::new(102, 0));
    }
}
