//! Low-level HTTP client — `TrackerHttp`.
//!
//! One method per API endpoint. Returns wire types (conversion to domain
//! types happens at the sub-client boundary). The tracker's API carries the
//! caller's identity as explicit `user_id` query parameters — there is no
//! token state to hold here.

use crate::domain::product::wire::{ProductRecord, StatusMessage, TrackProductRequest, TrackProductResponse};
use crate::error::HttpError;
use crate::http::retry::{RetryConfig, RetryPolicy};
use crate::session::wire::{AuthResponse, CredentialsRequest};
use crate::shared::{ProductId, UserId};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Low-level HTTP client for the Pricewatch REST API.
#[derive(Clone)]
pub struct TrackerHttp {
    base_url: String,
    client: Client,
}

impl TrackerHttp {
    pub fn new(base_url: &str) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Price history ────────────────────────────────────────────────────

    /// Raw price-history fetch. Returned as a `Value` because the backend
    /// answers a `{"message": ...}` object instead of a list when it has no
    /// rows — the history loader decides how to treat the shape.
    pub async fn get_price_history(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<serde_json::Value, HttpError> {
        let url = format!(
            "{}/prices?user_id={}&product_id={}",
            self.base_url, user_id, product_id
        );
        self.get(&url, RetryPolicy::None).await
    }

    // ── Tracked products ─────────────────────────────────────────────────

    pub async fn get_products(&self, user_id: &UserId) -> Result<Vec<ProductRecord>, HttpError> {
        let url = format!("{}/products?user_id={}", self.base_url, user_id);
        self.get(&url, RetryPolicy::Idempotent).await
    }

    /// Raw single-product fetch. `Value` for the same reason as the history
    /// endpoint: a missing product comes back as a message object.
    pub async fn get_product(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<serde_json::Value, HttpError> {
        let url = format!(
            "{}/products/{}?user_id={}",
            self.base_url, product_id, user_id
        );
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn track_product(
        &self,
        request: &TrackProductRequest,
    ) -> Result<TrackProductResponse, HttpError> {
        let url = format!("{}/track-product", self.base_url);
        self.post(&url, request, RetryPolicy::None).await
    }

    pub async fn delete_product(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<StatusMessage, HttpError> {
        let url = format!(
            "{}/products/{}?user_id={}",
            self.base_url, product_id, user_id
        );
        self.request_with_retry(reqwest::Method::DELETE, &url, None::<&()>, RetryPolicy::None)
            .await
    }

    // ── Accounts ─────────────────────────────────────────────────────────

    pub async fn signup(&self, body: &CredentialsRequest) -> Result<AuthResponse, HttpError> {
        let url = format!("{}/signup", self.base_url);
        self.post(&url, body, RetryPolicy::None).await
    }

    pub async fn signin(&self, body: &CredentialsRequest) -> Result<AuthResponse, HttpError> {
        let url = format!("{}/signin", self.base_url);
        self.post(&url, body, RetryPolicy::None).await
    }

    // ── Internal HTTP methods ────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        self.request_with_retry(reqwest::Method::GET, url, None::<&()>, retry)
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        self.request_with_retry(reqwest::Method::POST, url, Some(body), retry)
            .await
    }

    async fn request_with_retry<T: DeserializeOwned, B: Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&B>,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        let config = match retry {
            RetryPolicy::None => return self.do_request(&method, url, body).await,
            RetryPolicy::Idempotent => RetryConfig::idempotent(),
            RetryPolicy::Custom(c) => c,
        };

        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            match self.do_request::<T, B>(&method, url, body).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    let should_retry = match &e {
                        HttpError::ServerError { status, .. } => {
                            config.retryable_statuses.contains(status)
                        }
                        HttpError::RateLimited { retry_after_ms } => {
                            if let Some(ms) = retry_after_ms {
                                futures_timer::Delay::new(Duration::from_millis(*ms)).await;
                            }
                            true
                        }
                        HttpError::Timeout => true,
                        HttpError::Reqwest(re) => {
                            re.is_connect() || re.is_timeout() || re.is_request()
                        }
                        _ => false,
                    };

                    if should_retry && attempt < config.max_retries {
                        let delay = config.delay_for_attempt(attempt);
                        tracing::debug!(
                            attempt = attempt + 1,
                            max = config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying request to {}",
                            url
                        );
                        futures_timer::Delay::new(delay).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(HttpError::MaxRetriesExceeded {
            attempts: config.max_retries + 1,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn do_request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &reqwest::Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, HttpError> {
        let mut req = self.client.request(method.clone(), url);
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        let status = resp.status();

        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }

        let status_code = status.as_u16();
        let body_text = resp.text().await.unwrap_or_default();

        match status_code {
            401 => Err(HttpError::Unauthorized),
            404 => Err(HttpError::NotFound(body_text)),
            429 => Err(HttpError::RateLimited {
                retry_after_ms: None,
            }),
            400..=499 => Err(HttpError::BadRequest(body_text)),
            _ => Err(HttpError::ServerError {
                status: status_code,
                body: body_text,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_products_parses_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .and(query_param("user_id", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 1, "name": "Mechanical keyboard", "amazon_url": "https://amazon.example/kb", "issued_by_id": 7 }
            ])))
            .mount(&server)
            .await;

        let http = TrackerHttp::new(&server.uri()).unwrap();
        let products = http.get_products(&UserId::new(7)).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Mechanical keyboard");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signin"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({ "message": "Invalid credentials" })),
            )
            .mount(&server)
            .await;

        let http = TrackerHttp::new(&server.uri()).unwrap();
        let result = http
            .signin(&CredentialsRequest {
                email: "a@b.c".into(),
                password: "nope".into(),
                name: None,
            })
            .await;
        assert!(matches!(result, Err(HttpError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_price_history_uses_no_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prices"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let http = TrackerHttp::new(&server.uri()).unwrap();
        let result = http
            .get_price_history(&UserId::new(1), &ProductId::new(2))
            .await;
        assert!(matches!(
            result,
            Err(HttpError::ServerError { status: 503, .. })
        ));
    }
}
