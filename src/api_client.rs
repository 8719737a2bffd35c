// Booking API client: the two network round trips the widget needs
// Responses are returned verbatim; interpreting them is the session's job

use crate::error::{ApiError, ClientError};
use crate::model::{AvailabilityQuery, BookingPayload};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_AVAILABILITY_PATH: &str = "/api/appointments/availability";
pub const DEFAULT_BOOKING_PATH: &str = "/api/appointments/book";

// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // Origin of the hosting page, every request stays on it
    pub base_url: String,
    pub availability_path: String,
    pub booking_path: String,
    // None leaves timeouts to the transport
    pub timeout_ms: Option<u64>,
    // Cookie string of the visitor's session, sent with every request
    pub session_cookie: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8069".to_string(),
            availability_path: DEFAULT_AVAILABILITY_PATH.to_string(),
            booking_path: DEFAULT_BOOKING_PATH.to_string(),
            timeout_ms: None,
            session_cookie: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
}

/// The two operations the session needs from the backend.
///
/// Neither operation retries. `submit_booking` may create a booking, so
/// callers must invoke it at most once per confirmed user submission.
#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    async fn fetch_availability(&self, query: &AvailabilityQuery) -> Result<Value, ApiError>;

    async fn submit_booking(&self, payload: &BookingPayload) -> Result<Value, ApiError>;
}

// reqwest-backed client
pub struct HttpApiClient {
    client: reqwest::Client,
    availability_url: Url,
    booking_url: Url,
    stats: Mutex<ClientStats>,
}

impl HttpApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ClientError::ConfigError(format!("invalid base url: {}", e)))?;
        let availability_url = base
            .join(&config.availability_path)
            .map_err(|e| ClientError::ConfigError(format!("invalid availability path: {}", e)))?;
        let booking_url = base
            .join(&config.booking_path)
            .map_err(|e| ClientError::ConfigError(format!("invalid booking path: {}", e)))?;

        let jar = Jar::default();
        if let Some(cookie) = &config.session_cookie {
            jar.add_cookie_str(cookie, &base);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::new(jar));
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            client,
            availability_url,
            booking_url,
            stats: Mutex::new(ClientStats::default()),
        })
    }

    pub fn stats(&self) -> ClientStats {
        self.stats.lock().clone()
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        self.stats.lock().requests_sent += 1;
        let result = Self::read_json(request).await;

        let mut stats = self.stats.lock();
        match &result {
            Ok(_) => stats.requests_succeeded += 1,
            Err(e) => {
                stats.requests_failed += 1;
                warn!(error = %e, "request failed");
            }
        }
        result
    }

    // HTTP status is not an error signal here, the body decides
    async fn read_json(request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;
        debug!(status = %response.status(), url = %response.url(), "response received");

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::NetworkError(format!("invalid JSON body: {}", e)))
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn fetch_availability(&self, query: &AvailabilityQuery) -> Result<Value, ApiError> {
        debug!(service_id = %query.service_id, "fetching availability");
        let request = self
            .client
            .get(self.availability_url.clone())
            .query(&query.query_pairs());
        self.send(request).await
    }

    async fn submit_booking(&self, payload: &BookingPayload) -> Result<Value, ApiError> {
        debug!(service_id = %payload.service_id, start = %payload.start, "submitting booking");
        let request = self.client.post(self.booking_url.clone()).json(payload);
        self.send(request).await
    }
}
