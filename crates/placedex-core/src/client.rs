// crates/placedex-core/src/client.rs

//! # Catalog Client
//!
//! Every outbound request goes through [`RateLimitedClient`]: it waits for a
//! token from the shared bucket, stamps the credential header, and sorts the
//! upstream's throttle replies into "try again" (per-second burst) and
//! "give up" (daily quota). The wire itself sits behind [`Transport`] so the
//! harvest pipeline can be driven by a scripted fake in tests.

use crate::category::Category;
use crate::config::ClientConfig;
use crate::error::{PlaceError, Result};
use crate::ratelimit::TokenBucket;
use crate::raw::StatusBody;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

/// Marker in the throttle message that identifies the temporary burst limit.
const BURST_MARKER: &str = "per second";

/// A GET against one catalog endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl CatalogRequest {
    /// The single-row request whose metadata carries the category size.
    pub fn count(config: &ClientConfig, category: Category) -> Self {
        CatalogRequest {
            endpoint: config.endpoint.clone(),
            params: vec![
                ("limit".into(), "1".into()),
                ("locationcategoryid".into(), category.upstream_id().into()),
                ("datacategoryid".into(), config.data_category.clone()),
            ],
        }
    }

    pub fn page(config: &ClientConfig, category: Category, offset: u64, limit: u64) -> Self {
        CatalogRequest {
            endpoint: config.endpoint.clone(),
            params: vec![
                ("limit".into(), limit.to_string()),
                ("offset".into(), offset.to_string()),
                ("locationcategoryid".into(), category.upstream_id().into()),
                ("datacategoryid".into(), config.data_category.clone()),
            ],
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The static authentication header sent with every request.
#[derive(Clone)]
pub struct Credential {
    pub header: String,
    pub token: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("header", &self.header)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Status and body of one HTTP exchange, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// One raw request/response exchange with the catalog.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &CatalogRequest, credential: &Credential) -> Result<RawResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: &CatalogRequest, credential: &Credential) -> Result<RawResponse> {
        (**self).send(request, credential).await
    }
}

/// reqwest-backed transport.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(HttpTransport {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &CatalogRequest, credential: &Credential) -> Result<RawResponse> {
        let url = format!("{}/{}", self.base_url, request.endpoint);
        let response = self
            .http
            .get(&url)
            .query(&request.params)
            .header(credential.header.as_str(), credential.token.as_str())
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

enum Outcome {
    Body(Value),
    Burst(String),
    Quota(String),
}

/// Throttled, retry-aware access to the catalog.
pub struct RateLimitedClient<T> {
    transport: T,
    bucket: TokenBucket,
    credential: Credential,
    config: ClientConfig,
    tripped: AtomicBool,
    burst_retries: AtomicU64,
}

impl<T: Transport> RateLimitedClient<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        RateLimitedClient {
            transport,
            bucket: TokenBucket::per_second(config.requests_per_second),
            credential: Credential {
                header: config.token_header.clone(),
                token: config.token.clone(),
            },
            config: config.clone(),
            tripped: AtomicBool::new(false),
            burst_retries: AtomicU64::new(0),
        }
    }

    /// Fetch and parse one response body.
    ///
    /// Per-second throttle replies are retried (forever, unless the retry
    /// policy sets a ceiling). The daily-quota reply and transport failures
    /// are returned at once.
    pub async fn fetch(&self, request: &CatalogRequest) -> Result<Value> {
        if self.config.trip_on_quota && self.tripped.load(Ordering::Acquire) {
            return Err(PlaceError::QuotaExhausted(
                "circuit open after an earlier quota signal".into(),
            ));
        }

        let mut attempt = 0u32;
        loop {
            self.bucket.acquire().await;
            let response = self.transport.send(request, &self.credential).await?;

            match classify(response)? {
                Outcome::Body(value) => return Ok(value),
                Outcome::Burst(message) => {
                    attempt += 1;
                    self.burst_retries.fetch_add(1, Ordering::Relaxed);
                    if let Some(max) = self.config.retry.max_retries {
                        if attempt > max {
                            warn!(endpoint = %request.endpoint, attempts = attempt, "giving up on throttled request");
                            return Err(PlaceError::RetriesExhausted(max));
                        }
                    }
                    debug!(endpoint = %request.endpoint, attempt, %message, "temporary limit reached, retrying");
                    let delay = self.config.retry.delay_for(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Outcome::Quota(message) => {
                    if self.config.trip_on_quota {
                        self.tripped.store(true, Ordering::Release);
                    }
                    warn!(endpoint = %request.endpoint, %message, "daily quota exhausted");
                    return Err(PlaceError::QuotaExhausted(message));
                }
            }
        }
    }

    /// [`fetch`](Self::fetch) and deserialize into `D`.
    pub async fn fetch_json<D: DeserializeOwned>(&self, request: &CatalogRequest) -> Result<D> {
        let value = self.fetch(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Close the quota circuit again. Called at the start of every cycle.
    pub fn reset_circuit(&self) {
        self.tripped.store(false, Ordering::Release);
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Total per-second throttle retries since construction.
    pub fn burst_retries(&self) -> u64 {
        self.burst_retries.load(Ordering::Relaxed)
    }

    /// Endpoint, filters and limits this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

fn classify(response: RawResponse) -> Result<Outcome> {
    let parsed = serde_json::from_str::<Value>(&response.body);

    let throttled = match &parsed {
        Ok(value) if value.get("status").is_some() => serde_json::from_value::<StatusBody>(value.clone())
            .ok()
            .filter(StatusBody::is_rate_limited)
            .map(|s| s.message),
        _ => None,
    };
    let throttled = match throttled {
        Some(message) => Some(message),
        None if response.status == 429 => Some(response.body.clone()),
        None => None,
    };
    if let Some(message) = throttled {
        return Ok(if message.contains(BURST_MARKER) {
            Outcome::Burst(message)
        } else {
            Outcome::Quota(message)
        });
    }

    if !(200..300).contains(&response.status) {
        let snippet: String = response.body.chars().take(200).collect();
        return Err(PlaceError::Transport(format!(
            "catalog answered HTTP {}: {}",
            response.status, snippet
        )));
    }

    Ok(Outcome::Body(parsed?))
}
