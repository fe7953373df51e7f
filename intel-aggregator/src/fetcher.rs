use crate::types::{FetchConfig, FetchedDocument, IntelError, Result};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Shared HTTP client for every source: retry with exponential backoff and
/// a minimum spacing between requests to the same host.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            config,
            next_slot: Mutex::new(HashMap::new()),
        })
    }

    /// Download a feed document. Transport errors are reported inside the
    /// document so one dead feed never aborts the batch.
    pub async fn fetch_document(&self, url: &str) -> Result<FetchedDocument> {
        let started = Instant::now();
        debug!("GET {}", url);

        let outcome = match self.send_with_retry(url, || self.client.get(url)).await {
            Ok(response) => self.read_body(response).await,
            Err(e) => Err((e.to_string(), None)),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(match outcome {
            Ok((status, body)) => {
                info!("Fetched {} ({} bytes in {} ms)", url, body.len(), elapsed_ms);
                FetchedDocument {
                    url: url.to_string(),
                    status: Some(status),
                    elapsed_ms,
                    body: Some(body),
                    error: None,
                }
            }
            Err((error, status)) => {
                warn!("Giving up on {}: {}", url, error);
                FetchedDocument {
                    url: url.to_string(),
                    status,
                    elapsed_ms,
                    body: None,
                    error: Some(error),
                }
            }
        })
    }

    async fn read_body(&self, response: Response) -> std::result::Result<(u16, String), (String, Option<u16>)> {
        let status = response.status().as_u16();
        let too_large = |bytes: u64| format!("document too large: {} bytes (limit {})", bytes, self.config.max_body_bytes);

        if let Some(declared) = response.content_length() {
            if declared > self.config.max_body_bytes {
                return Err((too_large(declared), Some(status)));
            }
        }

        let body = response.text().await.map_err(|e| (e.to_string(), Some(status)))?;
        if body.len() as u64 > self.config.max_body_bytes {
            return Err((too_large(body.len() as u64), Some(status)));
        }
        Ok((status, body))
    }

    /// GET a JSON document with extra headers and query parameters.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .send_with_retry(url, || {
                headers
                    .iter()
                    .fold(self.client.get(url).query(query), |request, (name, value)| {
                        request.header(*name, *value)
                    })
            })
            .await?;

        Ok(response.json::<T>().await?)
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let base = Duration::from_secs(self.config.retry_delay_seconds);
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(base)
            .with_multiplier(2.0)
            .with_max_interval(base * 16)
            .with_max_elapsed_time(Some(base * 60))
            .build();

        let mut retries_left = self.config.max_retries;
        loop {
            self.wait_for_host(url).await?;

            let error = match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => IntelError::Status(response.status().as_u16()),
                Err(e) => IntelError::Http(e),
            };

            let delay = match backoff.next_backoff() {
                Some(delay) if retries_left > 0 => delay,
                _ => return Err(error),
            };
            retries_left -= 1;
            warn!("Request to {} failed ({}), retrying in {:?}", url, error, delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Sleep until this host's next request slot, then book the one after it.
    async fn wait_for_host(&self, url: &str) -> Result<()> {
        let host = Url::parse(url)?.host_str().unwrap_or_default().to_string();
        let spacing = Duration::from_millis(self.config.host_interval_ms);

        let wait = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots.get(&host).copied().filter(|slot| *slot > now).unwrap_or(now);
            slots.insert(host.clone(), slot + spacing);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            debug!("Throttling {} for {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
        Ok(())
    }
}
