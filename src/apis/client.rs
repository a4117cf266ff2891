/// Base HTTP client with rate limiting
use crate::errors::{BridgeError, TransportError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

/// Rate limiter for API clients
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    last_request: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(max_per_minute: usize) -> Self {
        let min_interval = if max_per_minute > 0 {
            Duration::from_secs_f64(60.0 / max_per_minute as f64)
        } else {
            Duration::ZERO
        };

        Self {
            semaphore: Arc::new(Semaphore::new(1)), // Only 1 concurrent request
            last_request: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    /// Wait until we can make a request (respects rate limits)
    pub async fn acquire(&self) -> Result<RateLimitGuard, BridgeError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| BridgeError::price_feed("rate limiter", e.to_string()))?;

        if !self.min_interval.is_zero() {
            let mut last = self.last_request.lock().await;
            if let Some(last_time) = *last {
                let elapsed = last_time.elapsed();
                if elapsed < self.min_interval {
                    tokio::time::sleep(self.min_interval - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }

        Ok(RateLimitGuard { _permit: permit })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// RAII guard returned by [`RateLimiter::acquire`]
pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
}

/// HTTP client wrapper with timeout and rate limiting
pub struct HttpClient {
    client: Client,
    limiter: RateLimiter,
}

impl HttpClient {
    pub fn new(timeout_secs: u64, max_per_minute: usize) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BridgeError::configuration("http client", e.to_string()))?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(max_per_minute),
        })
    }

    /// GET `url` and decode the JSON body; non-2xx responses become `HttpStatus`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T, BridgeError> {
        let _guard = self.limiter.acquire().await?;

        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BridgeError::price_feed(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            return Err(TransportError::HttpStatus {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BridgeError::price_feed(url, format!("invalid JSON: {}", e)))
    }
}
