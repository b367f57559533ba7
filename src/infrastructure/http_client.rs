//! HTTP client for the job service with rate limiting and error handling
//!
//! Every request waits on a direct `governor` limiter before it goes out, so
//! manual polls layered on top of the cadence never hammer the service.

use std::num::NonZeroU32;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{
    Client, Response,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::infrastructure::config::ServiceConfig;
use crate::infrastructure::service_error::{JobServiceError, JobServiceResult};

/// JSON HTTP client with an optional request rate limit
pub struct HttpClient {
    client: Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpClient {
    /// Create a new HTTP client from the service configuration
    pub fn new(config: &ServiceConfig) -> JobServiceResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| JobServiceError::ClientBuild(format!("invalid user agent: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| JobServiceError::ClientBuild(e.to_string()))?;

        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    fn check_status(url: &str, response: Response) -> JobServiceResult<Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(JobServiceError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> JobServiceResult<T> {
        let body = response
            .bytes()
            .await
            .map_err(|e| JobServiceError::transport(url, &e))?;
        serde_json::from_slice(&body).map_err(|e| JobServiceError::malformed(url, e))
    }

    /// `GET` a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> JobServiceResult<T> {
        self.throttle().await;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| JobServiceError::transport(url, &e))?;
        let response = Self::check_status(url, response)?;
        Self::decode(url, response).await
    }

    /// `POST` a JSON body and decode the JSON answer
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> JobServiceResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.throttle().await;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| JobServiceError::transport(url, &e))?;
        let response = Self::check_status(url, response)?;
        Self::decode(url, response).await
    }

    /// `GET` raw bytes, used for result downloads
    pub async fn get_bytes(&self, url: &str) -> JobServiceResult<Vec<u8>> {
        self.throttle().await;
        debug!("GET (download) {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| JobServiceError::transport(url, &e))?;
        let response = Self::check_status(url, response)?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| JobServiceError::transport(url, &e))?;
        Ok(bytes.to_vec())
    }

    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        self.rate_limiter.is_some()
    }
}
