//! Fetch collaborator interface and the reference HTTP implementation.

use crate::error::{FetchError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{redirect, Client};
use seedline_core::{HttpConfig, Target};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

/// A successfully fetched target.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Target that was requested
    pub target: Target,
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: String,
    /// When the response was received
    pub fetched_at: DateTime<Utc>,
}

impl FetchedResponse {
    /// First value of a header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the body is HTML according to `Content-Type`.
    ///
    /// A response without a content type is treated as HTML.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.header("content-type").map_or(true, |ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml")
        })
    }
}

/// Fetches targets on behalf of a seed producer.
///
/// This is the only place a seeding run waits on I/O.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `target`, serving it from cache when `use_cache` is set and a
    /// cached copy exists.
    async fn fetch(
        &self,
        target: &Target,
        use_cache: bool,
    ) -> std::result::Result<FetchedResponse, FetchError>;
}

/// [`Fetcher`] over `reqwest` with an in-memory response cache.
///
/// Tracks consecutive failures across calls; once `max_consecutive_errors`
/// is reached each further failure is reported as
/// [`FetchError::ControlledStop`]. Any success resets the count.
pub struct HttpFetcher {
    client: Client,
    cache: RwLock<HashMap<Url, FetchedResponse>>,
    consecutive_errors: AtomicU32,
    max_consecutive_errors: u32,
}

impl HttpFetcher {
    /// Create a fetcher with default settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a fetcher from configuration.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::limited(config.max_redirects));
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            cache: RwLock::new(HashMap::new()),
            consecutive_errors: AtomicU32::new(0),
            max_consecutive_errors: config.max_consecutive_errors,
        })
    }

    /// Number of cached responses.
    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Current run of consecutive failures.
    #[must_use]
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors.load(Ordering::SeqCst)
    }

    async fn fetch_uncached(
        &self,
        target: &Target,
    ) -> std::result::Result<FetchedResponse, FetchError> {
        let response = self
            .client
            .get(target.url().clone())
            .send()
            .await
            .map_err(classify)?;

        let url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(classify)?;

        Ok(FetchedResponse {
            target: target.clone(),
            url,
            status,
            headers,
            body,
            fetched_at: Utc::now(),
        })
    }

    fn record_failure(&self, err: FetchError) -> FetchError {
        let failures = self.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1;

        if self.max_consecutive_errors > 0
            && failures >= self.max_consecutive_errors
            && !matches!(err, FetchError::ControlledStop { .. })
        {
            return FetchError::controlled_stop(format!(
                "{failures} consecutive request failures, last error: {err}"
            ));
        }

        err
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        target: &Target,
        use_cache: bool,
    ) -> std::result::Result<FetchedResponse, FetchError> {
        if use_cache {
            if let Some(hit) = self.cache.read().await.get(target.url()) {
                debug!(target = %target, "serving target from cache");
                return Ok(hit.clone());
            }
        }

        match self.fetch_uncached(target).await {
            Ok(response) => {
                self.consecutive_errors.store(0, Ordering::SeqCst);
                if use_cache {
                    self.cache
                        .write()
                        .await
                        .insert(target.url().clone(), response.clone());
                }
                Ok(response)
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }
}

/// Map a transport error onto the fetch failure taxonomy.
fn classify(err: reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::Unexpected(anyhow::Error::new(err))
    } else if err.is_redirect() {
        FetchError::controlled_stop(format!("navigation error: {err}"))
    } else if err.is_timeout()
        || err.is_connect()
        || err.is_request()
        || err.is_body()
        || err.is_decode()
    {
        FetchError::Request(err.to_string())
    } else {
        FetchError::Unexpected(anyhow::Error::new(err))
    }
}
