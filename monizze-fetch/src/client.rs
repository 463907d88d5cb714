//! reqwest-backed [`PageSource`] for the history endpoint

use log::{debug, warn};
use monizze_core::{BearerToken, Error, Result};
use monizze_ingest::RawPage;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use std::time::Duration;

use crate::pager::PageSource;
use crate::retry::{Disposition, RetryPolicy, classify};

pub const DEFAULT_BASE_URL: &str = "https://my.monizze.be/en";
pub const DEFAULT_HISTORY_PATH: &str = "voucher/history";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    pub history_path: String,
    /// Sent as `per_page`; 0 leaves the page size to the server
    pub page_size: u32,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            history_path: DEFAULT_HISTORY_PATH.to_string(),
            page_size: 0,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.history_path.trim_start_matches('/')
        )
    }
}

pub struct HttpPageSource {
    client: reqwest::Client,
    endpoint: String,
    page_size: u32,
    retry: RetryPolicy,
    requests: usize,
}

impl HttpPageSource {
    pub fn new(token: &BearerToken, config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| Error::Authentication { status: 0 })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(concat!("monizze-export/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Protocol(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            page_size: config.page_size,
            retry: config.retry,
            requests: 0,
        })
    }

    /// HTTP requests sent so far, retries included
    pub fn requests(&self) -> usize {
        self.requests
    }

    async fn attempt(&mut self, cursor: Option<&str>) -> Result<std::result::Result<RawPage, Transient>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(c) = cursor {
            query.push(("cursor", c.to_string()));
        }
        if self.page_size > 0 {
            query.push(("per_page", self.page_size.to_string()));
        }

        self.requests += 1;
        let sent = self.client.get(&self.endpoint).query(&query).send().await;
        let resp = match sent {
            Ok(resp) => resp,
            Err(e) if e.is_builder() => {
                return Err(Error::Protocol(format!("invalid request to {}: {e}", self.endpoint)));
            }
            Err(e) => return Ok(Err(Transient::new(format!("request failed: {e}")))),
        };

        let status = resp.status();
        match classify(status) {
            Disposition::Success => match resp.bytes().await {
                Ok(body) => RawPage::from_slice(&body).map(Ok),
                Err(e) => Ok(Err(Transient::new(format!("reading response body: {e}")))),
            },
            Disposition::Unauthorized => Err(Error::Authentication {
                status: status.as_u16(),
            }),
            Disposition::Retry => Ok(Err(Transient {
                message: format!("server answered {status}"),
                retry_after: retry_after(resp.headers()),
            })),
            Disposition::Reject => {
                let body = resp.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(200).collect();
                Err(Error::Protocol(format!(
                    "{status} from {}: {}",
                    self.endpoint,
                    snippet.trim()
                )))
            }
        }
    }
}

impl PageSource for HttpPageSource {
    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<RawPage> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match self.attempt(cursor).await? {
                Ok(page) => return Ok(page),
                Err(transient) => transient,
            };

            if attempt >= self.retry.max_attempts {
                return Err(Error::TransientFetch {
                    attempts: attempt,
                    message: failure.message,
                });
            }

            let delay = self.retry.delay_after(attempt, failure.retry_after);
            warn!(
                "attempt {attempt}/{} failed ({}); retrying in {delay:?}",
                self.retry.max_attempts, failure.message
            );
            tokio::time::sleep(delay).await;
            debug!("retrying cursor {cursor:?}");
        }
    }
}

struct Transient {
    message: String,
    retry_after: Option<Duration>,
}

impl Transient {
    fn new(message: String) -> Self {
        Self {
            message,
            retry_after: None,
        }
    }
}

/// Only the delta-seconds form; HTTP dates fall back to the policy.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
