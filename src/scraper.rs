use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, redirect};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::utils::error::FetchError;

const FALLBACK_MACOS_VERSION: &str = "10_15_7";
const CHROME_TOKEN: &str = "AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MAX_REDIRECTS: usize = 10;

/// Source of raw page content.
///
/// The monitor only depends on this trait, so a headless browser or a canned
/// fixture can stand in for HTTP.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain HTTP GET with browser headers and exponential-backoff retries.
pub struct HttpFetcher {
    client: Client,
    max_attempts: u32,
    base_delay: Duration,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        timeout: Duration,
        user_agent: Option<String>,
    ) -> Result<Self, FetchError> {
        let user_agent = user_agent.unwrap_or_else(detect_user_agent);

        let client = Client::builder()
            .user_agent(user_agent.clone())
            .default_headers(browser_headers())
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            base_delay,
            user_agent,
        })
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        Self::new(
            config.max_attempts,
            config.base_delay(),
            config.timeout(),
            config.user_agent.clone(),
        )
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    async fn attempt(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| describe_request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        response
            .text()
            .await
            .map_err(|e| format!("failed to read body: {}", e))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let mut delays = backoff_schedule(self.base_delay);
        let mut last_error = String::new();

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = delays.next().unwrap_or(self.base_delay);
                debug!("Retrying {} in {:?} (attempt {})", url, delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            match self.attempt(url).await {
                Ok(body) => {
                    debug!("Fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                Err(reason) => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt + 1,
                        self.max_attempts,
                        url,
                        reason
                    );
                    last_error = reason;
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            reason: last_error,
        })
    }
}

/// Delays slept before the second, third, ... attempt: `base * 2^attempt`.
pub fn backoff_schedule(base: Duration) -> ExponentialBackoff {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    ExponentialBackoff::from_millis(2).factor(base_ms)
}

fn describe_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else if err.is_redirect() {
        format!("too many redirects: {}", err)
    } else {
        err.to_string()
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

/// A desktop Chrome user agent for the host OS.
pub fn detect_user_agent() -> String {
    if cfg!(target_os = "windows") {
        format!("Mozilla/5.0 (Windows NT 10.0; Win64; x64) {}", CHROME_TOKEN)
    } else if cfg!(target_os = "linux") {
        format!("Mozilla/5.0 (X11; Linux x86_64) {}", CHROME_TOKEN)
    } else {
        let version = macos_version().unwrap_or_else(|| FALLBACK_MACOS_VERSION.to_string());
        format!("Mozilla/5.0 (Macintosh; Intel Mac OS X {}) {}", version, CHROME_TOKEN)
    }
}

/// `sw_vers -productVersion` as a user-agent token (`14.2.1` -> `14_2_1`).
fn macos_version() -> Option<String> {
    let output = std::process::Command::new("sw_vers")
        .arg("-productVersion")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8(output.stdout).ok()?;
    let version = version.trim();
    if version.is_empty() {
        return None;
    }
    Some(version.replace('.', "_"))
}
