//! Blocking HTTP fetcher with a politeness delay between requests.
//!
//! tululu.org signals "no such book/page" by redirecting to the front page
//! rather than answering 404, so `fetch` reports whether any redirect
//! occurred en route and classifies it as [CrawlError::NotFound].
//! Transport failures are classified as [CrawlError::Connection] and left to
//! the coordinator, which owns backoff and resumption.

use crate::crawler::error::CrawlError;
use reqwest::Url;
use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; tululu-crawl/0.1; +https://github.com/tululu-crawl)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: u64 = 1;
const MAX_REDIRECTS: usize = 10;

/// Outcome of a successful (2xx, non-redirected) fetch.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// URL the body was ultimately served from.
    pub final_url: String,
}

impl PageResponse {
    /// Body as text. The site's encoding is passed through as-is; invalid
    /// UTF-8 sequences are replaced rather than rejected.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Seam between the coordinator/downloader and the network. The production
/// implementation is [PageFetcher]; tests substitute a scripted fake.
pub trait Fetch {
    fn fetch(&mut self, url: &str) -> Result<PageResponse, CrawlError>;
}

/// Blocking HTTP client that enforces a delay between requests.
#[derive(Debug)]
pub struct PageFetcher {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Option<Instant>,
}

impl PageFetcher {
    /// Build a fetcher with default User-Agent, timeout, and delay.
    pub fn new() -> Result<Self, CrawlError> {
        Self::builder().build()
    }

    /// Builder for custom User-Agent, delay, and timeout.
    pub fn builder() -> PageFetcherBuilder {
        PageFetcherBuilder::default()
    }

    fn wait_delay(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
    }
}

impl Fetch for PageFetcher {
    fn fetch(&mut self, url: &str) -> Result<PageResponse, CrawlError> {
        let requested = Url::parse(url).map_err(|e| CrawlError::InvalidUrl {
            input: url.to_string(),
            reason: e.to_string(),
        })?;

        self.wait_delay();
        let response = self
            .inner
            .get(requested.clone())
            .send()
            .map_err(|e| CrawlError::Connection {
                url: url.to_string(),
                source: e,
            })?;
        self.last_request = Some(Instant::now());

        // Redirect-as-absence: the client follows redirects, so a final URL
        // differing from the requested one means the redirect history is
        // non-empty and the resource does not exist.
        let final_url = response.url().clone();
        if final_url != requested {
            return Err(CrawlError::NotFound {
                url: url.to_string(),
            });
        }

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .map_err(|e| CrawlError::Connection {
                url: url.to_string(),
                source: e,
            })?
            .to_vec();

        Ok(PageResponse {
            status: status.as_u16(),
            body,
            final_url: final_url.to_string(),
        })
    }
}

/// Builder for [PageFetcher].
#[derive(Debug)]
pub struct PageFetcherBuilder {
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
}

impl Default for PageFetcherBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PageFetcherBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set the delay between requests in seconds. Default 1.
    pub fn delay_secs(mut self, secs: u64) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Set the request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<PageFetcher, CrawlError> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .user_agent(user_agent.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| CrawlError::InvalidUrl {
                input: user_agent,
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(PageFetcher {
            inner,
            delay: Duration::from_secs(self.delay_secs),
            last_request: None,
        })
    }
}
