//! Shared error type for the crawl engine.
//!
//! The taxonomy drives retry behavior: `Connection` is the only transient
//! variant (the coordinator retries it forever with a fixed backoff);
//! `HttpStatus`, `NotFound`, and `MalformedTitle` skip the affected book or
//! page; `BoundsExceeded` is fatal before any crawling starts.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// Transport-level failure (DNS, timeout, reset). Retried by the
    /// coordinator; never by the fetcher itself.
    #[error("Connection error: could not reach {url}: {source}")]
    Connection { url: String, source: reqwest::Error },

    /// Non-2xx response. Not retried; the affected book or page is skipped.
    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    /// The site signals "no such resource" by redirecting instead of
    /// returning 404; any redirect en route means the resource is absent.
    #[error("Not found (redirected away): {url}")]
    NotFound { url: String },

    /// Book page heading is missing the `::` title/author separator.
    #[error("Malformed heading at {url}: no '::' separator in {heading:?}")]
    MalformedTitle { url: String, heading: String },

    /// Page structure did not match the expected selectors (e.g. no heading
    /// or no cover container). The affected book is skipped.
    #[error("Could not parse page at {url}: {message}")]
    ParsePage { url: String, message: String },

    /// Requested start page lies beyond the catalog's last page. Fatal.
    #[error("Start page {requested} is beyond the catalog's last page {last_page}")]
    BoundsExceeded { requested: u32, last_page: u32 },

    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CrawlError {
    /// True for failures the coordinator answers with backoff-and-retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, CrawlError::Connection { .. })
    }
}
