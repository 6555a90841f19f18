//! The crawl engine: fetching, parsing, artifact download, and the
//! resumable page/book loop.

mod client;
mod coordinator;
mod download;
mod error;

pub mod parse;

pub use client::{Fetch, PageFetcher, PageFetcherBuilder, PageResponse};
pub use coordinator::{discover_bounds, run_crawl, CrawlCursor, CrawlOptions, CrawlSummary};
pub use download::{sanitize_filename, ArtifactDownloader};
pub use error::CrawlError;

use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed backoff after a connection failure, per the site convention.
pub const DEFAULT_BACKOFF_SECS: u64 = 180;

/// Per-invocation crawl settings, passed explicitly to each component rather
/// than held in process-wide state.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Catalog base URL, normalized to end with a slash so that page numbers
    /// join beneath it. Precondition: the catalog's page numbering is dense
    /// and contiguous; a missing page number ends the crawl.
    pub catalog_url: Url,
    /// Sleep between retries after a connection failure.
    pub backoff: Duration,
    /// Root for the `books/` and `images/` artifact folders.
    pub dest_root: PathBuf,
    /// Do not download book texts; records carry no text path.
    pub skip_txt: bool,
    /// Do not download cover images; records carry no cover path.
    pub skip_imgs: bool,
}

impl CrawlConfig {
    pub fn new(catalog_url: &str, dest_root: impl Into<PathBuf>) -> Result<Self, CrawlError> {
        Ok(Self {
            catalog_url: parse_catalog_url(catalog_url)?,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
            dest_root: dest_root.into(),
            skip_txt: false,
            skip_imgs: false,
        })
    }
}

/// Parse a catalog URL, normalizing the path to end with a slash so that
/// `Url::join` with a page number stays inside the category.
pub fn parse_catalog_url(input: &str) -> Result<Url, CrawlError> {
    let normalized = if input.ends_with('/') {
        input.to_string()
    } else {
        format!("{}/", input)
    };
    Url::parse(&normalized).map_err(|e| CrawlError::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_catalog_url_appends_missing_slash() -> Result<(), CrawlError> {
        let url = parse_catalog_url("https://tululu.org/l55")?;
        assert_eq!(url.as_str(), "https://tululu.org/l55/");
        assert_eq!(
            url.join("2/").map(|u| u.to_string()).ok().as_deref(),
            Some("https://tululu.org/l55/2/")
        );
        Ok(())
    }

    #[test]
    fn parse_catalog_url_rejects_garbage() {
        assert!(matches!(
            parse_catalog_url("no scheme here"),
            Err(CrawlError::InvalidUrl { .. })
        ));
    }
}
