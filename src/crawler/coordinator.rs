//! The resumable crawl loop.
//!
//! Pages are crawled in ascending order, books in document order within a
//! page, so the aggregate collection's ordering is deterministic for a
//! stable catalog. A connection failure never loses position: the cursor is
//! only advanced once a page completes, and a failing book is retried from
//! its own fetch after the fixed backoff.

use crate::collection::RecordAggregator;
use crate::crawler::client::Fetch;
use crate::crawler::download::ArtifactDownloader;
use crate::crawler::error::CrawlError;
use crate::crawler::{parse, CrawlConfig};
use crate::model::BookRecord;
use reqwest::Url;

/// Position within the page range. Advanced only when a page completes;
/// a retry after a connection failure resumes at the exact same page.
#[derive(Debug, Clone, Copy)]
pub struct CrawlCursor {
    pub current_page: u32,
    /// Exclusive upper bound.
    pub range_end: u32,
    /// Last page number read from the catalog's pagination control.
    pub last_discovered_page: u32,
}

impl CrawlCursor {
    fn advance(&mut self) {
        self.current_page += 1;
    }

    fn is_done(&self) -> bool {
        self.current_page >= self.range_end
    }
}

/// Callbacks for a crawl run: page progress and a per-page checkpoint
/// (defensive incremental flush of the collection).
#[derive(Default)]
pub struct CrawlOptions<'a> {
    pub progress: Option<&'a dyn Fn(u32, u32)>,
    pub on_checkpoint: Option<&'a dyn Fn(&RecordAggregator)>,
}

/// What a finished run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub records_emitted: u32,
    pub books_skipped: u32,
    pub pages_crawled: u32,
    /// Set when a catalog page inside the requested range turned out not to
    /// exist (redirect-as-absence); the crawl stopped at that boundary.
    pub stopped_at_missing_page: Option<u32>,
}

/// Outcome of processing a single book, pattern-matched by the page loop.
/// Only connection failures leave this as an error.
enum BookOutcome {
    Emitted(Box<BookRecord>),
    /// Redirect-as-absence: the book id maps to no real resource.
    Absent,
    /// Heading without the `::` separator.
    Malformed(String),
    /// HTTP error or unexpected page structure; skipped with a diagnostic.
    Unavailable(String),
}

/// URL of one catalog page. Page 1 is the catalog base itself.
fn page_url(base: &Url, page: u32) -> Result<Url, CrawlError> {
    if page <= 1 {
        return Ok(base.clone());
    }
    base.join(&format!("{}/", page))
        .map_err(|e| CrawlError::InvalidUrl {
            input: format!("{}{}/", base, page),
            reason: e.to_string(),
        })
}

/// Determine the effective page range by reading the pagination control on
/// the catalog's first page.
///
/// Connection failures here retry forever with the fixed backoff; this call
/// does not give up on a transient outage. A first page that redirects away
/// (the catalog itself is absent) yields an empty range rather than an
/// error. A requested start beyond the true last page is fatal.
///
/// `requested_end` is exclusive; `None` means "to the last page". The
/// returned range is clamped to `last_page + 1` and always spans at least
/// one page.
pub fn discover_bounds(
    fetcher: &mut dyn Fetch,
    config: &CrawlConfig,
    requested_start: u32,
    requested_end: Option<u32>,
) -> Result<CrawlCursor, CrawlError> {
    let first_url = page_url(&config.catalog_url, 1)?;
    let body = loop {
        match fetcher.fetch(first_url.as_str()) {
            Ok(page) => break page.text(),
            Err(CrawlError::Connection { url, source }) => {
                eprintln!(
                    "Connection error fetching {}: {}. Retrying in {}s.",
                    url,
                    source,
                    config.backoff.as_secs()
                );
                std::thread::sleep(config.backoff);
            }
            Err(CrawlError::NotFound { url }) => {
                eprintln!("Catalog first page redirected away ({}); nothing to crawl.", url);
                return Ok(CrawlCursor {
                    current_page: requested_start,
                    range_end: requested_start,
                    last_discovered_page: 0,
                });
            }
            Err(e) => return Err(e),
        }
    };

    let last_page = parse::last_page_number(&body, &first_url)?;
    let start = requested_start.max(1);
    if start > last_page {
        return Err(CrawlError::BoundsExceeded {
            requested: start,
            last_page,
        });
    }
    let mut end = requested_end.unwrap_or(last_page + 1).min(last_page + 1);
    if end <= start {
        // A single requested page is a half-open range of length 1.
        end = start + 1;
    }
    Ok(CrawlCursor {
        current_page: start,
        range_end: end,
        last_discovered_page: last_page,
    })
}

/// Drive the full crawl: discover bounds, then fetch each catalog page,
/// process each listed book, and append emitted records to the aggregator.
pub fn run_crawl(
    fetcher: &mut dyn Fetch,
    config: &CrawlConfig,
    options: &CrawlOptions<'_>,
    requested_start: u32,
    requested_end: Option<u32>,
    aggregator: &mut RecordAggregator,
) -> Result<CrawlSummary, CrawlError> {
    let mut cursor = discover_bounds(fetcher, config, requested_start, requested_end)?;
    let total_pages = cursor.range_end - cursor.current_page;
    let downloader = ArtifactDownloader::new(&config.dest_root);
    let mut summary = CrawlSummary::default();

    'pages: while !cursor.is_done() {
        let page = cursor.current_page;
        let url = page_url(&config.catalog_url, page)?;
        let body = match fetcher.fetch(url.as_str()) {
            Ok(response) => response.text(),
            Err(CrawlError::Connection { url, source }) => {
                // Resume at this very page; nothing is skipped.
                eprintln!(
                    "Connection error fetching catalog page {} ({}): {}. Retrying in {}s.",
                    page,
                    url,
                    source,
                    config.backoff.as_secs()
                );
                std::thread::sleep(config.backoff);
                continue;
            }
            Err(CrawlError::NotFound { .. }) => {
                eprintln!(
                    "Catalog page {} does not exist; stopping at the catalog's end.",
                    page
                );
                summary.stopped_at_missing_page = Some(page);
                break 'pages;
            }
            Err(CrawlError::HttpStatus { status, url }) => {
                eprintln!("Catalog page {}: HTTP {} at {}. Skipped.", page, status, url);
                cursor.advance();
                continue;
            }
            Err(e) => return Err(e),
        };

        let links = parse::catalog_book_links(&body, &url)?;
        for link in &links {
            // Retry the same book from its own fetch until it resolves to a
            // non-transient outcome.
            loop {
                match process_book(fetcher, config, &downloader, link) {
                    Ok(BookOutcome::Emitted(record)) => {
                        aggregator.append(*record);
                        summary.records_emitted += 1;
                        break;
                    }
                    Ok(BookOutcome::Absent) => {
                        eprintln!("Book absent (redirected): {}. Skipped.", link);
                        summary.books_skipped += 1;
                        break;
                    }
                    Ok(BookOutcome::Malformed(heading)) => {
                        eprintln!(
                            "Book at {} has a malformed heading {:?}. Skipped.",
                            link, heading
                        );
                        summary.books_skipped += 1;
                        break;
                    }
                    Ok(BookOutcome::Unavailable(reason)) => {
                        eprintln!("Book at {} unavailable: {}. Skipped.", link, reason);
                        summary.books_skipped += 1;
                        break;
                    }
                    Err(e) if e.is_transient() => {
                        eprintln!("{}. Retrying in {}s.", e, config.backoff.as_secs());
                        std::thread::sleep(config.backoff);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        cursor.advance();
        summary.pages_crawled += 1;
        if let Some(cb) = options.on_checkpoint {
            cb(aggregator);
        }
        if let Some(p) = options.progress {
            p(summary.pages_crawled, total_pages);
        }
    }

    Ok(summary)
}

/// Fetch, parse, and download one book. Returns a tagged outcome for every
/// condition the crawl can continue past; only transient connection failures
/// (and fatal filesystem errors) propagate as `Err`.
fn process_book(
    fetcher: &mut dyn Fetch,
    config: &CrawlConfig,
    downloader: &ArtifactDownloader,
    book_url: &Url,
) -> Result<BookOutcome, CrawlError> {
    let page = match fetcher.fetch(book_url.as_str()) {
        Ok(page) => page,
        Err(CrawlError::NotFound { .. }) => return Ok(BookOutcome::Absent),
        Err(CrawlError::HttpStatus { status, .. }) => {
            return Ok(BookOutcome::Unavailable(format!("HTTP {}", status)))
        }
        Err(e) => return Err(e),
    };
    let html = page.text();

    let parsed = match parse::parse_book_page(&html, book_url) {
        Ok(parsed) => parsed,
        Err(CrawlError::MalformedTitle { heading, .. }) => {
            return Ok(BookOutcome::Malformed(heading))
        }
        Err(CrawlError::ParsePage { message, .. }) => {
            return Ok(BookOutcome::Unavailable(message))
        }
        Err(e) => return Err(e),
    };

    let text_path = if config.skip_txt {
        None
    } else {
        match parse::text_link(&html, book_url)? {
            // No txt affordance on the page: the record persists without a
            // text path.
            None => {
                eprintln!("No text download offered for {:?} at {}.", parsed.title, book_url);
                None
            }
            Some(txt_url) => {
                let filename = match parse::book_id(&txt_url) {
                    Some(id) => format!("{}. {}", id, parsed.title),
                    None => parsed.title.clone(),
                };
                match downloader.download_txt(fetcher, &txt_url, &filename) {
                    Ok(path) => Some(path),
                    // The txt endpoint uses the same redirect-as-absence
                    // convention; a book whose text vanished is skipped.
                    Err(CrawlError::NotFound { url }) => {
                        return Ok(BookOutcome::Unavailable(format!(
                            "text redirected away at {}",
                            url
                        )))
                    }
                    Err(CrawlError::HttpStatus { status, .. }) => {
                        return Ok(BookOutcome::Unavailable(format!(
                            "text endpoint returned HTTP {}",
                            status
                        )))
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    };

    let cover_path = if config.skip_imgs {
        None
    } else {
        match downloader.download_image(fetcher, &parsed.cover_url) {
            Ok(path) => Some(path),
            Err(CrawlError::NotFound { url }) | Err(CrawlError::HttpStatus { url, .. }) => {
                eprintln!("Cover unavailable at {}; record kept without it.", url);
                None
            }
            Err(e) => return Err(e),
        }
    };

    Ok(BookOutcome::Emitted(Box::new(BookRecord {
        title: parsed.title,
        author: parsed.author,
        cover_url: parsed.cover_url.to_string(),
        comments: parsed.comments,
        genres: parsed.genres,
        text_path,
        cover_path,
    })))
}
