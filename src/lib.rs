//! tululu-crawl: crawl a tululu.org book catalog into local artifacts and a
//! JSON record collection.

pub mod cli;
pub mod collection;
pub mod config;
pub mod crawler;
pub mod model;

// Re-exports for the CLI and library consumers.
pub use collection::{CollectionError, RecordAggregator};
pub use crawler::{
    discover_bounds, run_crawl, ArtifactDownloader, CrawlConfig, CrawlCursor, CrawlError,
    CrawlOptions, CrawlSummary, Fetch, PageFetcher, PageFetcherBuilder, PageResponse,
};
pub use model::BookRecord;
