//! CLI parsing and orchestration. Parses args, runs the crawl, flushes the
//! JSON collection. Maps errors to exit codes.

use crate::collection::{CollectionError, RecordAggregator};
use crate::config;
use crate::crawler::{
    run_crawl, CrawlConfig, CrawlError, CrawlOptions, PageFetcher, DEFAULT_BACKOFF_SECS,
};
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Crawl(#[from] CrawlError),

    #[error("{0}")]
    Collection(#[from] CollectionError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Crawl(_) => 2,
            CliRunError::Collection(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "tululu-crawl")]
#[command(about = "Crawl a tululu.org category: book metadata, texts, and covers into a JSON collection")]
#[command(
    after_help = "Config file keys (dest_folder, json_path, user_agent, request_delay_secs, timeout_secs, backoff_secs) are documented in the README. CLI flags override config."
)]
pub struct Args {
    /// Category (catalog) URL to crawl.
    #[arg(default_value = "https://tululu.org/l55/")]
    pub category_url: String,

    /// First catalog page to crawl (1-based).
    #[arg(long, default_value_t = 1)]
    pub start_page: u32,

    /// Page to stop before (exclusive). Values beyond the catalog's last
    /// page are silently clamped. Default: crawl to the last page.
    #[arg(long)]
    pub end_page: Option<u32>,

    /// Root folder for downloaded artifacts (books/ and images/ beneath it).
    #[arg(long)]
    pub dest_folder: Option<PathBuf>,

    /// Path of the JSON collection file. Default: <dest>/books_description.json.
    #[arg(long)]
    pub json_path: Option<PathBuf>,

    /// Do not download book texts.
    #[arg(long)]
    pub skip_txt: bool,

    /// Do not download cover images.
    #[arg(long)]
    pub skip_imgs: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 1).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Sleep in seconds before retrying after a connection failure
    /// (overrides config; default 180).
    #[arg(long)]
    pub backoff: Option<u64>,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

const DEFAULT_JSON_NAME: &str = "books_description.json";

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code
/// and message on failure. Connection failures never surface here — the
/// coordinator retries them forever.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;

    let dest_root: PathBuf = args
        .dest_folder
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.dest_folder.clone()))
        .unwrap_or_else(|| PathBuf::from("."));
    let json_path: PathBuf = args
        .json_path
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.json_path.clone()))
        .unwrap_or_else(|| dest_root.join(DEFAULT_JSON_NAME));

    let delay_secs = args
        .delay
        .or_else(|| config.as_ref().and_then(|c| c.request_delay_secs));
    let timeout_secs = args
        .timeout
        .or_else(|| config.as_ref().and_then(|c| c.timeout_secs));
    let backoff_secs = args
        .backoff
        .or_else(|| config.as_ref().and_then(|c| c.backoff_secs))
        .unwrap_or(DEFAULT_BACKOFF_SECS);
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.user_agent.clone()));

    let mut crawl_config =
        CrawlConfig::new(&args.category_url, &dest_root).map_err(|e| match e {
            CrawlError::InvalidUrl { input, reason } => CliRunError::InvalidInput(format!(
                "Expected a category URL like https://tululu.org/l55/. Invalid: {}: {}",
                input, reason
            )),
            other => CliRunError::Crawl(other),
        })?;
    crawl_config.backoff = Duration::from_secs(backoff_secs);
    crawl_config.skip_txt = args.skip_txt;
    crawl_config.skip_imgs = args.skip_imgs;

    let mut builder = PageFetcher::builder();
    if let Some(secs) = delay_secs {
        builder = builder.delay_secs(secs);
    }
    if let Some(secs) = timeout_secs {
        builder = builder.timeout_secs(secs);
    }
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let mut fetcher = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |done: u32, total: u32| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total as u64);
            bar.set_style(
                indicatif::ProgressStyle::default_bar()
                    .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
                    .unwrap()
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
            bar
        });
        pb.set_position(done as u64);
        pb.set_message(format!("Crawling page {}/{}", done, total));
    };
    let progress: Option<&dyn Fn(u32, u32)> = if args.quiet { None } else { Some(&progress_cb) };

    // Defensive checkpoint: rewrite the collection after every finished page
    // so an interrupted run still leaves a well-formed file behind.
    let checkpoint_path = json_path.clone();
    let checkpoint_cb = |aggregator: &RecordAggregator| {
        if let Err(e) = aggregator.flush(&checkpoint_path) {
            eprintln!("Warning: could not checkpoint collection: {}", e);
        }
    };
    let on_checkpoint: Option<&dyn Fn(&RecordAggregator)> = Some(&checkpoint_cb);

    let options = CrawlOptions {
        progress,
        on_checkpoint,
    };
    let mut aggregator = RecordAggregator::new();
    let summary = run_crawl(
        &mut fetcher,
        &crawl_config,
        &options,
        args.start_page,
        args.end_page,
        &mut aggregator,
    )?;

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.finish_and_clear();
    }

    aggregator.flush(&json_path)?;

    if let Some(page) = summary.stopped_at_missing_page {
        eprintln!(
            "Catalog ended at page {}; crawled {} page(s) before it.",
            page, summary.pages_crawled
        );
    }
    if !args.quiet {
        eprintln!(
            "Crawled {} page(s): {} record(s) written to {}, {} book(s) skipped.",
            summary.pages_crawled,
            summary.records_emitted,
            json_path.display(),
            summary.books_skipped
        );
    }
    Ok(())
}
