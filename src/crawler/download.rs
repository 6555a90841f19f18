//! Artifact persistence: book texts and cover images.
//!
//! Texts are always refetched and overwritten; images are skipped entirely
//! when the destination file already exists. That asymmetry is deliberate
//! and is the only caching in the system, keyed purely on path existence.

use crate::crawler::client::Fetch;
use crate::crawler::error::CrawlError;
use reqwest::Url;
use std::fs;
use std::path::{Path, PathBuf};

/// Replacement name when sanitization removes every character.
const FALLBACK_FILENAME: &str = "book";

/// Strip characters that are illegal in filenames on common filesystems and
/// any path-traversal potential, preserving non-ASCII text (book titles are
/// mostly Cyrillic). Leading/trailing dots and whitespace are trimmed so the
/// result can never escape its folder or hide itself.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes downloaded artifacts under a destination root, in `books/` and
/// `images/` subfolders.
#[derive(Debug, Clone)]
pub struct ArtifactDownloader {
    books_dir: PathBuf,
    images_dir: PathBuf,
}

impl ArtifactDownloader {
    pub fn new(dest_root: &Path) -> Self {
        Self {
            books_dir: dest_root.join("books"),
            images_dir: dest_root.join("images"),
        }
    }

    /// Fetch the book text and write it under `books/`, overwriting any
    /// previous download. The txt endpoint uses the same redirect-as-absence
    /// convention as book pages, so the fetch can fail with NotFound.
    pub fn download_txt(
        &self,
        fetcher: &mut dyn Fetch,
        url: &Url,
        filename: &str,
    ) -> Result<PathBuf, CrawlError> {
        let page = fetcher.fetch(url.as_str())?;
        ensure_dir(&self.books_dir)?;
        let path = self
            .books_dir
            .join(format!("{}.txt", sanitize_filename(filename)));
        fs::write(&path, &page.body).map_err(|e| CrawlError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Fetch a cover image into `images/`, named after the URL's last path
    /// segment. If the destination already exists the existing path is
    /// returned without any network call.
    pub fn download_image(
        &self,
        fetcher: &mut dyn Fetch,
        url: &Url,
    ) -> Result<PathBuf, CrawlError> {
        let segment = url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_FILENAME);
        let path = self.images_dir.join(sanitize_filename(segment));
        if path.exists() {
            return Ok(path);
        }
        let page = fetcher.fetch(url.as_str())?;
        ensure_dir(&self.images_dir)?;
        fs::write(&path, &page.body).map_err(|e| CrawlError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

fn ensure_dir(dir: &Path) -> Result<(), CrawlError> {
    fs::create_dir_all(dir).map_err(|e| CrawlError::Io {
        path: dir.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::client::PageResponse;
    use tempfile::TempDir;

    /// Scripted fetcher: serves a fixed body and counts calls.
    struct CountingFetcher {
        body: Vec<u8>,
        calls: usize,
    }

    impl CountingFetcher {
        fn new(body: &str) -> Self {
            Self {
                body: body.as_bytes().to_vec(),
                calls: 0,
            }
        }
    }

    impl Fetch for CountingFetcher {
        fn fetch(&mut self, url: &str) -> Result<PageResponse, CrawlError> {
            self.calls += 1;
            Ok(PageResponse {
                status: 200,
                body: self.body.clone(),
                final_url: url.to_string(),
            })
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).expect("test url")
    }

    #[test]
    fn sanitize_strips_illegal_and_traversal() {
        assert_eq!(sanitize_filename("41. Пески Марса"), "41. Пески Марса");
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j"), "abcdefghij");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("  .hidden.  "), "hidden");
        assert_eq!(sanitize_filename("///"), "book");
        assert_eq!(sanitize_filename(""), "book");
    }

    #[test]
    fn download_txt_always_overwrites() -> Result<(), CrawlError> {
        let dir = TempDir::new().expect("tempdir");
        let downloader = ArtifactDownloader::new(dir.path());
        let txt_url = url("https://tululu.org/txt.php?id=41");

        let mut first = CountingFetcher::new("first version");
        let path = downloader.download_txt(&mut first, &txt_url, "41. Пески Марса")?;
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "first version");

        let mut second = CountingFetcher::new("second version");
        let path2 = downloader.download_txt(&mut second, &txt_url, "41. Пески Марса")?;
        assert_eq!(path, path2);
        assert_eq!(second.calls, 1);
        assert_eq!(
            std::fs::read_to_string(&path2).expect("read"),
            "second version"
        );
        Ok(())
    }

    #[test]
    fn download_image_skips_when_file_exists() -> Result<(), CrawlError> {
        let dir = TempDir::new().expect("tempdir");
        let downloader = ArtifactDownloader::new(dir.path());
        let img_url = url("https://tululu.org/shots/41.jpg");

        let mut fetcher = CountingFetcher::new("jpeg bytes");
        let path = downloader.download_image(&mut fetcher, &img_url)?;
        assert_eq!(fetcher.calls, 1);
        assert!(path.ends_with("images/41.jpg"));

        // Second download with an existing file: zero network calls.
        let mut untouched = CountingFetcher::new("different bytes");
        let path2 = downloader.download_image(&mut untouched, &img_url)?;
        assert_eq!(path, path2);
        assert_eq!(untouched.calls, 0);
        assert_eq!(std::fs::read_to_string(&path2).expect("read"), "jpeg bytes");
        Ok(())
    }

    #[test]
    fn download_image_names_after_last_path_segment() -> Result<(), CrawlError> {
        let dir = TempDir::new().expect("tempdir");
        let downloader = ArtifactDownloader::new(dir.path());
        let mut fetcher = CountingFetcher::new("gif");
        let path = downloader.download_image(
            &mut fetcher,
            &url("https://tululu.org/images/nopic.gif"),
        )?;
        assert!(path.ends_with("images/nopic.gif"));
        Ok(())
    }
}
