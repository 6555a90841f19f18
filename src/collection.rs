//! In-memory record collection and its JSON persistence.
//!
//! `flush` truncates and rewrites the whole collection as a single JSON
//! array on every call, so the file is well-formed at any point, including
//! between the per-page checkpoints and across repeated runs.

use crate::model::BookRecord;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Failed to write collection {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize collection {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Accumulates records in crawl order for the lifetime of one run.
/// Records are immutable once appended.
#[derive(Debug, Default)]
pub struct RecordAggregator {
    records: Vec<BookRecord>,
}

impl RecordAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: BookRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    /// Serialize the full collection as a JSON array, UTF-8 with non-ASCII
    /// left unescaped, replacing any previous file content.
    pub fn flush(&self, path: &Path) -> Result<(), CollectionError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CollectionError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }
        let file = File::create(path).map_err(|e| CollectionError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::to_writer_pretty(file, &self.records).map_err(|e| {
            CollectionError::Serialize {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }
}
