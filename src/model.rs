//! Canonical record for one crawled book.
//!
//! The crawler produces this shape; the JSON collection and any downstream
//! renderer consume it. Field names in the serialized form are stable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One successfully processed book. Only constructed after the title/author
/// split of the detail-page heading has succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    /// Cover image URL, absolute (resolved against the book page URL).
    #[serde(rename = "coverUrl")]
    pub cover_url: String,
    /// Reader comments in document order. May be empty.
    pub comments: Vec<String>,
    /// Genre tags in document order. May be empty.
    pub genres: Vec<String>,
    /// Path of the downloaded text, if the site offers a txt download for
    /// this book and text downloads were not skipped.
    #[serde(rename = "textPath", skip_serializing_if = "Option::is_none")]
    pub text_path: Option<PathBuf>,
    /// Path of the downloaded cover, if image downloads were not skipped.
    #[serde(rename = "coverPath", skip_serializing_if = "Option::is_none")]
    pub cover_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn sample_record() -> BookRecord {
        BookRecord {
            title: "Пески Марса".to_string(),
            author: "Кларк Артур".to_string(),
            cover_url: "https://tululu.org/shots/41.jpg".to_string(),
            comments: vec!["Отличная книга".to_string()],
            genres: vec!["Научная фантастика".to_string()],
            text_path: Some(PathBuf::from("books/41. Пески Марса.txt")),
            cover_path: Some(PathBuf::from("images/41.jpg")),
        }
    }

    #[test]
    fn record_serializes_with_renamed_fields() -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string(&sample_record())?;
        assert!(json.contains("\"coverUrl\":"));
        assert!(json.contains("\"textPath\":"));
        assert!(json.contains("\"coverPath\":"));
        // serde_json leaves non-ASCII unescaped, matching readable native-script output.
        assert!(json.contains("Пески Марса"));
        Ok(())
    }

    #[test]
    fn absent_paths_are_omitted() -> Result<(), Box<dyn Error>> {
        let mut record = sample_record();
        record.text_path = None;
        record.cover_path = None;
        let json = serde_json::to_string(&record)?;
        assert!(!json.contains("textPath"));
        assert!(!json.contains("coverPath"));
        Ok(())
    }

    #[test]
    fn record_round_trips() -> Result<(), Box<dyn Error>> {
        let record = sample_record();
        let json = serde_json::to_string(&record)?;
        let back: BookRecord = serde_json::from_str(&json)?;
        assert_eq!(back.title, record.title);
        assert_eq!(back.author, record.author);
        assert_eq!(back.cover_url, record.cover_url);
        assert_eq!(back.comments, record.comments);
        assert_eq!(back.genres, record.genres);
        assert_eq!(back.text_path, record.text_path);
        assert_eq!(back.cover_path, record.cover_path);
        Ok(())
    }
}
