//! HTML extraction for catalog and book detail pages.
//!
//! Selectors match tululu.org's markup: catalog pages list each book in a
//! `table.d_book`, the detail page carries a `Title :: Author` heading under
//! `td.ow_px_td`, the cover inside `div.bookimage`, reader comments in
//! `div.texts`, genres under `span.d_book`, and pagination links as
//! `a.npage`.

use crate::crawler::error::CrawlError;
use reqwest::Url;
use scraper::{Html, Selector};

/// Separator between title and author in the detail-page heading.
const TITLE_SEPARATOR: &str = "::";

/// Visible text of the plain-text download affordance.
const TEXT_LINK_LABEL: &str = "скачать txt";

/// Parsed metadata of one book detail page, before artifacts are downloaded.
#[derive(Debug, Clone)]
pub struct ParsedBook {
    pub title: String,
    pub author: String,
    pub cover_url: Url,
    pub comments: Vec<String>,
    pub genres: Vec<String>,
}

/// Parse a CSS selector or return a parse error (avoids panics from Selector::parse).
fn parse_selector(sel: &str, url: &Url) -> Result<Selector, CrawlError> {
    Selector::parse(sel).map_err(|e| CrawlError::ParsePage {
        url: url.to_string(),
        message: format!("invalid selector {:?}: {}", sel, e),
    })
}

fn join(base: &Url, href: &str) -> Result<Url, CrawlError> {
    base.join(href).map_err(|e| CrawlError::InvalidUrl {
        input: href.to_string(),
        reason: e.to_string(),
    })
}

/// Extract the book detail links from one catalog page, in document order,
/// resolved absolute against the page URL. One link per listed book.
pub fn catalog_book_links(html: &str, page_url: &Url) -> Result<Vec<Url>, CrawlError> {
    let doc = Html::parse_document(html);
    let table_sel = parse_selector("table.d_book", page_url)?;
    let anchor_sel = parse_selector("a[href]", page_url)?;
    let mut links = Vec::new();
    for table in doc.select(&table_sel) {
        if let Some(anchor) = table.select(&anchor_sel).next() {
            if let Some(href) = anchor.value().attr("href") {
                links.push(join(page_url, href)?);
            }
        }
    }
    Ok(links)
}

/// Split the detail-page heading on the literal `::` separator, trimming both
/// halves. A heading without the separator fails that book only.
pub fn split_heading(heading: &str, url: &str) -> Result<(String, String), CrawlError> {
    let (raw_title, raw_author) =
        heading
            .split_once(TITLE_SEPARATOR)
            .ok_or_else(|| CrawlError::MalformedTitle {
                url: url.to_string(),
                heading: heading.trim().to_string(),
            })?;
    Ok((raw_title.trim().to_string(), raw_author.trim().to_string()))
}

/// Extract the structured record from a book detail page. Genre or comment
/// absence is not a failure; a missing heading, separator, or cover is.
pub fn parse_book_page(html: &str, page_url: &Url) -> Result<ParsedBook, CrawlError> {
    let doc = Html::parse_document(html);

    let heading_sel = parse_selector("td.ow_px_td h1", page_url)?;
    let heading = doc
        .select(&heading_sel)
        .next()
        .map(|e| e.text().collect::<String>())
        .ok_or_else(|| CrawlError::ParsePage {
            url: page_url.to_string(),
            message: "no book heading found".to_string(),
        })?;
    let (title, author) = split_heading(&heading, page_url.as_str())?;

    let cover_sel = parse_selector("div.bookimage img", page_url)?;
    let cover_src = doc
        .select(&cover_sel)
        .next()
        .and_then(|e| e.value().attr("src"))
        .ok_or_else(|| CrawlError::ParsePage {
            url: page_url.to_string(),
            message: "no cover image found".to_string(),
        })?;
    let cover_url = join(page_url, cover_src)?;

    let comment_sel = parse_selector("div.texts span.black", page_url)?;
    let comments = doc
        .select(&comment_sel)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .collect();

    let genre_sel = parse_selector("span.d_book a", page_url)?;
    let genres = doc
        .select(&genre_sel)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .collect();

    Ok(ParsedBook {
        title,
        author,
        cover_url,
        comments,
        genres,
    })
}

/// Find the plain-text download link on a book detail page. None means the
/// site offers no text for this book, which is not a crawl failure.
pub fn text_link(html: &str, page_url: &Url) -> Result<Option<Url>, CrawlError> {
    let doc = Html::parse_document(html);
    let anchor_sel = parse_selector("table.d_book a[href]", page_url)?;
    for anchor in doc.select(&anchor_sel) {
        let label = anchor.text().collect::<String>();
        if label.trim() == TEXT_LINK_LABEL {
            if let Some(href) = anchor.value().attr("href") {
                return Ok(Some(join(page_url, href)?));
            }
        }
    }
    Ok(None)
}

/// Read the catalog's last page number from the pagination control of its
/// first page. A page without the control is a single-page catalog.
pub fn last_page_number(html: &str, page_url: &Url) -> Result<u32, CrawlError> {
    let doc = Html::parse_document(html);
    let npage_sel = parse_selector("a.npage", page_url)?;
    let last = doc
        .select(&npage_sel)
        .filter_map(|e| e.text().collect::<String>().trim().parse::<u32>().ok())
        .max()
        .unwrap_or(1);
    Ok(last)
}

/// Book id from a txt download URL's `id` query parameter, used to build the
/// text filename.
pub fn book_id(txt_url: &Url) -> Option<String> {
    txt_url
        .query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
}
