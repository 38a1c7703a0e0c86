//! Score page and client bundle scraping
//!
//! Everything here is pure text matching against markup the service controls.
//! The page format is assumed stable: when a pattern is absent the caller gets
//! an error, never a guess.

use crate::models::ScoreMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use thiserror::Error;
use tracing::debug;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"property="og:title" content="([^"]+)""#).expect("valid title regex"));

// The page embeds its store as JSON, sometimes HTML-escaped
static PAGES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"pages(?:&quot;|"):(\d+)"#).expect("valid page count regex"));

static LINK_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<link\b[^>]*>"#).expect("valid link tag regex"));

static REL_PRELOAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\brel\s*=\s*["']?preload\b"#).expect("valid rel regex"));

static AS_SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bas\s*=\s*["']?script\b"#).expect("valid as regex"));

static HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhref\s*=\s*["']([^"']+)["']"#).expect("valid href regex"));

// The bundle builds the signature as md5(id + type + index + "<seed>").substr(0,4)
static SEED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\+\s*(?:"([^"]+)"|'([^']+)')\s*\)\s*\.substr\(\s*0\s*,\s*4\s*\)"#)
        .expect("valid seed regex")
});

/// Score page scraping errors
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Score title not found in page (og:title meta tag missing)")]
    MissingTitle,

    #[error("Page count not found in page data")]
    MissingPageCount,

    #[error("Invalid page count: {0}")]
    InvalidPageCount(String),
}

/// Pull title and page count out of the score page
pub fn extract_metadata(page_html: &str) -> Result<ScoreMetadata, ScrapeError> {
    let raw_title = TITLE_RE
        .captures(page_html)
        .and_then(|c| c.get(1))
        .ok_or(ScrapeError::MissingTitle)?
        .as_str();
    let title = html_escape::decode_html_entities(raw_title).trim().to_string();
    if title.is_empty() {
        return Err(ScrapeError::MissingTitle);
    }

    let raw_pages = PAGES_RE
        .captures(page_html)
        .and_then(|c| c.get(1))
        .ok_or(ScrapeError::MissingPageCount)?
        .as_str();
    let page_count = raw_pages
        .parse::<u32>()
        .map_err(|_| ScrapeError::InvalidPageCount(raw_pages.to_string()))?;

    Ok(ScoreMetadata { title, page_count })
}

/// Script URLs hinted with `<link rel="preload">`, in document order
///
/// A link counts as a script when it says `as="script"` or its path ends in
/// `.js`. Relative hrefs are resolved against `page_url`; duplicates are
/// dropped.
pub fn preload_script_urls(page_html: &str, page_url: &Url) -> Vec<Url> {
    let mut urls: Vec<Url> = Vec::new();

    for tag in LINK_TAG_RE.find_iter(page_html) {
        let tag = tag.as_str();
        if !REL_PRELOAD_RE.is_match(tag) {
            continue;
        }

        let Some(href) = HREF_RE.captures(tag).and_then(|c| c.get(1)) else {
            continue;
        };
        let href = html_escape::decode_html_entities(href.as_str());

        let url = match page_url.join(&href) {
            Ok(url) => url,
            Err(e) => {
                debug!(href = %href, error = %e, "Skipping unresolvable preload href");
                continue;
            }
        };

        let is_script = AS_SCRIPT_RE.is_match(tag) || url.path().ends_with(".js");
        if is_script && !urls.contains(&url) {
            urls.push(url);
        }
    }

    urls
}

/// First seed literal in a client bundle, if any
pub fn extract_seed_literal(script: &str) -> Option<String> {
    SEED_RE.captures(script).and_then(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .map(|m| m.as_str().to_string())
    })
}
