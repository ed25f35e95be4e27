//! Typed search-record extraction from distilled result pages.
//!
//! Result pages carry one `<article>` per hit. Each fragment is mapped
//! independently and concurrently; how a mapping failure propagates
//! depends on the record kind. Web extraction is schema-strict and
//! fails the whole call, news extraction logs and skips. That asymmetry
//! is deliberate: web layouts are stable enough to treat a mismatch as
//! a bug, news layouts are not.

mod news;
mod web;

use std::fmt;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// The kind of search result a record was extracted from. Fixed at
/// construction; a record never changes kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Web,
    News,
    Images,
    Videos,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web => write!(f, "web"),
            Self::News => write!(f, "news"),
            Self::Images => write!(f, "images"),
            Self::Videos => write!(f, "videos"),
        }
    }
}

/// One extracted search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRecord {
    pub kind: RecordKind,
    pub link: Option<String>,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub source: Option<String>,
    pub relative_time: Option<String>,
}

/// Extract all records of `kind` from a distilled result page.
pub async fn extract(kind: RecordKind, html: &str) -> Result<Vec<SearchRecord>, ExtractError> {
    match kind {
        RecordKind::Web => web::extract_web(&locate_fragments(html, false)).await,
        RecordKind::News => news::extract_news(&locate_fragments(html, true)).await,
        RecordKind::Images | RecordKind::Videos => Err(ExtractError::UnsupportedKind(kind)),
    }
}

/// Collect `<article>` fragments as standalone HTML strings.
///
/// With `innermost_only`, articles that nest another article are
/// skipped; news pages wrap each hit in nested articles and only the
/// innermost holds the fields.
fn locate_fragments(html: &str, innermost_only: bool) -> Vec<String> {
    static ARTICLE: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| Selector::parse("article").expect("static selector"));

    let doc = Html::parse_document(html);
    doc.select(&ARTICLE)
        .filter(|el| !innermost_only || el.select(&ARTICLE).next().is_none())
        .map(|el| el.html())
        .collect()
}

/// Concatenated text of an element, trimmed.
pub(crate) fn element_text(el: &scraper::ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
