//! Schema-strict web result mapping.

use std::collections::HashSet;
use std::sync::LazyLock;

use futures::future::join_all;
use scraper::{Html, Selector};

use crate::error::ExtractError;
use crate::extract::{element_text, RecordKind, SearchRecord};

static LINK_ANCHOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[data-testid="result-extras-url-link"]"#).expect("static selector")
});
static TITLE_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[data-testid="result-title-a"]"#).expect("static selector"));
static SNIPPET_DIV: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[data-result="snippet"]"#).expect("static selector"));
static SOURCE_PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div div div p").expect("static selector"));
static INNER_DIV: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div").expect("static selector"));
static INNER_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("static selector"));

/// Map every fragment concurrently; any mapping failure fails the whole
/// call with zero partial results.
pub(super) async fn extract_web(fragments: &[String]) -> Result<Vec<SearchRecord>, ExtractError> {
    let results = join_all(fragments.iter().map(|f| map_fragment(f))).await;
    let mut records = Vec::new();
    for result in results {
        records.extend(result?);
    }
    Ok(records)
}

/// Zip the fragment's parallel field lists into records.
///
/// A matched anchor or snippet missing its required inner element is a
/// schema violation and fails the fragment.
async fn map_fragment(fragment: &str) -> Result<Vec<SearchRecord>, ExtractError> {
    let doc = Html::parse_fragment(fragment);
    let fail = || ExtractError::WebFragment {
        fragment: fragment.to_string(),
    };

    let mut links = Vec::new();
    for anchor in doc.select(&LINK_ANCHOR) {
        let inner = anchor.select(&INNER_DIV).next().ok_or_else(fail)?;
        links.push(element_text(&inner));
    }

    let mut titles = Vec::new();
    for anchor in doc.select(&TITLE_ANCHOR) {
        let inner = anchor.select(&INNER_SPAN).next().ok_or_else(fail)?;
        titles.push(element_text(&inner));
    }

    let mut snippets = Vec::new();
    for div in doc.select(&SNIPPET_DIV) {
        let inner = div.select(&INNER_SPAN).next().ok_or_else(fail)?;
        snippets.push(element_text(&inner));
    }

    // Source names sit in a paragraph nested three divs deep, with no
    // span children (those paragraphs belong to snippets).
    let mut seen: HashSet<_> = HashSet::new();
    let mut sources = Vec::new();
    for p in doc.select(&SOURCE_PARAGRAPH) {
        if p.select(&INNER_SPAN).next().is_none() && seen.insert(p.id()) {
            sources.push(element_text(&p));
        }
    }

    let records = links
        .into_iter()
        .zip(titles)
        .zip(snippets)
        .zip(sources)
        .map(|(((link, title), snippet), source)| SearchRecord {
            kind: RecordKind::Web,
            link: Some(link),
            title: Some(title),
            snippet: Some(snippet),
            source: Some(source),
            relative_time: None,
        })
        .collect();

    Ok(records)
}
