//! Loose news result mapping: best-effort fields, per-fragment failure
//! isolation.

use std::sync::LazyLock;

use futures::future::join_all;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::extract::{element_text, RecordKind, SearchRecord};

static ANY_FIELD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a, h2, span, p, div").expect("static selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").expect("static selector"));
static SOURCE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("static selector"));
static SNIPPET: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").expect("static selector"));
static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").expect("static selector"));

/// Map every fragment concurrently. Mapping failures are logged and
/// skipped; mapped records without a link are dropped.
pub(super) async fn extract_news(fragments: &[String]) -> Result<Vec<SearchRecord>, ExtractError> {
    let results = join_all(fragments.iter().map(|f| map_fragment(f))).await;
    let mut records = Vec::new();
    for result in results {
        match result {
            Err(err) => warn!(error = %err, "failed to map news fragment, skipping"),
            Ok(record) if record.link.is_none() => {
                debug!("news fragment had no link, dropping record")
            }
            Ok(record) => records.push(record),
        }
    }
    Ok(records)
}

async fn map_fragment(fragment: &str) -> Result<SearchRecord, ExtractError> {
    let doc = Html::parse_fragment(fragment);

    // A fragment with none of the recognizable elements is malformed
    // rather than merely sparse.
    if doc.select(&ANY_FIELD).next().is_none() {
        return Err(ExtractError::NewsFragment {
            fragment: fragment.to_string(),
        });
    }

    let link = doc
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);
    let title = doc.select(&TITLE).next().map(|el| element_text(&el));
    let source = doc.select(&SOURCE).next().map(|el| element_text(&el));
    let snippet = doc.select(&SNIPPET).next().map(|el| element_text(&el));

    // The relative age lives in a leaf div whose text mentions "ago".
    let relative_time = doc
        .select(&DIV)
        .filter(|div| !div.children().any(|c| c.value().is_element()))
        .map(|div| element_text(&div))
        .find(|text| !text.is_empty() && text.contains("ago"));

    Ok(SearchRecord {
        kind: RecordKind::News,
        link,
        title,
        snippet,
        source,
        relative_time,
    })
}
