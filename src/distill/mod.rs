//! HTML distillation engine.
//!
//! Pure functions from raw markup to a reduced document plus a removal
//! report. The `scraper` DOM is never mutated: each cleanup stage
//! collects node IDs into a removal set, and a single rewrite pass
//! serializes everything that survived. That keeps `distill`
//! deterministic and free of I/O.

mod rewrite;
mod strategies;

pub use strategies::{distill_structure_only, distill_ultra_minimal};

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use regex::Regex;
use scraper::{Html, Node, Selector};
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

use rewrite::TagAction;

/// Tags that survive structural simplification; everything else is
/// unwrapped in place.
pub(crate) const SEMANTIC_TAGS: &[&str] = &[
    "html", "head", "body", "title", "meta", "link", "header", "nav", "main", "section",
    "article", "aside", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "p", "div", "span", "a",
    "ul", "ol", "li", "table", "thead", "tbody", "tr", "td", "th", "form", "input", "button",
    "select", "option", "img", "figure", "figcaption",
];

/// Block-level tags that get a line break in text-flattening mode.
pub(crate) const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr",
];

/// HTML void elements: serialized without a closing tag.
pub(crate) const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Attributes kept on every element regardless of tag.
const ESSENTIAL_ATTRS: &[&str] = &[
    "id", "href", "src", "alt", "title", "role", "aria-label", "aria-labelledby",
];

/// Form-semantic attributes, dropped when the config asks for them to
/// be kept out of the reduced document.
const SEMANTIC_EXTRA_ATTRS: &[&str] = &["type", "name", "value"];

/// Attributes an `<img>` may carry into later stages.
const IMG_ESSENTIAL: &[&str] = &["src", "alt", "title", "class", "id"];

/// `<link rel>` tokens worth keeping.
const LINK_REL_ALLOW: &[&str] = &["canonical", "alternate", "shortlink"];

/// meta name/property values worth keeping (lowercased comparison).
const IMPORTANT_META: &[&str] = &[
    "description",
    "keywords",
    "author",
    "robots",
    "og:title",
    "og:description",
    "og:type",
    "twitter:title",
    "twitter:description",
];

/// Selectors for elements hidden from rendering.
const HIDDEN_SELECTORS: &[&str] = &[
    r#"[style*="display:none"]"#,
    r#"[style*="display: none"]"#,
    r#"[style*="visibility:hidden"]"#,
    r#"[style*="visibility: hidden"]"#,
    ".hidden",
    ".d-none",
    ".sr-only",
    ".screen-reader-text",
];

/// Class/id substring heuristics for ads, trackers, and third-party
/// embeds.
const AD_SELECTORS: &[&str] = &[
    r#"[class*="google-ad"]"#,
    r#"[class*="advertisement"]"#,
    r#"[class*="banner"]"#,
    r#"[id*="google_ads"]"#,
    r#"[class*="tracking"]"#,
    r#"[class*="analytics"]"#,
    r#"iframe[src*="google"]"#,
    r#"iframe[src*="facebook"]"#,
    r#"iframe[src*="twitter"]"#,
    r#"[class*="social-share"]"#,
];

static MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("static regex"));
static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").expect("static regex"));

/// Marker appended to every truncated document.
pub const TRUNCATION_MARKER: &str = "\n<!-- [TRUNCATED] -->";

/// Switches for [`distill`].
#[derive(Debug, Clone)]
pub struct DistillConfig {
    /// Keep semantic tags as markup. When false, the document is
    /// flattened to text with line breaks after block elements.
    pub preserve_structure: bool,
    /// Byte budget for the output; exceeding it truncates at a tag
    /// boundary and appends [`TRUNCATION_MARKER`].
    pub max_length: Option<usize>,
    /// Drop `class` attributes.
    pub remove_classes: bool,
    /// Drop form-semantic attributes (`type`, `name`, `value`) too.
    pub keep_semantic_attrs: bool,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            preserve_structure: true,
            max_length: None,
            remove_classes: true,
            keep_semantic_attrs: false,
        }
    }
}

/// Per-category removal counters. Elements inside an already-removed
/// subtree are not re-counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovalCounts {
    pub comments: usize,
    pub scripts: usize,
    pub styles: usize,
    pub svgs: usize,
    pub data_uri_images: usize,
    pub meta_tags: usize,
    pub hidden_elements: usize,
    pub ads_trackers: usize,
    pub classes_removed: usize,
    pub attributes_removed: usize,
}

/// Output of [`distill`].
#[derive(Debug, Clone, Serialize)]
pub struct DistillationResult {
    pub cleaned_html: String,
    /// Input size in bytes.
    pub original_size: usize,
    /// Output size in bytes.
    pub cleaned_size: usize,
    /// Percent reduction; 0.0 for empty input.
    pub compression_ratio: f64,
    pub removed: RemovalCounts,
}

/// Reduce a document to its semantic core.
///
/// Stages, in order: strip comments; scripts; styles and non-canonical
/// links; SVGs; data-URI images; unimportant meta tags; hidden
/// elements; ad/tracker elements. Then filter attributes, simplify
/// structure (or flatten to text), normalize whitespace, and truncate
/// to the configured budget.
pub fn distill(html: &str, config: &DistillConfig) -> DistillationResult {
    let original_size = html.len();
    let doc = Html::parse_document(html);
    let shell = has_document_shell(html);
    let mut counts = RemovalCounts::default();
    let mut removed: HashSet<NodeId> = HashSet::new();

    remove_comments(&doc, &mut removed, &mut counts);
    remove_scripts(&doc, &mut removed, &mut counts);
    remove_styles_and_links(&doc, &mut removed, &mut counts);
    remove_svgs(&doc, &mut removed, &mut counts);
    remove_data_uri_images(&doc, &mut removed, &mut counts);
    remove_unimportant_meta(&doc, &mut removed, &mut counts);
    remove_matching(&doc, &mut removed, HIDDEN_SELECTORS, |c| &mut c.hidden_elements, &mut counts);
    remove_matching(&doc, &mut removed, AD_SELECTORS, |c| &mut c.ads_trackers, &mut counts);
    count_attribute_removals(&doc, &removed, config, &mut counts);

    let body = if config.preserve_structure {
        rewrite::serialize_markup(
            &doc,
            &removed,
            &|tag| {
                if !shell && matches!(tag, "html" | "head" | "body") {
                    return TagAction::Unwrap;
                }
                if SEMANTIC_TAGS.contains(&tag) {
                    TagAction::Keep
                } else {
                    TagAction::Unwrap
                }
            },
            &|tag, attr| attr_kept(tag, attr, config),
        )
    } else {
        rewrite::flatten_text(&doc, &removed)
    };

    let cleaned = normalize_whitespace(&body);
    let cleaned_html = match config.max_length {
        Some(max) => truncate_markup(cleaned, max),
        None => cleaned,
    };

    let cleaned_size = cleaned_html.len();
    let compression_ratio = if original_size == 0 {
        0.0
    } else {
        (original_size as f64 - cleaned_size as f64) / original_size as f64 * 100.0
    };

    DistillationResult {
        cleaned_html,
        original_size,
        cleaned_size,
        compression_ratio,
        removed: counts,
    }
}

/// Per-tag element counts used to gauge how much a page will reduce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructureAnalysis {
    pub total_elements: usize,
    pub scripts: usize,
    pub styles: usize,
    pub images: usize,
    pub svgs: usize,
    pub forms: usize,
    pub tables: usize,
    pub links: usize,
    pub headings: usize,
    pub semantic_elements: usize,
    pub data_uri_images: usize,
    pub comments: usize,
}

/// Count the distillation-relevant features of a document.
pub fn analyze_structure(html: &str) -> StructureAnalysis {
    const SECTIONING: &[&str] = &[
        "header", "nav", "main", "section", "article", "aside", "footer",
    ];

    let doc = Html::parse_document(html);
    let mut report = StructureAnalysis::default();

    for node in doc.tree.root().descendants() {
        match node.value() {
            Node::Comment(_) => report.comments += 1,
            Node::Element(el) => {
                report.total_elements += 1;
                let name = el.name();
                match name {
                    "script" => report.scripts += 1,
                    "style" => report.styles += 1,
                    "svg" => report.svgs += 1,
                    "form" => report.forms += 1,
                    "table" => report.tables += 1,
                    "a" => report.links += 1,
                    "img" => {
                        report.images += 1;
                        if el.attr("src").is_some_and(|src| src.starts_with("data:")) {
                            report.data_uri_images += 1;
                        }
                    }
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => report.headings += 1,
                    _ => {}
                }
                if SECTIONING.contains(&name) {
                    report.semantic_elements += 1;
                }
            }
            _ => {}
        }
    }

    report
}

/// True when the source itself carries a document shell. The parser
/// always inserts `html`/`head`/`body` wrappers; for fragment-shaped
/// input they are unwrapped again so output never outgrows input.
pub(crate) fn has_document_shell(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    lower.contains("<html") || lower.contains("<body")
}

/// True when the node or one of its ancestors is already removed.
pub(crate) fn is_covered(removed: &HashSet<NodeId>, node: NodeRef<'_, Node>) -> bool {
    removed.contains(&node.id()) || node.ancestors().any(|a| removed.contains(&a.id()))
}

fn remove_comments(doc: &Html, removed: &mut HashSet<NodeId>, counts: &mut RemovalCounts) {
    for node in doc.tree.root().descendants() {
        if node.value().is_comment() && !is_covered(removed, node) {
            removed.insert(node.id());
            counts.comments += 1;
        }
    }
}

fn remove_scripts(doc: &Html, removed: &mut HashSet<NodeId>, counts: &mut RemovalCounts) {
    for node in doc.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        if matches!(el.name(), "script" | "noscript") && !is_covered(removed, node) {
            removed.insert(node.id());
            counts.scripts += 1;
        }
    }
}

fn remove_styles_and_links(doc: &Html, removed: &mut HashSet<NodeId>, counts: &mut RemovalCounts) {
    for node in doc.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        if is_covered(removed, node) {
            continue;
        }
        let drop = match el.name() {
            "style" => true,
            "link" => !el
                .attr("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|t| LINK_REL_ALLOW.contains(&t))),
            _ => false,
        };
        if drop {
            removed.insert(node.id());
            counts.styles += 1;
        }
    }
}

fn remove_svgs(doc: &Html, removed: &mut HashSet<NodeId>, counts: &mut RemovalCounts) {
    for node in doc.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        if el.name() == "svg" && !is_covered(removed, node) {
            removed.insert(node.id());
            counts.svgs += 1;
        }
    }
}

fn remove_data_uri_images(doc: &Html, removed: &mut HashSet<NodeId>, counts: &mut RemovalCounts) {
    for node in doc.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        if el.name() == "img"
            && el.attr("src").is_some_and(|src| src.starts_with("data:"))
            && !is_covered(removed, node)
        {
            removed.insert(node.id());
            counts.data_uri_images += 1;
        }
    }
}

fn remove_unimportant_meta(doc: &Html, removed: &mut HashSet<NodeId>, counts: &mut RemovalCounts) {
    for node in doc.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        if el.name() != "meta" || is_covered(removed, node) {
            continue;
        }
        // Either attribute can carry the important key.
        let important = ["name", "property"].iter().any(|&key| {
            el.attr(key)
                .is_some_and(|v| IMPORTANT_META.contains(&v.to_lowercase().as_str()))
        });
        if !important {
            removed.insert(node.id());
            counts.meta_tags += 1;
        }
    }
}

fn remove_matching(
    doc: &Html,
    removed: &mut HashSet<NodeId>,
    selectors: &[&str],
    counter: impl Fn(&mut RemovalCounts) -> &mut usize,
    counts: &mut RemovalCounts,
) {
    for sel_str in selectors {
        let sel = match Selector::parse(sel_str) {
            Ok(sel) => sel,
            Err(err) => {
                debug!(selector = sel_str, error = %err.to_string(), "skipping unparseable removal selector");
                continue;
            }
        };
        for el in doc.select(&sel) {
            if !is_covered(removed, *el) {
                removed.insert(el.id());
                *counter(counts) += 1;
            }
        }
    }
}

/// Count the class/attribute drops the rewrite pass will perform.
/// Separate from serialization so unwrapped elements still contribute.
fn count_attribute_removals(
    doc: &Html,
    removed: &HashSet<NodeId>,
    config: &DistillConfig,
    counts: &mut RemovalCounts,
) {
    for node in doc.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        if is_covered(removed, node) {
            continue;
        }
        let tag = el.name();
        for (attr, _) in el.attrs() {
            // Non-essential img attributes were already shed uncounted.
            if tag == "img" && !IMG_ESSENTIAL.contains(&attr) {
                continue;
            }
            if attr.starts_with("data-") {
                continue;
            }
            if attr == "class" {
                if config.remove_classes {
                    counts.classes_removed += 1;
                }
                continue;
            }
            if !essential_attr(attr, config) {
                counts.attributes_removed += 1;
            }
        }
    }
}

fn essential_attr(attr: &str, config: &DistillConfig) -> bool {
    ESSENTIAL_ATTRS.contains(&attr)
        || (!config.keep_semantic_attrs && SEMANTIC_EXTRA_ATTRS.contains(&attr))
}

/// Decide whether an attribute survives into the reduced document.
pub(crate) fn attr_kept(tag: &str, attr: &str, config: &DistillConfig) -> bool {
    if tag == "img" && !IMG_ESSENTIAL.contains(&attr) {
        return false;
    }
    if attr.starts_with("data-") {
        return true;
    }
    if attr == "class" {
        return !config.remove_classes;
    }
    essential_attr(attr, config)
}

/// Collapse runs of blank lines and spaces, trim each line, drop empty
/// lines.
pub(crate) fn normalize_whitespace(s: &str) -> String {
    let s = MULTI_NEWLINE.replace_all(s, "\n\n");
    let s = MULTI_SPACE.replace_all(&s, " ");
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to `max` bytes, preferring the last tag boundary in the
/// window when it falls past 80% of the budget, and append the marker.
fn truncate_markup(s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    let keep = match s[..cut].rfind('>') {
        Some(pos) if pos as f64 > max as f64 * 0.8 => &s[..pos + 1],
        _ => &s[..cut],
    };
    format!("{keep}{TRUNCATION_MARKER}")
}
