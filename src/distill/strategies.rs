//! Aggressive named distillation strategies built on the same
//! removal-set and rewrite primitives as [`distill`](super::distill).

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{Html, Node, Selector};

use super::rewrite::{self, escape_attr, escape_text, TagAction};
use super::{has_document_shell, is_covered, normalize_whitespace, VOID_TAGS};

/// Per-tag attribute allow-list for the ultra-minimal strategy. Tags
/// not listed keep no attributes at all.
const ULTRA_MINIMAL_ATTRS: &[(&str, &[&str])] = &[
    ("a", &["href"]),
    ("img", &["src", "alt"]),
    ("input", &["type", "name", "value"]),
    ("form", &["action", "method"]),
];

/// Navigation-relevant elements rebuilt by the structure-only strategy,
/// in emission order.
const STRUCTURE_SELECTORS: &[&str] = &[
    "nav", "header", "footer", "main", "aside", "a[href]", "form", "input", "button", "select",
    "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "table", "tr", "td", "th",
];

/// Strip comments, scripts, styles, SVGs, and data-URI images, keep
/// every remaining tag, and reduce attributes to a tiny per-tag
/// allow-list.
pub fn distill_ultra_minimal(html: &str) -> String {
    let doc = Html::parse_document(html);
    let shell = has_document_shell(html);
    let mut removed: HashSet<NodeId> = HashSet::new();

    for node in doc.tree.root().descendants() {
        if is_covered(&removed, node) {
            continue;
        }
        let drop = match node.value() {
            Node::Comment(_) => true,
            Node::Element(el) => {
                matches!(el.name(), "script" | "noscript" | "style" | "svg")
                    || (el.name() == "img"
                        && el.attr("src").is_some_and(|src| src.starts_with("data:")))
            }
            _ => false,
        };
        if drop {
            removed.insert(node.id());
        }
    }

    let body = rewrite::serialize_markup(
        &doc,
        &removed,
        &|tag| {
            if !shell && matches!(tag, "html" | "head" | "body") {
                TagAction::Unwrap
            } else {
                TagAction::Keep
            }
        },
        &|tag, attr| {
            ULTRA_MINIMAL_ATTRS
                .iter()
                .any(|(t, attrs)| *t == tag && attrs.contains(&attr))
        },
    );
    normalize_whitespace(&body)
}

/// Rebuild a minimal document holding only navigation-relevant elements
/// with their text and at most one identifying attribute.
pub fn distill_structure_only(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut body = String::new();

    for sel_str in STRUCTURE_SELECTORS {
        // Selectors here are static and known-good.
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        for el in doc.select(&sel) {
            let tag = el.value().name();
            let ident = match tag {
                "a" => el.value().attr("href").map(|v| ("href", v)),
                "input" | "button" => el.value().attr("type").map(|v| ("type", v)),
                "form" => el.value().attr("action").map(|v| ("action", v)),
                _ => None,
            };

            body.push('<');
            body.push_str(tag);
            if let Some((name, value)) = ident {
                body.push(' ');
                body.push_str(name);
                body.push_str("=\"");
                body.push_str(&escape_attr(value));
                body.push('"');
            }
            body.push('>');
            if VOID_TAGS.contains(&tag) {
                continue;
            }

            let text: String = el
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            body.push_str(&escape_text(&text));
            body.push_str("</");
            body.push_str(tag);
            body.push('>');
        }
    }

    format!("<html><body>{body}</body></html>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ultra_minimal_keeps_only_listed_attributes() {
        let html = r#"<html><body>
            <a href="/x" class="btn" onclick="go()">link</a>
            <img src="/p.png" alt="p" width="10">
            <div id="wrapper" role="main">text</div>
            <script>var x;</script>
            </body></html>"#;
        let out = distill_ultra_minimal(html);
        assert!(out.contains(r#"<a href="/x">link</a>"#));
        // Attributes come out of the parser name-sorted.
        assert!(out.contains(r#"<img alt="p" src="/p.png">"#));
        assert!(out.contains("<div>text</div>"));
        assert!(!out.contains("script"));
        assert!(!out.contains("onclick"));
        assert!(!out.contains("wrapper"));
    }

    #[test]
    fn ultra_minimal_fragment_input_stays_bare() {
        let out = distill_ultra_minimal(r#"<a href="/x">link</a>"#);
        assert_eq!(out, r#"<a href="/x">link</a>"#);
    }

    #[test]
    fn ultra_minimal_drops_data_uri_images() {
        let html = r#"<html><body><img src="data:image/gif;base64,AA" alt="x"></body></html>"#;
        let out = distill_ultra_minimal(html);
        assert!(!out.contains("data:image"));
    }

    #[test]
    fn structure_only_rebuilds_navigation_skeleton() {
        let html = r#"<html><body>
            <nav>Menu</nav>
            <a href="/about" class="x">About</a>
            <form action="/search" method="get"><input type="text" name="q"></form>
            <p>long article text that should vanish</p>
            </body></html>"#;
        let out = distill_structure_only(html);
        assert!(out.starts_with("<html><body>"));
        assert!(out.ends_with("</body></html>"));
        assert!(out.contains(r#"<a href="/about">About</a>"#));
        assert!(out.contains(r#"<form action="/search">"#));
        assert!(out.contains(r#"<input type="text">"#));
        assert!(!out.contains("long article text"));
        assert!(!out.contains("class="));
    }
}
