//! Single-pass serialization of a parsed document minus a removal set.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node};

use super::{BLOCK_TAGS, VOID_TAGS};

/// What to do with an element tag during serialization.
pub(crate) enum TagAction {
    Keep,
    /// Emit the element's children in place of the element.
    Unwrap,
}

/// Serialize the document as markup, skipping removed subtrees,
/// unwrapping tags per `tag_action`, and filtering attributes per
/// `attr_keep(tag, attr)`.
pub(crate) fn serialize_markup(
    doc: &Html,
    removed: &HashSet<NodeId>,
    tag_action: &dyn Fn(&str) -> TagAction,
    attr_keep: &dyn Fn(&str, &str) -> bool,
) -> String {
    let mut out = String::new();
    for child in doc.tree.root().children() {
        write_node(child, removed, tag_action, attr_keep, &mut out);
    }
    out
}

fn write_node(
    node: NodeRef<'_, Node>,
    removed: &HashSet<NodeId>,
    tag_action: &dyn Fn(&str) -> TagAction,
    attr_keep: &dyn Fn(&str, &str) -> bool,
    out: &mut String,
) {
    if removed.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Doctype(doctype) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(&doctype.name());
            out.push('>');
        }
        Node::Element(el) => {
            let tag = el.name();
            match tag_action(tag) {
                TagAction::Unwrap => {
                    for child in node.children() {
                        write_node(child, removed, tag_action, attr_keep, out);
                    }
                }
                TagAction::Keep => {
                    out.push('<');
                    out.push_str(tag);
                    // Attributes iterate name-sorted out of the parser,
                    // so emission order is deterministic.
                    for (attr, value) in el.attrs() {
                        if attr_keep(tag, attr) {
                            out.push(' ');
                            out.push_str(attr);
                            out.push_str("=\"");
                            out.push_str(&escape_attr(value));
                            out.push('"');
                        }
                    }
                    out.push('>');
                    if VOID_TAGS.contains(&tag) {
                        return;
                    }
                    for child in node.children() {
                        write_node(child, removed, tag_action, attr_keep, out);
                    }
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
            }
        }
        Node::Comment(_) | Node::ProcessingInstruction(_) => {}
        // Document/Fragment wrappers.
        _ => {
            for child in node.children() {
                write_node(child, removed, tag_action, attr_keep, out);
            }
        }
    }
}

/// Flatten the document to whitespace-joined text, with a line break
/// after each block-level element.
pub(crate) fn flatten_text(doc: &Html, removed: &HashSet<NodeId>) -> String {
    let mut out = String::new();
    collect_text(doc.tree.root(), removed, &mut out);
    out
}

fn collect_text(node: NodeRef<'_, Node>, removed: &HashSet<NodeId>, out: &mut String) {
    if removed.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Text(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() && !out.ends_with('\n') && !out.ends_with(' ') {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
        }
        Node::Element(el) => {
            for child in node.children() {
                collect_text(child, removed, out);
            }
            if BLOCK_TAGS.contains(&el.name()) && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
        }
        Node::Comment(_) | Node::ProcessingInstruction(_) | Node::Doctype(_) => {}
        _ => {
            for child in node.children() {
                collect_text(child, removed, out);
            }
        }
    }
}

pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub(crate) fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_significant_characters() {
        assert_eq!(escape_text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_attr(r#"say "hi" <now>"#), "say &quot;hi&quot; &lt;now&gt;");
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let doc = Html::parse_document(r#"<html><body><img src="/x.png"><br></body></html>"#);
        let out = serialize_markup(&doc, &HashSet::new(), &|_| TagAction::Keep, &|_, _| true);
        assert!(out.contains(r#"<img src="/x.png">"#));
        assert!(out.contains("<br>"));
        assert!(!out.contains("</img>"));
        assert!(!out.contains("</br>"));
    }

    #[test]
    fn attributes_emit_in_name_order() {
        let doc =
            Html::parse_document(r#"<html><body><img src="/x.png" alt="x" title="t"></body></html>"#);
        let out = serialize_markup(&doc, &HashSet::new(), &|_| TagAction::Keep, &|_, _| true);
        assert!(out.contains(r#"<img alt="x" src="/x.png" title="t">"#));
    }

    #[test]
    fn unwrapping_promotes_children_in_order() {
        let doc = Html::parse_document("<html><body><p>a <b>b</b> c</p></body></html>");
        let out = serialize_markup(
            &doc,
            &HashSet::new(),
            &|tag| if tag == "b" { TagAction::Unwrap } else { TagAction::Keep },
            &|_, _| true,
        );
        assert!(out.contains("<p>a b c</p>"));
    }

    #[test]
    fn removed_subtrees_are_skipped_entirely() {
        let doc = Html::parse_document("<html><body><div><span>gone</span></div><p>kept</p></body></html>");
        let div_id = {
            let sel = scraper::Selector::parse("div").unwrap();
            doc.select(&sel).next().unwrap().id()
        };
        let removed: HashSet<_> = [div_id].into_iter().collect();
        let out = serialize_markup(&doc, &removed, &|_| TagAction::Keep, &|_, _| true);
        assert!(!out.contains("gone"));
        assert!(out.contains("<p>kept</p>"));
    }
}
