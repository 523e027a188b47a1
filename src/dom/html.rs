/*!
 * HTML parsing and serialisation for the live document.
 *
 * Parsing is delegated to scraper (html5ever); the resulting tree is copied
 * into the document arena so that later mutations stay under our control.
 */

use std::ops::Deref;

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{Html, Node};

use super::{ElementData, NodeData};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(super) fn parse_document_into(tree: &mut Tree<NodeData>, source: &str) {
    let parsed = Html::parse_document(source);
    let root = tree.root().id();
    for child in parsed.tree.root().children() {
        copy_node(tree, root, child);
    }
}

/// Parse a fragment and append its top-level nodes to `parent`.
///
/// html5ever wraps fragments in a synthetic `<html>` element which is
/// unwrapped here.
pub(super) fn parse_fragment_into(
    tree: &mut Tree<NodeData>,
    parent: NodeId,
    fragment: &str,
) -> Vec<NodeId> {
    let parsed = Html::parse_fragment(fragment);
    let mut added = Vec::new();
    for top in parsed.tree.root().children() {
        let is_wrapper = matches!(top.value(), Node::Element(element) if element.name() == "html");
        if is_wrapper {
            for child in top.children() {
                added.extend(copy_node(tree, parent, child));
            }
        } else {
            added.extend(copy_node(tree, parent, top));
        }
    }
    added
}

fn copy_node(tree: &mut Tree<NodeData>, parent: NodeId, node: NodeRef<'_, Node>) -> Option<NodeId> {
    let data = match node.value() {
        Node::Element(element) => NodeData::Element(ElementData::with_attrs(element.name(), element.attrs())),
        Node::Text(text) => NodeData::Text(text.deref().to_string()),
        Node::Comment(comment) => NodeData::Comment(comment.deref().to_string()),
        _ => return None,
    };
    let id = tree.get_mut(parent)?.append(data).id();
    for child in node.children() {
        copy_node(tree, id, child);
    }
    Some(id)
}

pub(super) fn serialize(node: NodeRef<'_, NodeData>, out: &mut String) {
    match node.value() {
        NodeData::Document => {
            for child in node.children() {
                serialize(child, out);
            }
        }
        NodeData::Text(text) => {
            let raw = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|e| RAW_TEXT_ELEMENTS.contains(&e.tag())))
                .unwrap_or(false);
            if raw {
                out.push_str(text);
            } else {
                escape_into(text, false, out);
            }
        }
        NodeData::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(element.tag());
            for (name, value) in element.attributes() {
                out.push(' ');
                out.push_str(&name);
                out.push_str("=\"");
                escape_into(&value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&element.tag()) {
                return;
            }
            for child in node.children() {
                serialize(child, out);
            }
            out.push_str("</");
            out.push_str(element.tag());
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
