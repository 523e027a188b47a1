/*!
 * Common test utilities for the persian-rtl test suite
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use persian_rtl::dom::{Document, ElementData, NodeId};
use tempfile::TempDir;

/// A small chat transcript: Latin and Persian paragraphs and a code block
pub const CHAT_HTML: &str = concat!(
    "<html><head><title>chat</title></head><body>",
    "<div class=\"font-user-message\"><p>Hello world</p></div>",
    "<div class=\"font-claude-message\"><p>سلام دنیا</p>",
    "<pre><code>سلام</code></pre></div>",
    "</body></html>"
);

/// Route library logs to the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Wrap body content into a complete document
pub fn page(body: &str) -> Document {
    Document::parse_html(&format!("<html><head></head><body>{}</body></html>", body))
}

/// First element with the given tag whose full text equals `text`
pub fn find_element(doc: &Document, tag: &str, text: &str) -> NodeId {
    doc.descendants(doc.root())
        .into_iter()
        .find(|id| doc.element(*id).is_some_and(|e| e.tag() == tag) && doc.text_content(*id) == text)
        .unwrap_or_else(|| panic!("no <{}> with text {:?}", tag, text))
}

/// First element with the given tag
pub fn find_tag(doc: &Document, tag: &str) -> NodeId {
    doc.find(doc.root(), |e| e.tag() == tag)
        .unwrap_or_else(|| panic!("no <{}> in document", tag))
}

/// Element data of a node that must be an element
pub fn element(doc: &Document, id: NodeId) -> &ElementData {
    doc.element(id).expect("node should be an element")
}

/// Whether the element carries the RTL marks
pub fn is_marked_rtl(doc: &Document, id: NodeId) -> bool {
    let element = element(doc, id);
    element.style("direction") == Some("rtl")
        && element.style("text-align") == Some("right")
        && element.attr("data-rtl-processed") == Some("true")
}

/// Whether the element carries the LTR marks
pub fn is_marked_ltr(doc: &Document, id: NodeId) -> bool {
    let element = element(doc, id);
    element.style("direction") == Some("ltr")
        && element.style("text-align") == Some("left")
        && element.attr("data-rtl-processed") == Some("true")
}
