/*!
 * Exclusion policy.
 *
 * Decides which elements must never be annotated: script/style and other
 * structural elements, and verbatim/code containers. Exclusion is inherited,
 * so a node is excluded as soon as any of its ancestors is. The verdict is
 * computed afresh on every call.
 */

use crate::app_config::ExclusionConfig;
use crate::dom::{Document, ElementData, NodeId};

/// Predicate over tree nodes
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    skip_tags: Vec<String>,
    verbatim_tags: Vec<String>,
    verbatim_class_markers: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::new(&ExclusionConfig::default())
    }
}

impl ExclusionPolicy {
    pub fn new(config: &ExclusionConfig) -> Self {
        Self {
            skip_tags: config.skip_tags.iter().map(|tag| tag.to_ascii_lowercase()).collect(),
            verbatim_tags: config.verbatim_tags.iter().map(|tag| tag.to_ascii_lowercase()).collect(),
            verbatim_class_markers: config
                .verbatim_class_markers
                .iter()
                .map(|marker| marker.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether the element itself is excluded, ignoring its ancestors.
    ///
    /// Tags match exactly; class names match when they contain any class marker.
    pub fn excludes_element(&self, element: &ElementData) -> bool {
        let tag = element.tag();
        if self.skip_tags.iter().chain(&self.verbatim_tags).any(|skip| skip == tag) {
            return true;
        }
        element.classes().iter().any(|class| {
            let class = class.to_ascii_lowercase();
            self.verbatim_class_markers
                .iter()
                .any(|marker| class.contains(marker.as_str()))
        })
    }

    /// Whether the node or any of its ancestors is excluded
    pub fn is_excluded(&self, doc: &Document, node: NodeId) -> bool {
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .filter_map(|id| doc.element(id))
            .any(|element| self.excludes_element(element))
    }
}
