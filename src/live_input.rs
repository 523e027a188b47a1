/*!
 * Live input handling.
 *
 * Editable fields bypass the batched pass: every edit reclassifies the
 * field's current content and writes its direction immediately, inside the
 * event that reported the edit. Fields are discovered during annotation
 * passes and wired once, tracked both in the registry and by a marker
 * attribute on the element.
 */

use std::collections::HashSet;

use log::{debug, trace};

use crate::annotator::Direction;
use crate::app_config::Config;
use crate::dom::{Document, ElementData, NodeId};
use crate::errors::DomError;
use crate::exclusion::ExclusionPolicy;
use crate::language_utils::normalize_language_tag;
use crate::script::ScriptClassifier;

/// Whether the element is an editable field whose content the user types
pub fn is_live_input(element: &ElementData) -> bool {
    match element.tag() {
        "textarea" => true,
        "input" => matches!(
            element.attr("type").map(|kind| kind.trim().to_ascii_lowercase()).as_deref(),
            None | Some("") | Some("text") | Some("search")
        ),
        _ => matches!(
            element
                .attr("contenteditable")
                .map(|value| value.trim().to_ascii_lowercase())
                .as_deref(),
            Some("") | Some("true") | Some("plaintext-only")
        ),
    }
}

/// Current content of a live input: the `value` attribute of an `<input>`,
/// the text content of anything else.
pub fn input_value(doc: &Document, id: NodeId) -> Option<String> {
    let element = doc.element(id)?;
    if element.tag() == "input" {
        Some(element.attr("value").unwrap_or_default().to_string())
    } else {
        Some(doc.text_content(id))
    }
}

/// Registry of wired live inputs
#[derive(Debug)]
pub struct InputRegistry {
    classifier: ScriptClassifier,
    typeface_class: String,
    wired_attribute: String,
    language_tag: String,
    wired: HashSet<NodeId>,
}

impl Default for InputRegistry {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl InputRegistry {
    pub fn new(config: &Config) -> Self {
        let annotation = &config.annotation;
        Self {
            classifier: ScriptClassifier::new(config.classifier.ranges),
            typeface_class: annotation.typeface_class.clone(),
            wired_attribute: annotation.input_wired_attribute.clone(),
            language_tag: normalize_language_tag(&annotation.language_tag)
                .unwrap_or_else(|_| annotation.language_tag.clone()),
            wired: HashSet::new(),
        }
    }

    pub fn is_wired(&self, id: NodeId) -> bool {
        self.wired.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.wired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wired.is_empty()
    }

    /// Wire every live input in the subtree that is not wired yet.
    ///
    /// Inputs inside excluded subtrees are left alone. Returns the newly
    /// wired inputs in document order.
    pub fn discover(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        exclusion: &ExclusionPolicy,
    ) -> Result<Vec<NodeId>, DomError> {
        if !doc.is_attached(root) {
            return Ok(Vec::new());
        }

        let candidates: Vec<NodeId> = doc
            .descendants(root)
            .into_iter()
            .filter(|id| !self.wired.contains(id))
            .filter(|id| doc.element(*id).is_some_and(is_live_input))
            .filter(|id| !exclusion.is_excluded(doc, *id))
            .collect();

        for id in &candidates {
            self.wire(doc, *id)?;
        }
        if !candidates.is_empty() {
            debug!("Wired {} live input(s)", candidates.len());
        }
        Ok(candidates)
    }

    fn wire(&mut self, doc: &mut Document, id: NodeId) -> Result<(), DomError> {
        doc.add_class(id, &self.typeface_class)?;
        doc.set_attr(id, &self.wired_attribute, "true")?;
        self.wired.insert(id);

        let value = input_value(doc, id).unwrap_or_default();
        if !value.trim().is_empty() {
            let direction = self.direction_of(&value);
            self.write(doc, id, direction)?;
        }
        trace!("Wired live input {:?}", id);
        Ok(())
    }

    fn direction_of(&self, value: &str) -> Direction {
        if self.classifier.is_target(value) {
            Direction::Rtl
        } else {
            Direction::Ltr
        }
    }

    fn write(&self, doc: &mut Document, id: NodeId, direction: Direction) -> Result<(), DomError> {
        match direction {
            Direction::Rtl => {
                doc.set_style(id, "direction", "rtl")?;
                doc.set_style(id, "text-align", "right")?;
                doc.set_attr(id, "lang", &self.language_tag)?;
            }
            _ => {
                doc.set_style(id, "direction", "ltr")?;
                doc.set_style(id, "text-align", "left")?;
                let ours = doc
                    .element(id)
                    .is_some_and(|element| element.attr("lang") == Some(self.language_tag.as_str()));
                if ours {
                    doc.remove_attr(id, "lang")?;
                }
            }
        }
        Ok(())
    }

    /// Handle an edit of a wired input.
    ///
    /// Returns the direction written, or `None` when the node is not a wired
    /// input (unknown or detached nodes included).
    pub fn on_input(&mut self, doc: &mut Document, id: NodeId) -> Result<Option<Direction>, DomError> {
        if !self.wired.contains(&id) || !doc.is_attached(id) {
            return Ok(None);
        }
        let value = input_value(doc, id).unwrap_or_default();
        let direction = self.direction_of(&value);
        self.write(doc, id, direction)?;
        trace!("Input {:?} is now {:?}", id, direction);
        Ok(Some(direction))
    }

    /// Handle focus on a wired input: only ever switches it to RTL
    pub fn on_focus(&mut self, doc: &mut Document, id: NodeId) -> Result<Option<Direction>, DomError> {
        if !self.wired.contains(&id) || !doc.is_attached(id) {
            return Ok(None);
        }
        let value = input_value(doc, id).unwrap_or_default();
        if !self.classifier.is_target(&value) {
            return Ok(None);
        }
        self.write(doc, id, Direction::Rtl)?;
        Ok(Some(Direction::Rtl))
    }

    /// Forget inputs that are no longer part of the document
    pub fn prune(&mut self, doc: &Document) -> usize {
        let before = self.wired.len();
        self.wired.retain(|id| doc.is_attached(*id));
        before - self.wired.len()
    }
}
