/*!
 * Direction annotator.
 *
 * Walks a subtree of the live document and writes direction, alignment and
 * typeface intent onto its elements. The walk is a single pre-order
 * traversal, so every decision can rely on the decisions already taken for
 * the ancestors above it.
 *
 * Per-node `AnnotationState` is owned here, keyed by node identity. A node
 * whose decision inputs (its text fingerprint and whether it inherits an RTL
 * mark) are unchanged is not classified again, which keeps repeated passes
 * free of observable mutations.
 */

use std::collections::HashMap;

use log::{debug, trace, warn};
use sha2::{Digest, Sha256};

use crate::app_config::{AnnotationConfig, Config, InlinePolicy};
use crate::dom::{Document, NodeData, NodeId};
use crate::errors::DomError;
use crate::exclusion::ExclusionPolicy;
use crate::language_utils::normalize_language_tag;
use crate::live_input::is_live_input;
use crate::script::{ClassificationResult, ScriptClassifier};

/// Blocks that decide their own direction regardless of their container
const STANDALONE_TAGS: &[&str] = &["p", "li", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Blocks evaluated as a single unit over all of their text
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

const LIST_TAGS: &[&str] = &["ol", "ul"];

/// Paragraph-level direction decided for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Rtl,
    Ltr,
    #[default]
    Unset,
}

/// Script class recorded for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptClass {
    Target,
    Other,
    #[default]
    Unset,
}

impl From<ClassificationResult> for ScriptClass {
    fn from(result: ClassificationResult) -> Self {
        match result {
            ClassificationResult::TargetScript => Self::Target,
            ClassificationResult::OtherScript => Self::Other,
        }
    }
}

/// What the annotator knows about one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationState {
    pub processed: bool,
    pub direction: Direction,
    pub script_class: ScriptClass,
    /// SHA-256 of the text the decision was derived from
    pub fingerprint: Option<String>,
    /// The RTL mark came from an ancestor rather than the node's own text
    pub inherited: bool,
}

impl AnnotationState {
    fn is_settled(&self) -> bool {
        self.processed && self.script_class != ScriptClass::Unset
    }
}

/// Counters for one `annotate` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateReport {
    /// Elements visited (excluded subtrees and live inputs not counted)
    pub visited: usize,
    /// Elements whose direction was derived (or re-derived) as RTL
    pub marked_rtl: usize,
    /// Elements whose direction was derived (or re-derived) as LTR
    pub marked_ltr: usize,
    /// Elements whose earlier decision was kept without classifying again
    pub reused: usize,
    /// Excluded subtrees pruned
    pub excluded: usize,
    pub lists_mirrored: usize,
}

impl std::ops::AddAssign for AnnotateReport {
    fn add_assign(&mut self, other: Self) {
        self.visited += other.visited;
        self.marked_rtl += other.marked_rtl;
        self.marked_ltr += other.marked_ltr;
        self.reused += other.reused;
        self.excluded += other.excluded;
        self.lists_mirrored += other.lists_mirrored;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct VisitContext {
    /// The nearest ancestor with a decided direction is RTL
    ancestor_rtl: bool,
    /// Descendants are explicitly given the RTL mark of an ancestor
    propagate: bool,
}

fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn is_zero_length(value: &str) -> bool {
    let number = value.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    number.parse::<f64>().map(|n| n == 0.0).unwrap_or(false)
}

/// Stateful subtree annotator
#[derive(Debug)]
pub struct Annotator {
    classifier: ScriptClassifier,
    exclusion: ExclusionPolicy,
    config: AnnotationConfig,
    language_tag: String,
    states: HashMap<NodeId, AnnotationState>,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Annotator {
    pub fn new(config: &Config) -> Self {
        let language_tag = normalize_language_tag(&config.annotation.language_tag).unwrap_or_else(|e| {
            warn!("Using language tag '{}' as is: {}", config.annotation.language_tag, e);
            config.annotation.language_tag.clone()
        });

        Self {
            classifier: ScriptClassifier::new(config.classifier.ranges),
            exclusion: ExclusionPolicy::new(&config.exclusion),
            config: config.annotation.clone(),
            language_tag,
            states: HashMap::new(),
        }
    }

    pub fn classifier(&self) -> &ScriptClassifier {
        &self.classifier
    }

    pub fn exclusion(&self) -> &ExclusionPolicy {
        &self.exclusion
    }

    pub fn config(&self) -> &AnnotationConfig {
        &self.config
    }

    /// The language tag written onto RTL nodes
    pub fn language_tag(&self) -> &str {
        &self.language_tag
    }

    pub fn state(&self, id: NodeId) -> Option<&AnnotationState> {
        self.states.get(&id)
    }

    pub fn tracked_nodes(&self) -> usize {
        self.states.len()
    }

    /// Drop the state of nodes that are no longer part of the document
    pub fn prune(&mut self, doc: &Document) -> usize {
        let before = self.states.len();
        self.states.retain(|id, _| doc.is_attached(*id));
        before - self.states.len()
    }

    /// Annotate the subtree rooted at `root`.
    ///
    /// A root that is no longer attached is a silent no-op. A root inside an
    /// excluded subtree or a live input is pruned. A root inside a heading is
    /// widened to the heading so the heading is re-evaluated as one unit, and a
    /// root inside a paragraph or list item is widened to that block.
    pub fn annotate(&mut self, doc: &mut Document, root: NodeId) -> Result<AnnotateReport, DomError> {
        let mut report = AnnotateReport::default();

        if !doc.contains(root) {
            return Err(DomError::UnknownNode(root));
        }
        if !doc.is_attached(root) {
            trace!("Skipping detached root {:?}", root);
            return Ok(report);
        }
        if self.exclusion.is_excluded(doc, root) {
            trace!("Skipping excluded root {:?}", root);
            report.excluded += 1;
            return Ok(report);
        }
        if doc.ancestors(root).into_iter().any(|id| doc.element(id).is_some_and(is_live_input)) {
            trace!("Skipping root {:?} inside a live input", root);
            return Ok(report);
        }

        let root = doc
            .closest(root, |element| HEADING_TAGS.contains(&element.tag()))
            .or_else(|| doc.closest(root, |element| STANDALONE_TAGS.contains(&element.tag())))
            .unwrap_or(root);

        let ctx = self.root_context(doc, root);
        self.visit(doc, root, ctx, &mut report)?;

        if let Some(parent) = doc.parent(root) {
            if doc.element(parent).is_some_and(|element| LIST_TAGS.contains(&element.tag())) {
                self.mirror_list(doc, parent, &mut report)?;
            }
        }

        debug!(
            "Annotated {:?}: {} visited, {} rtl, {} ltr, {} reused, {} excluded",
            root, report.visited, report.marked_rtl, report.marked_ltr, report.reused, report.excluded
        );
        Ok(report)
    }

    /// Derive the traversal context of a root from the marks on its ancestors
    fn root_context(&self, doc: &Document, root: NodeId) -> VisitContext {
        let decided = doc.ancestors(root).into_iter().find_map(|id| {
            let element = doc.element(id)?;
            if !element.has_attr(&self.config.processed_attribute) {
                return None;
            }
            match element.style("direction") {
                Some("rtl") => Some(true),
                Some("ltr") => Some(false),
                _ => None,
            }
        });

        let ancestor_rtl = decided.unwrap_or(false);
        VisitContext {
            ancestor_rtl,
            propagate: ancestor_rtl && self.config.inline_policy == InlinePolicy::Inherit,
        }
    }

    fn visit(
        &mut self,
        doc: &mut Document,
        id: NodeId,
        ctx: VisitContext,
        report: &mut AnnotateReport,
    ) -> Result<(), DomError> {
        let (tag, excluded, live) = match doc.data(id) {
            Some(NodeData::Element(element)) => (
                element.tag().to_string(),
                self.exclusion.excludes_element(element),
                is_live_input(element),
            ),
            Some(NodeData::Document) => {
                for child in doc.children(id) {
                    self.visit(doc, child, ctx, report)?;
                }
                return Ok(());
            }
            Some(_) => return Ok(()),
            None => return Err(DomError::UnknownNode(id)),
        };

        if excluded {
            trace!("Pruned excluded <{}> {:?}", tag, id);
            report.excluded += 1;
            return Ok(());
        }
        if live {
            return Ok(());
        }
        report.visited += 1;

        if HEADING_TAGS.contains(&tag.as_str()) {
            let mut text = String::new();
            self.visible_text(doc, id, &mut text);
            let direction = self.decide(doc, id, &tag, &text, false, true, ctx, report)?;
            return self.cover(doc, id, direction, report);
        }

        let standalone = STANDALONE_TAGS.contains(&tag.as_str());
        let inherited = ctx.propagate && !standalone;
        // paragraphs and list items decide on their whole visible text
        let text = if standalone {
            let mut text = String::new();
            self.visible_text(doc, id, &mut text);
            text
        } else {
            doc.direct_text(id)
        };
        let direction = self.decide(doc, id, &tag, &text, inherited, standalone, ctx, report)?;

        let child_ctx = VisitContext {
            ancestor_rtl: match direction {
                Direction::Rtl => true,
                Direction::Ltr => false,
                Direction::Unset => ctx.ancestor_rtl,
            },
            propagate: direction == Direction::Rtl && self.config.inline_policy == InlinePolicy::Inherit,
        };
        for child in doc.children(id) {
            self.visit(doc, child, child_ctx, report)?;
        }

        if LIST_TAGS.contains(&tag.as_str()) {
            self.mirror_list(doc, id, report)?;
        }
        Ok(())
    }

    /// Decide and write the direction of one element
    #[allow(clippy::too_many_arguments)]
    fn decide(
        &mut self,
        doc: &mut Document,
        id: NodeId,
        tag: &str,
        text: &str,
        inherited: bool,
        standalone: bool,
        ctx: VisitContext,
        report: &mut AnnotateReport,
    ) -> Result<Direction, DomError> {
        let fingerprint = fingerprint(text);

        if let Some(state) = self.states.get(&id) {
            let unchanged = state.fingerprint.as_deref() == Some(fingerprint.as_str());
            let upgrade = inherited && state.direction != Direction::Rtl;
            if state.is_settled() && unchanged && !upgrade {
                let direction = state.direction;
                self.write(doc, id, tag, direction)?;
                report.reused += 1;
                return Ok(direction);
            }
        }

        let class = self.classifier.classify(text);
        let direction = if class.is_target() || inherited {
            Direction::Rtl
        } else if text.trim().is_empty() {
            Direction::Unset
        } else if !ctx.ancestor_rtl || standalone {
            Direction::Ltr
        } else {
            Direction::Unset
        };

        trace!("<{}> {:?}: {:?} -> {:?}", tag, id, class, direction);
        self.write(doc, id, tag, direction)?;
        match direction {
            Direction::Rtl => report.marked_rtl += 1,
            Direction::Ltr => report.marked_ltr += 1,
            Direction::Unset => {}
        }

        self.states.insert(
            id,
            AnnotationState {
                processed: direction != Direction::Unset,
                direction,
                script_class: class.into(),
                fingerprint: Some(fingerprint),
                inherited: inherited && !class.is_target(),
            },
        );
        Ok(direction)
    }

    /// Give every non-excluded descendant of a heading the heading's direction
    fn cover(
        &mut self,
        doc: &mut Document,
        id: NodeId,
        direction: Direction,
        report: &mut AnnotateReport,
    ) -> Result<(), DomError> {
        for child in doc.children(id) {
            let Some(element) = doc.element(child) else {
                continue;
            };
            if self.exclusion.excludes_element(element) {
                report.excluded += 1;
                continue;
            }
            if is_live_input(element) {
                continue;
            }
            let tag = element.tag().to_string();

            let covered = match direction {
                Direction::Rtl => Direction::Rtl,
                _ => Direction::Unset,
            };
            self.write(doc, child, &tag, covered)?;
            self.states.insert(
                child,
                AnnotationState {
                    processed: covered == Direction::Rtl,
                    direction: covered,
                    script_class: ScriptClass::Unset,
                    fingerprint: None,
                    inherited: covered == Direction::Rtl,
                },
            );
            report.visited += 1;
            self.cover(doc, child, direction, report)?;
        }
        Ok(())
    }

    /// Text of the subtree, skipping excluded descendants
    fn visible_text(&self, doc: &Document, id: NodeId, out: &mut String) {
        for child in doc.children(id) {
            match doc.data(child) {
                Some(NodeData::Text(text)) => out.push_str(text),
                Some(NodeData::Element(element)) if !self.exclusion.excludes_element(element) => {
                    self.visible_text(doc, child, out)
                }
                _ => {}
            }
        }
    }

    fn write(&self, doc: &mut Document, id: NodeId, tag: &str, direction: Direction) -> Result<(), DomError> {
        match direction {
            Direction::Rtl => self.apply_rtl(doc, id, tag),
            Direction::Ltr => self.apply_ltr(doc, id),
            Direction::Unset => self.clear_marks(doc, id),
        }
    }

    fn apply_rtl(&self, doc: &mut Document, id: NodeId, tag: &str) -> Result<(), DomError> {
        doc.set_style(id, "direction", "rtl")?;
        doc.set_style(id, "text-align", "right")?;
        // list markers must keep their own character order
        if tag != "li" {
            if let Some(value) = self.config.unicode_bidi.css_value() {
                doc.set_style(id, "unicode-bidi", value)?;
            }
        }
        doc.add_class(id, &self.config.typeface_class)?;
        doc.set_attr(id, "lang", &self.language_tag)?;
        doc.set_attr(id, &self.config.processed_attribute, "true")?;
        Ok(())
    }

    fn apply_ltr(&self, doc: &mut Document, id: NodeId) -> Result<(), DomError> {
        doc.set_style(id, "direction", "ltr")?;
        doc.set_style(id, "text-align", "left")?;
        self.strip_rtl_only(doc, id)?;
        doc.set_attr(id, &self.config.processed_attribute, "true")?;
        Ok(())
    }

    fn strip_rtl_only(&self, doc: &mut Document, id: NodeId) -> Result<(), DomError> {
        let (bidi, lang) = match doc.element(id) {
            Some(element) => (
                element.style("unicode-bidi").map(str::to_string),
                element.attr("lang").map(str::to_string),
            ),
            None => return Err(DomError::NotAnElement(id)),
        };
        if bidi.is_some() && bidi.as_deref() == self.config.unicode_bidi.css_value() {
            doc.remove_style(id, "unicode-bidi")?;
        }
        if lang.as_deref() == Some(self.language_tag.as_str()) {
            doc.remove_attr(id, "lang")?;
        }
        doc.remove_class(id, &self.config.typeface_class)?;
        Ok(())
    }

    /// Remove every mark of an earlier decision
    fn clear_marks(&self, doc: &mut Document, id: NodeId) -> Result<(), DomError> {
        let marked = doc
            .element(id)
            .is_some_and(|element| element.has_attr(&self.config.processed_attribute));
        if !marked {
            return Ok(());
        }
        doc.remove_style(id, "direction")?;
        doc.remove_style(id, "text-align")?;
        self.strip_rtl_only(doc, id)?;
        doc.remove_attr(id, &self.config.processed_attribute)?;
        Ok(())
    }

    /// Mirror a list whose decided items are all RTL. Applied once per list.
    fn mirror_list(&mut self, doc: &mut Document, list: NodeId, report: &mut AnnotateReport) -> Result<bool, DomError> {
        let Some(element) = doc.element(list) else {
            return Err(DomError::NotAnElement(list));
        };
        if element.has_attr(&self.config.list_attribute) || self.exclusion.is_excluded(doc, list) {
            return Ok(false);
        }

        let items: Vec<Direction> = doc
            .children(list)
            .into_iter()
            .filter(|child| doc.element(*child).is_some_and(|e| e.tag() == "li"))
            .map(|child| self.states.get(&child).map(|s| s.direction).unwrap_or_default())
            .collect();
        let any_rtl = items.contains(&Direction::Rtl);
        let any_ltr = items.contains(&Direction::Ltr);
        if !any_rtl || any_ltr {
            return Ok(false);
        }

        let padding = element
            .style("padding-left")
            .filter(|value| !is_zero_length(value))
            .map(str::to_string)
            .unwrap_or_else(|| self.config.list_indent.clone());
        let margin = element
            .style("margin-left")
            .filter(|value| !is_zero_length(value))
            .map(str::to_string);

        doc.set_style(list, "direction", "rtl")?;
        doc.set_style(list, "padding-right", &padding)?;
        doc.set_style(list, "padding-left", "0")?;
        if let Some(margin) = margin {
            doc.set_style(list, "margin-right", &margin)?;
            doc.remove_style(list, "margin-left")?;
        }
        doc.set_attr(list, &self.config.list_attribute, "true")?;

        trace!("Mirrored list {:?}", list);
        report.lists_mirrored += 1;
        Ok(true)
    }
}
