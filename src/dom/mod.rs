/*!
 * Live document tree.
 *
 * The document is owned and mutated by the host; the engine only reads it
 * and writes annotation attributes onto existing elements. Every effective
 * change is reported to subscribers as a `MutationRecord`, which is how the
 * reactive scheduler learns about new content.
 *
 * - `html`: parsing (via scraper) and serialisation
 * - `mutation`: mutation records delivered to observers
 * - `selector`: simple compound selectors used for container scoping
 */

use std::collections::HashMap;
use std::sync::Arc;

use ego_tree::{NodeRef, Tree};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::errors::DomError;

pub use ego_tree::NodeId;
pub use self::mutation::MutationRecord;
pub use self::selector::SimpleSelector;

pub mod html;
pub mod mutation;
pub mod selector;

/// Handle shared between the tree owner and the engine
pub type SharedDocument = Arc<Mutex<Document>>;

/// Content of a single tree node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// The document root
    Document,
    /// An element with its attributes
    Element(ElementData),
    /// A run of character data
    Text(String),
    /// A comment, kept only for faithful serialisation
    Comment(String),
}

impl NodeData {
    /// The element data, if this node is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// The character data, if this node is a text node
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Tag, attributes, classes and inline style of an element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    classes: Vec<String>,
    styles: Vec<(String, String)>,
}

impl ElementData {
    /// Create an element without attributes
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Create an element from raw attribute pairs.
    ///
    /// `class` and `style` are split into the class list and the inline
    /// declaration list.
    pub fn with_attrs<'a, I>(tag: &str, attrs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut element = Self::new(tag);
        for (name, value) in attrs {
            element.set_attr(name, value);
        }
        element
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Value of a plain attribute (`class` and `style` are exposed separately)
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Value of an inline style property
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value.as_str())
    }

    /// Inline style serialised as a declaration list
    pub fn style_text(&self) -> String {
        self.styles
            .iter()
            .map(|(property, value)| format!("{}: {}", property, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// All attributes in serialised form, `class` and `style` last
    pub fn attributes(&self) -> Vec<(String, String)> {
        let mut all = self.attrs.clone();
        if !self.classes.is_empty() {
            all.push(("class".to_string(), self.classes.join(" ")));
        }
        if !self.styles.is_empty() {
            all.push(("style".to_string(), self.style_text()));
        }
        all
    }

    fn set_attr(&mut self, name: &str, value: &str) -> bool {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "class" => {
                let classes: Vec<String> = value.split_whitespace().map(str::to_string).collect();
                let changed = classes != self.classes;
                self.classes = classes;
                changed
            }
            "style" => {
                let styles = parse_declarations(value);
                let changed = styles != self.styles;
                self.styles = styles;
                changed
            }
            _ => match self.attrs.iter_mut().find(|(key, _)| *key == name) {
                Some((_, existing)) if existing == value => false,
                Some((_, existing)) => {
                    *existing = value.to_string();
                    true
                }
                None => {
                    self.attrs.push((name, value.to_string()));
                    true
                }
            },
        }
    }

    fn remove_attr(&mut self, name: &str) -> bool {
        match name {
            "class" => {
                let changed = !self.classes.is_empty();
                self.classes.clear();
                changed
            }
            "style" => {
                let changed = !self.styles.is_empty();
                self.styles.clear();
                changed
            }
            _ => {
                let before = self.attrs.len();
                self.attrs.retain(|(key, _)| key != name);
                before != self.attrs.len()
            }
        }
    }

    fn add_class(&mut self, class: &str) -> bool {
        if self.has_class(class) {
            return false;
        }
        self.classes.push(class.to_string());
        true
    }

    fn remove_class(&mut self, class: &str) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c != class);
        before != self.classes.len()
    }

    fn set_style(&mut self, property: &str, value: &str) -> bool {
        match self.styles.iter_mut().find(|(key, _)| key == property) {
            Some((_, existing)) if existing == value => false,
            Some((_, existing)) => {
                *existing = value.to_string();
                true
            }
            None => {
                self.styles.push((property.to_string(), value.to_string()));
                true
            }
        }
    }

    fn remove_style(&mut self, property: &str) -> bool {
        let before = self.styles.len();
        self.styles.retain(|(key, _)| key != property);
        before != self.styles.len()
    }
}

fn parse_declarations(text: &str) -> Vec<(String, String)> {
    text.split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            if property.is_empty() || value.is_empty() {
                None
            } else {
                Some((property, value.to_string()))
            }
        })
        .collect()
}

/// The live document: an arena tree plus its mutation subscribers
#[derive(Debug)]
pub struct Document {
    tree: Tree<NodeData>,
    observers: Vec<UnboundedSender<MutationRecord>>,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document (root node only)
    pub fn new() -> Self {
        Self {
            tree: Tree::new(NodeData::Document),
            observers: Vec::new(),
            revision: 0,
        }
    }

    /// Parse a complete HTML document
    pub fn parse_html(source: &str) -> Self {
        let mut document = Self::new();
        html::parse_document_into(&mut document.tree, source);
        document
    }

    /// Wrap the document into the shared handle
    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    /// Subscribe to mutation records emitted from now on
    pub fn observe(&mut self) -> UnboundedReceiver<MutationRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    /// Counter of effective changes since creation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn node(&self, id: NodeId) -> Result<NodeRef<'_, NodeData>, DomError> {
        self.tree.get(id).ok_or(DomError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.get(id).is_some()
    }

    /// Whether the node is still reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        let root = self.root();
        id == root || node.ancestors().any(|ancestor| ancestor.id() == root)
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.tree.get(id).map(|node| node.value())
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.data(id).and_then(NodeData::as_element)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.get(id)?.parent().map(|parent| parent.id())
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default()
    }

    /// Ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| node.ancestors().map(|ancestor| ancestor.id()).collect())
            .unwrap_or_default()
    }

    /// The node and all of its descendants in pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| node.descendants().map(|descendant| descendant.id()).collect())
            .unwrap_or_default()
    }

    /// Whether `node` is `ancestor` or lies inside it
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    /// Concatenated text of the fragments owned directly by this node
    pub fn direct_text(&self, id: NodeId) -> String {
        let Some(node) = self.tree.get(id) else {
            return String::new();
        };
        node.children()
            .filter_map(|child| child.value().as_text())
            .collect()
    }

    /// Concatenated text of every fragment in the subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.tree.get(id) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|descendant| descendant.value().as_text())
            .collect()
    }

    /// First element in the subtree (pre-order) accepted by the predicate
    pub fn find<F>(&self, from: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&ElementData) -> bool,
    {
        let node = self.tree.get(from)?;
        node.descendants()
            .find(|descendant| descendant.value().as_element().is_some_and(&predicate))
            .map(|descendant| descendant.id())
    }

    /// All elements in the subtree matching the selector, in document order
    pub fn select(&self, from: NodeId, selector: &SimpleSelector) -> Vec<NodeId> {
        let Some(node) = self.tree.get(from) else {
            return Vec::new();
        };
        node.descendants()
            .filter(|descendant| {
                descendant
                    .value()
                    .as_element()
                    .is_some_and(|element| selector.matches(element))
            })
            .map(|descendant| descendant.id())
            .collect()
    }

    /// Nearest inclusive ancestor element accepted by the predicate
    pub fn closest<F>(&self, id: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&ElementData) -> bool,
    {
        let node = self.tree.get(id)?;
        std::iter::once(node)
            .chain(node.ancestors())
            .find(|candidate| candidate.value().as_element().is_some_and(&predicate))
            .map(|candidate| candidate.id())
    }

    pub fn head(&self) -> Option<NodeId> {
        self.find(self.root(), |element| element.tag() == "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find(self.root(), |element| element.tag() == "body")
    }

    /// Sort node ids in document order, dropping duplicates and detached nodes
    pub fn document_order(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let positions: HashMap<NodeId, usize> = self
            .tree
            .root()
            .descendants()
            .enumerate()
            .map(|(index, node)| (node.id(), index))
            .collect();
        let mut ordered: Vec<(usize, NodeId)> = ids
            .iter()
            .filter_map(|id| positions.get(id).map(|position| (*position, *id)))
            .collect();
        ordered.sort_unstable_by_key(|(position, _)| *position);
        ordered.dedup_by_key(|(position, _)| *position);
        ordered.into_iter().map(|(_, id)| id).collect()
    }

    /// Serialise the whole document
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        html::serialize(self.tree.root(), &mut out);
        out
    }

    /// Serialise one node and its subtree
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(node) = self.tree.get(id) {
            html::serialize(node, &mut out);
        }
        out
    }

    // Structural mutations (tree owner side)

    fn ensure_container(&self, id: NodeId) -> Result<(), DomError> {
        match self.node(id)?.value() {
            NodeData::Document | NodeData::Element(_) => Ok(()),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// Append an element as the last child of `parent`
    pub fn append_element(&mut self, parent: NodeId, element: ElementData) -> Result<NodeId, DomError> {
        self.append_child(parent, NodeData::Element(element))
    }

    /// Append an empty element with the given tag
    pub fn create_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        self.append_element(parent, ElementData::new(tag))
    }

    /// Append a text fragment as the last child of `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        self.append_child(parent, NodeData::Text(text.to_string()))
    }

    fn append_child(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId, DomError> {
        self.ensure_container(parent)?;
        let mut parent_node = self.tree.get_mut(parent).ok_or(DomError::UnknownNode(parent))?;
        let id = parent_node.append(data).id();
        self.emit(MutationRecord::ChildList {
            parent,
            added: vec![id],
            removed: Vec::new(),
        });
        Ok(id)
    }

    /// Parse an HTML fragment and append its top-level nodes to `parent`
    pub fn append_html(&mut self, parent: NodeId, fragment: &str) -> Result<Vec<NodeId>, DomError> {
        self.ensure_container(parent)?;
        let added = html::parse_fragment_into(&mut self.tree, parent, fragment);
        if !added.is_empty() {
            self.emit(MutationRecord::ChildList {
                parent,
                added: added.clone(),
                removed: Vec::new(),
            });
        }
        Ok(added)
    }

    /// Replace the character data of a text node
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<bool, DomError> {
        let mut node = self.tree.get_mut(id).ok_or(DomError::UnknownNode(id))?;
        let changed = match node.value() {
            NodeData::Text(existing) if existing == text => false,
            NodeData::Text(existing) => {
                *existing = text.to_string();
                true
            }
            _ => return Err(DomError::NotText(id)),
        };
        if changed {
            self.emit(MutationRecord::CharacterData { target: id });
        }
        Ok(changed)
    }

    /// Replace all children of an element with a single text fragment
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<NodeId, DomError> {
        if self.element(id).is_none() {
            return Err(match self.contains(id) {
                true => DomError::NotAnElement(id),
                false => DomError::UnknownNode(id),
            });
        }
        let removed = self.children(id);
        for child in &removed {
            if let Some(mut node) = self.tree.get_mut(*child) {
                node.detach();
            }
        }
        let mut node = self.tree.get_mut(id).ok_or(DomError::UnknownNode(id))?;
        let added = node.append(NodeData::Text(text.to_string())).id();
        self.emit(MutationRecord::ChildList {
            parent: id,
            added: vec![added],
            removed,
        });
        Ok(added)
    }

    /// Detach a node (and its subtree) from its parent
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.parent(id);
        let mut node = self.tree.get_mut(id).ok_or(DomError::UnknownNode(id))?;
        node.detach();
        if let Some(parent) = parent {
            self.emit(MutationRecord::ChildList {
                parent,
                added: Vec::new(),
                removed: vec![id],
            });
        }
        Ok(())
    }

    // Attribute mutations (annotation side)

    fn update_element<F>(&mut self, id: NodeId, name: &str, update: F) -> Result<bool, DomError>
    where
        F: FnOnce(&mut ElementData) -> bool,
    {
        let mut node = self.tree.get_mut(id).ok_or(DomError::UnknownNode(id))?;
        let changed = match node.value() {
            NodeData::Element(element) => update(element),
            _ => return Err(DomError::NotAnElement(id)),
        };
        if changed {
            self.emit(MutationRecord::Attributes {
                target: id,
                name: name.to_string(),
            });
        }
        Ok(changed)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<bool, DomError> {
        self.update_element(id, name, |element| element.set_attr(name, value))
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<bool, DomError> {
        self.update_element(id, name, |element| element.remove_attr(name))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<bool, DomError> {
        self.update_element(id, "class", |element| element.add_class(class))
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<bool, DomError> {
        self.update_element(id, "class", |element| element.remove_class(class))
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<bool, DomError> {
        self.update_element(id, "style", |element| element.set_style(property, value))
    }

    pub fn remove_style(&mut self, id: NodeId, property: &str) -> Result<bool, DomError> {
        self.update_element(id, "style", |element| element.remove_style(property))
    }

    fn emit(&mut self, record: MutationRecord) {
        self.revision += 1;
        self.observers.retain(|tx| tx.send(record.clone()).is_ok());
    }
}
