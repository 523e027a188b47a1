use ego_tree::NodeId;

/// A change notification delivered to document observers
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRecord {
    /// Children were added to or removed from `parent`
    ChildList {
        parent: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// A text node changed its character data
    CharacterData { target: NodeId },
    /// An attribute, class or inline style changed on an element
    Attributes { target: NodeId, name: String },
}

impl MutationRecord {
    /// Whether the record describes a content change rather than an attribute write
    pub fn is_content_change(&self) -> bool {
        !matches!(self, Self::Attributes { .. })
    }
}
