pub mod node;

use crate::path::parse_index;
use crate::prelude_internal::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Arena-backed document tree.
///
/// Removed nodes leave a tombstone behind, so a `NodeId` is never reused and
/// stays a stable identity for the lifetime of the document.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) root: NodeId,
    nodes: Vec<Option<Node>>,
}

#[derive(Debug, PartialEq, thiserror::Error, Clone)]
#[error("Insert error: {kind} at '{path}'")]
pub struct InsertError {
    pub kind: InsertErrorKind,
    pub path: DocPath,
}

#[derive(Debug, PartialEq, thiserror::Error, Clone)]
pub enum InsertErrorKind {
    #[error("Already assigned: {key}")]
    AlreadyAssigned { key: String },
    #[error("Expected object")]
    ExpectedObject,
    #[error("Expected array")]
    ExpectedArray,
    #[error("Expected object or array")]
    ExpectedContainer,
    #[error("Expected scalar value")]
    ExpectedScalar,
    #[error("Array index invalid: {index} (length {len})")]
    ArrayIndexInvalid { index: usize, len: usize },
    #[error("Segment '{segment}' is not an array index")]
    NotAnIndex { segment: String },
    #[error("The root node cannot be removed")]
    CannotRemoveRoot,
    #[error("Node {0:?} does not exist")]
    UnknownNode(NodeId),
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document whose root is an empty object.
    pub fn new() -> Self {
        Self {
            root: NodeId(0),
            nodes: vec![Some(Node {
                name: String::new(),
                parent: None,
                content: NodeValue::empty_object(),
            })],
        }
    }

    pub fn get_root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &Node {
        self.node(self.root)
    }

    /// Panics if `id` was removed; use [`Document::get_node`] for ids of unknown provenance.
    pub fn node(&self, id: NodeId) -> &Node {
        match self.get_node(id) {
            Some(node) => node,
            None => panic!("node {id:?} does not exist"),
        }
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn create_node(
        &mut self,
        name: String,
        parent: Option<NodeId>,
        content: NodeValue,
    ) -> NodeId {
        self.nodes.push(Some(Node {
            name,
            parent,
            content,
        }));
        NodeId(self.nodes.len() - 1)
    }

    /// Replaces the root with a detached tree. Only used while building from JSON.
    pub(crate) fn set_root(&mut self, root: NodeId) {
        if root != self.root {
            self.nodes[self.root.0] = None;
            self.root = root;
        }
    }

    pub(crate) fn set_content(&mut self, id: NodeId, content: NodeValue) {
        if let Some(node) = self.get_node_mut(id) {
            node.content = content;
        }
    }

    /// Direct children in document order.
    /// Empty for leaves and for ids that no longer exist.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.get_node(id) else {
            return Vec::new();
        };
        match &node.content {
            NodeValue::Object(map) => map.values().collect(),
            NodeValue::Array(array) => array.to_vec(),
            NodeValue::Value(_) | NodeValue::Reference(_) => Vec::new(),
        }
    }

    /// Looks up a child by path segment: an object key, or an index for arrays.
    pub fn child(&self, id: NodeId, segment: &str) -> Option<NodeId> {
        match &self.get_node(id)?.content {
            NodeValue::Object(map) => map.get(segment),
            NodeValue::Array(array) => array.get(parse_index(segment)?),
            NodeValue::Value(_) | NodeValue::Reference(_) => None,
        }
    }

    /// `id` and all of its descendants in pre-order. Empty if `id` was removed.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let children = self.children(current);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Canonical path of `id`, computed from the parent chain.
    pub fn path_of(&self, id: NodeId) -> DocPath {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(node) = self.get_node(current) {
            match node.parent {
                Some(parent) => {
                    segments.push(node.name.clone());
                    current = parent;
                }
                None => break,
            }
        }
        segments.reverse();
        DocPath(segments)
    }

    pub fn find_by_path(&self, path: &DocPath) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root, |current, segment| self.child(current, segment))
    }

    /// Resolves a `$ref` path such as `/servers/0` to the node it points at.
    pub fn resolve_reference(&self, reference: &Reference) -> Option<NodeId> {
        let target = reference.target().ok()?;
        self.find_by_path(&target)
    }

    /// Inserts `value` under `parent` at `segment`: a key for object parents,
    /// an index (`0..=len`) for array parents. Returns the new subtree root.
    pub fn insert_child_by_segment(
        &mut self,
        parent: NodeId,
        segment: &str,
        value: JsonValue,
    ) -> Result<NodeId, InsertError> {
        let Some(node) = self.get_node(parent) else {
            return Err(self.insert_error(parent, InsertErrorKind::UnknownNode(parent)));
        };
        match &node.content {
            NodeValue::Object(_) => self.insert_object_child(parent, segment, value),
            NodeValue::Array(_) => match parse_index(segment) {
                Some(index) => self.insert_array_element(parent, Some(index), value),
                None => Err(self.insert_error(
                    parent,
                    InsertErrorKind::NotAnIndex {
                        segment: segment.to_string(),
                    },
                )),
            },
            _ => Err(self.insert_error(parent, InsertErrorKind::ExpectedContainer)),
        }
    }

    pub fn insert_object_child(
        &mut self,
        parent: NodeId,
        key: &str,
        value: JsonValue,
    ) -> Result<NodeId, InsertError> {
        let Some(node) = self.get_node(parent) else {
            return Err(self.insert_error(parent, InsertErrorKind::UnknownNode(parent)));
        };
        match node.as_object() {
            Some(map) if map.contains_key(key) => {
                return Err(self.insert_error(
                    parent,
                    InsertErrorKind::AlreadyAssigned {
                        key: key.to_string(),
                    },
                ));
            }
            Some(_) => {}
            None => return Err(self.insert_error(parent, InsertErrorKind::ExpectedObject)),
        }

        let child = self.build_json(key.to_string(), Some(parent), value);
        let result = self
            .get_node_mut(parent)
            .ok_or(InsertErrorKind::UnknownNode(parent))
            .and_then(Node::require_object)
            .and_then(|map| map.add(key.to_string(), child));
        result.map_err(|kind| self.insert_error(parent, kind))?;
        Ok(child)
    }

    /// Inserts at `index`, or appends when `index` is `None`. Later siblings are renumbered.
    pub fn insert_array_element(
        &mut self,
        parent: NodeId,
        index: Option<usize>,
        value: JsonValue,
    ) -> Result<NodeId, InsertError> {
        let Some(node) = self.get_node(parent) else {
            return Err(self.insert_error(parent, InsertErrorKind::UnknownNode(parent)));
        };
        let Some(array) = node.as_array() else {
            return Err(self.insert_error(parent, InsertErrorKind::ExpectedArray));
        };
        let len = array.len();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(self.insert_error(parent, InsertErrorKind::ArrayIndexInvalid { index, len }));
        }

        let child = self.build_json(index.to_string(), Some(parent), value);
        let result = self
            .get_node_mut(parent)
            .ok_or(InsertErrorKind::UnknownNode(parent))
            .and_then(Node::require_array)
            .and_then(|array| array.insert_at(index, child));
        result.map_err(|kind| self.insert_error(parent, kind))?;
        self.renumber(parent);
        Ok(child)
    }

    /// Replaces the value of a scalar node.
    pub fn set_scalar(&mut self, id: NodeId, value: JsonValue) -> Result<(), InsertError> {
        if value.is_object() || value.is_array() {
            return Err(self.insert_error(id, InsertErrorKind::ExpectedScalar));
        }
        match self.get_node_mut(id) {
            Some(node) if matches!(node.content, NodeValue::Value(_)) => {
                node.content = NodeValue::Value(value);
                Ok(())
            }
            Some(_) => Err(self.insert_error(id, InsertErrorKind::ExpectedScalar)),
            None => Err(self.insert_error(id, InsertErrorKind::UnknownNode(id))),
        }
    }

    /// Detaches `id` from its parent and drops the whole subtree.
    /// Returns the removed ids in pre-order.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<NodeId>, InsertError> {
        let Some(node) = self.get_node(id) else {
            return Err(self.insert_error(id, InsertErrorKind::UnknownNode(id)));
        };
        let Some(parent) = node.parent else {
            return Err(self.insert_error(id, InsertErrorKind::CannotRemoveRoot));
        };
        let name = node.name.clone();
        let removed = self.descendants(id);

        let mut renumber = false;
        if let Some(parent_node) = self.get_node_mut(parent) {
            match &mut parent_node.content {
                NodeValue::Object(map) => {
                    map.remove_ordered(&name);
                }
                NodeValue::Array(array) => {
                    array.remove(id);
                    renumber = true;
                }
                NodeValue::Value(_) | NodeValue::Reference(_) => {}
            }
        }
        if renumber {
            self.renumber(parent);
        }
        for removed_id in &removed {
            self.nodes[removed_id.0] = None;
        }
        Ok(removed)
    }

    /// Keeps array element names equal to their positions.
    fn renumber(&mut self, array_id: NodeId) {
        let Some(array) = self.get_node(array_id).and_then(Node::as_array) else {
            return;
        };
        for (index, child) in array.to_vec().into_iter().enumerate() {
            if let Some(node) = self.get_node_mut(child) {
                node.name = index.to_string();
            }
        }
    }

    fn insert_error(&self, id: NodeId, kind: InsertErrorKind) -> InsertError {
        InsertError {
            kind,
            path: self.path_of(id),
        }
    }
}
