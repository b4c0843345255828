use core::fmt::Display;

use indexmap::IndexMap;

use crate::prelude_internal::*;

#[derive(Debug, Clone)]
/// A node in the document.
///
/// This does not implement PartialEq since content may refer to other nodes, and so equality is not well-defined.
pub struct Node {
    /// Property key, or the stringified position for array elements. Empty for the root.
    pub name: String,
    /// Non-owning link to the containing node. `None` only for the root.
    pub parent: Option<NodeId>,
    pub content: NodeValue,
}

impl Node {
    pub fn as_object(&self) -> Option<&NodeMap> {
        match &self.content {
            NodeValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NodeArray> {
        match &self.content {
            NodeValue::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&JsonValue> {
        match &self.content {
            NodeValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match &self.content {
            NodeValue::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    pub(crate) fn require_object(&mut self) -> Result<&mut NodeMap, InsertErrorKind> {
        match &mut self.content {
            NodeValue::Object(map) => Ok(map),
            _ => Err(InsertErrorKind::ExpectedObject),
        }
    }

    pub(crate) fn require_array(&mut self) -> Result<&mut NodeArray, InsertErrorKind> {
        match &mut self.content {
            NodeValue::Array(array) => Ok(array),
            _ => Err(InsertErrorKind::ExpectedArray),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum NodeValue {
    Object(NodeMap),
    Array(NodeArray),
    /// A JSON scalar: null, bool, number or string.
    Value(JsonValue),
    Reference(Reference),
}

impl NodeValue {
    pub fn empty_object() -> Self {
        Self::Object(NodeMap::new())
    }

    pub fn empty_array() -> Self {
        Self::Array(NodeArray::new())
    }
}

/// A `$ref`-style pointer to another document location.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub path: String,
    /// The object this reference was parsed from, kept for faithful round-trip.
    pub raw: serde_json::Map<String, JsonValue>,
}

impl Reference {
    pub const KEY: &'static str = "$ref";

    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let mut raw = serde_json::Map::new();
        raw.insert(Self::KEY.to_string(), JsonValue::String(path.clone()));
        Self { path, raw }
    }

    /// Reference paths are absolute: non-empty and starting with `/`.
    pub fn is_well_formed(&self) -> bool {
        self.path.starts_with('/')
    }

    /// The referenced location as a canonical document path.
    pub fn target(&self) -> Result<DocPath, PathError> {
        if !self.is_well_formed() {
            return Err(PathError::NotAbsolute {
                path: self.path.clone(),
            });
        }
        self.path[1..].parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Number,
    String,
    Object,
    Array,
    Reference,
}

impl ValueKind {
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(_) => Self::Bool,
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            JsonValue::Number(_) => Self::Number,
            JsonValue::String(_) => Self::String,
            JsonValue::Array(_) => Self::Array,
            JsonValue::Object(_) => Self::Object,
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
            Self::Reference => "reference",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Plural)]
#[plural(len, is_empty, iter, new)]
pub struct NodeArray(Vec<NodeId>);

impl NodeArray {
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.0.get(index).copied()
    }

    pub fn push(&mut self, node_id: NodeId) {
        self.0.push(node_id);
    }

    pub fn insert_at(&mut self, index: usize, node_id: NodeId) -> Result<(), InsertErrorKind> {
        if index > self.0.len() {
            return Err(InsertErrorKind::ArrayIndexInvalid {
                index,
                len: self.0.len(),
            });
        }
        self.0.insert(index, node_id);
        Ok(())
    }

    /// Removes `node_id` and returns the position it occupied.
    pub fn remove(&mut self, node_id: NodeId) -> Option<usize> {
        let index = self.position(node_id)?;
        self.0.remove(index);
        Some(index)
    }

    pub fn position(&self, node_id: NodeId) -> Option<usize> {
        self.0.iter().position(|id| *id == node_id)
    }

    pub fn to_vec(&self) -> Vec<NodeId> {
        self.0.clone()
    }
}

/// Object children in document order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeMap(IndexMap<String, NodeId>);

impl NodeMap {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.0.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, NodeId)> {
        self.0.iter().map(|(key, id)| (key, *id))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.values().copied()
    }

    pub fn add(&mut self, key: String, node_id: NodeId) -> Result<(), InsertErrorKind> {
        match self.0.entry(key) {
            indexmap::map::Entry::Occupied(e) => Err(InsertErrorKind::AlreadyAssigned {
                key: e.key().clone(),
            }),
            indexmap::map::Entry::Vacant(e) => {
                e.insert(node_id);
                Ok(())
            }
        }
    }

    /// O(n) removal, preserves document order.
    pub fn remove_ordered(&mut self, key: &str) -> Option<NodeId> {
        self.0.shift_remove(key)
    }
}
