//! Schema model: an immutable arena of [`SchemaNode`]s plus the mount table.

use core::fmt::Display;

use confmap_document::path::parse_index;
use confmap_document::{DocPath, ValueKind};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::descriptor::PrimitiveKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaNodeId(pub usize);

/// Name used for sequence element and map value schemas.
pub const WILDCARD: &str = "*";

/// Shape of a schema node, derived from which child slots are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Object,
    Array,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Boolean,
    Integer,
    Number,
    String,
    Any,
    Enum(String),
    Composite(String),
    Map,
    Sequence,
}

impl From<PrimitiveKind> for TypeKind {
    fn from(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Boolean => Self::Boolean,
            PrimitiveKind::Integer => Self::Integer,
            PrimitiveKind::Number => Self::Number,
            PrimitiveKind::String => Self::String,
            PrimitiveKind::Any => Self::Any,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredType {
    pub kind: TypeKind,
    pub nullable: bool,
}

impl DeclaredType {
    pub fn new(kind: TypeKind, nullable: bool) -> Self {
        Self { kind, nullable }
    }

    /// Value-shaped types have a natural non-null zero value and are required unless nullable.
    pub fn is_value_shaped(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Boolean | TypeKind::Integer | TypeKind::Number | TypeKind::Enum(_)
        )
    }

    /// Whether a JSON value of `kind` is representable as this type.
    pub fn accepts(&self, kind: ValueKind) -> bool {
        if kind == ValueKind::Null {
            return self.nullable || self.kind == TypeKind::Any;
        }
        match &self.kind {
            TypeKind::Any => true,
            TypeKind::Boolean => kind == ValueKind::Bool,
            TypeKind::Integer => kind == ValueKind::Integer,
            TypeKind::Number => matches!(kind, ValueKind::Integer | ValueKind::Number),
            TypeKind::String => kind == ValueKind::String,
            TypeKind::Enum(_) => matches!(kind, ValueKind::String | ValueKind::Integer),
            TypeKind::Composite(_) => kind == ValueKind::Object,
            TypeKind::Map => kind == ValueKind::Object,
            TypeKind::Sequence => kind == ValueKind::Array,
        }
    }
}

impl Display for DeclaredType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            TypeKind::Boolean => write!(f, "boolean")?,
            TypeKind::Integer => write!(f, "integer")?,
            TypeKind::Number => write!(f, "number")?,
            TypeKind::String => write!(f, "string")?,
            TypeKind::Any => write!(f, "any")?,
            TypeKind::Enum(name) => write!(f, "enum {name}")?,
            TypeKind::Composite(name) => write!(f, "{name}")?,
            TypeKind::Map => write!(f, "map")?,
            TypeKind::Sequence => write!(f, "sequence")?,
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// A regex constraint, kept alongside its source text for messages.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    pub regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Allowed shape, constraints and default at one logical location.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// Property name, mount path, or [`WILDCARD`].
    pub name: String,
    pub declared_type: DeclaredType,
    pub is_required: bool,
    pub is_read_only: bool,
    pub default_value: JsonValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub pattern: Option<Pattern>,
    /// Lower-cased, in declaration order.
    pub allowed_values: Option<IndexSet<String>>,
    pub is_enum_flags: bool,
    pub properties: Option<IndexMap<String, SchemaNodeId>>,
    pub additional_properties: Option<SchemaNodeId>,
    pub allow_additional_properties: bool,
    pub item_schema: Option<SchemaNodeId>,
    /// Set only on mount roots.
    pub mount_path: Option<DocPath>,
}

impl SchemaNode {
    pub fn kind(&self) -> SchemaKind {
        if self.properties.is_some() {
            SchemaKind::Object
        } else if self.item_schema.is_some() {
            SchemaKind::Array
        } else {
            SchemaKind::Value
        }
    }

    pub fn property(&self, name: &str) -> Option<SchemaNodeId> {
        self.properties.as_ref()?.get(name).copied()
    }
}

/// The built schema model. Immutable once returned by the builder.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) mounts: IndexMap<DocPath, SchemaNodeId>,
}

impl SchemaDocument {
    pub fn node(&self, id: SchemaNodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn get_node(&self, id: SchemaNodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn mounts(&self) -> impl Iterator<Item = (&DocPath, SchemaNodeId)> {
        self.mounts.iter().map(|(path, id)| (path, *id))
    }

    pub fn mount(&self, path: &DocPath) -> Option<SchemaNodeId> {
        self.mounts.get(path).copied()
    }

    /// The longest mount path that is a prefix of (or equal to) `path`.
    pub fn longest_mount(&self, path: &DocPath) -> Option<(&DocPath, SchemaNodeId)> {
        self.mounts
            .iter()
            .filter(|(mount, _)| path.starts_with(mount))
            .max_by_key(|(mount, _)| mount.len())
            .map(|(mount, id)| (mount, *id))
    }

    /// One step of schema navigation: the schema governing child `segment` of a
    /// node governed by `parent`.
    pub fn child_schema(&self, parent: SchemaNodeId, segment: &str) -> Option<SchemaNodeId> {
        let node = self.node(parent);
        match node.kind() {
            SchemaKind::Object => node
                .property(segment)
                .or(node.additional_properties),
            SchemaKind::Array => parse_index(segment).and(node.item_schema),
            SchemaKind::Value => None,
        }
    }

    /// Names of the required properties of `id`, in declaration order.
    pub fn required_properties(&self, id: SchemaNodeId) -> impl Iterator<Item = &str> + '_ {
        self.node(id)
            .properties
            .iter()
            .flatten()
            .filter(|(_, child)| self.node(**child).is_required)
            .map(|(name, _)| name.as_str())
    }

    /// Follows `segments` from `start` with [`SchemaDocument::child_schema`].
    pub fn descend<'s>(
        &self,
        start: SchemaNodeId,
        segments: impl IntoIterator<Item = &'s String>,
    ) -> Option<SchemaNodeId> {
        segments
            .into_iter()
            .try_fold(start, |current, segment| self.child_schema(current, segment))
    }

    pub(crate) fn push(&mut self, node: SchemaNode) -> SchemaNodeId {
        self.nodes.push(node);
        SchemaNodeId(self.nodes.len() - 1)
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    pub(crate) fn add_mount(&mut self, path: DocPath, id: SchemaNodeId) {
        self.nodes[id.0].mount_path = Some(path.clone());
        self.mounts.insert(path, id);
    }
}
