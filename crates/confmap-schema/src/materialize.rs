//! Materialization of schema-only ("virtual") locations into real document nodes.
//!
//! A [`VirtualLocation`] names a real anchor and the chain of segments below
//! it. Missing segments are instantiated from their schema's cached default,
//! so a segment may already exist once an ancestor's default has been
//! inserted; such nodes are reused rather than duplicated.
//!
//! The whole chain is checked before the first insertion. A failed
//! materialization never leaves nodes behind.

use ahash::AHashMap;
use confmap_document::path::parse_index;
use confmap_document::{DocPath, Document, InsertError, NodeId, NodeValue, Reference};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::mapper::{SchemaAssociation, SchemaMapper};
use crate::schema::{SchemaDocument, SchemaNodeId};

/// One `(name, schema)` step of a virtual location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualSegment {
    pub name: String,
    pub schema: SchemaNodeId,
}

impl VirtualSegment {
    pub fn new(name: impl Into<String>, schema: SchemaNodeId) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// The real node a virtual chain hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The document root, whatever its id.
    Root,
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualLocation {
    pub anchor: Anchor,
    /// Outermost first; empty when the target's parent is the anchor.
    pub ancestors: Vec<VirtualSegment>,
    pub target: VirtualSegment,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaterializeError {
    #[error("cannot materialize below '{path}': {reason}")]
    StructuralConflict { path: DocPath, reason: String },
    #[error("anchor node {0:?} does not exist")]
    UnknownAnchor(NodeId),
    #[error("no schema governs '{path}'")]
    NoSchema { path: DocPath },
    #[error("the document root cannot be materialized")]
    EmptyPath,
    #[error(transparent)]
    Edit(#[from] InsertError),
}

/// Nodes created by one materialization, in creation (pre-)order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialization {
    pub target: NodeId,
    pub created: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    Created(Materialization),
    /// The target was already present; nothing was changed.
    Existing(NodeId),
}

impl Materialized {
    pub fn node(&self) -> NodeId {
        match self {
            Materialized::Created(materialization) => materialization.target,
            Materialized::Existing(node) => *node,
        }
    }

    pub fn created(&self) -> &[NodeId] {
        match self {
            Materialized::Created(materialization) => &materialization.created,
            Materialized::Existing(_) => &[],
        }
    }
}

impl VirtualLocation {
    /// A single virtual child directly under a real node.
    pub fn under(parent: NodeId, target: VirtualSegment) -> Self {
        Self {
            anchor: Anchor::Node(parent),
            ancestors: Vec::new(),
            target,
        }
    }

    /// Ancestors followed by the target.
    pub fn segments(&self) -> impl Iterator<Item = &VirtualSegment> {
        self.ancestors.iter().chain(core::iter::once(&self.target))
    }

    /// Builds the location of `path`: the longest existing proper prefix
    /// becomes the anchor and every remaining segment gets the schema the
    /// mapper would assign to a node at that path.
    pub fn resolve(
        document: &Document,
        schema: &SchemaDocument,
        association: &SchemaAssociation,
        path: &DocPath,
    ) -> Result<Self, MaterializeError> {
        let Some((_, parent_segments)) = path.segments().split_last() else {
            return Err(MaterializeError::EmptyPath);
        };

        let mut anchor_id = document.get_root_id();
        let mut existing = 0;
        for segment in parent_segments {
            match document.child(anchor_id, segment) {
                Some(child) => {
                    anchor_id = child;
                    existing += 1;
                }
                None => break,
            }
        }

        let mapper = SchemaMapper::new(schema);
        let mut parent_schema = association.get(anchor_id);
        let mut prefix: DocPath = path.segments()[..existing].iter().cloned().collect();
        let mut segments = Vec::with_capacity(path.len() - existing);
        for segment in &path.segments()[existing..] {
            prefix.push(segment.clone());
            let resolved = mapper
                .resolve(&prefix, parent_schema)
                .ok_or_else(|| MaterializeError::NoSchema {
                    path: prefix.clone(),
                })?;
            segments.push(VirtualSegment::new(segment.clone(), resolved));
            parent_schema = Some(resolved);
        }

        let anchor = if existing == 0 {
            Anchor::Root
        } else {
            Anchor::Node(anchor_id)
        };
        // `segments` holds at least the last path segment.
        let target = segments.pop().ok_or(MaterializeError::EmptyPath)?;
        Ok(Self {
            anchor,
            ancestors: segments,
            target,
        })
    }
}

/// Instantiates virtual locations and keeps the association in step.
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'s> {
    schema: &'s SchemaDocument,
}

impl<'s> Materializer<'s> {
    pub fn new(schema: &'s SchemaDocument) -> Self {
        Self { schema }
    }

    pub fn materialize(
        &self,
        document: &mut Document,
        association: &mut SchemaAssociation,
        location: &VirtualLocation,
    ) -> Result<Materialized, MaterializeError> {
        let anchor = match location.anchor {
            Anchor::Root => document.get_root_id(),
            Anchor::Node(id) if document.contains(id) => id,
            Anchor::Node(id) => return Err(MaterializeError::UnknownAnchor(id)),
        };
        let segments: Vec<&VirtualSegment> = location.segments().collect();

        let mut parent = anchor;
        let mut first_missing = None;
        for (index, segment) in segments.iter().enumerate() {
            match document.child(parent, &segment.name) {
                Some(child) => parent = child,
                None => {
                    first_missing = Some(index);
                    break;
                }
            }
        }
        let Some(first_missing) = first_missing else {
            debug!(node = ?parent, "materialization target already exists");
            return Ok(Materialized::Existing(parent));
        };
        let missing = &segments[first_missing..];

        self.plan(document, parent, missing)?;

        let mut created: Vec<NodeId> = Vec::new();
        let mut segment_schemas: AHashMap<NodeId, SchemaNodeId> = AHashMap::new();
        let mut current = parent;
        for segment in missing {
            if let Some(existing) = document.child(current, &segment.name) {
                // Instantiated by an ancestor's default.
                segment_schemas.insert(existing, segment.schema);
                current = existing;
                continue;
            }
            let value = self.schema.node(segment.schema).default_value.clone();
            match document.insert_child_by_segment(current, &segment.name, value) {
                Ok(id) => {
                    created.extend(document.descendants(id));
                    segment_schemas.insert(id, segment.schema);
                    current = id;
                }
                Err(err) => {
                    if let Some(first) = created.first() {
                        if let Err(rollback) = document.remove_node(*first) {
                            warn!(node = ?first, error = %rollback, "materialization rollback failed");
                        }
                    }
                    return Err(MaterializeError::StructuralConflict {
                        path: err.path,
                        reason: err.kind.to_string(),
                    });
                }
            }
        }

        let mapper = SchemaMapper::new(self.schema);
        for node in &created {
            match segment_schemas.get(node) {
                Some(schema) => association.insert(*node, Some(*schema)),
                None => {
                    mapper.map_node(document, association, *node);
                }
            }
        }

        debug!(
            target = ?current,
            created = created.len(),
            "materialized virtual location"
        );
        Ok(Materialized::Created(Materialization {
            target: current,
            created,
        }))
    }

    /// Checks that every missing segment can be attached, without mutating.
    fn plan(
        &self,
        document: &Document,
        parent: NodeId,
        missing: &[&VirtualSegment],
    ) -> Result<(), MaterializeError> {
        let Some((first, rest)) = missing.split_first() else {
            return Ok(());
        };
        let mut path = document.path_of(parent);
        let conflict = |path: &DocPath, reason: String| MaterializeError::StructuralConflict {
            path: path.clone(),
            reason,
        };

        match &document.node(parent).content {
            NodeValue::Object(_) => {}
            NodeValue::Array(array) => {
                check_index(&first.name, array.len()).map_err(|reason| conflict(&path, reason))?;
            }
            NodeValue::Value(_) => {
                return Err(conflict(&path, "parent is a value node".to_string()));
            }
            NodeValue::Reference(_) => {
                return Err(conflict(&path, "parent is a reference node".to_string()));
            }
        }

        let mut value = self.default_of(first);
        path.push(first.name.clone());
        for segment in rest {
            if is_reference_literal(&value) {
                return Err(conflict(
                    &path,
                    "default value is a reference and cannot hold children".to_string(),
                ));
            }
            value = match value {
                JsonValue::Object(mut map) => match map.remove(&segment.name) {
                    Some(child) => child,
                    None => self.default_of(segment),
                },
                JsonValue::Array(mut items) => {
                    let index = check_index(&segment.name, items.len())
                        .map_err(|reason| conflict(&path, reason))?;
                    if index < items.len() {
                        items.swap_remove(index)
                    } else {
                        self.default_of(segment)
                    }
                }
                _ => {
                    return Err(conflict(
                        &path,
                        "default value is not an object or array".to_string(),
                    ));
                }
            };
            path.push(segment.name.clone());
        }
        Ok(())
    }

    fn default_of(&self, segment: &VirtualSegment) -> JsonValue {
        self.schema.node(segment.schema).default_value.clone()
    }

    /// Removes exactly the nodes created by `materialization` and their
    /// association entries. Nodes already gone are skipped.
    pub fn revert(
        &self,
        document: &mut Document,
        association: &mut SchemaAssociation,
        materialization: &Materialization,
    ) -> Result<(), MaterializeError> {
        for node in &materialization.created {
            if !document.contains(*node) {
                continue;
            }
            for removed in document.remove_node(*node)? {
                association.remove(removed);
            }
        }
        debug!(
            removed = materialization.created.len(),
            "reverted materialization"
        );
        Ok(())
    }
}

/// Objects with a string `$ref` member become reference leaves when inserted.
fn is_reference_literal(value: &JsonValue) -> bool {
    value
        .as_object()
        .and_then(|map| map.get(Reference::KEY))
        .is_some_and(JsonValue::is_string)
}

/// Array segments must be an index no greater than the current length.
fn check_index(segment: &str, len: usize) -> Result<usize, String> {
    match parse_index(segment) {
        Some(index) if index <= len => Ok(index),
        Some(index) => Err(format!("index {index} is past the end (length {len})")),
        None => Err(format!("'{segment}' is not an array index")),
    }
}

/// Properties the schema allows on an object node that the node lacks.
pub fn virtual_children(
    document: &Document,
    schema: &SchemaDocument,
    association: &SchemaAssociation,
    node: NodeId,
) -> Vec<VirtualSegment> {
    let Some(map) = document.get_node(node).and_then(|n| n.as_object()) else {
        return Vec::new();
    };
    let Some(schema_node) = association.get(node) else {
        return Vec::new();
    };
    schema
        .node(schema_node)
        .properties
        .iter()
        .flatten()
        .filter(|(name, _)| !map.contains_key(name))
        .map(|(name, id)| VirtualSegment::new(name.clone(), *id))
        .collect()
}
