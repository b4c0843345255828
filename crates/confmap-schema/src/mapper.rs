//! Node → schema association.
//!
//! Resolution for a node at path `p`:
//! - with a mount that is a segment-wise prefix of `p`, take the longest one
//!   and descend from its root through the remaining segments;
//! - otherwise apply one step of [`SchemaDocument::child_schema`] to the
//!   parent's recorded schema.
//!
//! The root without a root mount, and every dead end, resolve to no schema.

use ahash::AHashMap;
use confmap_document::{DocPath, Document, NodeId};
use tracing::debug;

use crate::schema::{SchemaDocument, SchemaNodeId};

/// Which schema node governs each document node. `None` marks a node that
/// was mapped and found unschematized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaAssociation {
    entries: AHashMap<NodeId, Option<SchemaNodeId>>,
}

impl SchemaAssociation {
    /// The governing schema, if the node was mapped and has one.
    pub fn get(&self, node: NodeId) -> Option<SchemaNodeId> {
        self.entries.get(&node).copied().flatten()
    }

    /// The raw entry: `None` when the node was never mapped.
    pub fn entry(&self, node: NodeId) -> Option<Option<SchemaNodeId>> {
        self.entries.get(&node).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Option<SchemaNodeId>)> + '_ {
        self.entries.iter().map(|(node, schema)| (*node, *schema))
    }

    pub(crate) fn insert(&mut self, node: NodeId, schema: Option<SchemaNodeId>) {
        self.entries.insert(node, schema);
    }

    pub(crate) fn remove(&mut self, node: NodeId) -> Option<Option<SchemaNodeId>> {
        self.entries.remove(&node)
    }
}

/// Maps the whole of `document` against `schema`.
pub fn map_tree(document: &Document, schema: &SchemaDocument) -> SchemaAssociation {
    SchemaMapper::new(schema).map_tree(document)
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaMapper<'s> {
    schema: &'s SchemaDocument,
}

impl<'s> SchemaMapper<'s> {
    pub fn new(schema: &'s SchemaDocument) -> Self {
        Self { schema }
    }

    pub fn map_tree(&self, document: &Document) -> SchemaAssociation {
        let mut association = SchemaAssociation::default();
        let root = document.get_root_id();
        let root_path = document.path_of(root);
        self.map_from(document, &mut association, root, root_path, None);
        debug!(nodes = association.len(), "document mapped");
        association
    }

    /// Maps a single node, reading its parent's schema from `association`.
    /// A node no longer in `document` is left unrecorded.
    pub fn map_node(
        &self,
        document: &Document,
        association: &mut SchemaAssociation,
        node: NodeId,
    ) -> Option<SchemaNodeId> {
        if !document.contains(node) {
            return None;
        }
        let path = document.path_of(node);
        let parent_schema = document
            .get_node(node)
            .and_then(|n| n.parent)
            .and_then(|parent| association.get(parent));
        let resolved = self.resolve(&path, parent_schema);
        association.insert(node, resolved);
        resolved
    }

    /// Maps `node` and everything below it. Does nothing if `node` was removed.
    pub fn map_subtree(
        &self,
        document: &Document,
        association: &mut SchemaAssociation,
        node: NodeId,
    ) {
        if !document.contains(node) {
            return;
        }
        let path = document.path_of(node);
        let parent_schema = document
            .get_node(node)
            .and_then(|n| n.parent)
            .and_then(|parent| association.get(parent));
        self.map_from(document, association, node, path, parent_schema);
    }

    /// Resolves the schema for a node at `path` whose parent is governed by `parent_schema`.
    pub fn resolve(
        &self,
        path: &DocPath,
        parent_schema: Option<SchemaNodeId>,
    ) -> Option<SchemaNodeId> {
        if let Some((mount, root)) = self.schema.longest_mount(path) {
            let rest = path.strip_prefix(mount)?;
            return self.schema.descend(root, rest);
        }
        let segment = path.last()?;
        self.schema.child_schema(parent_schema?, segment)
    }

    fn map_from(
        &self,
        document: &Document,
        association: &mut SchemaAssociation,
        start: NodeId,
        start_path: DocPath,
        parent_schema: Option<SchemaNodeId>,
    ) {
        let mut stack = vec![(start, start_path, parent_schema)];
        while let Some((node, path, parent_schema)) = stack.pop() {
            let resolved = self.resolve(&path, parent_schema);
            association.insert(node, resolved);
            for child in document.children(node).into_iter().rev() {
                let Some(child_node) = document.get_node(child) else {
                    continue;
                };
                stack.push((child, path.child(child_node.name.clone()), resolved));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_schema;
    use crate::config::BuilderConfig;
    use crate::descriptor::{PropertyDef, TypeBundle, TypeDef, TypeRef};
    use serde_json::json;

    fn schema() -> SchemaDocument {
        let bundle = TypeBundle::new()
            .with_type(TypeDef::composite(
                "root",
                vec![
                    PropertyDef::new("name", TypeRef::named("string")),
                    PropertyDef::new("servers", TypeRef::sequence(TypeRef::named("server"))),
                ],
            ))
            .with_type(TypeDef::composite(
                "server",
                vec![PropertyDef::new("port", TypeRef::named("integer"))],
            ))
            .with_mount("", TypeRef::named("root"))
            .with_mount("plugins/x", TypeRef::map(TypeRef::named("boolean")));
        build_schema(&[bundle], &BuilderConfig::default()).schema
    }

    #[test]
    fn test_map_tree() {
        let schema = schema();
        let doc = Document::from_json(json!({
            "name": "app",
            "servers": [{ "port": 80, "extra": true }],
            "plugins": { "x": { "on": true }, "y": 1 }
        }));
        let association = map_tree(&doc, &schema);
        assert_eq!(association.len(), doc.len());

        let at = |p: &str| association.get(doc.find_by_path(&p.parse().unwrap()).unwrap());
        let root = schema.mount(&DocPath::root()).unwrap();
        assert_eq!(at(""), Some(root));
        assert_eq!(at("name"), schema.child_schema(root, "name"));
        let port = at("servers/0/port").unwrap();
        assert_eq!(schema.node(port).name, "port");
        assert_eq!(at("servers/0/extra"), None);
        // Below the root mount, "plugins" is not a property of root.
        assert_eq!(at("plugins"), None);
        assert_eq!(at("plugins/y"), None);
        // The deeper mount wins for its subtree.
        let x = schema.mount(&"plugins/x".parse().unwrap()).unwrap();
        assert_eq!(at("plugins/x"), Some(x));
        assert!(at("plugins/x/on").is_some());
    }

    #[test]
    fn test_map_node_matches_map_tree() {
        let schema = schema();
        let doc = Document::from_json(json!({ "servers": [{ "port": 1 }, { "port": 2 }] }));
        let full = map_tree(&doc, &schema);

        let mapper = SchemaMapper::new(&schema);
        let mut incremental = SchemaAssociation::default();
        for node in doc.descendants(doc.get_root_id()) {
            mapper.map_node(&doc, &mut incremental, node);
        }
        assert_eq!(full, incremental);
    }

    #[test]
    fn test_removed_node_is_not_recorded() {
        let schema = schema();
        let mut doc = Document::from_json(json!({ "name": "app", "servers": [{ "port": 1 }] }));
        let mut association = map_tree(&doc, &schema);
        let servers = doc.find_by_path(&"servers".parse().unwrap()).unwrap();
        let removed = doc.remove_node(servers).unwrap();
        for node in &removed {
            association.remove(*node);
        }

        let mapper = SchemaMapper::new(&schema);
        let before = association.clone();
        assert_eq!(mapper.map_node(&doc, &mut association, servers), None);
        mapper.map_subtree(&doc, &mut association, servers);
        assert_eq!(association, before);
        assert!(!association.contains(servers));
    }

    #[test]
    fn test_unmapped_entry_vs_unschematized() {
        let schema = SchemaDocument::default();
        let doc = Document::from_json(json!({ "a": 1 }));
        let association = map_tree(&doc, &schema);
        let a = doc.find_by_path(&"a".parse().unwrap()).unwrap();
        assert_eq!(association.entry(a), Some(None));
        assert_eq!(association.entry(NodeId(99)), None);
        assert!(!association.contains(NodeId(99)));
    }
}
