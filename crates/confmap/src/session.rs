//! A document paired with its current schema and node association.

use std::sync::Arc;

use confmap_document::{DocPath, Document, NodeId};
use confmap_schema::{
    BuilderConfig, Diagnostic, Materialization, Materialized, Materializer, SchemaAssociation,
    SchemaDocument, SchemaMapper, SchemaNodeId, TypeBundle, ValidatorConfig, Validator,
    VirtualLocation, VirtualSegment, build_schema, virtual_children,
};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::slot::SchemaSlot;

/// Owns the document and keeps the association in step with the schema the
/// session last picked up from its [`SchemaSlot`].
#[derive(Debug)]
pub struct Session {
    document: Document,
    slot: SchemaSlot,
    schema: Option<Arc<SchemaDocument>>,
    association: SchemaAssociation,
    builder_config: BuilderConfig,
    validator_config: ValidatorConfig,
}

impl Session {
    pub fn new(document: Document) -> Self {
        Self::with_slot(document, SchemaSlot::new())
    }

    /// A session reading schemas published to a shared slot.
    pub fn with_slot(document: Document, slot: SchemaSlot) -> Self {
        let mut session = Self {
            document,
            slot,
            schema: None,
            association: SchemaAssociation::default(),
            builder_config: BuilderConfig::default(),
            validator_config: ValidatorConfig::default(),
        };
        session.refresh();
        session
    }

    pub fn with_builder_config(mut self, config: BuilderConfig) -> Self {
        self.builder_config = config;
        self
    }

    pub fn with_validator_config(mut self, config: ValidatorConfig) -> Self {
        self.validator_config = config;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access for external edits. Follow up with [`Session::map_node`]
    /// for inserted nodes, or [`Session::remap`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn schema(&self) -> Option<&Arc<SchemaDocument>> {
        self.schema.as_ref()
    }

    pub fn association(&self) -> &SchemaAssociation {
        &self.association
    }

    pub fn slot(&self) -> &SchemaSlot {
        &self.slot
    }

    /// Builds a schema from `bundles`, publishes it and remaps the document.
    /// Returns the build diagnostics.
    pub fn load_schema(&mut self, bundles: &[TypeBundle]) -> Vec<Diagnostic> {
        let output = build_schema(bundles, &self.builder_config);
        info!(
            mounts = output.schema.mounts().count(),
            diagnostics = output.diagnostics.len(),
            "schema loaded"
        );
        self.slot.publish(output.schema);
        self.refresh();
        output.diagnostics
    }

    /// Picks up a newly published schema. Returns whether the schema changed.
    pub fn refresh(&mut self) -> bool {
        let current = self.slot.current();
        let unchanged = match (&current, &self.schema) {
            (Some(new), Some(old)) => Arc::ptr_eq(new, old),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return false;
        }
        self.schema = current;
        self.remap();
        true
    }

    /// Rebuilds the whole association.
    pub fn remap(&mut self) {
        self.association = match &self.schema {
            Some(schema) => SchemaMapper::new(schema).map_tree(&self.document),
            None => SchemaAssociation::default(),
        };
        debug!(nodes = self.association.len(), "session remapped");
    }

    /// Maps `node` and its subtree after an external insertion.
    /// Returns `None` when there is no schema, no governing schema node, or
    /// `node` is no longer in the document.
    pub fn map_node(&mut self, node: NodeId) -> Option<SchemaNodeId> {
        let schema = self.schema.as_ref()?;
        if !self.document.contains(node) {
            return None;
        }
        let mapper = SchemaMapper::new(schema);
        mapper.map_subtree(&self.document, &mut self.association, node);
        self.association.get(node)
    }

    pub fn validate(&self) -> Vec<Diagnostic> {
        let Some(schema) = &self.schema else {
            return Vec::new();
        };
        Validator::new(&self.document, schema, &self.association)
            .with_config(self.validator_config.clone())
            .validate()
    }

    pub fn virtual_children(&self, node: NodeId) -> Vec<VirtualSegment> {
        match &self.schema {
            Some(schema) => virtual_children(&self.document, schema, &self.association, node),
            None => Vec::new(),
        }
    }

    pub fn materialize(
        &mut self,
        location: &VirtualLocation,
    ) -> Result<Materialized, SessionError> {
        let schema = self.schema.as_ref().ok_or(SessionError::NoSchema)?;
        Ok(Materializer::new(schema).materialize(
            &mut self.document,
            &mut self.association,
            location,
        )?)
    }

    /// Materializes the node at `path`, creating missing ancestors.
    pub fn materialize_path(&mut self, path: &DocPath) -> Result<Materialized, SessionError> {
        let schema = self.schema.as_ref().ok_or(SessionError::NoSchema)?;
        let location = VirtualLocation::resolve(&self.document, schema, &self.association, path)?;
        self.materialize(&location)
    }

    /// Undoes a materialization returned by this session.
    pub fn revert(&mut self, materialization: &Materialization) -> Result<(), SessionError> {
        let schema = self.schema.as_ref().ok_or(SessionError::NoSchema)?;
        Materializer::new(schema).revert(
            &mut self.document,
            &mut self.association,
            materialization,
        )?;
        Ok(())
    }
}
