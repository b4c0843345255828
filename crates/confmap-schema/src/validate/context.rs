//! Validation context and state
//!
//! `ValidationContext` bundles what every check needs:
//! - the document, schema and association being validated
//! - the current canonical path for diagnostics
//! - the accumulated diagnostics

use std::cell::RefCell;

use confmap_document::{DocPath, Document, NodeId};

use crate::config::ValidatorConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::mapper::SchemaAssociation;
use crate::schema::SchemaDocument;

/// Mutable state threaded through a validation pass.
#[derive(Debug, Default)]
pub struct ValidationState {
    /// Canonical path of the node being checked.
    pub path: DocPath,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationState {
    pub fn new(path: DocPath) -> Self {
        Self {
            path,
            diagnostics: Vec::new(),
        }
    }

    pub fn record(&mut self, node_id: NodeId, kind: DiagnosticKind) {
        let path = self.path.clone();
        self.diagnostics.push(Diagnostic::node(node_id, path, kind));
    }

    pub fn push_path(&mut self, segment: &str) {
        self.path.push(segment);
    }

    pub fn pop_path(&mut self) {
        self.path.pop();
    }
}

/// Shared references plus interior-mutable state, so checks only need `&self`.
pub struct ValidationContext<'a> {
    pub document: &'a Document,
    pub schema: &'a SchemaDocument,
    pub association: &'a SchemaAssociation,
    pub config: &'a ValidatorConfig,
    pub state: RefCell<ValidationState>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        document: &'a Document,
        schema: &'a SchemaDocument,
        association: &'a SchemaAssociation,
        config: &'a ValidatorConfig,
        start: NodeId,
    ) -> Self {
        Self {
            document,
            schema,
            association,
            config,
            state: RefCell::new(ValidationState::new(document.path_of(start))),
        }
    }

    pub fn record(&self, node_id: NodeId, kind: DiagnosticKind) {
        self.state.borrow_mut().record(node_id, kind);
    }

    pub fn push_path(&self, segment: &str) {
        self.state.borrow_mut().push_path(segment);
    }

    pub fn pop_path(&self) {
        self.state.borrow_mut().pop_path();
    }

    pub fn finish(self) -> Vec<Diagnostic> {
        self.state.into_inner().diagnostics
    }
}
