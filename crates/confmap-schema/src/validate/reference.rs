//! Reference nodes are exempt from type checks; only the path syntax is checked.

use confmap_document::{NodeId, Reference};

use crate::diagnostic::DiagnosticKind;

use super::context::ValidationContext;

pub struct ReferenceValidator<'a, 'doc> {
    pub ctx: &'a ValidationContext<'doc>,
}

impl ReferenceValidator<'_, '_> {
    pub fn validate(&self, node_id: NodeId, reference: &Reference) {
        if !reference.is_well_formed() {
            self.ctx.record(
                node_id,
                DiagnosticKind::InvalidReferencePath {
                    path: reference.path.clone(),
                },
            );
        }
    }
}
