//! Object and array validators

use confmap_document::{NodeArray, NodeId, NodeMap, ValueKind};

use crate::diagnostic::DiagnosticKind;
use crate::schema::{SchemaKind, SchemaNode, SchemaNodeId};

use super::context::ValidationContext;
use super::validate_child;

// =============================================================================
// ObjectValidator
// =============================================================================

pub struct ObjectValidator<'a, 'doc> {
    pub ctx: &'a ValidationContext<'doc>,
    pub schema_node_id: Option<SchemaNodeId>,
}

impl ObjectValidator<'_, '_> {
    pub fn validate(&self, node_id: NodeId, map: &NodeMap) {
        if let Some(schema_node_id) = self.schema_node_id {
            let schema = self.ctx.schema.node(schema_node_id);
            match schema.kind() {
                SchemaKind::Object => {
                    self.check_required(node_id, schema_node_id, map);
                    self.check_additional(node_id, schema, map);
                }
                SchemaKind::Array => {
                    record_mismatch(self.ctx, node_id, schema, ValueKind::Object);
                    return;
                }
                SchemaKind::Value if !schema.declared_type.accepts(ValueKind::Object) => {
                    record_mismatch(self.ctx, node_id, schema, ValueKind::Object);
                    return;
                }
                SchemaKind::Value => {}
            }
        }

        for (key, child) in map.iter() {
            validate_child(self.ctx, self.schema_node_id, child, key);
        }
    }

    fn check_required(&self, node_id: NodeId, schema_node_id: SchemaNodeId, map: &NodeMap) {
        for property in self.ctx.schema.required_properties(schema_node_id) {
            if !map.contains_key(property) {
                self.ctx.record(
                    node_id,
                    DiagnosticKind::MissingRequiredProperty {
                        property: property.to_string(),
                    },
                );
            }
        }
    }

    fn check_additional(&self, node_id: NodeId, schema: &SchemaNode, map: &NodeMap) {
        if schema.allow_additional_properties {
            return;
        }
        for key in map.keys() {
            if schema.property(key).is_none() {
                self.ctx.record(
                    node_id,
                    DiagnosticKind::DisallowedProperty {
                        property: key.clone(),
                    },
                );
            }
        }
    }
}

// =============================================================================
// ArrayValidator
// =============================================================================

pub struct ArrayValidator<'a, 'doc> {
    pub ctx: &'a ValidationContext<'doc>,
    pub schema_node_id: Option<SchemaNodeId>,
}

impl ArrayValidator<'_, '_> {
    pub fn validate(&self, node_id: NodeId, array: &NodeArray) {
        if let Some(schema_node_id) = self.schema_node_id {
            let schema = self.ctx.schema.node(schema_node_id);
            let compatible = match schema.kind() {
                SchemaKind::Array => true,
                SchemaKind::Object => false,
                SchemaKind::Value => schema.declared_type.accepts(ValueKind::Array),
            };
            if !compatible {
                record_mismatch(self.ctx, node_id, schema, ValueKind::Array);
                return;
            }
        }

        for (index, child) in array.iter().enumerate() {
            validate_child(self.ctx, self.schema_node_id, *child, &index.to_string());
        }
    }
}

fn record_mismatch(
    ctx: &ValidationContext<'_>,
    node_id: NodeId,
    schema: &SchemaNode,
    actual: ValueKind,
) {
    ctx.record(
        node_id,
        DiagnosticKind::TypeMismatch {
            expected: schema.declared_type.to_string(),
            actual,
        },
    );
}
