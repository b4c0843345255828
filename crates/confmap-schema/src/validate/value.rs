//! Scalar checks: type compatibility, range, pattern and allowed values.

use confmap_document::{NodeId, ValueKind};
use serde_json::Value as JsonValue;

use crate::diagnostic::DiagnosticKind;
use crate::schema::{SchemaNode, SchemaNodeId, TypeKind};

use super::context::ValidationContext;

pub struct ValueValidator<'a, 'doc> {
    pub ctx: &'a ValidationContext<'doc>,
    pub schema_node_id: SchemaNodeId,
}

impl ValueValidator<'_, '_> {
    pub fn validate(&self, node_id: NodeId, value: &JsonValue) {
        let schema = self.ctx.schema.node(self.schema_node_id);
        let actual = ValueKind::of(value);
        if !schema.declared_type.accepts(actual) {
            self.ctx.record(
                node_id,
                DiagnosticKind::TypeMismatch {
                    expected: schema.declared_type.to_string(),
                    actual,
                },
            );
            return;
        }

        match value {
            JsonValue::Number(number) => {
                if let Some(n) = number.as_f64() {
                    self.check_range(node_id, schema, n);
                }
                // Numeric enum values are not member names
                if !matches!(schema.declared_type.kind, TypeKind::Enum(_)) {
                    self.check_allowed(node_id, schema, &number.to_string());
                }
            }
            JsonValue::String(text) => {
                self.check_pattern(node_id, schema, text);
                self.check_allowed(node_id, schema, text);
            }
            JsonValue::Bool(flag) => self.check_allowed(node_id, schema, &flag.to_string()),
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => {}
        }
    }

    fn check_range(&self, node_id: NodeId, schema: &SchemaNode, value: f64) {
        if let Some(min) = schema.min {
            if value < min {
                self.ctx
                    .record(node_id, DiagnosticKind::BelowMinimum { value, min });
            }
        }
        if let Some(max) = schema.max {
            if value > max {
                self.ctx
                    .record(node_id, DiagnosticKind::AboveMaximum { value, max });
            }
        }
    }

    fn check_pattern(&self, node_id: NodeId, schema: &SchemaNode, text: &str) {
        let Some(pattern) = &schema.pattern else {
            return;
        };
        if !pattern.is_match(text) {
            self.ctx.record(
                node_id,
                DiagnosticKind::PatternMismatch {
                    value: text.to_string(),
                    pattern: pattern.source.clone(),
                },
            );
        }
    }

    /// Case-insensitive; flag enums check each comma-separated member.
    fn check_allowed(&self, node_id: NodeId, schema: &SchemaNode, text: &str) {
        let Some(allowed) = &schema.allowed_values else {
            return;
        };
        let members: Vec<&str> = if schema.is_enum_flags {
            text.split(',').map(str::trim).collect()
        } else {
            vec![text]
        };
        for member in members {
            if !allowed.contains(&member.to_lowercase()) {
                self.ctx.record(
                    node_id,
                    DiagnosticKind::ValueNotAllowed {
                        value: member.to_string(),
                        allowed: allowed.iter().cloned().collect(),
                    },
                );
            }
        }
    }
}
