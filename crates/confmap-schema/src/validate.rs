//! Document validation against a mapped schema
//!
//! # Architecture
//!
//! - `NodeValidator`: dispatches on the node's content
//! - `ValueValidator`, `ObjectValidator`, `ArrayValidator`, `ReferenceValidator`:
//!   one per node shape
//! - `ValidationContext`: shared references, current path and diagnostics
//!
//! Validation never fails. Every independent violation becomes one
//! [`Diagnostic`] and the pass runs to the end of the subtree.

mod compound;
mod context;
mod reference;
mod value;

pub use context::{ValidationContext, ValidationState};

use confmap_document::{Document, NodeId, NodeValue};
use tracing::debug;

use crate::config::ValidatorConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::mapper::SchemaAssociation;
use crate::schema::{SchemaDocument, SchemaNodeId};

use compound::{ArrayValidator, ObjectValidator};
use reference::ReferenceValidator;
use value::ValueValidator;

// =============================================================================
// Public API
// =============================================================================

/// Validates the whole document, starting from the root's associated schema.
pub fn validate(
    document: &Document,
    schema: &SchemaDocument,
    association: &SchemaAssociation,
) -> Vec<Diagnostic> {
    Validator::new(document, schema, association).validate()
}

/// Validates the subtree at `node` against `schema_node`.
pub fn validate_node(
    document: &Document,
    schema: &SchemaDocument,
    association: &SchemaAssociation,
    node: NodeId,
    schema_node: Option<SchemaNodeId>,
) -> Vec<Diagnostic> {
    Validator::new(document, schema, association).validate_node(node, schema_node)
}

/// Validation entry point carrying a [`ValidatorConfig`].
pub struct Validator<'a> {
    document: &'a Document,
    schema: &'a SchemaDocument,
    association: &'a SchemaAssociation,
    config: ValidatorConfig,
}

impl<'a> Validator<'a> {
    pub fn new(
        document: &'a Document,
        schema: &'a SchemaDocument,
        association: &'a SchemaAssociation,
    ) -> Self {
        Self {
            document,
            schema,
            association,
            config: ValidatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn validate(&self) -> Vec<Diagnostic> {
        let root = self.document.get_root_id();
        self.validate_node(root, self.association.get(root))
    }

    pub fn validate_node(&self, node: NodeId, schema_node: Option<SchemaNodeId>) -> Vec<Diagnostic> {
        let ctx = ValidationContext::new(
            self.document,
            self.schema,
            self.association,
            &self.config,
            node,
        );
        NodeValidator {
            ctx: &ctx,
            schema_node_id: schema_node,
        }
        .validate(node);
        let diagnostics = ctx.finish();
        debug!(diagnostics = diagnostics.len(), "validation finished");
        diagnostics
    }
}

// =============================================================================
// NodeValidator (dispatcher)
// =============================================================================

pub(crate) struct NodeValidator<'a, 'doc> {
    pub ctx: &'a ValidationContext<'doc>,
    pub schema_node_id: Option<SchemaNodeId>,
}

impl NodeValidator<'_, '_> {
    pub fn validate(&self, node_id: NodeId) {
        let Some(node) = self.ctx.document.get_node(node_id) else {
            return;
        };

        if let NodeValue::Reference(reference) = &node.content {
            ReferenceValidator { ctx: self.ctx }.validate(node_id, reference);
            return;
        }

        if let Some(schema_node_id) = self.schema_node_id {
            self.check_read_only(node_id, schema_node_id);
        }

        match &node.content {
            NodeValue::Value(value) => {
                if let Some(schema_node_id) = self.schema_node_id {
                    ValueValidator {
                        ctx: self.ctx,
                        schema_node_id,
                    }
                    .validate(node_id, value);
                }
            }
            NodeValue::Object(map) => ObjectValidator {
                ctx: self.ctx,
                schema_node_id: self.schema_node_id,
            }
            .validate(node_id, map),
            NodeValue::Array(array) => ArrayValidator {
                ctx: self.ctx,
                schema_node_id: self.schema_node_id,
            }
            .validate(node_id, array),
            NodeValue::Reference(_) => {}
        }
    }

    fn check_read_only(&self, node_id: NodeId, schema_node_id: SchemaNodeId) {
        if !self.ctx.config.check_read_only {
            return;
        }
        let schema_node = self.ctx.schema.node(schema_node_id);
        if schema_node.is_read_only
            && self.ctx.document.node_to_json(node_id) != schema_node.default_value
        {
            self.ctx.record(node_id, DiagnosticKind::ReadOnlyModified);
        }
    }
}

/// Schema for a child: the association's entry when recorded, otherwise one
/// navigation step from the parent's schema.
pub(crate) fn child_schema(
    ctx: &ValidationContext<'_>,
    parent_schema: Option<SchemaNodeId>,
    child: NodeId,
    segment: &str,
) -> Option<SchemaNodeId> {
    match ctx.association.entry(child) {
        Some(recorded) => recorded,
        None => parent_schema.and_then(|parent| ctx.schema.child_schema(parent, segment)),
    }
}

/// Recurses into `child`, keeping the context path in step.
pub(crate) fn validate_child(
    ctx: &ValidationContext<'_>,
    parent_schema: Option<SchemaNodeId>,
    child: NodeId,
    segment: &str,
) {
    ctx.push_path(segment);
    NodeValidator {
        ctx,
        schema_node_id: child_schema(ctx, parent_schema, child, segment),
    }
    .validate(child);
    ctx.pop_path();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_schema;
    use crate::config::BuilderConfig;
    use crate::descriptor::{PropertyDef, TypeBundle, TypeDef, TypeRef};
    use crate::diagnostic::Severity;
    use crate::mapper::map_tree;
    use confmap_document::DocPath;
    use serde_json::{Value as JsonValue, json};

    fn schema() -> SchemaDocument {
        let bundle = TypeBundle::new()
            .with_type(TypeDef::enumeration("level", ["Info", "Debug"], false))
            .with_type(TypeDef::enumeration("features", ["Cache", "Trace", "Retry"], true))
            .with_type(TypeDef::composite(
                "app",
                vec![
                    PropertyDef::new("name", TypeRef::named("string")).pattern("^[a-z]+$"),
                    PropertyDef::new("port", TypeRef::named("integer"))
                        .default_value(json!(8080))
                        .range(Some(1.0), Some(65535.0)),
                    PropertyDef::new("ratio", TypeRef::named("number")).nullable(),
                    PropertyDef::new("level", TypeRef::named("level")),
                    PropertyDef::new("features", TypeRef::named("features")).required(false),
                    PropertyDef::new("tags", TypeRef::sequence(TypeRef::named("string"))),
                    PropertyDef::new("env", TypeRef::map(TypeRef::named("string"))),
                    PropertyDef::new("version", TypeRef::named("integer"))
                        .required(false)
                        .read_only()
                        .default_value(json!(1)),
                ],
            ))
            .with_mount("", TypeRef::named("app"));
        build_schema(&[bundle], &BuilderConfig::default()).schema
    }

    fn check(value: JsonValue) -> Vec<Diagnostic> {
        let schema = schema();
        let doc = Document::from_json(value);
        let association = map_tree(&doc, &schema);
        validate(&doc, &schema, &association)
    }

    fn kinds(diagnostics: &[Diagnostic]) -> Vec<&DiagnosticKind> {
        diagnostics.iter().map(|d| &d.kind).collect()
    }

    #[test]
    fn test_valid_document() {
        let diagnostics = check(json!({
            "name": "web",
            "port": 80,
            "ratio": null,
            "level": "debug",
            "features": "cache, Retry",
            "tags": ["a", "b"],
            "env": { "HOME": "/root" },
            "version": 2
        }));
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_missing_required() {
        let diagnostics = check(json!({ "level": "Info" }));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            &diagnostics[0].kind,
            DiagnosticKind::MissingRequiredProperty { property } if property == "port"
        ));
        assert_eq!(diagnostics[0].location.to_string(), "(root)");
    }

    #[test]
    fn test_disallowed_property() {
        let diagnostics = check(json!({ "port": 1, "level": "Info", "extra": 1 }));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            &diagnostics[0].kind,
            DiagnosticKind::DisallowedProperty { property } if property == "extra"
        ));
    }

    #[test]
    fn test_type_mismatch_stops_further_checks() {
        let diagnostics = check(json!({ "port": "80", "level": "Info", "ratio": 0.5 }));
        assert_eq!(diagnostics.len(), 1);
        let DiagnosticKind::TypeMismatch { expected, .. } = &diagnostics[0].kind else {
            panic!("expected type mismatch, got {diagnostics:?}");
        };
        assert_eq!(expected, "integer");
        assert_eq!(diagnostics[0].location.to_string(), "port");
    }

    #[test]
    fn test_null_requires_nullable() {
        let diagnostics = check(json!({ "port": null, "level": "Info", "ratio": null }));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0].kind, DiagnosticKind::TypeMismatch { .. }));
    }

    #[test]
    fn test_independent_constraint_checks() {
        let diagnostics = check(json!({
            "name": "Web1",
            "port": 70000,
            "level": "Warn",
            "features": "cache,bogus"
        }));
        let kinds = kinds(&diagnostics);
        assert_eq!(kinds.len(), 4, "{diagnostics:?}");
        assert!(matches!(kinds[0], DiagnosticKind::PatternMismatch { .. }));
        assert!(matches!(kinds[1], DiagnosticKind::AboveMaximum { max, .. } if *max == 65535.0));
        assert!(matches!(kinds[2], DiagnosticKind::ValueNotAllowed { value, .. } if value == "Warn"));
        assert!(matches!(kinds[3], DiagnosticKind::ValueNotAllowed { value, .. } if value == "bogus"));
    }

    #[test]
    fn test_shape_mismatches() {
        let diagnostics = check(json!({
            "port": { "value": 1 },
            "level": "Info",
            "tags": { "a": "b" },
            "env": ["x"]
        }));
        let paths: Vec<_> = diagnostics.iter().map(|d| d.location.to_string()).collect();
        assert_eq!(paths, vec!["port", "tags", "env"]);
        assert!(diagnostics
            .iter()
            .all(|d| matches!(d.kind, DiagnosticKind::TypeMismatch { .. })));
    }

    #[test]
    fn test_nested_paths() {
        let diagnostics = check(json!({ "port": 1, "level": "Info", "tags": ["ok", 3] }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].location.to_string(), "tags/1");
    }

    #[test]
    fn test_reference_exemption() {
        let diagnostics = check(json!({
            "port": { "$ref": "/defaults/port" },
            "level": { "$ref": "bad" }
        }));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            &diagnostics[0].kind,
            DiagnosticKind::InvalidReferencePath { path } if path == "bad"
        ));
    }

    #[test]
    fn test_unschematized_subtree_checks_references_only() {
        let schema = SchemaDocument::default();
        let doc = Document::from_json(json!({ "a": { "b": { "$ref": "" } }, "c": 1 }));
        let association = map_tree(&doc, &schema);
        let diagnostics = validate(&doc, &schema, &association);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].location.to_string(), "a/b");
    }

    #[test]
    fn test_read_only_check() {
        let schema = schema();
        let doc = Document::from_json(json!({ "port": 1, "level": "Info", "version": 2 }));
        let association = map_tree(&doc, &schema);
        let plain = Validator::new(&doc, &schema, &association).validate();
        assert!(plain.is_empty());

        let strict = Validator::new(&doc, &schema, &association)
            .with_config(ValidatorConfig {
                check_read_only: true,
            })
            .validate();
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].severity, Severity::Warning);
        assert!(matches!(strict[0].kind, DiagnosticKind::ReadOnlyModified));
    }

    #[test]
    fn test_validate_node_subtree() {
        let schema = schema();
        let doc = Document::from_json(json!({ "tags": [1], "port": "x" }));
        let association = map_tree(&doc, &schema);
        let tags = doc.find_by_path(&"tags".parse::<DocPath>().unwrap()).unwrap();
        let diagnostics =
            validate_node(&doc, &schema, &association, tags, association.get(tags));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].location.to_string(), "tags/0");
        assert_eq!(diagnostics[0].node_id(), doc.child(tags, "0"));
    }
}
