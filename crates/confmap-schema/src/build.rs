//! Schema builder: type bundles in, [`SchemaDocument`] plus diagnostics out.
//!
//! Every mount declaration produces one root. A root that fails (unknown type,
//! malformed annotation) is rolled back and reported; the other roots still
//! build. Recursive types are cut at the point where a type reappears on its
//! own construction path, so sibling branches sharing a type still build fully.

use confmap_document::DocPath;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::config::BuilderConfig;
use crate::defaults::derive_default;
use crate::descriptor::{Constraints, PropertyDef, TypeBundle, TypeDef, TypeRef, TypeShape};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::schema::{
    DeclaredType, Pattern, SchemaDocument, SchemaNode, SchemaNodeId, TypeKind, WILDCARD,
};

/// Result of a build: the schema is always usable, possibly with roots missing.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub schema: SchemaDocument,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Builds a schema from `bundles` in declaration order.
pub fn build_schema(bundles: &[TypeBundle], config: &BuilderConfig) -> BuildOutput {
    SchemaBuilder::new(bundles, config).build()
}

/// Shape of a node under construction, before it is flattened into slots.
#[derive(Debug, Clone)]
pub(crate) enum Shape {
    Scalar,
    Enum { members: Vec<String>, flags: bool },
    Object(IndexMap<String, SchemaNodeId>),
    Map(SchemaNodeId),
    Array(SchemaNodeId),
    /// Recursion cut: no children, defaults to null.
    Placeholder,
}

pub struct SchemaBuilder<'t> {
    bundles: &'t [TypeBundle],
    config: &'t BuilderConfig,
    schema: SchemaDocument,
    diagnostics: Vec<Diagnostic>,
    /// Named types on the current construction path.
    visiting: Vec<&'t str>,
    /// Bundle owning the mount being built; its types shadow other bundles'.
    current_bundle: usize,
    current_mount: String,
}

impl<'t> SchemaBuilder<'t> {
    pub fn new(bundles: &'t [TypeBundle], config: &'t BuilderConfig) -> Self {
        Self {
            bundles,
            config,
            schema: SchemaDocument::default(),
            diagnostics: Vec::new(),
            visiting: Vec::new(),
            current_bundle: 0,
            current_mount: String::new(),
        }
    }

    pub fn build(mut self) -> BuildOutput {
        let bundles = self.bundles;
        for (bundle_index, bundle) in bundles.iter().enumerate() {
            for mount in &bundle.mounts {
                self.build_mount(bundle_index, &mount.path, &mount.root);
            }
        }
        debug!(
            mounts = self.schema.mounts.len(),
            nodes = self.schema.len(),
            diagnostics = self.diagnostics.len(),
            "schema built"
        );
        BuildOutput {
            schema: self.schema,
            diagnostics: self.diagnostics,
        }
    }

    fn build_mount(&mut self, bundle_index: usize, raw_path: &str, root: &'t TypeRef) {
        let path: DocPath = match raw_path.parse() {
            Ok(path) => path,
            Err(err) => {
                warn!(path = raw_path, "skipping mount with invalid path");
                self.diagnostics.push(Diagnostic::mount(
                    raw_path,
                    DiagnosticKind::InvalidMountPath {
                        path: raw_path.to_string(),
                        reason: err.to_string(),
                    },
                ));
                return;
            }
        };
        if self.schema.mount(&path).is_some() {
            warn!(path = raw_path, "duplicate mount path");
            self.diagnostics.push(Diagnostic::mount(
                raw_path,
                DiagnosticKind::DuplicateMount {
                    path: raw_path.to_string(),
                },
            ));
            return;
        }

        self.current_bundle = bundle_index;
        self.current_mount = raw_path.to_string();
        self.visiting.clear();
        let node_checkpoint = self.schema.len();
        let diagnostic_checkpoint = self.diagnostics.len();

        match self.build_node(root, raw_path, None, raw_path) {
            Ok(id) => self.schema.add_mount(path, id),
            Err(kind) => {
                warn!(path = raw_path, error = %kind, "skipping mount root");
                self.schema.truncate(node_checkpoint);
                self.diagnostics.truncate(diagnostic_checkpoint);
                self.diagnostics.push(Diagnostic::mount(raw_path, kind));
            }
        }
    }

    /// Looks in the mount's own bundle first, then in the others in order.
    fn find_type(&self, name: &str) -> Option<&'t TypeDef> {
        let bundles: &'t [TypeBundle] = self.bundles;
        bundles
            .get(self.current_bundle)
            .and_then(|bundle| bundle.find(name))
            .or_else(|| bundles.iter().find_map(|bundle| bundle.find(name)))
    }

    /// Builds the schema node for `ty`. `property` is set when the node is a
    /// property of a composite; only then can it be required.
    fn build_node(
        &mut self,
        ty: &'t TypeRef,
        name: &str,
        property: Option<&'t PropertyDef>,
        at: &str,
    ) -> Result<SchemaNodeId, DiagnosticKind> {
        let nullable = property.is_some_and(|p| p.nullable);
        let own_constraints = property.map(|p| &p.constraints);

        match ty {
            TypeRef::Sequence { sequence } => {
                let element = self.build_node(sequence, WILDCARD, None, &join(at, WILDCARD))?;
                let constraints = own_constraints.cloned().unwrap_or_default();
                let declared = DeclaredType::new(TypeKind::Sequence, nullable);
                self.finish(name, declared, property, &constraints, Shape::Array(element), at)
            }
            TypeRef::Map { map } => {
                let value = self.build_node(map, WILDCARD, None, &join(at, WILDCARD))?;
                let constraints = own_constraints.cloned().unwrap_or_default();
                let declared = DeclaredType::new(TypeKind::Map, nullable);
                self.finish(name, declared, property, &constraints, Shape::Map(value), at)
            }
            TypeRef::Named(type_name) => {
                if let Some(primitive) = ty.primitive() {
                    let constraints = own_constraints.cloned().unwrap_or_default();
                    let declared = DeclaredType::new(primitive.into(), nullable);
                    return self.finish(name, declared, property, &constraints, Shape::Scalar, at);
                }
                let def = self
                    .find_type(type_name)
                    .ok_or_else(|| DiagnosticKind::UnresolvedType {
                        type_name: type_name.clone(),
                        at: display_at(at),
                    })?;
                self.build_named(def, name, property, at)
            }
        }
    }

    fn build_named(
        &mut self,
        def: &'t TypeDef,
        name: &str,
        property: Option<&'t PropertyDef>,
        at: &str,
    ) -> Result<SchemaNodeId, DiagnosticKind> {
        let nullable = property.is_some_and(|p| p.nullable);
        let constraints = match property {
            Some(p) => p.constraints.merged_over(&def.constraints),
            None => def.constraints.clone(),
        };
        let kind = match &def.shape {
            TypeShape::Composite { .. } => TypeKind::Composite(def.name.clone()),
            TypeShape::Enum { .. } => TypeKind::Enum(def.name.clone()),
            TypeShape::Map { .. } => TypeKind::Map,
            TypeShape::Sequence { .. } => TypeKind::Sequence,
        };
        let declared = DeclaredType::new(kind, nullable);

        if self.visiting.contains(&def.name.as_str()) {
            warn!(type_name = %def.name, at = %display_at(at), "recursive type truncated");
            self.diagnostics.push(Diagnostic::mount(
                self.current_mount.clone(),
                DiagnosticKind::CycleTruncated {
                    type_name: def.name.clone(),
                    at: display_at(at),
                },
            ));
            return self.finish(name, declared, property, &constraints, Shape::Placeholder, at);
        }

        self.visiting.push(&def.name);
        let shape = self.build_shape(def, at);
        self.visiting.pop();
        let shape = shape?;

        self.finish(name, declared, property, &constraints, shape, at)
    }

    fn build_shape(&mut self, def: &'t TypeDef, at: &str) -> Result<Shape, DiagnosticKind> {
        match &def.shape {
            TypeShape::Composite { properties } => {
                let mut built = IndexMap::new();
                for property in properties.iter().filter(|p| !p.hidden) {
                    if built.contains_key(&property.name) {
                        return Err(DiagnosticKind::MalformedAnnotation {
                            at: display_at(at),
                            reason: format!("duplicate property '{}'", property.name),
                        });
                    }
                    let child_at = join(at, &property.name);
                    let child =
                        self.build_node(&property.ty, &property.name, Some(property), &child_at)?;
                    built.insert(property.name.clone(), child);
                }
                Ok(Shape::Object(built))
            }
            TypeShape::Enum { members, flags } => Ok(Shape::Enum {
                members: members.clone(),
                flags: *flags,
            }),
            TypeShape::Map { value } => Ok(Shape::Map(self.build_node(
                value,
                WILDCARD,
                None,
                &join(at, WILDCARD),
            )?)),
            TypeShape::Sequence { element } => Ok(Shape::Array(self.build_node(
                element,
                WILDCARD,
                None,
                &join(at, WILDCARD),
            )?)),
        }
    }

    /// Applies constraints, derives the default and pushes the node.
    fn finish(
        &mut self,
        name: &str,
        declared: DeclaredType,
        property: Option<&PropertyDef>,
        constraints: &Constraints,
        shape: Shape,
        at: &str,
    ) -> Result<SchemaNodeId, DiagnosticKind> {
        let malformed = |reason: String| DiagnosticKind::MalformedAnnotation {
            at: display_at(at),
            reason,
        };
        if let (Some(min), Some(max)) = (constraints.min, constraints.max) {
            if min > max {
                return Err(malformed(format!("min {min} is greater than max {max}")));
            }
        }
        let pattern = constraints
            .pattern
            .as_deref()
            .map(Pattern::new)
            .transpose()
            .map_err(|err| malformed(format!("invalid pattern: {err}")))?;

        let is_required = property.is_some()
            && constraints
                .required
                .unwrap_or(declared.is_value_shaped() && !declared.nullable);

        let enum_members = match &shape {
            Shape::Enum { members, .. } => Some(members.as_slice()),
            _ => None,
        };
        let allowed_values: Option<IndexSet<String>> = constraints
            .allowed_values
            .as_deref()
            .or(enum_members)
            .map(|values| values.iter().map(|v| v.to_lowercase()).collect());

        let default_value =
            derive_default(&self.schema, &declared, constraints.default.as_ref(), &shape);

        let mut node = SchemaNode {
            name: name.to_string(),
            declared_type: declared,
            is_required,
            is_read_only: constraints.read_only,
            default_value,
            min: constraints.min,
            max: constraints.max,
            pattern,
            allowed_values,
            is_enum_flags: matches!(shape, Shape::Enum { flags: true, .. }),
            properties: None,
            additional_properties: None,
            allow_additional_properties: false,
            item_schema: None,
            mount_path: None,
        };
        match shape {
            Shape::Object(properties) => {
                node.allow_additional_properties =
                    properties.is_empty() || !self.config.closed_objects;
                node.properties = Some(properties);
            }
            Shape::Map(value) => {
                node.properties = Some(IndexMap::new());
                node.additional_properties = Some(value);
                node.allow_additional_properties = true;
            }
            Shape::Array(element) => node.item_schema = Some(element),
            Shape::Scalar | Shape::Enum { .. } | Shape::Placeholder => {}
        }
        Ok(self.schema.push(node))
    }
}

fn join(at: &str, segment: &str) -> String {
    if at.is_empty() {
        segment.to_string()
    } else {
        format!("{at}/{segment}")
    }
}

fn display_at(at: &str) -> String {
    if at.is_empty() {
        "(root)".to_string()
    } else {
        at.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PropertyDef;
    use crate::diagnostic::Severity;
    use crate::schema::SchemaKind;
    use serde_json::{Value as JsonValue, json};

    fn path(s: &str) -> DocPath {
        s.parse().unwrap()
    }

    fn build(bundle: TypeBundle) -> BuildOutput {
        build_schema(&[bundle], &BuilderConfig::default())
    }

    fn database_bundle() -> TypeBundle {
        TypeBundle::new()
            .with_type(TypeDef::composite(
                "database",
                vec![
                    PropertyDef::new("host", TypeRef::named("string")),
                    PropertyDef::new("port", TypeRef::named("integer"))
                        .default_value(json!(5432))
                        .range(Some(1.0), Some(65535.0)),
                    PropertyDef::new("timeout", TypeRef::named("number")).nullable(),
                    PropertyDef::new("secret", TypeRef::named("string")).hidden(),
                ],
            ))
            .with_mount("database", TypeRef::named("database"))
    }

    #[test]
    fn test_build_composite() {
        let output = build(database_bundle());
        assert!(output.diagnostics.is_empty());
        let schema = &output.schema;
        let root = schema.mount(&path("database")).unwrap();
        let node = schema.node(root);
        assert_eq!(node.kind(), SchemaKind::Object);
        assert_eq!(node.mount_path, Some(path("database")));
        assert!(!node.allow_additional_properties);
        assert!(!node.is_required);

        let names: Vec<_> = node.properties.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["host", "port", "timeout"]);

        let port = schema.node(node.property("port").unwrap());
        assert!(port.is_required);
        assert_eq!(port.min, Some(1.0));
        assert_eq!(port.default_value, json!(5432));

        let host = schema.node(node.property("host").unwrap());
        assert!(!host.is_required);
        let timeout = schema.node(node.property("timeout").unwrap());
        assert!(!timeout.is_required);
        assert_eq!(timeout.default_value, JsonValue::Null);

        assert_eq!(node.default_value, json!({ "port": 5432 }));
    }

    #[test]
    fn test_open_objects_when_configured() {
        let config = BuilderConfig {
            closed_objects: false,
        };
        let output = build_schema(&[database_bundle()], &config);
        let root = output.schema.mount(&path("database")).unwrap();
        assert!(output.schema.node(root).allow_additional_properties);
    }

    #[test]
    fn test_empty_composite_is_open() {
        let output = build(
            TypeBundle::new()
                .with_type(TypeDef::composite("bag", vec![]))
                .with_mount("", TypeRef::named("bag")),
        );
        let root = output.schema.mount(&DocPath::root()).unwrap();
        let node = output.schema.node(root);
        assert!(node.allow_additional_properties);
        assert_eq!(node.kind(), SchemaKind::Object);
    }

    #[test]
    fn test_enum_and_collections() {
        let output = build(
            TypeBundle::new()
                .with_type(TypeDef::enumeration("level", ["Info", "Debug"], false))
                .with_type(TypeDef::enumeration("mode", ["Read", "Write"], true))
                .with_type(TypeDef::composite(
                    "app",
                    vec![
                        PropertyDef::new("level", TypeRef::named("level")),
                        PropertyDef::new("mode", TypeRef::named("mode")).required(false),
                        PropertyDef::new(
                            "tags",
                            TypeRef::sequence(TypeRef::named("string")),
                        ),
                        PropertyDef::new("env", TypeRef::map(TypeRef::named("string"))),
                    ],
                ))
                .with_mount("", TypeRef::named("app")),
        );
        assert!(output.diagnostics.is_empty());
        let schema = &output.schema;
        let app = schema.mount(&DocPath::root()).unwrap();

        let level = schema.node(schema.child_schema(app, "level").unwrap());
        assert!(level.is_required);
        assert!(!level.is_enum_flags);
        assert_eq!(level.default_value, json!("Info"));
        let allowed: Vec<_> = level.allowed_values.as_ref().unwrap().iter().cloned().collect();
        assert_eq!(allowed, vec!["info", "debug"]);

        let mode = schema.node(schema.child_schema(app, "mode").unwrap());
        assert!(!mode.is_required);
        assert!(mode.is_enum_flags);

        let tags = schema.child_schema(app, "tags").unwrap();
        assert_eq!(schema.node(tags).kind(), SchemaKind::Array);
        assert_eq!(schema.node(tags).default_value, json!([]));
        let item = schema.child_schema(tags, "0").unwrap();
        assert_eq!(schema.node(item).name, WILDCARD);

        let env = schema.child_schema(app, "env").unwrap();
        assert_eq!(schema.node(env).kind(), SchemaKind::Object);
        assert_eq!(schema.node(env).default_value, json!({}));
        assert!(schema.child_schema(env, "ANY_KEY").is_some());

        assert_eq!(schema.node(app).default_value, json!({ "level": "Info" }));
    }

    #[test]
    fn test_unresolved_type_skips_only_that_root() {
        let output = build(
            TypeBundle::new()
                .with_type(TypeDef::composite(
                    "broken",
                    vec![PropertyDef::new("x", TypeRef::named("missing"))],
                ))
                .with_type(TypeDef::composite("ok", vec![]))
                .with_mount("a", TypeRef::named("broken"))
                .with_mount("b", TypeRef::named("ok")),
        );
        assert_eq!(output.diagnostics.len(), 1);
        let diagnostic = &output.diagnostics[0];
        assert_eq!(diagnostic.severity, Severity::Error);
        assert!(matches!(
            &diagnostic.kind,
            DiagnosticKind::UnresolvedType { type_name, at } if type_name == "missing" && at == "a/x"
        ));
        assert!(output.schema.mount(&path("a")).is_none());
        let b = output.schema.mount(&path("b")).unwrap();
        // The failed root left no nodes behind.
        assert_eq!(output.schema.len(), 1);
        assert_eq!(b, SchemaNodeId(0));
    }

    #[test]
    fn test_malformed_annotations() {
        let output = build(
            TypeBundle::new()
                .with_type(TypeDef::composite(
                    "range",
                    vec![PropertyDef::new("n", TypeRef::named("integer")).range(Some(5.0), Some(1.0))],
                ))
                .with_type(TypeDef::composite(
                    "regex",
                    vec![PropertyDef::new("s", TypeRef::named("string")).pattern("(")],
                ))
                .with_mount("a", TypeRef::named("range"))
                .with_mount("b", TypeRef::named("regex")),
        );
        assert_eq!(output.diagnostics.len(), 2);
        assert!(output.diagnostics.iter().all(|d| matches!(
            d.kind,
            DiagnosticKind::MalformedAnnotation { .. }
        )));
        assert_eq!(output.schema.mounts().count(), 0);
    }

    #[test]
    fn test_duplicate_and_invalid_mounts() {
        let output = build(
            TypeBundle::new()
                .with_mount("a", TypeRef::named("integer"))
                .with_mount("a", TypeRef::named("string"))
                .with_mount("/b", TypeRef::named("string"))
                .with_mount("c/", TypeRef::named("string"))
                .with_mount("c//d", TypeRef::named("string")),
        );
        let kinds: Vec<_> = output.diagnostics.iter().map(|d| (&d.kind, d.severity)).collect();
        assert_eq!(kinds.len(), 4);
        assert!(matches!(kinds[0], (DiagnosticKind::DuplicateMount { .. }, Severity::Warning)));
        for (kind, severity) in &kinds[1..] {
            assert!(matches!(kind, DiagnosticKind::InvalidMountPath { .. }));
            assert_eq!(*severity, Severity::Error);
        }
        let a = output.schema.mount(&path("a")).unwrap();
        assert_eq!(output.schema.node(a).declared_type.kind, TypeKind::Integer);
    }

    #[test]
    fn test_cycle_is_truncated() {
        let output = build(
            TypeBundle::new()
                .with_type(TypeDef::composite(
                    "tree",
                    vec![
                        PropertyDef::new("label", TypeRef::named("string")),
                        PropertyDef::new(
                            "children",
                            TypeRef::sequence(TypeRef::named("tree")),
                        ),
                        PropertyDef::new("parent", TypeRef::named("tree")).nullable(),
                    ],
                ))
                .with_mount("", TypeRef::named("tree")),
        );
        assert_eq!(output.diagnostics.len(), 2);
        assert!(output.diagnostics.iter().all(|d| d.severity == Severity::Warning));

        let schema = &output.schema;
        let root = schema.mount(&DocPath::root()).unwrap();
        let item = schema.descend(root, path("children/0").iter()).unwrap();
        let item = schema.node(item);
        assert_eq!(item.kind(), SchemaKind::Value);
        assert_eq!(item.declared_type.kind, TypeKind::Composite("tree".into()));
        assert_eq!(item.default_value, JsonValue::Null);

        let parent = schema.node(schema.child_schema(root, "parent").unwrap());
        assert_eq!(parent.kind(), SchemaKind::Value);
        assert!(parent.declared_type.nullable);
    }

    #[test]
    fn test_diamond_reuse_builds_fully() {
        let output = build(
            TypeBundle::new()
                .with_type(TypeDef::composite(
                    "endpoint",
                    vec![PropertyDef::new("port", TypeRef::named("integer"))],
                ))
                .with_type(TypeDef::composite(
                    "service",
                    vec![
                        PropertyDef::new("public", TypeRef::named("endpoint")),
                        PropertyDef::new("admin", TypeRef::named("endpoint")),
                    ],
                ))
                .with_mount("", TypeRef::named("service")),
        );
        assert!(output.diagnostics.is_empty());
        let root = output.schema.mount(&DocPath::root()).unwrap();
        for branch in ["public", "admin"] {
            let port = output
                .schema
                .descend(root, path(&format!("{branch}/port")).iter())
                .unwrap();
            assert!(output.schema.node(port).is_required);
        }
    }

    #[test]
    fn test_mount_bundle_types_shadow_other_bundles() {
        let first = TypeBundle::new()
            .with_type(TypeDef::composite("shared", vec![PropertyDef::new("a", TypeRef::named("integer"))]));
        let second = TypeBundle::new()
            .with_type(TypeDef::composite("shared", vec![PropertyDef::new("b", TypeRef::named("integer"))]))
            .with_mount("x", TypeRef::named("shared"));
        let third = TypeBundle::new().with_mount("y", TypeRef::named("shared"));
        let output = build_schema(&[first, second, third], &BuilderConfig::default());
        let x = output.schema.mount(&path("x")).unwrap();
        let y = output.schema.mount(&path("y")).unwrap();
        assert!(output.schema.child_schema(x, "b").is_some());
        assert!(output.schema.child_schema(y, "a").is_some());
    }
}
