//! Schema model, schema building, document mapping, validation and
//! materialization for confmap documents.
//!
//! The usual flow:
//! 1. [`build_schema`] turns [`TypeBundle`]s into a [`SchemaDocument`],
//! 2. [`map_tree`] associates every document node with its schema node,
//! 3. [`validate`] reports [`Diagnostic`]s against that association,
//! 4. [`Materializer`] turns schema-only locations into real nodes.

pub mod build;
pub mod config;
pub mod defaults;
pub mod descriptor;
pub mod diagnostic;
pub mod mapper;
pub mod materialize;
pub mod schema;
pub mod validate;

pub use build::{BuildOutput, SchemaBuilder, build_schema};
pub use config::{BuilderConfig, ValidatorConfig};
pub use descriptor::{
    BundleError, Constraints, MountDecl, PrimitiveKind, PropertyDef, TypeBundle, TypeDef,
    TypeRef, TypeShape,
};
pub use diagnostic::{Diagnostic, DiagnosticKind, Location, Severity, summarize};
pub use mapper::{SchemaAssociation, SchemaMapper, map_tree};
pub use materialize::{
    Anchor, Materialization, MaterializeError, Materialized, Materializer, VirtualLocation,
    VirtualSegment, virtual_children,
};
pub use schema::{
    DeclaredType, Pattern, SchemaDocument, SchemaKind, SchemaNode, SchemaNodeId, TypeKind,
    WILDCARD,
};
pub use validate::{Validator, validate, validate_node};
