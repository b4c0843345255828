//! Type descriptors: the external input the schema builder reads.
//!
//! A [`TypeBundle`] holds named type definitions and the mount declarations that
//! anchor root types into the document. Bundles are plain data and can be
//! deserialized from JSON:
//!
//! ```json
//! {
//!   "types": [
//!     { "name": "database", "shape": "composite", "properties": [
//!       { "name": "port", "type": "integer", "constraints": { "default": 5432 } },
//!       { "name": "hosts", "type": { "sequence": "string" } }
//!     ] }
//!   ],
//!   "mounts": [ { "path": "database", "root": "database" } ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Built-in scalar kinds, referenced by name from a [`TypeRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Integer,
    Number,
    String,
    Any,
}

impl PrimitiveKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Any => "any",
        }
    }
}

/// The declared type of a property, sequence element, map value or mount root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeRef {
    /// A primitive (`"integer"`) or a named type from a bundle.
    Named(String),
    Sequence { sequence: Box<TypeRef> },
    Map { map: Box<TypeRef> },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn sequence(element: TypeRef) -> Self {
        Self::Sequence {
            sequence: Box::new(element),
        }
    }

    pub fn map(value: TypeRef) -> Self {
        Self::Map {
            map: Box::new(value),
        }
    }

    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Named(name) => PrimitiveKind::from_name(name),
            _ => None,
        }
    }
}

/// Declarative constraint annotations attached to a property or a type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Constraints {
    /// Overrides the required-ness derived from the declared type.
    pub required: Option<bool>,
    pub read_only: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub pattern: Option<String>,
    pub allowed_values: Option<Vec<String>>,
    pub default: Option<JsonValue>,
}

impl Constraints {
    /// `self` takes precedence; unset fields fall back to `base`.
    pub fn merged_over(&self, base: &Constraints) -> Constraints {
        Constraints {
            required: self.required.or(base.required),
            read_only: self.read_only || base.read_only,
            min: self.min.or(base.min),
            max: self.max.or(base.max),
            pattern: self.pattern.clone().or_else(|| base.pattern.clone()),
            allowed_values: self
                .allowed_values
                .clone()
                .or_else(|| base.allowed_values.clone()),
            default: self.default.clone().or_else(|| base.default.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PropertyDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub nullable: bool,
    /// Hidden properties are not part of the schema.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub constraints: Constraints,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            hidden: false,
            constraints: Constraints::default(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.constraints.required = Some(required);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.constraints.read_only = true;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.constraints.min = min;
        self.constraints.max = max;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_value(mut self, value: JsonValue) -> Self {
        self.constraints.default = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum TypeShape {
    Composite {
        #[serde(default)]
        properties: Vec<PropertyDef>,
    },
    Enum {
        members: Vec<String>,
        /// Bitmask semantics: a value may combine several members, comma-separated.
        #[serde(default)]
        flags: bool,
    },
    Map {
        value: TypeRef,
    },
    Sequence {
        element: TypeRef,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(flatten)]
    pub shape: TypeShape,
    #[serde(default)]
    pub constraints: Constraints,
}

impl TypeDef {
    pub fn composite(name: impl Into<String>, properties: Vec<PropertyDef>) -> Self {
        Self {
            name: name.into(),
            shape: TypeShape::Composite { properties },
            constraints: Constraints::default(),
        }
    }

    pub fn enumeration<I, S>(name: impl Into<String>, members: I, flags: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            shape: TypeShape::Enum {
                members: members.into_iter().map(Into::into).collect(),
                flags,
            },
            constraints: Constraints::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }
}

/// Pairs a document path with the root type that governs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountDecl {
    /// `""` for the document root, otherwise `segment/segment/...`.
    pub path: String,
    pub root: TypeRef,
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("invalid type bundle: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeBundle {
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub mounts: Vec<MountDecl>,
}

impl TypeBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(input: &str) -> Result<Self, BundleError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.types.push(def);
        self
    }

    pub fn with_mount(mut self, path: impl Into<String>, root: TypeRef) -> Self {
        self.mounts.push(MountDecl {
            path: path.into(),
            root,
        });
        self
    }

    pub fn find(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|def| def.name == name)
    }
}
