use serde::{Deserialize, Serialize};

/// Options for [`SchemaBuilder`](crate::build::SchemaBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuilderConfig {
    /// Composite types with at least one property reject unknown keys.
    /// Turning this off makes every composite open.
    pub closed_objects: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            closed_objects: true,
        }
    }
}

/// Options for [`Validator`](crate::validate::Validator).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ValidatorConfig {
    /// Warn when a read-only property holds something other than its default.
    pub check_read_only: bool,
}
