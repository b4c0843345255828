//! Shared argument definitions.

use confmap::schema::{BuilderConfig, ValidatorConfig};

/// Schema-related command-line arguments.
///
/// Embedded in other command Args using `#[command(flatten)]`.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct SchemaArgs {
    /// Type bundle file (JSON). Repeat to load several bundles in order.
    #[arg(short, long, required = true)]
    pub schema: Vec<String>,

    /// Let composite types accept properties they do not declare
    #[arg(long)]
    pub open_objects: bool,

    /// Warn when a read-only property differs from its default
    #[arg(long)]
    pub check_read_only: bool,
}

impl SchemaArgs {
    pub fn to_builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            closed_objects: !self.open_objects,
        }
    }

    pub fn to_validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            check_read_only: self.check_read_only,
        }
    }
}
