//! Diagnostics emitted by the schema builder and the validator.
//!
//! Diagnostics are data, not errors: building and validation always run to
//! completion and hand back an ordered list for the caller to surface.

use core::fmt;

use confmap_document::{DocPath, NodeId, ValueKind};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// Where a diagnostic applies.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// A document node, with its canonical path at the time of the check.
    Node { node_id: NodeId, path: DocPath },
    /// A mount root of the schema being built.
    Mount { path: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagnosticKind {
    // Build-time
    #[error("recursive type '{type_name}' truncated at '{at}'")]
    CycleTruncated { type_name: String, at: String },

    #[error("mount path '{path}' is already defined; later definition skipped")]
    DuplicateMount { path: String },

    #[error("invalid mount path '{path}': {reason}")]
    InvalidMountPath { path: String, reason: String },

    #[error("unresolved type '{type_name}' at '{at}'")]
    UnresolvedType { type_name: String, at: String },

    #[error("malformed annotation at '{at}': {reason}")]
    MalformedAnnotation { at: String, reason: String },

    // Validation
    #[error("missing required property '{property}'")]
    MissingRequiredProperty { property: String },

    #[error("property '{property}' is not allowed")]
    DisallowedProperty { property: String },

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: ValueKind },

    #[error("value {value} is less than the minimum {min}")]
    BelowMinimum { value: f64, min: f64 },

    #[error("value {value} is greater than the maximum {max}")]
    AboveMaximum { value: f64, max: f64 },

    #[error("'{value}' does not match pattern /{pattern}/")]
    PatternMismatch { value: String, pattern: String },

    #[error("'{value}' is not one of: {}", .allowed.join(", "))]
    ValueNotAllowed { value: String, allowed: Vec<String> },

    #[error("reference path '{path}' must be non-empty and start with '/'")]
    InvalidReferencePath { path: String },

    #[error("read-only property was changed from its default")]
    ReadOnlyModified,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::CycleTruncated { .. } | Self::DuplicateMount { .. } | Self::ReadOnlyModified => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

/// A `(location, severity, message)` record.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub location: Location,
    pub severity: Severity,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(location: Location, kind: DiagnosticKind) -> Self {
        Self {
            location,
            severity: kind.severity(),
            kind,
        }
    }

    pub fn node(node_id: NodeId, path: DocPath, kind: DiagnosticKind) -> Self {
        Self::new(Location::Node { node_id, path }, kind)
    }

    pub fn mount(path: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self::new(Location::Mount { path: path.into() }, kind)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn node_id(&self) -> Option<NodeId> {
        match &self.location {
            Location::Node { node_id, .. } => Some(*node_id),
            Location::Mount { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Node { path, .. } if path.is_root() => f.write_str("(root)"),
            Location::Node { path, .. } => write!(f, "{path}"),
            Location::Mount { path } if path.is_empty() => f.write_str("mount (root)"),
            Location::Mount { path } => write!(f, "mount {path}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.location, self.kind)
    }
}

/// Counts of errors and warnings in a diagnostics list.
pub fn summarize(diagnostics: &[Diagnostic]) -> (usize, usize) {
    diagnostics.iter().fold((0, 0), |(errors, warnings), d| match d.severity {
        Severity::Error => (errors + 1, warnings),
        Severity::Warning => (errors, warnings + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::node(
            NodeId(3),
            "db/port".parse().unwrap(),
            DiagnosticKind::MissingRequiredProperty {
                property: "host".to_string(),
            },
        );
        assert_eq!(d.to_string(), "error: db/port: missing required property 'host'");

        let d = Diagnostic::mount(
            "",
            DiagnosticKind::CycleTruncated {
                type_name: "node".to_string(),
                at: "children/*".to_string(),
            },
        );
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(
            d.to_string(),
            "warning: mount (root): recursive type 'node' truncated at 'children/*'"
        );
    }

    #[test]
    fn test_value_not_allowed_message() {
        let kind = DiagnosticKind::ValueNotAllowed {
            value: "x".to_string(),
            allowed: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(kind.to_string(), "'x' is not one of: a, b");
    }

    #[test]
    fn test_summarize() {
        let diagnostics = vec![
            Diagnostic::mount("a", DiagnosticKind::DuplicateMount { path: "a".into() }),
            Diagnostic::mount(
                "b",
                DiagnosticKind::UnresolvedType {
                    type_name: "x".into(),
                    at: "b".into(),
                },
            ),
        ];
        assert_eq!(summarize(&diagnostics), (1, 1));
    }
}
