//! Plain-text rendering of diagnostics.

use core::fmt::Write;

use confmap_schema::{Diagnostic, summarize};

/// One line per diagnostic, followed by an error/warning summary.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        let _ = writeln!(out, "{diagnostic}");
    }
    let (errors, warnings) = summarize(diagnostics);
    let _ = write!(
        out,
        "{errors} {}, {warnings} {}",
        plural(errors, "error", "errors"),
        plural(warnings, "warning", "warnings")
    );
    out
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmap_schema::DiagnosticKind;

    #[test]
    fn test_format_diagnostics() {
        let diagnostics = vec![
            Diagnostic::mount(
                "db",
                DiagnosticKind::DuplicateMount {
                    path: "db".to_string(),
                },
            ),
            Diagnostic::node(
                confmap_document::NodeId(0),
                confmap_document::DocPath::root(),
                DiagnosticKind::MissingRequiredProperty {
                    property: "port".to_string(),
                },
            ),
        ];
        assert_eq!(
            format_diagnostics(&diagnostics),
            "warning: mount db: mount path 'db' is already defined; later definition skipped\n\
             error: (root): missing required property 'port'\n\
             1 error, 1 warning"
        );
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_diagnostics(&[]), "0 errors, 0 warnings");
    }
}
