//! Check command - builds the schema and validates a document against it.

use std::process::ExitCode;

use confmap::report::format_diagnostics;
use confmap::schema::{Diagnostic, summarize};
use tracing::info;

use crate::args::SchemaArgs;
use crate::util::open_session;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to the JSON document to check (use - for stdin)
    pub file: String,

    #[command(flatten)]
    pub config: SchemaArgs,

    /// Treat warnings as errors
    #[arg(long)]
    pub deny_warnings: bool,

    /// Only print the summary line
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn run(args: Args) -> anyhow::Result<ExitCode> {
    let (session, mut diagnostics) = open_session(&args.file, &args.config)?;
    diagnostics.extend(session.validate());
    info!(file = %args.file, diagnostics = diagnostics.len(), "check finished");

    if args.quiet {
        let (errors, warnings) = summarize(&diagnostics);
        println!("{}: {errors} errors, {warnings} warnings", args.file);
    } else {
        println!("{}", format_diagnostics(&diagnostics));
    }

    Ok(if is_failure(&diagnostics, args.deny_warnings) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn is_failure(diagnostics: &[Diagnostic], deny_warnings: bool) -> bool {
    let (errors, warnings) = summarize(diagnostics);
    errors > 0 || (deny_warnings && warnings > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmap::schema::DiagnosticKind;

    #[test]
    fn test_is_failure() {
        let warning = Diagnostic::mount(
            "a",
            DiagnosticKind::DuplicateMount {
                path: "a".to_string(),
            },
        );
        assert!(!is_failure(&[], true));
        assert!(!is_failure(std::slice::from_ref(&warning), false));
        assert!(is_failure(std::slice::from_ref(&warning), true));
    }
}
