//! Materialize command - creates a schema-only node and prints the result.

use std::process::ExitCode;

use anyhow::{Context, anyhow};
use confmap::document::DocPath;
use confmap::report::format_diagnostics;
use confmap::schema::Materialized;
use tracing::{info, warn};

use crate::args::SchemaArgs;
use crate::util::open_session;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to the JSON document (use - for stdin)
    pub file: String,

    /// Canonical path of the node to create, e.g. `database/replicas/0/port`
    pub path: String,

    #[command(flatten)]
    pub config: SchemaArgs,

    /// Pretty print JSON output
    #[arg(short, long)]
    pub pretty: bool,
}

pub fn run(args: Args) -> anyhow::Result<ExitCode> {
    let path: DocPath = args
        .path
        .parse()
        .with_context(|| format!("invalid path '{}'", args.path))?;
    let (mut session, diagnostics) = open_session(&args.file, &args.config)?;
    if diagnostics.iter().any(|d| d.is_error()) {
        warn!("schema built with errors; some mounts were skipped");
        eprintln!("{}", format_diagnostics(&diagnostics));
    }

    let materialized = session
        .materialize_path(&path)
        .map_err(|e| anyhow!("cannot materialize '{path}': {e}"))?;
    info!(node = ?materialized.node(), created = materialized.created().len(), "materialize finished");
    match materialized {
        Materialized::Created(materialization) => {
            eprintln!("created {} node(s)", materialization.created.len());
        }
        Materialized::Existing(_) => eprintln!("'{path}' already exists"),
    }

    let json = session.into_document().to_json();
    let output = if args.pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    println!("{output}");
    Ok(ExitCode::SUCCESS)
}
