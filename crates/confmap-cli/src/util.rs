use std::fs;
use std::io::{self, Read};

use anyhow::Context;
use confmap::Session;
use confmap::document::Document;
use confmap::schema::{Diagnostic, TypeBundle};

use crate::args::SchemaArgs;

/// Read input from file path or stdin.
/// - `None` or `Some("-")` reads from stdin
/// - `Some(path)` reads from file
pub fn read_input(file: Option<&str>) -> anyhow::Result<String> {
    match file {
        None | Some("-") => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Error reading from stdin")?;
            Ok(buffer)
        }
        Some(path) => fs::read_to_string(path).with_context(|| format!("Error reading {path}")),
    }
}

/// Helper to get display path for error messages
pub fn display_path(file: Option<&str>) -> &str {
    match file {
        None | Some("-") => "<stdin>",
        Some(path) => path,
    }
}

pub fn parse_document(contents: &str, file: Option<&str>) -> anyhow::Result<Document> {
    let value = serde_json::from_str(contents)
        .with_context(|| format!("{} is not valid JSON", display_path(file)))?;
    Ok(Document::from_json(value))
}

pub fn load_bundles(paths: &[String]) -> anyhow::Result<Vec<TypeBundle>> {
    paths
        .iter()
        .map(|path| {
            let contents = read_input(Some(path))?;
            TypeBundle::from_json_str(&contents).with_context(|| format!("in {path}"))
        })
        .collect()
}

/// Reads the document and bundles, builds the schema and returns the session
/// with the build diagnostics.
pub fn open_session(
    file: &str,
    schema: &SchemaArgs,
) -> anyhow::Result<(Session, Vec<Diagnostic>)> {
    let contents = read_input(Some(file))?;
    let document = parse_document(&contents, Some(file))?;
    let bundles = load_bundles(&schema.schema)?;
    let mut session = Session::new(document)
        .with_builder_config(schema.to_builder_config())
        .with_validator_config(schema.to_validator_config());
    let diagnostics = session.load_schema(&bundles);
    Ok((session, diagnostics))
}
