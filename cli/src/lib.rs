//! CLI logic for the `esql` tool: parse a query, print it, and check it
//! against detection rule requirements.

mod args;
mod config;

pub use args::{Args, OutputFormat};
pub use config::{load_config, ConfigError};

use std::fs;
use std::io::{self, Read, Write};

use esql_parser::{EsqlQuery, SyntaxError};
use esql_validator::{
    validate_columns_response, validate_rule_query, ColumnsResponse, ValidationError,
};
use log::info;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[diagnostic(code(esql::io))]
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[diagnostic(code(esql::config))]
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[diagnostic(code(esql::json))]
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Query has {} syntax error(s)", .0.len())]
    Syntax(Vec<SyntaxError>),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Every diagnostic inside `error`, one report each.
pub fn to_reportables(error: &CliError) -> Vec<&dyn Diagnostic> {
    match error {
        CliError::Syntax(errors) => errors.iter().map(|e| e as &dyn Diagnostic).collect(),
        CliError::Validation(inner) => vec![inner as &dyn Diagnostic],
        other => vec![other as &dyn Diagnostic],
    }
}

fn read_query(args: &Args) -> Result<(String, String), CliError> {
    if let Some(query) = &args.query {
        return Ok((String::from("query"), query.clone()));
    }
    if let Some(path) = &args.file {
        return Ok((path.clone(), fs::read_to_string(path)?));
    }
    let mut query = String::new();
    io::stdin().read_to_string(&mut query)?;
    Ok((String::from("stdin"), query))
}

/// Run the `esql` CLI, writing the parsed query to `out`.
///
/// Syntax errors are returned after the output is written, so `--format json`
/// still shows the partial tree.
pub fn run(args: &Args, out: &mut dyn Write) -> Result<(), CliError> {
    let config = load_config(args.config.as_ref())?;
    let (name, text) = read_query(args)?;
    info!(source = name.as_str(), bytes = text.len(); "Parsing query");

    let query = EsqlQuery::from_named_source(&name, text.as_str());
    match args.format {
        OutputFormat::Pretty => writeln!(out, "{}", query.result())?,
        OutputFormat::Json => writeln!(out, "{}", query.to_json()?)?,
        OutputFormat::Ast => writeln!(out, "{:#?}", query.commands())?,
    }

    if !query.is_valid() {
        return Err(CliError::Syntax(query.errors().to_vec()));
    }

    let info = validate_rule_query(&text, &config)?;
    if let Some(path) = &args.columns {
        let response: ColumnsResponse = serde_json::from_str(&fs::read_to_string(path)?)?;
        validate_columns_response(&info, &response, &config)?;
    }

    info!(aggregating = info.is_aggregating; "Rule query is valid");
    Ok(())
}
