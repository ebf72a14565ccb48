//! Command-line argument definitions for the `esql` tool.

use clap::{Parser, ValueEnum};

/// Parse an ES|QL query and check it against detection rule requirements
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Query text. Read from --file, or stdin, when omitted
    pub query: Option<String>,

    /// Path to a file holding the query
    #[arg(short, long, conflicts_with = "query")]
    pub file: Option<String>,

    /// How to print the parsed query
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// JSON column listing from running the query, checked for the id field
    #[arg(long)]
    pub columns: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Canonical ES|QL text
    Pretty,
    /// Parse result as JSON
    Json,
    /// Debug dump of the command tree
    Ast,
}
