use std::sync::Arc;

use miette::NamedSource;

/// ES|QL Abstract Syntax Tree
pub mod ast;
/// ES|QL Tokenizer/Lexer
pub mod lexer;
/// ES|QL Parser
pub mod parser;
/// Canonical query printing
pub mod printer;
/// Lexer and parser combined
pub mod query;
/// Miette Span Utilities
pub mod spans;

pub use ast::{AstNode, Command};
pub use parser::{ParseResult, SyntaxError};
pub use query::EsqlQuery;

/// Parses `source_code`, naming it `source_name` in diagnostics.
///
/// Never fails: lexer and parser errors are collected in
/// [`ParseResult::errors`] next to whatever part of the query could be built.
pub fn parse<SN: ToString, SC: ToString>(source_name: SN, source_code: SC) -> ParseResult {
    EsqlQuery::from_named_source(source_name.to_string(), source_code.to_string()).into_result()
}

/// Shared handle used by diagnostics to render source snippets.
pub fn named_source(source_name: &str, source_code: &str) -> Arc<NamedSource> {
    Arc::new(NamedSource::new(source_name, source_code.to_string()))
}
