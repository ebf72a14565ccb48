use log::debug;

use crate::ast::Command;
use crate::lexer::tokenize;
use crate::parser::{self, ParseResult, SyntaxError};

/// A parsed query: the source text plus the (possibly partial) command list
/// and every error found while lexing and parsing it.
#[derive(Debug, Clone)]
pub struct EsqlQuery {
    source: String,
    result: ParseResult,
}

impl EsqlQuery {
    /// Parses `text`. Never fails; check [`EsqlQuery::errors`].
    pub fn from_source(text: impl Into<String>) -> Self {
        Self::from_named_source("query", text)
    }

    /// Like [`EsqlQuery::from_source`], with a name used in diagnostics.
    pub fn from_named_source(name: impl AsRef<str>, text: impl Into<String>) -> Self {
        let source = text.into();
        let src = crate::named_source(name.as_ref(), &source);

        let (tokens, lexer_errors) = tokenize(src.clone(), &source);
        let mut errors: Vec<SyntaxError> = lexer_errors
            .into_iter()
            .map(|error| SyntaxError::new(src.clone(), error.kind.to_string(), error.location))
            .collect();

        let parsed = parser::parse(src, &source, tokens);
        errors.extend(parsed.errors);
        let result = ParseResult {
            ast: parsed.ast,
            errors,
        };

        debug!(
            commands = result.ast.len(),
            errors = result.errors.len();
            "Parsed ES|QL query"
        );
        EsqlQuery { source, result }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn commands(&self) -> &[Command] {
        &self.result.ast
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.result.errors
    }

    pub fn is_valid(&self) -> bool {
        self.result.errors.is_empty()
    }

    /// First command called `name`, matched case-insensitively.
    pub fn find_command(&self, name: &str) -> Option<&Command> {
        self.commands()
            .iter()
            .find(|command| command.name.eq_ignore_ascii_case(name))
    }

    pub fn result(&self) -> &ParseResult {
        &self.result
    }

    pub fn into_result(self) -> ParseResult {
        self.result
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spans::Location;
    use pretty_assertions::assert_eq;

    #[test]
    fn lexer_errors_come_first() {
        let query = EsqlQuery::from_source("FROM logs | WHERE a == \"open | LIMIT 5 |");
        let messages: Vec<&str> = query.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages[0], "Unterminated string literal");
        assert!(!query.is_valid());
    }

    #[test]
    fn lexical_error_token_is_reported_once() {
        let query = EsqlQuery::from_source("FROM logs | WHERE a > # | LIMIT 1");
        assert_eq!(query.errors().len(), 1);
        assert_eq!(query.errors()[0].message, "Unexpected character '#'");
        assert_eq!(query.errors()[0].location, Location::new(22, 23));
        assert!(query.find_command("where").unwrap().incomplete);
        assert!(query.find_command("LIMIT").is_some());
    }

    #[test]
    fn empty_input_is_valid() {
        let query = EsqlQuery::from_source("   // nothing here\n");
        assert!(query.commands().is_empty());
        assert!(query.is_valid());
    }

    #[test]
    fn result_serializes_with_type_tags() {
        let query = EsqlQuery::from_source("FROM a METADATA _id | LIMIT 1");
        let json: serde_json::Value = serde_json::from_str(&query.to_json().unwrap()).unwrap();
        assert_eq!(json["ast"][0]["type"], "command");
        assert_eq!(json["ast"][0]["name"], "from");
        assert_eq!(json["ast"][0]["args"][1]["type"], "option");
        let limit = &json["ast"][1]["args"][0];
        assert_eq!(limit["literalType"], "number");
        assert_eq!(limit["numberType"], "integer");
        assert_eq!(limit["value"], 1);
        assert_eq!(json["errors"], serde_json::json!([]));
    }

    #[test]
    fn query_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EsqlQuery>();
    }
}
