use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Serialize;
use thiserror::Error;

/// Stable identifiers for rule-query validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "ERR_INVALID_ESQL")]
    InvalidEsql,
    #[serde(rename = "ERR_INVALID_SYNTAX")]
    InvalidSyntax,
    #[serde(rename = "ERR_MISSING_ID_FIELD_FROM_RESULT")]
    MissingIdFieldFromResult,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidEsql => "ERR_INVALID_ESQL",
            ErrorCode::InvalidSyntax => "ERR_INVALID_SYNTAX",
            ErrorCode::MissingIdFieldFromResult => "ERR_MISSING_ID_FIELD_FROM_RESULT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a query cannot be used as a detection rule.
#[derive(Error, Debug, Diagnostic)]
pub enum ValidationError {
    #[diagnostic(code(ERR_INVALID_SYNTAX))]
    #[error("Error validating ES|QL: \"{message}\"")]
    InvalidSyntax {
        message: String,
        #[source_code]
        src: Arc<NamedSource>,
        #[label("first syntax error")]
        span: SourceSpan,
    },

    #[diagnostic(
        code(ERR_MISSING_ID_FIELD_FROM_RESULT),
        help("For example: FROM logs* METADATA _id")
    )]
    #[error("Queries that don't use the STATS...BY function (non-aggregating queries) must include the \"metadata _id\" operator after the source command")]
    MissingMetadataOperator {
        #[source_code]
        src: Arc<NamedSource>,
        #[label("no METADATA _id here")]
        span: SourceSpan,
    },

    #[diagnostic(
        code(ERR_MISSING_ID_FIELD_FROM_RESULT),
        help("Keep the _id field, e.g. `| KEEP _id, ...`")
    )]
    #[error("Queries that don't use the STATS...BY function (non-aggregating queries) must include the \"_id\" field in the result")]
    MissingIdField,

    #[diagnostic(code(ERR_INVALID_ESQL))]
    #[error("Error validating ES|QL: \"{message}\"")]
    InvalidEsql { message: String },
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationError::InvalidSyntax { .. } => ErrorCode::InvalidSyntax,
            ValidationError::MissingMetadataOperator { .. } | ValidationError::MissingIdField => {
                ErrorCode::MissingIdFieldFromResult
            }
            ValidationError::InvalidEsql { .. } => ErrorCode::InvalidEsql,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn codes_serialize_as_stable_strings() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::MissingIdFieldFromResult).unwrap(),
            "\"ERR_MISSING_ID_FIELD_FROM_RESULT\""
        );
        assert_eq!(ErrorCode::InvalidEsql.to_string(), "ERR_INVALID_ESQL");
    }

    #[test]
    fn diagnostic_code_matches_error_code() {
        let error = ValidationError::MissingIdField;
        let code = Diagnostic::code(&error).map(|code| code.to_string());
        assert_eq!(code.as_deref(), Some(error.code().as_str()));

        let error = ValidationError::InvalidEsql {
            message: String::from("index not found"),
        };
        assert_eq!(error.to_string(), "Error validating ES|QL: \"index not found\"");
        assert_eq!(error.code(), ErrorCode::InvalidEsql);
    }
}
