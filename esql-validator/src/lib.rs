use esql_parser::{named_source, EsqlQuery, SyntaxError};
use log::debug;
use serde::{Deserialize, Serialize};

/// Aggregation, metadata and column questions over a parsed query
pub mod analysis;
/// Analyzer configuration
pub mod config;
/// Validation errors and their stable codes
pub mod error;

pub use analysis::{collect_columns, find_metadata_option, has_metadata_id_operator, is_aggregating_query};
pub use config::AnalyzerConfig;
pub use error::{ErrorCode, ValidationError};

/// What the rule checks need to know about a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleQueryInfo {
    pub errors: Vec<SyntaxError>,
    pub is_aggregating: bool,
    /// Non-aggregating and without `METADATA _id` on its source command.
    pub is_missing_metadata_operator: bool,
}

pub fn parse_esql_query(text: &str, config: &AnalyzerConfig) -> RuleQueryInfo {
    let query = EsqlQuery::from_source(text);
    analyze(&query, config)
}

fn analyze(query: &EsqlQuery, config: &AnalyzerConfig) -> RuleQueryInfo {
    let is_aggregating = is_aggregating_query(query.commands(), config);
    RuleQueryInfo {
        errors: query.errors().to_vec(),
        is_aggregating,
        is_missing_metadata_operator: !is_aggregating
            && !has_metadata_id_operator(query.commands(), config),
    }
}

/// Checks that `text` can back a detection rule: it must parse, and a
/// non-aggregating query must request `METADATA _id` so alerts can point at
/// source documents. A blank query is left for required-field checks.
pub fn validate_rule_query(
    text: &str,
    config: &AnalyzerConfig,
) -> Result<RuleQueryInfo, ValidationError> {
    let query = EsqlQuery::from_source(text);
    let info = analyze(&query, config);
    debug!(
        errors = info.errors.len(),
        aggregating = info.is_aggregating,
        missing_metadata = info.is_missing_metadata_operator;
        "Analyzed rule query"
    );

    if text.trim().is_empty() {
        return Ok(info);
    }

    if let Some(first) = info.errors.first() {
        return Err(ValidationError::InvalidSyntax {
            message: first.message.clone(),
            src: named_source("query", text),
            span: first.location.into(),
        });
    }

    if info.is_missing_metadata_operator {
        let location = query
            .find_command(&config.source_command)
            .or_else(|| query.commands().first())
            .map(|command| command.location)
            .unwrap_or_default();
        return Err(ValidationError::MissingMetadataOperator {
            src: named_source("query", text),
            span: location.into(),
        });
    }

    Ok(info)
}

/// A column of an ES|QL response, as returned by `_query`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResultColumn {
    #[serde(alias = "name")]
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// The column listing of a query run, or the error Elasticsearch gave.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnsResponse {
    Error { error: String },
    Columns(Vec<ResultColumn>),
}

/// A non-aggregating query must return `_id`, whatever its METADATA says;
/// a later `KEEP` or `DROP` can still remove it.
pub fn validate_result_columns(
    info: &RuleQueryInfo,
    columns: &[ResultColumn],
    config: &AnalyzerConfig,
) -> Result<(), ValidationError> {
    let has_id = columns.iter().any(|column| column.id == config.id_field);
    if !info.is_aggregating && !has_id {
        return Err(ValidationError::MissingIdField);
    }
    Ok(())
}

pub fn validate_columns_response(
    info: &RuleQueryInfo,
    response: &ColumnsResponse,
    config: &AnalyzerConfig,
) -> Result<(), ValidationError> {
    match response {
        ColumnsResponse::Error { error } => Err(ValidationError::InvalidEsql {
            message: error.clone(),
        }),
        ColumnsResponse::Columns(columns) => validate_result_columns(info, columns, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn validate(text: &str) -> Result<RuleQueryInfo, ValidationError> {
        validate_rule_query(text, &AnalyzerConfig::default())
    }

    #[test]
    fn metadata_query_is_valid() {
        let info = validate("FROM logs METADATA _id | WHERE a > 1").unwrap();
        assert!(!info.is_aggregating);
        assert!(!info.is_missing_metadata_operator);
    }

    #[test]
    fn aggregating_query_needs_no_metadata() {
        let info = validate("FROM logs | STATS COUNT(*)").unwrap();
        assert!(info.is_aggregating);
        assert!(!info.is_missing_metadata_operator);
    }

    #[test]
    fn missing_metadata_is_reported_on_the_source_command() {
        let error = validate("FROM logs | WHERE a > 1").unwrap_err();
        assert_eq!(error.code(), ErrorCode::MissingIdFieldFromResult);
        match error {
            ValidationError::MissingMetadataOperator { span, .. } => {
                assert_eq!(span.offset(), 0);
                assert_eq!(span.len(), 9);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn syntax_errors_win_over_rule_checks() {
        let error = validate("FROM logs | WHERE (a > 1").unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidSyntax);
        assert_eq!(
            error.to_string(),
            "Error validating ES|QL: \"Unbalanced parenthesis: '(' is never closed\""
        );
    }

    #[test]
    fn blank_query_is_not_checked() {
        assert!(validate("  ").is_ok());
    }

    #[test]
    fn result_columns_must_contain_id() {
        let config = AnalyzerConfig::default();
        let info = parse_esql_query("FROM logs METADATA _id | KEEP host", &config);
        let columns = vec![ResultColumn {
            id: String::from("host"),
            data_type: Some(String::from("keyword")),
        }];
        let error = validate_result_columns(&info, &columns, &config).unwrap_err();
        assert_eq!(error.code(), ErrorCode::MissingIdFieldFromResult);

        let info = parse_esql_query("FROM logs | STATS c = COUNT(*)", &config);
        assert!(validate_result_columns(&info, &columns, &config).is_ok());
    }

    #[test]
    fn columns_response_errors_are_invalid_esql() {
        let config = AnalyzerConfig::default();
        let info = parse_esql_query("FROM missing METADATA _id", &config);
        let response: ColumnsResponse =
            serde_json::from_str(r#"{ "error": "Unknown index [missing]" }"#).unwrap();
        let error = validate_columns_response(&info, &response, &config).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidEsql);

        let response: ColumnsResponse =
            serde_json::from_str(r#"[{ "name": "_id", "type": "keyword" }]"#).unwrap();
        assert!(validate_columns_response(&info, &response, &config).is_ok());
    }
}
