//! Read-only questions asked of a parsed command list.

use esql_parser::ast::{walk, AstNode, Command, CommandOption};

use crate::config::AnalyzerConfig;

/// True when any command collapses rows into groups, so results carry no
/// per-document `_id`.
pub fn is_aggregating_query(commands: &[Command], config: &AnalyzerConfig) -> bool {
    commands
        .iter()
        .any(|command| config.is_aggregating_command(&command.name))
}

/// The `METADATA` option of the first source command, if any.
pub fn find_metadata_option<'a>(
    commands: &'a [Command],
    config: &AnalyzerConfig,
) -> Option<&'a CommandOption> {
    commands
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(&config.source_command))?
        .option(&config.metadata_option)
}

pub fn has_metadata_id_operator(commands: &[Command], config: &AnalyzerConfig) -> bool {
    find_metadata_option(commands, config).map_or(false, |option| {
        option
            .args
            .iter()
            .filter_map(AstNode::as_column)
            .any(|column| column.name == config.id_field)
    })
}

/// Distinct column names in first-seen order. Wildcard patterns such as
/// `host.*` and the `*` of `COUNT(*)` are not columns and are skipped.
pub fn collect_columns(commands: &[Command]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    walk(commands, |node| {
        if let Some(column) = node.as_column() {
            if !column.is_pattern() && !columns.contains(&column.name.as_str()) {
                columns.push(column.name.as_str());
            }
        }
    });
    columns
}
