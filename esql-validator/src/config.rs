use serde::{Deserialize, Serialize};

/// Knobs for the rule-query analyzers. Every field may be omitted from a
/// config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalyzerConfig {
    /// Lowercased command names that collapse rows into groups.
    pub aggregating_commands: Vec<String>,
    /// The source command whose options are searched for metadata fields.
    pub source_command: String,
    pub metadata_option: String,
    /// Field that identifies a document in alerts.
    pub id_field: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            aggregating_commands: vec![String::from("stats")],
            source_command: String::from("from"),
            metadata_option: String::from("metadata"),
            id_field: String::from("_id"),
        }
    }
}

impl AnalyzerConfig {
    pub fn is_aggregating_command(&self, name: &str) -> bool {
        self.aggregating_commands
            .iter()
            .any(|command| command.eq_ignore_ascii_case(name))
    }
}
