//! Property-based tests with proptest.
//!
//! Aggregation detection looks at which commands occur, never at their
//! order, and a query with `METADATA _id` never needs it reported missing.

use esql_parser::EsqlQuery;
use esql_validator::{is_aggregating_query, parse_esql_query, AnalyzerConfig};
use proptest::prelude::*;

fn stage() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "WHERE a > 1",
        "EVAL b = a * 2",
        "KEEP a, b",
        "DROP c",
        "SORT a DESC",
        "LIMIT 10",
        "STATS c = COUNT(*) BY a",
        "INLINESTATS m = MAX(a) BY b",
        "RENAME a AS z",
        "MV_EXPAND tags",
    ])
}

fn to_query(stages: &[&str]) -> String {
    let mut query = String::from("FROM logs-*");
    for stage in stages {
        query.push_str(" | ");
        query.push_str(stage);
    }
    query
}

proptest! {
    #[test]
    fn aggregation_ignores_command_order(
        (stages, shuffled) in prop::collection::vec(stage(), 0..6)
            .prop_flat_map(|stages| (Just(stages.clone()), Just(stages).prop_shuffle()))
    ) {
        let config = AnalyzerConfig::default();
        let original = EsqlQuery::from_source(to_query(&stages));
        let permuted = EsqlQuery::from_source(to_query(&shuffled));
        prop_assert!(original.is_valid());
        prop_assert!(permuted.is_valid());
        prop_assert_eq!(
            is_aggregating_query(original.commands(), &config),
            is_aggregating_query(permuted.commands(), &config)
        );
        prop_assert_eq!(
            is_aggregating_query(original.commands(), &config),
            stages.iter().any(|stage| stage.starts_with("STATS"))
        );
    }

    #[test]
    fn metadata_id_is_never_missing(stages in prop::collection::vec(stage(), 0..6)) {
        let query = to_query(&stages).replacen("FROM logs-*", "FROM logs-* METADATA _id", 1);
        let info = parse_esql_query(&query, &AnalyzerConfig::default());
        prop_assert!(info.errors.is_empty());
        prop_assert!(!info.is_missing_metadata_operator);
    }
}
