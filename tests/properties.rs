//! Invariants of the row and column filters over generated tables and filters.

use proptest::prelude::*;

use tabsieve::columns::{parse_column_filter, resolve_columns};
use tabsieve::expression::QueryEvaluator;
use tabsieve::predicate::filter_rows;
use tabsieve::query::{apply_row_filter, MatchResult, RowFilterOptions};
use tabsieve::store::{all_rows, RowSet, RowStore, Table};
use tabsieve::terms::parse_terms;
use tabsieve::{Result, SieveError};

fn table_strategy() -> impl Strategy<Value = Table> {
    prop::collection::vec(("[a-c]{0,3}", "[a-c1]{0,3}"), 0..8).prop_map(|rows| {
        let rows: Vec<Vec<String>> = rows.into_iter().map(|(a, b)| vec![a, b]).collect();
        Table::from_text(&["left".to_string(), "right".to_string()], &rows).unwrap()
    })
}

fn term_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-c]{1,2}",
        "![a-c]{1,2}",
        "\\^[a-c]{1,2}",
        "[a-c]{1,2}\\$",
        "\"[a-c]{1,2}\"",
        "\\[[a-c], [a-c1]\\]",
    ]
}

fn filter_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(term_strategy(), 0..4).prop_map(|terms| terms.join(" "))
}

fn apply(store: &dyn RowStore, text: &str) -> MatchResult {
    apply_row_filter(store, text, &QueryEvaluator, RowFilterOptions::default()).unwrap()
}

fn ascending(rows: &[u32]) -> bool {
    rows.windows(2).all(|pair| pair[0] < pair[1])
}

proptest! {
    #[test]
    fn prop_row_filter_is_idempotent(table in table_strategy(), text in filter_strategy()) {
        prop_assert_eq!(apply(&table, &text), apply(&table, &text));
    }

    #[test]
    fn prop_wildcard_appends_in_order(table in table_strategy(), text in filter_strategy(), glued in any::<bool>()) {
        let plain = apply(&table, &text);
        let marker = if glued { "*" } else { " *" };
        let wild = apply(&table, &format!("{}{}", text, marker));
        prop_assert_eq!(wild.matched(), plain.matched());
        prop_assert_eq!(wild.len(), table.row_count());

        let rows = wild.rows();
        let (matched, unmatched) = rows.split_at(plain.matched().len() as usize);
        prop_assert!(ascending(matched));
        prop_assert!(ascending(unmatched));
    }

    #[test]
    fn prop_negation_is_the_complement(table in table_strategy(), word in "[a-c1]{1,2}") {
        let all = all_rows(&table);
        let positive = apply(&table, &word);
        let negative = apply(&table, &format!("!{}", word));
        prop_assert_eq!(negative.matched().clone(), all - positive.matched());
    }

    #[test]
    fn prop_failed_expression_searches_the_whole_text(
        table in table_strategy(),
        expr in "[a-c]{1,2} [<>=]{1,2} [a-c1]{1,2}",
        text in filter_strategy(),
    ) {
        let broken = |_: &dyn RowStore, expr: &str| -> Result<RowSet> {
            Err(SieveError::Parse { message: format!("cannot parse '{}'", expr), line: None, col: None })
        };
        let raw = format!("{} @ {}", expr, text);
        let result = apply_row_filter(&table, &raw, &broken, RowFilterOptions::default()).unwrap();
        let expected = filter_rows(&table, &all_rows(&table), &parse_terms(&raw.replace('@', " ")));
        prop_assert_eq!(result.matched(), &expected);
    }

    #[test]
    fn prop_column_filter_is_total(
        columns in prop::collection::hash_set("[a-d]{1,3}", 1..8),
        filter in prop::collection::vec(prop_oneof!["[a-d]{1,2}", "![a-d]{1,2}", "'[a-d]{1,3}'"], 1..4),
    ) {
        let columns: Vec<String> = columns.into_iter().collect();
        prop_assert_eq!(resolve_columns(&columns, "*"), columns.clone());
        prop_assert_eq!(resolve_columns(&columns, ""), columns.clone());

        let text = filter.join(", ");
        let spec = parse_column_filter(&text);
        let visible = resolve_columns(&columns, &text);
        for column in &visible {
            prop_assert!(spec.include_terms.iter().any(|term| term.matches(column)), "{} not asked for", column);
            prop_assert!(!spec.is_excluded(column), "{} excluded", column);
        }
        let mut unique = visible.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), visible.len());
    }
}
