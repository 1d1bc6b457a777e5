use tabsieve::expression::QueryEvaluator;
use tabsieve::predicate::filter_rows;
use tabsieve::query::{apply_row_filter, MatchResult, RowFilterOptions};
use tabsieve::store::{all_rows, RowSet, RowStore, Table};
use tabsieve::terms::parse_terms;
use tabsieve::{Result, SieveError};

fn setup() -> Table {
    Table::from_text(
        &["Name", "price", "discount", "Region"],
        &[
            vec!["report_2024", "150", "", "EU"],
            vec!["temp_old", "80", "discount 10%", "US"],
            vec!["report_old", "300", "", "EU"],
            vec!["price list", "100", "no discount", "APAC"],
            vec!["summary", "120.5", "", "US"],
        ],
    )
    .unwrap()
}

fn names_only() -> Table {
    Table::from_text(&["Name"], &[vec!["report_2024"], vec!["temp_old"], vec!["report_old"]]).unwrap()
}

fn filter(store: &dyn RowStore, text: &str) -> MatchResult {
    apply_row_filter(store, text, &QueryEvaluator, RowFilterOptions::default()).expect("row filter")
}

fn names(store: &dyn RowStore, result: &MatchResult) -> Vec<String> {
    result
        .iter()
        .map(|row| store.cell(row, "Name").map(|c| c.to_display_string()).unwrap_or_default())
        .collect()
}

#[test]
fn exclusion_narrows_a_search() {
    let table = names_only();
    let result = filter(&table, "report !old");
    assert_eq!(names(&table, &result), ["report_2024"]);
}

#[test]
fn wildcard_appends_the_rest_in_original_order() {
    let table = names_only();
    let result = filter(&table, "report !old *");
    assert_eq!(names(&table, &result), ["report_2024", "temp_old", "report_old"]);
    assert!(result.wildcard());
    assert_eq!(result.matched().len(), 1);
    assert_eq!(result.unmatched().iter().collect::<Vec<_>>(), [1, 2]);
}

#[test]
fn wildcard_may_be_glued_to_the_last_term() {
    let table = names_only();
    let result = filter(&table, "report !old*");
    assert_eq!(result.rows(), vec![0, 1, 2]);
    assert!(result.wildcard());
    assert_eq!(result.matched().iter().collect::<Vec<_>>(), [0]);
    assert_eq!(filter(&table, "report*"), filter(&table, "report *"));
}

#[test]
fn escaped_backslash_before_separator_still_splits() {
    let table = Table::from_text(&["Path"], &[vec![r"c:\\"], vec!["d:"]]).unwrap();
    let broken = |_: &dyn RowStore, _: &str| -> Result<RowSet> {
        Err(SieveError::Evaluation("cannot evaluate".into()))
    };
    // `\\` is an escaped backslash, so the '@' after it separates
    let result = apply_row_filter(&table, r"c:\\@ c", &broken, RowFilterOptions::default()).unwrap();
    assert_eq!(result.rows(), vec![0]);
}

#[test]
fn expression_then_text() {
    let table = setup();
    let result = filter(&table, "price > 100 @ !discount");
    assert_eq!(names(&table, &result), ["report_2024", "report_old", "summary"]);

    let narrowed = filter(&table, "price > 100 @ report");
    assert_eq!(names(&table, &narrowed), ["report_2024", "report_old"]);
}

#[test]
fn broken_expression_searches_everything_typed() {
    let table = setup();
    let options = RowFilterOptions { bare_expressions: true };
    let result = apply_row_filter(&table, "price >> 100", &QueryEvaluator, options).unwrap();
    // only "price list" holds both "price" and "100"; the bad operator excludes nothing
    assert_eq!(names(&table, &result), ["price list"]);
    assert_eq!(result, filter(&table, "price >> 100"));

    let with_separator = filter(&table, "price >> 100 @ list");
    let expected = filter_rows(&table, &all_rows(&table), &parse_terms("price >> 100 list"));
    assert_eq!(with_separator.matched(), &expected);
}

#[test]
fn unknown_column_falls_back_to_text() {
    let table = setup();
    let result = filter(&table, "Country == 'EU' @ report");
    let expected = filter_rows(&table, &all_rows(&table), &parse_terms("Country == 'EU'   report"));
    assert_eq!(result.matched(), &expected);
    assert!(result.is_empty());
}

#[test]
fn bare_expressions_option() {
    let table = setup();
    let off = filter(&table, "Region == 'EU'");
    assert!(off.is_empty(), "read as text, no cell holds all three terms");
    let on = apply_row_filter(&table, "Region == 'EU'", &QueryEvaluator, RowFilterOptions { bare_expressions: true })
        .unwrap();
    assert_eq!(on.rows(), vec![0, 2]);
}

#[test]
fn exact_prefix_and_suffix_terms() {
    let table = setup();
    assert_eq!(names(&table, &filter(&table, "\"eu\"")), ["report_2024", "report_old"]);
    assert_eq!(names(&table, &filter(&table, "^temp")), ["temp_old"]);
    assert_eq!(names(&table, &filter(&table, "2024$")), ["report_2024"]);
    assert_eq!(names(&table, &filter(&table, "'120.5'")), ["summary"]);
}

#[test]
fn bracket_lists_are_disjunctive() {
    let table = setup();
    assert_eq!(names(&table, &filter(&table, "[apac, summary]")), ["price list", "summary"]);
    assert_eq!(names(&table, &filter(&table, "us [temp, summ]")), ["temp_old", "summary"]);
    assert_eq!(names(&table, &filter(&table, "![report, us]")), ["price list"]);
}

#[test]
fn unterminated_quotes_and_brackets_are_literal() {
    let table = Table::from_text(&["Note"], &[vec!["[draft"], vec!["\"quoted"], vec!["plain"]]).unwrap();
    assert_eq!(filter(&table, "[draft").rows(), vec![0]);
    assert_eq!(filter(&table, "\"quoted").rows(), vec![1]);
}

#[test]
fn empty_filter_keeps_every_row() {
    let table = setup();
    assert_eq!(filter(&table, "").rows(), vec![0, 1, 2, 3, 4]);
    assert_eq!(filter(&table, "   ").rows(), vec![0, 1, 2, 3, 4]);
    assert_eq!(filter(&table, "*").rows(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn escaped_separator_is_text() {
    let table = Table::from_text(&["Mail"], &[vec!["ann@example.org"], vec!["bob@example.com"]]).unwrap();
    assert_eq!(filter(&table, r"ann\@example").rows(), vec![0]);
}

#[test]
fn missing_evaluator_with_open_bracket_is_reported() {
    let table = setup();
    let unavailable = |_: &dyn RowStore, _: &str| -> Result<RowSet> {
        Err(SieveError::EvaluatorUnavailable("no query backend".into()))
    };
    let err = apply_row_filter(&table, "price > 1 @ [eu, us", &unavailable, RowFilterOptions::default()).unwrap_err();
    assert!(matches!(err, SieveError::FilterUnavailable(_)));

    // a closed list degrades to the text search like any other failure
    let result = apply_row_filter(&table, "price > 1 @ [eu, us]", &unavailable, RowFilterOptions::default()).unwrap();
    let expected = filter_rows(&table, &all_rows(&table), &parse_terms("price > 1   [eu, us]"));
    assert_eq!(result.matched(), &expected);
}

#[test]
fn custom_evaluators_plug_in() {
    let table = setup();
    let first_two = |_: &dyn RowStore, _: &str| -> Result<RowSet> { Ok((0..2).collect()) };
    let result = apply_row_filter(&table, "anything @ old", &first_two, RowFilterOptions::default()).unwrap();
    assert_eq!(result.rows(), vec![1]);
}

#[test]
fn repeated_application_is_identical() {
    let table = setup();
    for text in ["price > 100 @ !discount *", "report", "price >> 1", "[eu, us] !old *"] {
        assert_eq!(filter(&table, text), filter(&table, text), "{text}");
    }
}
