use tabsieve::columns::{parse_column_filter, resolve_columns};

fn setup() -> Vec<String> {
    ["Date", "Open", "High", "Low", "Close", "Volume"].iter().map(|s| s.to_string()).collect()
}

#[test]
fn pins_columns_around_the_wildcard() {
    let columns = setup();
    assert_eq!(resolve_columns(&columns, r#""Date", *, "Volume""#), columns);
    assert_eq!(
        resolve_columns(&columns, r#""Date", *, "Open""#),
        ["Date", "High", "Low", "Close", "Volume", "Open"]
    );
    assert_eq!(
        resolve_columns(&columns, r#""Close" "Open" *"#),
        ["Close", "Open", "Date", "High", "Low", "Volume"]
    );
}

#[test]
fn empty_and_star_leave_columns_alone() {
    let columns = setup();
    assert_eq!(resolve_columns(&columns, ""), columns);
    assert_eq!(resolve_columns(&columns, "*"), columns);
    assert_eq!(resolve_columns(&columns, "\"*\""), columns);
    assert_eq!(resolve_columns(&columns, " , ; "), columns);
}

#[test]
fn include_terms_drop_unmatched_columns() {
    let columns = setup();
    assert_eq!(resolve_columns(&columns, "o"), ["Open", "Low", "Close", "Volume"]);
    assert_eq!(resolve_columns(&columns, "volume, date"), ["Volume", "Date"]);
    assert_eq!(resolve_columns(&columns, "\"dat\""), Vec::<String>::new());
    assert_eq!(resolve_columns(&columns, "nothing"), Vec::<String>::new());
}

#[test]
fn quoted_terms_are_exact_but_ignore_case() {
    let columns = vec!["Time".to_string(), "Timestamp".to_string()];
    assert_eq!(resolve_columns(&columns, "'time'"), ["Time"]);
    assert_eq!(resolve_columns(&columns, "time"), ["Time", "Timestamp"]);
}

#[test]
fn exclusion_always_wins() {
    let columns = setup();
    assert_eq!(resolve_columns(&columns, "!o *"), ["Date", "High"]);
    assert_eq!(resolve_columns(&columns, r#""Open" * !"open""#), ["Date", "High", "Low", "Close", "Volume"]);
    assert_eq!(resolve_columns(&columns, "* !low !'Volume'"), ["Date", "Open", "High", "Close"]);
    // without an include term or '*' nothing is asked for
    assert_eq!(resolve_columns(&columns, "!Low"), Vec::<String>::new());
}

#[test]
fn repeated_mentions_place_a_column_once() {
    let columns = setup();
    assert_eq!(resolve_columns(&columns, "close Close * close"), ["Close", "Date", "Open", "High", "Low", "Volume"]);
    assert_eq!(resolve_columns(&columns, "* * Date"), ["Open", "High", "Low", "Close", "Volume", "Date"]);
}

#[test]
fn names_with_spaces_need_quotes() {
    let columns = vec!["Unit Price".to_string(), "Units".to_string(), "Price".to_string()];
    assert_eq!(resolve_columns(&columns, "\"Unit Price\""), ["Unit Price"]);
    assert_eq!(resolve_columns(&columns, "Unit Price"), ["Unit Price", "Units", "Price"]);
}

#[test]
fn parsed_spec_keeps_token_order() {
    let spec = parse_column_filter("b; !c, 'a' *");
    let texts: Vec<&str> = spec.include_terms.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["b", "a"]);
    assert_eq!(spec.exclude_terms.len(), 1);
    assert!(spec.wildcard);
}
