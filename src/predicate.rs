//! Full-row text search.
//!
//! Every predicate is tested against each column of a row and the column
//! results are OR-ed; the predicates themselves are AND-ed. Negation applies
//! to the row-level result, so a row matches `!x` exactly when no cell
//! matches `x`.

use crate::store::{CellValue, RowId, RowSet, RowStore};
use crate::terms::{Anchor, TermGroup, TermPredicate};

#[derive(Debug, Clone, Copy)]
enum MatchKind {
    Substr,
    Prefix,
    Suffix,
    Exact,
}

#[derive(Debug, Clone)]
struct CompiledTerm {
    needle: String,
    kind: MatchKind,
    negate: bool,
}

impl CompiledTerm {
    fn new(predicate: &TermPredicate) -> Self {
        let kind = match (predicate.exact, predicate.anchor) {
            (true, _) => MatchKind::Exact,
            (false, Anchor::Prefix) => MatchKind::Prefix,
            (false, Anchor::Suffix) => MatchKind::Suffix,
            (false, Anchor::None) => MatchKind::Substr,
        };
        Self { needle: predicate.text.to_lowercase(), kind, negate: predicate.negate }
    }
    fn matches(&self, cell: &str) -> bool {
        match self.kind {
            MatchKind::Substr => cell.contains(self.needle.as_str()),
            MatchKind::Prefix => cell.starts_with(self.needle.as_str()),
            MatchKind::Suffix => cell.ends_with(self.needle.as_str()),
            MatchKind::Exact => cell == self.needle,
        }
    }
}

/// A [`TermGroup`] with its needles lowercased once, ready to test rows.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    terms: Vec<CompiledTerm>,
    or_terms: Option<Vec<String>>,
}

impl TermMatcher {
    pub fn new(group: &TermGroup) -> Self {
        Self {
            terms: group.terms.iter().map(CompiledTerm::new).collect(),
            or_terms: group
                .or_terms
                .as_ref()
                .map(|items| items.iter().map(|item| item.to_lowercase()).collect()),
        }
    }
    /// `cells` must already be lowercased.
    pub fn matches_cells(&self, cells: &[String]) -> bool {
        let all_terms = self
            .terms
            .iter()
            .all(|term| term.negate != cells.iter().any(|cell| term.matches(cell)));
        all_terms
            && self.or_terms.as_ref().map_or(true, |items| {
                items.iter().any(|item| cells.iter().any(|cell| cell.contains(item.as_str())))
            })
    }
}

fn lowercase_cell(cell: Option<&CellValue>) -> String {
    cell.map(|value| value.to_display_string().to_lowercase()).unwrap_or_default()
}

/// Tests one row against `group`, scanning only the named `columns`.
/// Names the store does not know are read as empty cells.
pub fn evaluate_contains(store: &dyn RowStore, row: RowId, columns: &[String], group: &TermGroup) -> bool {
    let cells: Vec<String> = columns
        .iter()
        .map(|name| lowercase_cell(store.cell(row, name)))
        .collect();
    TermMatcher::new(group).matches_cells(&cells)
}

/// The subset of `candidates` matching `group` over every column.
pub fn filter_rows(store: &dyn RowStore, candidates: &RowSet, group: &TermGroup) -> RowSet {
    if group.is_empty() {
        return candidates.clone();
    }
    let matcher = TermMatcher::new(group);
    let width = store.columns().len();
    let mut cells: Vec<String> = Vec::with_capacity(width);
    let mut matched = RowSet::new();
    for row in candidates.iter() {
        cells.clear();
        cells.extend((0..width).map(|column| lowercase_cell(store.cell_at(row, column))));
        if matcher.matches_cells(&cells) {
            matched.insert(row);
        }
    }
    tracing::debug!(candidates = candidates.len(), matched = matched.len(), "text search");
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Table;
    use crate::terms::parse_terms;

    fn table() -> Table {
        Table::from_text(
            &["Name", "Size"],
            &[vec!["Report_2024", "100"], vec!["temp_old", "2.5"], vec!["report_old", ""]],
        )
        .unwrap()
    }

    #[test]
    fn evaluates_a_single_row_over_chosen_columns() {
        let table = table();
        let columns = vec!["Name".to_string()];
        assert!(evaluate_contains(&table, 0, &columns, &parse_terms("REPORT")));
        assert!(!evaluate_contains(&table, 0, &columns, &parse_terms("100")));
        let all: Vec<String> = table.columns().to_vec();
        assert!(evaluate_contains(&table, 0, &all, &parse_terms("100")));
    }

    #[test]
    fn typed_cells_match_through_their_text() {
        let table = table();
        let rows = filter_rows(&table, &crate::store::all_rows(&table), &parse_terms("\"2.5\""));
        assert_eq!(rows.iter().collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn anchors_apply_per_cell() {
        let table = table();
        let all = crate::store::all_rows(&table);
        assert_eq!(filter_rows(&table, &all, &parse_terms("^report")).len(), 2);
        assert_eq!(filter_rows(&table, &all, &parse_terms("old$")).len(), 2);
        assert_eq!(filter_rows(&table, &all, &parse_terms("^old")).len(), 0);
    }
}
