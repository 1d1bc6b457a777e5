//! The row filter language.
//!
//! ```text
//! price > 100 @ report !old *
//! └── expression ─┘ └─ text ─┘ └ wildcard
//! ```
//!
//! The part before the first unescaped `@` is a structured expression handed
//! to an [`ExpressionEvaluator`]; the part after it (or the whole text when
//! there is no `@`) is a free-text search ([`crate::terms`]) narrowing the
//! expression's rows. A trailing `*` keeps the rows that did not match,
//! appended after the ones that did.
//!
//! An expression that fails to parse or evaluate never empties the view: the
//! whole filter text is searched as plain text over every row instead.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, SieveError};
use crate::expression::ExpressionEvaluator;
use crate::predicate::filter_rows;
use crate::store::{all_rows, RowId, RowSet, RowStore};
use crate::terms::{has_unterminated_bracket, parse_terms, TermGroup};

pub const SEPARATOR: char = '@';
const ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowFilterOptions {
    /// Try an `@`-free filter as an expression before searching it as text.
    pub bare_expressions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRowFilter {
    pub query_expr: Option<String>,
    pub contains_group: Option<TermGroup>,
    pub wildcard: bool,
}

/// Removes a trailing `*`, spaced (`report *`) or glued (`report*`),
/// reporting whether one was there.
pub fn split_wildcard(raw: &str) -> (&str, bool) {
    let trimmed = raw.trim();
    match trimmed.strip_suffix('*') {
        Some(rest) => (rest.trim_end(), true),
        None => (trimmed, false),
    }
}

fn find_separator(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (position, ch) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == ESCAPE {
            escaped = true;
        } else if ch == SEPARATOR {
            return Some(position);
        }
    }
    None
}

/// Rewrites `text` with the escape rules `find_separator` uses: a backslash
/// escapes exactly the next character, and only `\@` loses its backslash.
/// Unescaped separators become `separator_as`.
fn rewrite_separators(text: &str, separator_as: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            ESCAPE => match chars.next() {
                Some(SEPARATOR) => out.push(SEPARATOR),
                Some(next) => {
                    out.push(ESCAPE);
                    out.push(next);
                }
                None => out.push(ESCAPE),
            },
            SEPARATOR => out.push(separator_as),
            other => out.push(other),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    rewrite_separators(text, SEPARATOR)
}

/// The text searched when the expression part fails: everything typed,
/// with the separator itself read as a space.
fn fallback_text(text: &str) -> String {
    rewrite_separators(text, ' ')
}

pub fn parse_row_filter(raw: &str, options: RowFilterOptions) -> ParsedRowFilter {
    let (text, wildcard) = split_wildcard(raw);
    let (query, contains) = match find_separator(text) {
        Some(at) => (text[..at].trim(), text[at + SEPARATOR.len_utf8()..].trim()),
        None if options.bare_expressions => (text, ""),
        None => ("", text),
    };
    ParsedRowFilter {
        query_expr: (!query.is_empty()).then(|| unescape(query)),
        contains_group: (!contains.is_empty()).then(|| parse_terms(&unescape(contains))),
        wildcard,
    }
}

// ------------- Result -------------
/// Matched rows, followed by the unmatched ones when the filter ended in `*`.
/// Both parts iterate in original row order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchResult {
    matched: RowSet,
    unmatched: RowSet,
    wildcard: bool,
}

impl MatchResult {
    /// Every row of `store`, unfiltered.
    pub fn unfiltered(store: &dyn RowStore) -> Self {
        Self { matched: all_rows(store), unmatched: RowSet::new(), wildcard: false }
    }
    fn new(store: &dyn RowStore, matched: RowSet, wildcard: bool) -> Self {
        let unmatched = if wildcard { all_rows(store) - &matched } else { RowSet::new() };
        Self { matched, unmatched, wildcard }
    }
    pub fn matched(&self) -> &RowSet {
        &self.matched
    }
    pub fn unmatched(&self) -> &RowSet {
        &self.unmatched
    }
    pub fn wildcard(&self) -> bool {
        self.wildcard
    }
    pub fn is_match(&self, row: RowId) -> bool {
        self.matched.contains(row)
    }
    /// Row ids in display order.
    pub fn iter(&self) -> impl Iterator<Item = RowId> + '_ {
        self.matched.iter().chain(self.unmatched.iter())
    }
    pub fn rows(&self) -> Vec<RowId> {
        self.iter().collect()
    }
    pub fn len(&self) -> usize {
        (self.matched.len() + self.unmatched.len()) as usize
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ------------- Fallback chain -------------
/// Filters `store` by `raw`.
///
/// Only one failure reaches the caller: [`SieveError::FilterUnavailable`],
/// when the evaluator is missing altogether and the text holds an
/// unterminated bracket list, so neither reading of the filter is sound.
pub fn apply_row_filter(
    store: &dyn RowStore,
    raw: &str,
    evaluator: &dyn ExpressionEvaluator,
    options: RowFilterOptions,
) -> Result<MatchResult> {
    let parsed = parse_row_filter(raw, options);
    let everything = all_rows(store);
    let narrowing = parsed.contains_group.clone().unwrap_or_default();
    let matched = match parsed.query_expr.as_deref() {
        None => filter_rows(store, &everything, &narrowing),
        Some(expr) => match evaluator.evaluate(store, expr) {
            Ok(rows) => filter_rows(store, &(rows & &everything), &narrowing),
            Err(err) => {
                let (text, _) = split_wildcard(raw);
                if matches!(err, SieveError::EvaluatorUnavailable(_)) && has_unterminated_bracket(text) {
                    warn!(error = %err, "no evaluator and an unterminated bracket list");
                    return Err(SieveError::FilterUnavailable(format!(
                        "'{}' needs the expression evaluator, which is unavailable",
                        text
                    )));
                }
                if err.is_expression_failure() {
                    info!(expr, error = %err, "expression failed, searching the whole filter as text");
                } else {
                    warn!(expr, error = %err, "evaluator failed, searching the whole filter as text");
                }
                filter_rows(store, &everything, &parse_terms(&fallback_text(text)))
            }
        },
    };
    debug!(filter = raw, matched = matched.len(), wildcard = parsed.wildcard, "row filter applied");
    Ok(MatchResult::new(store, matched, parsed.wildcard))
}
