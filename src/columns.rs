//! The column filter language.
//!
//! Tokens are separated by spaces, commas or semicolons. A quoted token names
//! a column exactly, a bare one matches every column containing it, `!`
//! excludes, and `*` stands for "all remaining columns, here". Columns come
//! out in the order the tokens were typed, so `"Date", *, "Volume"` pins
//! `Date` first and `Volume` last. Matching ignores case.

use std::collections::HashSet;

use crate::terms::{tokenize, unquote};

const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnTerm {
    pub text: String,
    pub exact: bool,
}

impl ColumnTerm {
    pub fn matches(&self, column: &str) -> bool {
        let column = column.to_lowercase();
        let text = self.text.to_lowercase();
        if self.exact { column == text } else { column.contains(text.as_str()) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilterSpec {
    pub include_terms: Vec<ColumnTerm>,
    pub exclude_terms: Vec<ColumnTerm>,
    pub wildcard: bool,
    /// How many include terms precede the first `*`.
    wildcard_at: usize,
}

enum Token {
    Include(ColumnTerm),
    Exclude(ColumnTerm),
    Wildcard,
}

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || ch == ',' || ch == ';'
}

fn parse_token(token: &str) -> Option<Token> {
    if token.is_empty() {
        return None;
    }
    if token == WILDCARD {
        return Some(Token::Wildcard);
    }
    if let Some(rest) = token.strip_prefix('!') {
        return match parse_token(rest.trim_start_matches('!'))? {
            Token::Include(term) => Some(Token::Exclude(term)),
            _ => None,
        };
    }
    match unquote(token) {
        Some(WILDCARD) => Some(Token::Wildcard),
        Some("") => None,
        Some(inner) => Some(Token::Include(ColumnTerm { text: inner.to_string(), exact: true })),
        None => Some(Token::Include(ColumnTerm { text: token.to_string(), exact: false })),
    }
}

pub fn parse_column_filter(text: &str) -> ColumnFilterSpec {
    let mut spec = ColumnFilterSpec::default();
    for token in tokenize(text, is_separator) {
        match parse_token(&token) {
            Some(Token::Include(term)) => spec.include_terms.push(term),
            Some(Token::Exclude(term)) => {
                if !spec.exclude_terms.contains(&term) {
                    spec.exclude_terms.push(term);
                }
            }
            Some(Token::Wildcard) if !spec.wildcard => {
                spec.wildcard = true;
                spec.wildcard_at = spec.include_terms.len();
            }
            _ => {}
        }
    }
    tracing::trace!(?spec, "parsed column filter");
    spec
}

impl ColumnFilterSpec {
    /// True when the text held nothing usable, which filters nothing.
    pub fn is_empty(&self) -> bool {
        self.include_terms.is_empty() && self.exclude_terms.is_empty() && !self.wildcard
    }
    pub fn is_excluded(&self, column: &str) -> bool {
        self.exclude_terms.iter().any(|term| term.matches(column))
    }

    /// The visible columns, in token order. Exclusion wins over any include.
    pub fn resolve(&self, all_columns: &[String]) -> Vec<String> {
        if self.is_empty() {
            return all_columns.to_vec();
        }
        let (before, after) = self.include_terms.split_at(self.wildcard_at.min(self.include_terms.len()));
        let mut placed: HashSet<&str> = HashSet::new();
        let mut visible: Vec<String> = Vec::new();
        for term in before {
            self.place_matches(term, all_columns, &mut placed, &mut visible);
        }
        if self.wildcard {
            // columns named after the '*' keep their own later position
            let held: HashSet<&str> = all_columns
                .iter()
                .filter(|c| !placed.contains(c.as_str()) && after.iter().any(|term| term.matches(c)))
                .map(String::as_str)
                .collect();
            for column in all_columns {
                if !held.contains(column.as_str()) && !self.is_excluded(column) && placed.insert(column.as_str()) {
                    visible.push(column.clone());
                }
            }
        }
        for term in after {
            self.place_matches(term, all_columns, &mut placed, &mut visible);
        }
        visible
    }

    fn place_matches<'a>(
        &self,
        term: &ColumnTerm,
        all_columns: &'a [String],
        placed: &mut HashSet<&'a str>,
        visible: &mut Vec<String>,
    ) {
        for column in all_columns.iter().filter(|c| term.matches(c)) {
            if !self.is_excluded(column) && placed.insert(column.as_str()) {
                visible.push(column.clone());
            }
        }
    }
}

/// Resolves `filter_text` against `all_columns`. Empty or junk text leaves
/// every column visible; a filter whose terms match nothing yields none.
pub fn resolve_columns(all_columns: &[String], filter_text: &str) -> Vec<String> {
    let visible = parse_column_filter(filter_text).resolve(all_columns);
    tracing::debug!(filter = filter_text, visible = visible.len(), of = all_columns.len(), "columns resolved");
    visible
}
