//! Column name search.
//!
//! A typed fragment is matched against every column name, case-insensitively,
//! in three tiers: exact, partial (substring) and, when neither finds anything,
//! fuzzy. Fuzzy scores are character-level similarity ratios from `similar`,
//! the `2·matches / (len(a) + len(b))` measure.
//!
//! The empty fragment is the browse case: every column comes back as exact,
//! and [`browse_groups`] cuts long lists into alphabetical chunks.

use serde::{Deserialize, Serialize};
use similar::TextDiff;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub fuzzy_cutoff: f64,
    pub fuzzy_limit: usize,
    /// Fragments shorter than this are never fuzzy matched.
    pub fuzzy_min_length: usize,
    pub browse_threshold: usize,
    pub browse_group_size: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            fuzzy_cutoff: 0.6,
            fuzzy_limit: 10,
            fuzzy_min_length: 3,
            browse_threshold: 20,
            browse_group_size: 15,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMatches {
    pub exact: Vec<String>,
    pub partial: Vec<String>,
    pub fuzzy: Vec<String>,
    browse: bool,
}

impl ColumnMatches {
    /// The column to act on without asking: the first exact match, else a
    /// sole partial match, else a sole fuzzy match. Browsing has none.
    pub fn best(&self) -> Option<&str> {
        if self.browse {
            return None;
        }
        match (self.exact.first(), self.partial.as_slice(), self.fuzzy.as_slice()) {
            (Some(exact), _, _) => Some(exact.as_str()),
            (None, [only], _) => Some(only.as_str()),
            (None, [], [only]) => Some(only.as_str()),
            _ => None,
        }
    }
    /// True for the empty-fragment listing of every column.
    pub fn is_browse(&self) -> bool {
        self.browse
    }
    /// No suggestions at all. The browse case is never "no results".
    pub fn is_empty(&self) -> bool {
        !self.browse && self.exact.is_empty() && self.partial.is_empty() && self.fuzzy.is_empty()
    }
    pub fn len(&self) -> usize {
        self.exact.len() + self.partial.len() + self.fuzzy.len()
    }
}

pub fn similarity(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}

fn sort_case_insensitive(columns: &mut [String]) {
    columns.sort_by_cached_key(|column| column.to_lowercase());
}

pub fn search(all_columns: &[String], fragment: &str) -> ColumnMatches {
    search_with(all_columns, fragment, &SearchOptions::default())
}

pub fn search_with(all_columns: &[String], fragment: &str, options: &SearchOptions) -> ColumnMatches {
    let needle = fragment.trim().to_lowercase();
    if needle.is_empty() {
        let mut exact = all_columns.to_vec();
        sort_case_insensitive(&mut exact);
        return ColumnMatches { exact, browse: true, ..ColumnMatches::default() };
    }
    let mut matches = ColumnMatches::default();
    for column in all_columns {
        let name = column.to_lowercase();
        if name == needle {
            matches.exact.push(column.clone());
        } else if name.contains(needle.as_str()) {
            matches.partial.push(column.clone());
        }
    }
    if matches.exact.is_empty() && matches.partial.is_empty() && needle.chars().count() >= options.fuzzy_min_length {
        matches.fuzzy = fuzzy(all_columns, &needle, options);
    }
    sort_case_insensitive(&mut matches.exact);
    sort_case_insensitive(&mut matches.partial);
    sort_case_insensitive(&mut matches.fuzzy);
    tracing::debug!(
        fragment,
        exact = matches.exact.len(),
        partial = matches.partial.len(),
        fuzzy = matches.fuzzy.len(),
        "column search"
    );
    matches
}

/// The best `fuzzy_limit` columns scoring at least `fuzzy_cutoff`. Ties keep
/// column order.
fn fuzzy(all_columns: &[String], needle: &str, options: &SearchOptions) -> Vec<String> {
    let mut scored: Vec<(f64, &String)> = all_columns
        .iter()
        .map(|column| (similarity(needle, &column.to_lowercase()), column))
        .filter(|(score, _)| *score >= options.fuzzy_cutoff)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(options.fuzzy_limit).map(|(_, column)| column.clone()).collect()
}

// ------------- Browse menu -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseGroup {
    pub label: String,
    pub columns: Vec<String>,
}

fn initial(column: &str) -> String {
    column.chars().next().map(|c| c.to_uppercase().collect()).unwrap_or_default()
}

/// The browse listing as one flat group, or, above `browse_threshold`
/// columns, as chunks of `browse_group_size` labelled like `"A-C (15 columns)"`.
pub fn browse_groups(all_columns: &[String], options: &SearchOptions) -> Vec<BrowseGroup> {
    let mut sorted = all_columns.to_vec();
    sort_case_insensitive(&mut sorted);
    if sorted.len() <= options.browse_threshold {
        let label = format!("All ({} columns)", sorted.len());
        return vec![BrowseGroup { label, columns: sorted }];
    }
    sorted
        .chunks(options.browse_group_size.max(1))
        .map(|chunk| {
            let first = chunk.first().map(|c| initial(c)).unwrap_or_default();
            let last = chunk.last().map(|c| initial(c)).unwrap_or_default();
            BrowseGroup {
                label: format!("{}-{} ({} columns)", first, last, chunk.len()),
                columns: chunk.to_vec(),
            }
        })
        .collect()
}

/// `columns` with `name` moved to index 0, or `None` when it is not there.
pub fn move_to_start(columns: &[String], name: &str) -> Option<Vec<String>> {
    let position = columns.iter().position(|c| c == name)?;
    let mut reordered = columns.to_vec();
    let column = reordered.remove(position);
    reordered.insert(0, column);
    Some(reordered)
}
