//! Filter state carried across dataset swaps, and named saved filters.
//!
//! [`FilterState`] is the only mutable piece of the engine. It keeps the
//! filter texts exactly as typed, the column list the column filter last
//! resolved to, and the column last picked from the search suggestions.
//! When the host swaps in another table, [`FilterState::reapply`] projects
//! it onto the new columns.

use serde::{Deserialize, Serialize};

use crate::columns::{parse_column_filter, resolve_columns};
use crate::error::{Result, SieveError};
use crate::search::move_to_start;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    row_filter_text: String,
    column_filter_text: String,
    explicit_visible_columns: Option<Vec<String>>,
    last_searched_column: Option<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn row_filter_text(&self) -> &str {
        &self.row_filter_text
    }
    pub fn column_filter_text(&self) -> &str {
        &self.column_filter_text
    }
    pub fn explicit_visible_columns(&self) -> Option<&[String]> {
        self.explicit_visible_columns.as_deref()
    }
    pub fn last_searched_column(&self) -> Option<&str> {
        self.last_searched_column.as_deref()
    }
    pub fn has_filters(&self) -> bool {
        !self.row_filter_text.trim().is_empty() || !self.column_filter_text.trim().is_empty()
    }

    pub fn set_row_filter(&mut self, text: &str) {
        self.row_filter_text = text.to_string();
    }

    /// Stores `text` and resolves it against `all_columns`. Text that filters
    /// nothing clears the explicit column list.
    pub fn set_column_filter(&mut self, text: &str, all_columns: &[String]) {
        self.column_filter_text = text.to_string();
        self.re_resolve(all_columns);
    }

    /// Regenerates the explicit column list from the column filter text.
    pub fn re_resolve(&mut self, all_columns: &[String]) {
        self.explicit_visible_columns = if parse_column_filter(&self.column_filter_text).is_empty() {
            None
        } else {
            Some(resolve_columns(all_columns, &self.column_filter_text))
        };
    }

    /// The columns to display, in order.
    pub fn visible_columns(&self, all_columns: &[String]) -> Vec<String> {
        match &self.explicit_visible_columns {
            Some(explicit) => explicit.iter().filter(|c| all_columns.contains(c)).cloned().collect(),
            None => all_columns.to_vec(),
        }
    }

    pub fn select_suggestion(&mut self, column: &str) {
        self.last_searched_column = Some(column.to_string());
    }

    /// `columns` reordered with the last searched column first.
    pub fn move_searched_column_to_start(&self, columns: &[String]) -> Option<Vec<String>> {
        move_to_start(columns, self.last_searched_column.as_deref()?)
    }

    /// The state projected onto a dataset with `new_columns`.
    ///
    /// Filter texts are kept verbatim. The explicit column list keeps its
    /// surviving entries in their resolved order; if none survive it is
    /// dropped so that every column shows. The last searched column is kept
    /// only if the new dataset has it.
    pub fn reapply(&self, new_columns: &[String]) -> FilterState {
        let explicit_visible_columns = self
            .explicit_visible_columns
            .as_ref()
            .map(|explicit| -> Vec<String> {
                explicit.iter().filter(|c| new_columns.contains(c)).cloned().collect()
            })
            .filter(|survivors| !survivors.is_empty());
        let last_searched_column = self
            .last_searched_column
            .clone()
            .filter(|column| new_columns.contains(column));
        tracing::debug!(
            kept = explicit_visible_columns.as_ref().map(Vec::len),
            last_searched = last_searched_column.is_some(),
            "filter state reapplied"
        );
        FilterState {
            row_filter_text: self.row_filter_text.clone(),
            column_filter_text: self.column_filter_text.clone(),
            explicit_visible_columns,
            last_searched_column,
        }
    }

    /// Clears both filters. The last searched column stays.
    pub fn reset(&mut self) {
        self.row_filter_text.clear();
        self.column_filter_text.clear();
        self.explicit_visible_columns = None;
    }

    pub fn snapshot(&self, name: &str) -> SavedFilter {
        SavedFilter {
            name: name.to_string(),
            row_filter: self.row_filter_text.clone(),
            column_filter: self.column_filter_text.clone(),
        }
    }

    pub fn restore(&mut self, saved: &SavedFilter, all_columns: &[String]) {
        self.set_row_filter(&saved.row_filter);
        self.set_column_filter(&saved.column_filter, all_columns);
    }
}

// ------------- Saved filters -------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFilter {
    pub name: String,
    #[serde(default)]
    pub row_filter: String,
    #[serde(default)]
    pub column_filter: String,
}

/// Named filters in the order they were first saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedFilters {
    filters: Vec<SavedFilter>,
}

impl SavedFilters {
    pub fn new() -> Self {
        Self::default()
    }
    /// Adds `filter`, replacing any filter of the same name in place.
    pub fn save(&mut self, filter: SavedFilter) -> Result<()> {
        if filter.name.trim().is_empty() {
            return Err(SieveError::InvalidInput("a saved filter needs a name".into()));
        }
        if filter.row_filter.trim().is_empty() && filter.column_filter.trim().is_empty() {
            return Err(SieveError::InvalidInput("no filter is currently active".into()));
        }
        match self.filters.iter_mut().find(|f| f.name == filter.name) {
            Some(existing) => *existing = filter,
            None => self.filters.push(filter),
        }
        Ok(())
    }
    pub fn get(&self, name: &str) -> Option<&SavedFilter> {
        self.filters.iter().find(|f| f.name == name)
    }
    pub fn remove(&mut self, name: &str) -> Option<SavedFilter> {
        let position = self.filters.iter().position(|f| f.name == name)?;
        Some(self.filters.remove(position))
    }
    pub fn iter(&self) -> impl Iterator<Item = &SavedFilter> {
        self.filters.iter()
    }
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name.as_str()).collect()
    }
    pub fn len(&self) -> usize {
        self.filters.len()
    }
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
