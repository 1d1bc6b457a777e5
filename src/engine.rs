//! The host-facing side of the crate.
//!
//! An [`Engine`] owns the settings, the expression evaluator, the
//! [`FilterState`] and the saved filters for one browsing session. The host
//! keeps ownership of its table and passes it in with every call; after
//! loading a different table it calls [`Engine::swap_dataset`].

use tracing::debug;

use crate::config::Settings;
use crate::error::{Result, SieveError};
use crate::expression::{ExpressionEvaluator, QueryEvaluator};
use crate::query::{apply_row_filter, MatchResult};
use crate::search::{browse_groups, search_with, BrowseGroup, ColumnMatches};
use crate::state::{FilterState, SavedFilters};
use crate::store::RowStore;

/// Rows and columns to display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct View {
    pub rows: MatchResult,
    pub columns: Vec<String>,
}

pub struct Engine {
    settings: Settings,
    evaluator: Box<dyn ExpressionEvaluator>,
    state: FilterState,
    saved: SavedFilters,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        Self::with_evaluator(settings, QueryEvaluator)
    }
    pub fn with_evaluator(settings: Settings, evaluator: impl ExpressionEvaluator + 'static) -> Self {
        Self {
            settings,
            evaluator: Box::new(evaluator),
            state: FilterState::new(),
            saved: SavedFilters::new(),
        }
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    pub fn state(&self) -> &FilterState {
        &self.state
    }
    pub fn saved_filters(&self) -> &SavedFilters {
        &self.saved
    }
    /// Replaces the saved filters, e.g. with ones the host loaded from disk.
    pub fn set_saved_filters(&mut self, saved: SavedFilters) {
        self.saved = saved;
    }

    fn filter_rows(&self, store: &dyn RowStore) -> Result<MatchResult> {
        if self.state.row_filter_text().trim().is_empty() {
            return Ok(MatchResult::unfiltered(store));
        }
        apply_row_filter(store, self.state.row_filter_text(), self.evaluator.as_ref(), self.settings.rows)
    }

    /// Stores `text` as the row filter and evaluates it.
    pub fn apply_row_filter(&mut self, store: &dyn RowStore, text: &str) -> Result<MatchResult> {
        self.state.set_row_filter(text);
        self.filter_rows(store)
    }

    /// Stores `text` as the column filter and returns the visible columns.
    pub fn apply_column_filter(&mut self, store: &dyn RowStore, text: &str) -> Vec<String> {
        self.state.set_column_filter(text, store.columns());
        self.state.visible_columns(store.columns())
    }

    pub fn search_columns(&self, store: &dyn RowStore, fragment: &str) -> ColumnMatches {
        search_with(store.columns(), fragment, &self.settings.search)
    }

    pub fn browse_columns(&self, store: &dyn RowStore) -> Vec<BrowseGroup> {
        browse_groups(store.columns(), &self.settings.search)
    }

    /// Records `column` as the picked search suggestion.
    pub fn select_column(&mut self, store: &dyn RowStore, column: &str) -> Result<()> {
        if store.column_index(column).is_none() {
            return Err(SieveError::InvalidInput(format!("unknown column '{}'", column)));
        }
        self.state.select_suggestion(column);
        Ok(())
    }

    /// The store's column order with the selected column first. The host
    /// applies it to its table, e.g. with `Table::reorder_columns`.
    pub fn move_selected_to_start(&self, store: &dyn RowStore) -> Option<Vec<String>> {
        self.state.move_searched_column_to_start(store.columns())
    }

    /// Current rows and columns for `store`.
    pub fn view(&self, store: &dyn RowStore) -> Result<View> {
        Ok(View { rows: self.filter_rows(store)?, columns: self.state.visible_columns(store.columns()) })
    }

    /// Projects the filter state onto a newly loaded `store` and filters it.
    pub fn swap_dataset(&mut self, store: &dyn RowStore) -> Result<View> {
        let columns = store.columns();
        self.state = self.state.reapply(columns);
        if self.state.explicit_visible_columns().is_none() && !self.state.column_filter_text().trim().is_empty() {
            let mut resolved = self.state.clone();
            resolved.re_resolve(columns);
            // a text that matches nothing here keeps showing every column
            if resolved.explicit_visible_columns().is_some_and(|c| !c.is_empty()) {
                self.state = resolved;
            }
        }
        debug!(columns = columns.len(), rows = store.row_count(), "dataset swapped");
        self.view(store)
    }

    /// Clears both filters and returns the unfiltered view.
    pub fn reset(&mut self, store: &dyn RowStore) -> View {
        self.state.reset();
        View { rows: MatchResult::unfiltered(store), columns: store.columns().to_vec() }
    }

    /// Saves the current filter texts under `name`.
    pub fn save_filter(&mut self, name: &str) -> Result<()> {
        self.saved.save(self.state.snapshot(name))
    }

    /// Makes the saved filter `name` current and returns the resulting view.
    pub fn apply_saved(&mut self, store: &dyn RowStore, name: &str) -> Result<View> {
        let saved = self
            .saved
            .get(name)
            .cloned()
            .ok_or_else(|| SieveError::InvalidInput(format!("no saved filter named '{}'", name)))?;
        self.state.restore(&saved, store.columns());
        self.view(store)
    }
}
