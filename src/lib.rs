//! Tabsieve – row and column filter languages for interactive table browsers.
//!
//! A table browser usually offers three text boxes: one filtering rows, one
//! choosing and ordering columns, and one finding a column by name. Tabsieve
//! implements what sits behind them, independent of any GUI toolkit:
//!
//! * The *row filter* combines a structured expression with a free-text
//!   search: `price > 100 @ report !old *`. The expression runs through an
//!   [`expression::ExpressionEvaluator`], the text after `@` narrows its rows
//!   and a trailing `*` appends the rows that did not match. A broken
//!   expression never empties the view; the whole text is searched instead.
//! * The *column filter* picks and orders columns: `"Date", *, !tmp, "Volume"`.
//! * The *column search* suggests exact, partial and fuzzy name matches.
//! * The *filter state* remembers all of the above and carries it over when
//!   another table with other columns is loaded.
//!
//! ## Modules
//! * [`store`] – The [`store::RowStore`] access trait, typed cells and the
//!   in-memory [`store::Table`] (with CSV loading).
//! * [`terms`] – Free-text search terms: quoted exact matches, `[a, b]` lists,
//!   `!` negation, `^` / `$` anchors.
//! * [`predicate`] – Full-row evaluation of search terms.
//! * [`expression`] – The evaluator seam plus the built-in dataframe-query
//!   style evaluator. Grammar details live in `expression.pest`.
//! * [`query`] – The row filter and its fallback chain.
//! * [`columns`] – The column filter.
//! * [`search`] – Column name search and the browse menu.
//! * [`state`] – Filter state across dataset swaps, saved filters.
//! * [`engine`] – One browsing session: settings, evaluator and state together.
//! * [`config`] / [`logging`] – Settings layering and the tracing subscriber
//!   used by the `tabsieve` binary.
//!
//! ## Matching
//! All text matching is case-insensitive and works on the displayed form of a
//! cell ([`store::CellValue::to_display_string`]), so `100.0` is found by
//! typing `100.0`, and a date by typing `2024-03`.
//!
//! ## Quick Start
//! ```
//! use tabsieve::{config::Settings, engine::Engine, store::Table};
//! let table = Table::from_text(
//!     &["Name", "Size"],
//!     &[vec!["report_2024", "120"], vec!["temp_old", "80"], vec!["report_old", "300"]],
//! ).unwrap();
//! let mut engine = Engine::new(Settings::default());
//! let rows = engine.apply_row_filter(&table, "Size > 100 @ report !old").unwrap();
//! assert_eq!(rows.rows(), vec![0]);
//! let columns = engine.apply_column_filter(&table, "size *");
//! assert_eq!(columns, ["Size", "Name"]);
//! ```
//!
//! ## Threading
//! Everything is synchronous. An [`engine::Engine`] belongs to the thread that
//! delivers the user's input; if filter requests can overlap, the host drops
//! results whose input text is no longer current.

pub mod error;
pub mod store;
pub mod terms;
pub mod predicate;
pub mod expression;
pub mod query;
pub mod columns;
pub mod search;
pub mod state;
pub mod engine;
pub mod config;
pub mod logging;

pub use error::{Result, SieveError};
