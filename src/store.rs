//! Read-only access to the table being filtered.
//!
//! The engine never owns or mutates the data it filters. Everything it needs
//! is expressed by the [`RowStore`] trait: the ordered column names, the row
//! count and cell lookup. Rows are addressed by [`RowId`], the original row
//! index, which stays stable no matter how a view is filtered or ordered.
//!
//! Every text comparison in the crate goes through
//! [`CellValue::to_display_string`], so typed cells (numbers, dates) are
//! matched by the same text the user sees in the grid.
//!
//! [`Table`] is the in-memory store used by the command line host and the
//! tests; a GUI host can implement [`RowStore`] over its own storage instead.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::io::Read;
use std::path::Path;

// used for the date and datetime cell types
use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
// used for sets of rows, iteration is always in original row order
use roaring::RoaringBitmap;
use seahash::SeaHasher;

use crate::error::{Result, SieveError};

// ------------- Rows -------------
pub type RowId = u32;
pub type RowSet = RoaringBitmap;

pub type NameHasher = BuildHasherDefault<SeaHasher>;

/// Every row of the store, in original order.
pub fn all_rows(store: &dyn RowStore) -> RowSet {
    let mut rows = RowSet::new();
    let count = u32::try_from(store.row_count()).unwrap_or(u32::MAX);
    rows.insert_range(0..count);
    rows
}

// ------------- Cells -------------
const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

lazy_static! {
    static ref NUMERIC: Regex = Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

impl CellValue {
    /// Types a raw text cell the way a CSV reader would: numbers, booleans
    /// and ISO dates become typed values, anything else stays text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if NUMERIC.is_match(trimmed) {
            if let Ok(i) = trimmed.parse::<i64>() {
                return Self::Integer(i);
            }
            if let Ok(f) = trimmed.parse::<f64>() {
                return Self::Float(f);
            }
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            return Self::Date(date);
        }
        for format in DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Self::DateTime(datetime);
            }
        }
        Self::Text(raw.to_string())
    }
    /// The text a cell is matched by.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{:.1}", x),
            Self::Float(x) => write!(f, "{}", x),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMATS[0])),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(raw: &str) -> Self {
        Self::infer(raw)
    }
}

// ------------- Store -------------
pub trait RowStore {
    fn columns(&self) -> &[String];
    fn row_count(&self) -> usize;
    fn cell_at(&self, row: RowId, column: usize) -> Option<&CellValue>;

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c == name)
    }
    fn cell(&self, row: RowId, name: &str) -> Option<&CellValue> {
        self.column_index(name).and_then(|index| self.cell_at(row, index))
    }
    fn column_values(&self, name: &str) -> Option<Vec<&CellValue>> {
        let index = self.column_index(name)?;
        let count = u32::try_from(self.row_count()).unwrap_or(u32::MAX);
        Some((0..count).filter_map(|row| self.cell_at(row, index)).collect())
    }
    /// Stringified cells of one row, one entry per column.
    fn display_row(&self, row: RowId) -> Vec<String> {
        (0..self.columns().len())
            .map(|index| self.cell_at(row, index).map(CellValue::to_display_string).unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize, NameHasher>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut index = HashMap::<String, usize, NameHasher>::default();
        for (position, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(SieveError::Shape(format!("duplicate column name '{}'", name)));
            }
        }
        if u32::try_from(rows.len()).is_err() {
            return Err(SieveError::Shape(format!("{} rows exceed the addressable row range", rows.len())));
        }
        for (row_id, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SieveError::Shape(format!(
                    "row {} has {} cells but there are {} columns",
                    row_id,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, index, rows })
    }
    /// Builds a table from raw text, typing every cell with [`CellValue::infer`].
    pub fn from_text<S: AsRef<str>>(columns: &[S], rows: &[Vec<S>]) -> Result<Self> {
        let columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| CellValue::infer(cell.as_ref())).collect())
            .collect();
        Self::new(columns, rows)
    }
    /// Reads a CSV document with a header line. Short records are padded with
    /// empty cells, long ones truncated, and repeated header names get a
    /// `.1`, `.2`, ... suffix.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let mut columns: Vec<String> = Vec::new();
        for header in reader.headers()?.iter() {
            let mut name = header.trim().to_string();
            let mut suffix = 0;
            while columns.contains(&name) {
                suffix += 1;
                name = format!("{}.{}", header.trim(), suffix);
            }
            columns.push(name);
        }
        let width = columns.len();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut cells: Vec<CellValue> = record.iter().take(width).map(CellValue::infer).collect();
            cells.resize(width, CellValue::Empty);
            rows.push(cells);
        }
        tracing::debug!(columns = width, rows = rows.len(), "loaded csv");
        Self::new(columns, rows)
    }
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }
    /// Applies a new display order. `order` must name every column exactly once.
    pub fn reorder_columns(&mut self, order: &[String]) -> Result<()> {
        if order.len() != self.columns.len() {
            return Err(SieveError::InvalidInput(format!(
                "column order names {} columns but the table has {}",
                order.len(),
                self.columns.len()
            )));
        }
        let mut positions = Vec::with_capacity(order.len());
        let mut seen = vec![false; order.len()];
        for name in order {
            let position = self
                .index
                .get(name)
                .copied()
                .ok_or_else(|| SieveError::InvalidInput(format!("unknown column '{}'", name)))?;
            if seen[position] {
                return Err(SieveError::InvalidInput(format!("column '{}' named twice", name)));
            }
            seen[position] = true;
            positions.push(position);
        }
        for row in self.rows.iter_mut() {
            let mut old = std::mem::take(row);
            *row = positions
                .iter()
                .map(|&p| std::mem::replace(&mut old[p], CellValue::Empty))
                .collect();
        }
        self.columns = order.to_vec();
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();
        Ok(())
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowStore for Table {
    fn columns(&self) -> &[String] {
        &self.columns
    }
    fn row_count(&self) -> usize {
        self.rows.len()
    }
    fn cell_at(&self, row: RowId, column: usize) -> Option<&CellValue> {
        self.rows.get(row as usize).and_then(|cells| cells.get(column))
    }
    fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_cell_types() {
        assert_eq!(CellValue::infer("42"), CellValue::Integer(42));
        assert_eq!(CellValue::infer(" 2.5 "), CellValue::Float(2.5));
        assert_eq!(CellValue::infer("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::infer(""), CellValue::Empty);
        assert_eq!(CellValue::infer("nan"), CellValue::Text("nan".into()));
        assert_eq!(CellValue::infer("inf"), CellValue::Text("inf".into()));
        assert!(matches!(CellValue::infer("2024-03-01"), CellValue::Date(_)));
        assert!(matches!(CellValue::infer("2024-03-01 12:30:00"), CellValue::DateTime(_)));
    }

    #[test]
    fn display_strings() {
        assert_eq!(CellValue::Float(100.0).to_display_string(), "100.0");
        assert_eq!(CellValue::Float(0.25).to_display_string(), "0.25");
        assert_eq!(CellValue::infer("2024-03-01").to_display_string(), "2024-03-01");
        assert_eq!(CellValue::Empty.to_display_string(), "");
    }

    #[test]
    fn csv_pads_rows_and_renames_duplicate_headers() {
        let data = "a,b,a\n1,x\n2,y,3,4\n";
        let table = Table::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(table.columns(), ["a", "b", "a.1"]);
        assert_eq!(table.cell(0, "a.1"), Some(&CellValue::Empty));
        assert_eq!(table.cell(1, "a.1"), Some(&CellValue::Integer(3)));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Table::from_text(&["a", "b"], &[vec!["1"]]).unwrap_err();
        assert!(matches!(err, SieveError::Shape(_)));
    }

    #[test]
    fn reorder_moves_cells_with_columns() {
        let mut table = Table::from_text(&["a", "b", "c"], &[vec!["1", "2", "3"]]).unwrap();
        let order: Vec<String> = ["c", "a", "b"].iter().map(|s| s.to_string()).collect();
        table.reorder_columns(&order).unwrap();
        assert_eq!(table.display_row(0), ["3", "1", "2"]);
        assert_eq!(table.cell(0, "a"), Some(&CellValue::Integer(1)));
        assert!(table.reorder_columns(&order[..2]).is_err());
    }
}
