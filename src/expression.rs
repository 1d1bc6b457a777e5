//! Structured boolean expressions over column names.
//!
//! The row filter hands the left side of `@` to an [`ExpressionEvaluator`].
//! A host can plug in its own evaluator (anything with the right `Fn`
//! signature qualifies); [`QueryEvaluator`] is the built-in one, covering the
//! dataframe-query forms users of a table browser tend to type:
//!
//! * comparisons `== != < <= > >=`, chained as in `1 < x <= 5`
//! * `and`/`&`, `or`/`|`, `not`/`~`, parentheses
//! * `col in [a, b]`, `col not in (a, b)`
//! * `col.str.contains(p)`, `.str.match(p)` (regular expressions),
//!   `.str.startswith(s)`, `.str.endswith(s)`, each taking `case=False`
//! * column names as identifiers or in backticks: `` `Unit Price` ``
//!
//! Grammar details live in `expression.pest`. Both syntax and evaluation
//! failures come back as errors, never as an empty row set, so that the
//! caller can tell "nothing matched" from "this was not an expression".

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use regex::{Regex, RegexBuilder};

use crate::error::{Result, SieveError};
use crate::store::{all_rows, CellValue, RowId, RowSet, RowStore};

#[derive(Parser)]
#[grammar = "expression.pest"]
struct ExpressionParser;

pub trait ExpressionEvaluator {
    /// The rows of `store` satisfying `expr`.
    fn evaluate(&self, store: &dyn RowStore, expr: &str) -> Result<RowSet>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&dyn RowStore, &str) -> Result<RowSet>,
{
    fn evaluate(&self, store: &dyn RowStore, expr: &str) -> Result<RowSet> {
        self(store, expr)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEvaluator;

impl ExpressionEvaluator for QueryEvaluator {
    fn evaluate(&self, store: &dyn RowStore, expr: &str) -> Result<RowSet> {
        let compiled = Expression::compile(store, expr)?;
        let mut rows = RowSet::new();
        for row in all_rows(store).iter() {
            if compiled.matches(store, row)? {
                rows.insert(row);
            }
        }
        tracing::debug!(expr, matched = rows.len(), "expression evaluated");
        Ok(rows)
    }
}

// ------------- Syntax tree -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone)]
enum Operand {
    Number(f64),
    Text(String),
    Bool(bool),
    Column(usize),
}

#[derive(Debug, Clone)]
enum TextMatcher {
    Pattern(Regex),
    Prefix { needle: String, case_sensitive: bool },
    Suffix { needle: String, case_sensitive: bool },
}

impl TextMatcher {
    fn matches(&self, text: &str) -> bool {
        match self {
            Self::Pattern(regex) => regex.is_match(text),
            Self::Prefix { needle, case_sensitive: true } => text.starts_with(needle.as_str()),
            Self::Prefix { needle, case_sensitive: false } => text.to_lowercase().starts_with(needle.as_str()),
            Self::Suffix { needle, case_sensitive: true } => text.ends_with(needle.as_str()),
            Self::Suffix { needle, case_sensitive: false } => text.to_lowercase().ends_with(needle.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Or(Vec<Node>),
    And(Vec<Node>),
    Not(Box<Node>),
    Truthy(Operand),
    Compare { first: Operand, rest: Vec<(CmpOp, Operand)> },
    Member { operand: Operand, items: Vec<Operand>, negate: bool },
    Text { column: usize, matcher: TextMatcher },
}

/// A parsed expression with its column names resolved against one store.
#[derive(Debug, Clone)]
pub struct Expression {
    root: Node,
}

impl Expression {
    /// Parses `expr` and resolves its column references. Unknown columns
    /// are reported here, before any row is looked at.
    pub fn compile(store: &dyn RowStore, expr: &str) -> Result<Self> {
        let mut pairs = ExpressionParser::parse(Rule::query, expr)?;
        let query = pairs.next().ok_or_else(|| unexpected("empty parse"))?;
        let disjunction = query
            .into_inner()
            .find(|pair| pair.as_rule() == Rule::disjunction)
            .ok_or_else(|| unexpected("missing expression body"))?;
        Ok(Self { root: build(disjunction, store)? })
    }
    pub fn matches(&self, store: &dyn RowStore, row: RowId) -> Result<bool> {
        self.root.eval(store, row)
    }
}

fn unexpected(what: &str) -> SieveError {
    SieveError::Parse { message: what.to_string(), line: None, col: None }
}

fn strip_delimiters(raw: &str) -> &str {
    // delimiters are single ASCII characters guaranteed by the grammar
    &raw[1..raw.len() - 1]
}

fn build(pair: Pair<Rule>, store: &dyn RowStore) -> Result<Node> {
    match pair.as_rule() {
        Rule::disjunction => Ok(collapse(build_children(pair, store)?, Node::Or)),
        Rule::conjunction => Ok(collapse(build_children(pair, store)?, Node::And)),
        Rule::negation => {
            let inner = pair
                .into_inner()
                .find(|p| p.as_rule() != Rule::kw_not)
                .ok_or_else(|| unexpected("empty negation"))?;
            // a nested negation only appears behind a 'not' or '~'
            if inner.as_rule() == Rule::negation {
                Ok(Node::Not(Box::new(build(inner, store)?)))
            } else {
                build(inner, store)
            }
        }
        Rule::comparison => {
            let mut inner = pair.into_inner();
            let first = build_operand(inner.next().ok_or_else(|| unexpected("empty comparison"))?, store)?;
            let mut rest = Vec::new();
            while let Some(op) = inner.next() {
                let operand = inner.next().ok_or_else(|| unexpected("dangling comparison"))?;
                rest.push((build_cmp_op(op.as_str())?, build_operand(operand, store)?));
            }
            if rest.is_empty() {
                Ok(Node::Truthy(first))
            } else {
                Ok(Node::Compare { first, rest })
            }
        }
        Rule::membership => {
            let mut inner = pair.into_inner();
            let operand = build_operand(inner.next().ok_or_else(|| unexpected("empty membership"))?, store)?;
            let op = inner.next().ok_or_else(|| unexpected("missing 'in'"))?;
            let list = inner.next().ok_or_else(|| unexpected("missing list"))?;
            let items = list
                .into_inner()
                .map(|item| build_operand(item, store))
                .collect::<Result<Vec<_>>>()?;
            Ok(Node::Member { operand, items, negate: op.as_rule() == Rule::not_in })
        }
        Rule::string_call => {
            let mut inner = pair.into_inner();
            let column = resolve_column(inner.next().ok_or_else(|| unexpected("missing column"))?, store)?;
            let method = inner.next().ok_or_else(|| unexpected("missing method"))?;
            let argument = inner.next().ok_or_else(|| unexpected("missing argument"))?;
            let needle = strip_delimiters(argument.as_str());
            let case_sensitive = match inner.next() {
                Some(flag) => flag.into_inner().next().map_or(true, |b| parse_bool(b.as_str())),
                None => true,
            };
            let matcher = match method.as_str() {
                "contains" => TextMatcher::Pattern(compile_pattern(needle, case_sensitive)?),
                "match" => TextMatcher::Pattern(compile_pattern(&format!("^(?:{})", needle), case_sensitive)?),
                "startswith" => TextMatcher::Prefix { needle: fold_case(needle, case_sensitive), case_sensitive },
                "endswith" => TextMatcher::Suffix { needle: fold_case(needle, case_sensitive), case_sensitive },
                other => return Err(unexpected(&format!("unknown string method '{}'", other))),
            };
            Ok(Node::Text { column, matcher })
        }
        other => Err(unexpected(&format!("unexpected {:?}", other))),
    }
}

fn build_children(pair: Pair<Rule>, store: &dyn RowStore) -> Result<Vec<Node>> {
    pair.into_inner()
        .filter(|p| !matches!(p.as_rule(), Rule::kw_and | Rule::kw_or))
        .map(|p| build(p, store))
        .collect()
}

fn collapse(mut parts: Vec<Node>, wrap: fn(Vec<Node>) -> Node) -> Node {
    if parts.len() == 1 { parts.remove(0) } else { wrap(parts) }
}

fn build_cmp_op(op: &str) -> Result<CmpOp> {
    match op {
        "==" => Ok(CmpOp::Eq),
        "!=" => Ok(CmpOp::Ne),
        "<" => Ok(CmpOp::Lt),
        "<=" => Ok(CmpOp::Le),
        ">" => Ok(CmpOp::Gt),
        ">=" => Ok(CmpOp::Ge),
        other => Err(unexpected(&format!("unknown operator '{}'", other))),
    }
}

fn build_operand(pair: Pair<Rule>, store: &dyn RowStore) -> Result<Operand> {
    match pair.as_rule() {
        Rule::number => pair
            .as_str()
            .parse::<f64>()
            .map(Operand::Number)
            .map_err(|e| unexpected(&format!("bad number '{}': {}", pair.as_str(), e))),
        Rule::string => Ok(Operand::Text(strip_delimiters(pair.as_str()).to_string())),
        Rule::boolean => Ok(Operand::Bool(parse_bool(pair.as_str()))),
        Rule::column => resolve_column(pair, store).map(Operand::Column),
        other => Err(unexpected(&format!("unexpected operand {:?}", other))),
    }
}

fn resolve_column(pair: Pair<Rule>, store: &dyn RowStore) -> Result<usize> {
    let name = pair.into_inner().next().ok_or_else(|| unexpected("empty column"))?;
    let name = match name.as_rule() {
        Rule::quoted_ident => strip_delimiters(name.as_str()),
        _ => name.as_str(),
    };
    store
        .column_index(name)
        .ok_or_else(|| SieveError::Evaluation(format!("unknown column '{}'", name)))
}

fn parse_bool(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

fn fold_case(needle: &str, case_sensitive: bool) -> String {
    if case_sensitive { needle.to_string() } else { needle.to_lowercase() }
}

fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| SieveError::Evaluation(format!("bad pattern '{}': {}", pattern, e)))
}

// ------------- Evaluation -------------
#[derive(Debug, Clone, PartialEq)]
enum Value<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Date(NaiveDateTime),
    Text(Cow<'a, str>),
}

impl<'a> Value<'a> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "empty",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Date(_) => "date",
            Self::Text(_) => "text",
        }
    }
    fn from_cell(cell: &'a CellValue) -> Self {
        match cell {
            CellValue::Empty => Self::Null,
            CellValue::Bool(b) => Self::Bool(*b),
            CellValue::Integer(i) => Self::Number(*i as f64),
            CellValue::Float(x) => Self::Number(*x),
            CellValue::Date(d) => d.and_hms_opt(0, 0, 0).map_or(Self::Null, Self::Date),
            CellValue::DateTime(dt) => Self::Date(*dt),
            CellValue::Text(s) => Self::Text(Cow::Borrowed(s.as_str())),
        }
    }
}

impl Operand {
    fn value<'a>(&'a self, store: &'a dyn RowStore, row: RowId) -> Value<'a> {
        match self {
            Self::Number(x) => Value::Number(*x),
            Self::Text(s) => Value::Text(Cow::Borrowed(s.as_str())),
            Self::Bool(b) => Value::Bool(*b),
            Self::Column(index) => store.cell_at(row, *index).map_or(Value::Null, Value::from_cell),
        }
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M").ok())
}

fn as_number(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> Result<bool> {
    let ordering = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => return Ok(op == CmpOp::Ne),
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Number(b)) => as_number(*a).partial_cmp(b),
        (Value::Number(a), Value::Bool(b)) => a.partial_cmp(&as_number(*b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Text(b)) => parse_datetime(b).map(|b| a.cmp(&b)),
        (Value::Text(a), Value::Date(b)) => parse_datetime(a).map(|a| a.cmp(b)),
        _ => None,
    };
    match ordering {
        Some(ordering) => Ok(op.holds(ordering)),
        None if matches!(op, CmpOp::Eq | CmpOp::Ne) => Ok(op == CmpOp::Ne),
        // NaN never orders
        None if matches!((left, right), (Value::Number(_), Value::Number(_))) => Ok(false),
        None => Err(SieveError::Evaluation(format!(
            "cannot order {} against {}",
            left.kind(),
            right.kind()
        ))),
    }
}

impl Node {
    fn eval(&self, store: &dyn RowStore, row: RowId) -> Result<bool> {
        match self {
            Node::Or(parts) => {
                for part in parts {
                    if part.eval(store, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Node::And(parts) => {
                for part in parts {
                    if !part.eval(store, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Node::Not(inner) => Ok(!inner.eval(store, row)?),
            Node::Truthy(operand) => match operand.value(store, row) {
                Value::Bool(b) => Ok(b),
                Value::Null => Ok(false),
                other => Err(SieveError::Evaluation(format!(
                    "expected a boolean condition but found a {}",
                    other.kind()
                ))),
            },
            Node::Compare { first, rest } => {
                let mut left = first.value(store, row);
                for (op, operand) in rest {
                    let right = operand.value(store, row);
                    if !compare(&left, *op, &right)? {
                        return Ok(false);
                    }
                    left = right;
                }
                Ok(true)
            }
            Node::Member { operand, items, negate } => {
                let value = operand.value(store, row);
                for item in items {
                    if compare(&value, CmpOp::Eq, &item.value(store, row))? {
                        return Ok(!negate);
                    }
                }
                Ok(*negate)
            }
            Node::Text { column, matcher } => Ok(match store.cell_at(row, *column) {
                None | Some(CellValue::Empty) => false,
                Some(cell) => matcher.matches(&cell.to_display_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Table;

    fn table() -> Table {
        Table::from_text(&["price", "Name"], &[vec!["150", "a"]]).unwrap()
    }

    #[test]
    fn syntax_errors_carry_a_position() {
        let err = Expression::compile(&table(), "price >> 100").unwrap_err();
        match err {
            SieveError::Parse { line, col, .. } => {
                assert_eq!(line, Some(1));
                assert!(col.is_some());
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_columns_fail_before_scanning() {
        let err = Expression::compile(&table(), "report").unwrap_err();
        assert!(matches!(err, SieveError::Evaluation(ref m) if m.contains("unknown column 'report'")));
    }

    #[test]
    fn keywords_do_not_swallow_identifiers() {
        let table = Table::from_text(&["notes", "order", "inside"], &[vec!["1", "2", "3"]]).unwrap();
        let rows = QueryEvaluator.evaluate(&table, "notes == 1 and order < inside").unwrap();
        assert_eq!(rows.len(), 1);
    }
}
