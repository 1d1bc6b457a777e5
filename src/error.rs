use pest::error::LineColLocation;
use thiserror::Error;

use crate::expression::Rule;

#[derive(Error, Debug)]
pub enum SieveError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Evaluation error: {0}")]
    Evaluation(String),
    #[error("Expression evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),
    #[error("Filter unavailable: {0}")]
    FilterUnavailable(String),
    #[error("Table shape error: {0}")]
    Shape(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SieveError {
    /// True for the failures a structured expression can produce. The row
    /// filter turns every one of these into a plain text search.
    pub fn is_expression_failure(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Evaluation(_) | Self::EvaluatorUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SieveError>;

// Helper conversions
impl From<pest::error::Error<Rule>> for SieveError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let (line, col) = match e.line_col {
            LineColLocation::Pos((line, col)) => (line, col),
            LineColLocation::Span((line, col), _) => (line, col),
        };
        Self::Parse {
            message: e.variant.message().into_owned(),
            line: Some(line),
            col: Some(col),
        }
    }
}
impl From<config::ConfigError> for SieveError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for SieveError {
    fn from(e: serde_json::Error) -> Self { Self::Serialization(e.to_string()) }
}
impl From<csv::Error> for SieveError {
    fn from(e: csv::Error) -> Self { Self::Csv(e.to_string()) }
}
