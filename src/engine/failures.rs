//! Everything that can go wrong while translating or running a query.
//!
//! None of these ever reach the caller as an `Err`. A query either produces rows, or it produces
//! an empty result plus the list of failures that explain why. Some failures (a dropped condition,
//! an ignored JOIN) still produce rows, just less filtered ones.
use crate::backend::BackendError;
use crate::engine::syntax::Comparison;
use log::warn;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Failure {
    #[error("Could not parse query: {0}")]
    Parse(#[from] ParseFailure),
    #[error("Backend rejected the query: {0}")]
    Backend(Arc<BackendError>),
    #[error("Unsupported SQL was ignored: {0}")]
    Unsupported(#[from] UnsupportedConstruct),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("no table name found after FROM in '{input}'")]
    MissingTable { input: String },
    #[error("unterminated quote in WHERE clause '{clause}', ignoring the whole clause")]
    UnterminatedQuote { clause: String },
    #[error("no comparison operator in condition '{condition}'")]
    NoOperator { condition: String },
    #[error("no column name in condition '{condition}'")]
    MissingColumn { condition: String },
    #[error("no value for placeholder #{position} (column '{column}')")]
    MissingParameter { column: String, position: usize },
    #[error("no value for parameter ':{name}' (column '{column}')")]
    UnknownParameter { column: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedConstruct {
    #[error("{0} clauses are not supported")]
    Clause(String),
    #[error("OR is not supported in '{condition}'")]
    Disjunction { condition: String },
    #[error("parentheses are not supported in '{condition}'")]
    Grouping { condition: String },
    #[error("not-equal comparisons are not supported in '{condition}'")]
    NotEqual { condition: String },
    #[error("placeholders only work with '=', found '{column} {comparison} ?'")]
    PlaceholderComparison {
        column: String,
        comparison: Comparison,
    },
}

impl From<BackendError> for Failure {
    fn from(value: BackendError) -> Self {
        Failure::Backend(Arc::new(value))
    }
}

impl Failure {
    pub fn is_backend(&self) -> bool {
        matches!(self, Failure::Backend(_))
    }
}

/// Collects failures while a query is being translated.
///
/// Every failure is logged the moment it's reported, so operators see them in the log even if the
/// caller ignores the failures in the outcome.
#[derive(Debug, Default)]
pub struct Failures(Vec<Failure>);

impl Failures {
    pub fn report<F>(&mut self, failure: F)
    where
        F: Into<Failure>,
    {
        let failure = failure.into();
        warn!("{}", failure);

        self.0.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Failures> for Vec<Failure> {
    fn from(value: Failures) -> Self {
        value.0
    }
}
