//! The table API we translate queries into.
//!
//! A backend hands out [FilterableQuery]s for tables. Those get a chain of filter calls and are then
//! executed. Nothing talks to the backend until [FilterableQuery::execute] is called.
//!
//! There are two real backends:
//!  - [rest], a PostgREST (Supabase) server;
//!  - [memory], tables kept in memory, loaded from a JSON file.
//!
//! [recording] only remembers what was called, it's used to explain translations.
pub mod memory;
pub mod recording;
pub mod rest;

use crate::backend::memory::{MemoryClient, MemoryQuery};
use crate::backend::rest::{RestClient, RestQuery};
use serde_json::Value;
use thiserror::Error;

/// One result row: column name to value, in the order the backend sent them.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub data: Vec<Row>,
    /// Only filled in when an exact count was requested, and the backend provided it.
    pub count: Option<u64>,
}

pub trait Client {
    type Query: FilterableQuery;

    fn table(&self, name: &str) -> Self::Query;
}

/// An in-progress table query.
///
/// All methods take and return the query by value, so calls can be chained. If a backend rejects
/// one of the calls, it keeps going and reports the problem from [FilterableQuery::execute].
pub trait FilterableQuery: Sized {
    fn select(self, columns: &str) -> Self;

    /// Asks the backend to also count all matching rows.
    fn exact_count(self) -> Self;

    fn eq(self, column: &str, value: &str) -> Self;

    fn gt(self, column: &str, value: &str) -> Self;

    fn gte(self, column: &str, value: &str) -> Self;

    fn lt(self, column: &str, value: &str) -> Self;

    fn lte(self, column: &str, value: &str) -> Self;

    fn not_is_null(self, column: &str) -> Self;

    fn order(self, column: &str, descending: bool) -> Self;

    fn limit(self, count: usize) -> Self;

    fn execute(self) -> Result<Response, BackendError>;
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("table '{0}' does not exist")]
    UnknownTable(String),
    #[error("column '{column}' does not exist in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("cannot compare column '{column}' to '{value}'")]
    TypeMismatch { column: String, value: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("could not start the async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Any of the real backends, picked at runtime based on the context.
#[derive(Clone)]
pub enum Backend {
    Rest(RestClient),
    Memory(MemoryClient),
}

pub enum BackendQuery {
    Rest(RestQuery),
    Memory(MemoryQuery),
}

impl Client for Backend {
    type Query = BackendQuery;

    fn table(&self, name: &str) -> Self::Query {
        match self {
            Backend::Rest(client) => BackendQuery::Rest(client.table(name)),
            Backend::Memory(client) => BackendQuery::Memory(client.table(name)),
        }
    }
}

impl BackendQuery {
    fn map<R, M>(self, rest: R, memory: M) -> Self
    where
        R: FnOnce(RestQuery) -> RestQuery,
        M: FnOnce(MemoryQuery) -> MemoryQuery,
    {
        match self {
            BackendQuery::Rest(query) => BackendQuery::Rest(rest(query)),
            BackendQuery::Memory(query) => BackendQuery::Memory(memory(query)),
        }
    }
}

impl FilterableQuery for BackendQuery {
    fn select(self, columns: &str) -> Self {
        self.map(|q| q.select(columns), |q| q.select(columns))
    }

    fn exact_count(self) -> Self {
        self.map(|q| q.exact_count(), |q| q.exact_count())
    }

    fn eq(self, column: &str, value: &str) -> Self {
        self.map(|q| q.eq(column, value), |q| q.eq(column, value))
    }

    fn gt(self, column: &str, value: &str) -> Self {
        self.map(|q| q.gt(column, value), |q| q.gt(column, value))
    }

    fn gte(self, column: &str, value: &str) -> Self {
        self.map(|q| q.gte(column, value), |q| q.gte(column, value))
    }

    fn lt(self, column: &str, value: &str) -> Self {
        self.map(|q| q.lt(column, value), |q| q.lt(column, value))
    }

    fn lte(self, column: &str, value: &str) -> Self {
        self.map(|q| q.lte(column, value), |q| q.lte(column, value))
    }

    fn not_is_null(self, column: &str) -> Self {
        self.map(|q| q.not_is_null(column), |q| q.not_is_null(column))
    }

    fn order(self, column: &str, descending: bool) -> Self {
        self.map(|q| q.order(column, descending), |q| q.order(column, descending))
    }

    fn limit(self, count: usize) -> Self {
        self.map(|q| q.limit(count), |q| q.limit(count))
    }

    fn execute(self) -> Result<Response, BackendError> {
        match self {
            BackendQuery::Rest(query) => query.execute(),
            BackendQuery::Memory(query) => query.execute(),
        }
    }
}
