pub mod backend;
pub mod cache;
pub mod context;
mod engine;
mod error;

pub use engine::binding::Params;
pub use engine::failures::{Failure, Failures, ParseFailure, UnsupportedConstruct};
pub use engine::rendering::{render_calls, render_rows};
pub use engine::{count, explain, run, select, select_from, Explanation, Flow, QueryOutcome};

/// The query parser on its own, for when you want the clauses but not a backend.
pub mod syntax {
    pub use crate::engine::syntax::{
        extract_columns, extract_limit, extract_order, extract_table, extract_where,
        parse_condition, parse_query, split_conditions, Comparison, Condition, Operand, Order,
        ParsedClauses,
    };
}

pub use error::{Error, ErrorKind, InternalError};
