pub mod binding;
pub mod failures;
mod filters;
pub mod rendering;
pub mod syntax;


use crate::backend::recording::{Call, RecordingClient};
use crate::backend::{Client, FilterableQuery, Response, Row};
use crate::engine::binding::Params;
use crate::engine::failures::{Failure, Failures, ParseFailure};
use crate::engine::syntax::parse_query;
use log::info;
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// The three ways the dashboard asks for data. They only differ in where the table comes from and
/// in the shape of the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Table from the FROM clause, rows as the backend returns them.
    Select,
    /// Always this table, whatever the FROM clause says.
    SelectFrom(String),
    /// Table from the FROM clause, a single `{"count": n}` row.
    Count,
}

/// The result of running a query.
///
/// When anything went wrong badly enough to not have results, `rows` is empty. An empty `rows` can
/// also just mean nothing matched; check `failures` to tell them apart.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub rows: Vec<Row>,
    pub failures: Vec<Failure>,
}

/// What a query would do, without doing it.
#[derive(Debug, Clone)]
pub struct Explanation {
    pub calls: Vec<Call>,
    pub failures: Vec<Failure>,
}

pub fn select<C: Client>(client: &C, input: &str, params: &Params) -> QueryOutcome {
    run(client, &Flow::Select, input, params)
}

pub fn select_from<C: Client>(client: &C, table: &str, input: &str, params: &Params) -> QueryOutcome {
    run(client, &Flow::SelectFrom(table.to_string()), input, params)
}

pub fn count<C: Client>(client: &C, input: &str, params: &Params) -> QueryOutcome {
    run(client, &Flow::Count, input, params)
}

/// Translates `input` into backend calls and runs them.
///
/// This never fails. Whatever goes wrong ends up in [QueryOutcome::failures], and is logged.
pub fn run<C: Client>(client: &C, flow: &Flow, input: &str, params: &Params) -> QueryOutcome {
    info!("Running {} query: {}", flow, input);

    let mut failures = Failures::default();
    let parsed = parse_query(input, &mut failures);

    let Some(table) = flow.table(parsed.table.as_deref()) else {
        failures.report(ParseFailure::MissingTable {
            input: input.to_string(),
        });

        return QueryOutcome::failed(failures);
    };

    let clauses = parsed.bind(params, &mut failures);

    let response = match flow {
        Flow::Count => {
            let clauses = syntax::ParsedClauses {
                columns: "*".to_string(),
                ..clauses
            };

            filters::apply(client.table(&table).exact_count(), &clauses).execute()
        }
        Flow::Select | Flow::SelectFrom(_) => {
            filters::apply(client.table(&table), &clauses).execute()
        }
    };

    match response {
        Ok(response) => {
            info!("Query returned {} rows", response.data.len());

            QueryOutcome {
                rows: flow.shape(response),
                failures: failures.into(),
            }
        }
        Err(error) => {
            failures.report(error);

            QueryOutcome::failed(failures)
        }
    }
}

/// Lists the backend calls `input` translates to.
pub fn explain(flow: &Flow, input: &str, params: &Params) -> Explanation {
    let recorder = RecordingClient::new();
    let outcome = run(&recorder, flow, input, params);

    Explanation {
        calls: recorder.calls(),
        failures: outcome.failures,
    }
}

impl Flow {
    fn table(&self, from_clause: Option<&str>) -> Option<String> {
        match self {
            Flow::SelectFrom(table) => Some(table.clone()),
            Flow::Select | Flow::Count => from_clause.map(str::to_owned),
        }
    }

    fn shape(&self, response: Response) -> Vec<Row> {
        match self {
            Flow::Count => {
                // Backends that can't count still return rows, so fall back to those.
                let count = response
                    .count
                    .unwrap_or(response.data.len() as u64);

                let mut row = Row::new();
                row.insert("count".to_string(), Value::from(count));

                vec![row]
            }
            Flow::Select | Flow::SelectFrom(_) => response.data,
        }
    }
}

impl Display for Flow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Flow::Select => write!(f, "select"),
            Flow::SelectFrom(table) => write!(f, "select from {table}"),
            Flow::Count => write!(f, "count"),
        }
    }
}

impl QueryOutcome {
    fn failed(failures: Failures) -> Self {
        QueryOutcome {
            rows: Vec::new(),
            failures: failures.into(),
        }
    }

    pub fn has_backend_failure(&self) -> bool {
        self.failures.iter().any(Failure::is_backend)
    }
}
