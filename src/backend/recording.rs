//! A backend that only remembers what it was asked to do.
use crate::backend::{BackendError, Client, FilterableQuery, Response};
use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Table(String),
    Select(String),
    ExactCount,
    Eq(String, String),
    Gt(String, String),
    Gte(String, String),
    Lt(String, String),
    Lte(String, String),
    NotIsNull(String),
    Order { column: String, descending: bool },
    Limit(usize),
    Execute,
}

/// Every query handed out by the same client writes to the same call log.
#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    calls: Rc<RefCell<Vec<Call>>>,
    response: Response,
}

pub struct RecordingQuery {
    calls: Rc<RefCell<Vec<Call>>>,
    response: Response,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every executed query will answer with `response`.
    pub fn returning(response: Response) -> Self {
        RecordingClient {
            calls: Rc::default(),
            response,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl Client for RecordingClient {
    type Query = RecordingQuery;

    fn table(&self, name: &str) -> Self::Query {
        self.calls.borrow_mut().push(Call::Table(name.to_string()));

        RecordingQuery {
            calls: self.calls.clone(),
            response: self.response.clone(),
        }
    }
}

impl RecordingQuery {
    fn record(self, call: Call) -> Self {
        self.calls.borrow_mut().push(call);
        self
    }
}

impl FilterableQuery for RecordingQuery {
    fn select(self, columns: &str) -> Self {
        self.record(Call::Select(columns.to_string()))
    }

    fn exact_count(self) -> Self {
        self.record(Call::ExactCount)
    }

    fn eq(self, column: &str, value: &str) -> Self {
        self.record(Call::Eq(column.to_string(), value.to_string()))
    }

    fn gt(self, column: &str, value: &str) -> Self {
        self.record(Call::Gt(column.to_string(), value.to_string()))
    }

    fn gte(self, column: &str, value: &str) -> Self {
        self.record(Call::Gte(column.to_string(), value.to_string()))
    }

    fn lt(self, column: &str, value: &str) -> Self {
        self.record(Call::Lt(column.to_string(), value.to_string()))
    }

    fn lte(self, column: &str, value: &str) -> Self {
        self.record(Call::Lte(column.to_string(), value.to_string()))
    }

    fn not_is_null(self, column: &str) -> Self {
        self.record(Call::NotIsNull(column.to_string()))
    }

    fn order(self, column: &str, descending: bool) -> Self {
        self.record(Call::Order {
            column: column.to_string(),
            descending,
        })
    }

    fn limit(self, count: usize) -> Self {
        self.record(Call::Limit(count))
    }

    fn execute(self) -> Result<Response, BackendError> {
        let query = self.record(Call::Execute);

        Ok(query.response)
    }
}

/// Renders calls the way they'd look in a builder chain: `.eq("speler", "Jan")`.
impl Display for Call {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Call::Table(name) => write!(f, "table({name:?})"),
            Call::Select(columns) => write!(f, ".select({columns:?})"),
            Call::ExactCount => write!(f, ".exact_count()"),
            Call::Eq(column, value) => write!(f, ".eq({column:?}, {value:?})"),
            Call::Gt(column, value) => write!(f, ".gt({column:?}, {value:?})"),
            Call::Gte(column, value) => write!(f, ".gte({column:?}, {value:?})"),
            Call::Lt(column, value) => write!(f, ".lt({column:?}, {value:?})"),
            Call::Lte(column, value) => write!(f, ".lte({column:?}, {value:?})"),
            Call::NotIsNull(column) => write!(f, ".not_is_null({column:?})"),
            Call::Order { column, descending } => {
                write!(f, ".order({column:?}, descending={descending})")
            }
            Call::Limit(count) => write!(f, ".limit({count})"),
            Call::Execute => write!(f, ".execute()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let client = RecordingClient::new();
        client
            .table("gps_data")
            .select("*")
            .eq("speler", "Jan")
            .limit(3)
            .execute()
            .unwrap();

        assert_eq!(
            vec![
                Call::Table("gps_data".to_string()),
                Call::Select("*".to_string()),
                Call::Eq("speler".to_string(), "Jan".to_string()),
                Call::Limit(3),
                Call::Execute,
            ],
            client.calls()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ".gte(\"datum\", \"2025-07-01\")",
            Call::Gte("datum".to_string(), "2025-07-01".to_string()).to_string()
        );
        assert_eq!(
            ".order(\"datum\", descending=true)",
            Call::Order {
                column: "datum".to_string(),
                descending: true
            }
            .to_string()
        );
    }
}
