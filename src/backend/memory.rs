//! Tables kept in memory.
//!
//! Loaded from a JSON document shaped like `{"table_name": [{"column": value, ...}, ...]}`. Useful
//! for working offline with an export of the real data, and for tests.
//!
//! Filter values arrive as text, the same way they would over REST. They're compared numerically
//! when the stored value is a number, as booleans when it's a boolean, and as text otherwise. ISO
//! dates compare correctly as text.
use crate::backend::{BackendError, Client, FilterableQuery, Response, Row};
use log::debug;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    tables: Arc<HashMap<String, Vec<Row>>>,
}

#[derive(Debug)]
pub struct MemoryQuery {
    table_name: String,
    tables: Arc<HashMap<String, Vec<Row>>>,
    columns: Option<Vec<String>>,
    filters: Vec<Filter>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
    count: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug)]
enum Test {
    NotNull,
    Compare(Operator, String),
}

#[derive(Debug)]
struct Filter {
    column: String,
    test: Test,
}

impl MemoryClient {
    pub fn new(tables: HashMap<String, Vec<Row>>) -> Self {
        MemoryClient {
            tables: Arc::new(tables),
        }
    }

    pub fn from_json(document: Value) -> Result<Self, BackendError> {
        let Value::Object(document) = document else {
            return Err(BackendError::InvalidResponse(
                "expected an object of tables".to_string(),
            ));
        };

        let mut tables = HashMap::new();
        for (name, rows) in document {
            let Value::Array(rows) = rows else {
                return Err(BackendError::InvalidResponse(format!(
                    "table '{name}' is not a list of rows"
                )));
            };

            let rows = rows
                .into_iter()
                .map(|row| match row {
                    Value::Object(row) => Ok(row),
                    _ => Err(BackendError::InvalidResponse(format!(
                        "table '{name}' contains something that is not a row"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;

            tables.insert(name, rows);
        }

        Ok(MemoryClient::new(tables))
    }

    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let document: Value = serde_json::from_reader(fs::File::open(path)?)?;

        Ok(MemoryClient::from_json(document)?)
    }
}

impl Client for MemoryClient {
    type Query = MemoryQuery;

    fn table(&self, name: &str) -> Self::Query {
        MemoryQuery {
            table_name: name.to_string(),
            tables: self.tables.clone(),
            columns: None,
            filters: Vec::new(),
            order: None,
            limit: None,
            count: false,
        }
    }
}

impl MemoryQuery {
    fn filter(mut self, column: &str, test: Test) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            test,
        });

        self
    }

    fn compare(self, column: &str, operator: Operator, value: &str) -> Self {
        self.filter(column, Test::Compare(operator, value.to_string()))
    }

    /// Every column the query mentions has to exist, unless the table has no rows to tell us
    /// what its columns are.
    fn check_columns(&self, rows: &[Row]) -> Result<(), BackendError> {
        let known: HashSet<&str> = rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        if known.is_empty() {
            return Ok(());
        }

        let mentioned = self
            .columns
            .iter()
            .flatten()
            .chain(self.filters.iter().map(|filter| &filter.column))
            .chain(self.order.iter().map(|(column, _)| column));

        for column in mentioned {
            if !known.contains(column.as_str()) {
                return Err(BackendError::UnknownColumn {
                    table: self.table_name.clone(),
                    column: column.clone(),
                });
            }
        }

        Ok(())
    }
}

impl FilterableQuery for MemoryQuery {
    fn select(mut self, columns: &str) -> Self {
        let columns: Vec<String> = columns
            .split(',')
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(str::to_owned)
            .collect();

        self.columns = if columns.iter().any(|column| column == "*") {
            None
        } else {
            Some(columns)
        };

        self
    }

    fn exact_count(mut self) -> Self {
        self.count = true;
        self
    }

    fn eq(self, column: &str, value: &str) -> Self {
        self.compare(column, Operator::Eq, value)
    }

    fn gt(self, column: &str, value: &str) -> Self {
        self.compare(column, Operator::Gt, value)
    }

    fn gte(self, column: &str, value: &str) -> Self {
        self.compare(column, Operator::Gte, value)
    }

    fn lt(self, column: &str, value: &str) -> Self {
        self.compare(column, Operator::Lt, value)
    }

    fn lte(self, column: &str, value: &str) -> Self {
        self.compare(column, Operator::Lte, value)
    }

    fn not_is_null(self, column: &str) -> Self {
        self.filter(column, Test::NotNull)
    }

    fn order(mut self, column: &str, descending: bool) -> Self {
        self.order = Some((column.to_string(), descending));
        self
    }

    fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    fn execute(self) -> Result<Response, BackendError> {
        let rows = self
            .tables
            .get(&self.table_name)
            .ok_or_else(|| BackendError::UnknownTable(self.table_name.clone()))?;

        self.check_columns(rows)?;

        let mut matching = Vec::new();
        for row in rows {
            if self.matches(row)? {
                matching.push(row);
            }
        }
        debug!(
            "{} of {} rows in '{}' match",
            matching.len(),
            rows.len(),
            self.table_name
        );

        if let Some((column, descending)) = &self.order {
            matching.sort_by(|a, b| {
                let ordering = compare_cells(cell(a, column), cell(b, column));

                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let count = self.count.then_some(matching.len() as u64);
        let data = matching
            .into_iter()
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|row| self.project(row))
            .collect();

        Ok(Response { data, count })
    }
}

impl MemoryQuery {
    fn matches(&self, row: &Row) -> Result<bool, BackendError> {
        for filter in &self.filters {
            let value = cell(row, &filter.column);

            let accepted = match &filter.test {
                Test::NotNull => !value.is_null(),
                Test::Compare(operator, text) => match compare_to_text(value, text) {
                    Comparable::Ordered(ordering) => operator.accepts(ordering),
                    Comparable::Incomparable => false,
                    Comparable::Mismatch => {
                        return Err(BackendError::TypeMismatch {
                            column: filter.column.clone(),
                            value: text.clone(),
                        })
                    }
                },
            };

            if !accepted {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn project(&self, row: &Row) -> Row {
        match &self.columns {
            None => row.clone(),
            Some(columns) => columns
                .iter()
                .map(|column| (column.clone(), cell(row, column).clone()))
                .collect(),
        }
    }
}

impl Operator {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Gte => ordering != Ordering::Less,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Lte => ordering != Ordering::Greater,
        }
    }
}

enum Comparable {
    Ordered(Ordering),
    /// NULL never matches anything.
    Incomparable,
    Mismatch,
}

fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    static NULL: Value = Value::Null;

    row.get(column).unwrap_or(&NULL)
}

fn compare_to_text(value: &Value, text: &str) -> Comparable {
    match value {
        Value::Null => Comparable::Incomparable,
        Value::Number(number) => match (number.as_f64(), text.trim().parse::<f64>()) {
            (Some(left), Ok(right)) => left
                .partial_cmp(&right)
                .map_or(Comparable::Incomparable, Comparable::Ordered),
            _ => Comparable::Mismatch,
        },
        Value::Bool(boolean) => match text.trim().to_ascii_lowercase().parse::<bool>() {
            Ok(other) => Comparable::Ordered(boolean.cmp(&other)),
            Err(_) => Comparable::Mismatch,
        },
        Value::String(string) => Comparable::Ordered(string.as_str().cmp(text)),
        other => Comparable::Ordered(other.to_string().as_str().cmp(text)),
    }
}

/// Sorting order for cells: NULLs sort after everything else, numbers compare numerically, and
/// values of different types are grouped by type.
fn compare_cells(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Array(_) | Value::Object(_) => 3,
            Value::Null => 4,
        }
    }

    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}
