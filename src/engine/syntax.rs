//! SQL-like query parsing
//!
//! The queries we get look like this:
//! ```text
//!     SELECT speler, datum FROM gps_data WHERE speler = 'Jan' AND datum >= ? ORDER BY datum DESC LIMIT 10
//! ```
//! This is not a SQL parser. Every clause is found with a regex, and only the WHERE clause gets
//! broken down further, into conditions joined by AND. Anything outside of that subset is either
//! ignored or dropped, and reported as a failure.
//!
//! Supported subset:
//!  - `SELECT <anything> FROM <identifier>`
//!  - `WHERE <condition> [AND <condition>]...` where a condition is one of
//!    `col = v`, `col > v`, `col >= v`, `col < v`, `col <= v`, `col IS NOT NULL`
//!  - `ORDER BY <identifier> [ASC|DESC]`
//!  - `LIMIT <integer>`
//!
//! Values can be quoted literals, bare literals, `?` or `:name` placeholders.
//!
//! If this ever needs to grow, the whole module can be swapped for a real parser as long as it keeps
//! producing [ParsedClauses].
mod conditions;

pub use conditions::{parse_condition, split_conditions};

use conditions::without_quoted;

use crate::engine::failures::{Failures, UnsupportedConstruct};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

static FROM_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bFROM\s+([A-Za-z_][\w.]*)").expect("valid regex"));
static SELECT_COLUMNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bSELECT\s+(.*?)\s+FROM\b").expect("valid regex"));
static WHERE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)\bWHERE\s+(.*?)\s*(?:\bGROUP\s+BY\b|\bHAVING\b|\bUNION\b|\bORDER\s+BY\b|\bLIMIT\b|;\s*\z|\z)",
    )
    .expect("valid regex")
});
static ORDER_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bORDER\s+BY\s+([A-Za-z_][\w.]*)(?:\s+(ASC|DESC)\b)?").expect("valid regex")
});
static LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)\b").expect("valid regex"));
static UNSUPPORTED_CLAUSES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(JOIN|GROUP\s+BY|HAVING|UNION)\b").expect("valid regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// The value side of a condition, as it was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// `'Jan'`, `"Jan"` or `18`. Always kept as text, quotes removed.
    Literal(String),
    /// `?`
    Positional,
    /// `:name`
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    GreaterThan,
    GreaterOrEqual,
    LesserThan,
    LesserOrEqual,
}

/// A single test from a WHERE clause.
///
/// Parsing produces `Condition<Operand>`, binding parameters turns those into `Condition<String>`,
/// which is what gets sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition<V = String> {
    Equality {
        column: String,
        value: V,
    },
    Comparison {
        column: String,
        comparison: Comparison,
        value: V,
    },
    NotNull {
        column: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClauses<V = String> {
    /// Missing when there's no FROM. Flows that pin their own table don't care.
    pub table: Option<String>,
    pub columns: String,
    pub conditions: Vec<Condition<V>>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

/// Breaks a query into its clauses.
///
/// This never fails. Conditions that can't be understood are dropped and reported to `failures`,
/// and everything else falls back to the most permissive option: all columns, no filters, no
/// ordering and no limit.
pub fn parse_query(input: &str, failures: &mut Failures) -> ParsedClauses<Operand> {
    let unquoted = without_quoted(input);
    for unsupported in UNSUPPORTED_CLAUSES.captures_iter(&unquoted) {
        let clause = WHITESPACE.replace_all(&unsupported[1], " ").to_uppercase();

        failures.report(UnsupportedConstruct::Clause(clause));
    }

    let conditions = match extract_where(input) {
        None => Vec::new(),
        Some(where_clause) => match split_conditions(where_clause) {
            Ok(parts) => parts
                .into_iter()
                .filter_map(|part| match parse_condition(part) {
                    Ok(condition) => Some(condition),
                    Err(failure) => {
                        failures.report(failure);
                        None
                    }
                })
                .collect(),
            Err(failure) => {
                failures.report(failure);
                Vec::new()
            }
        },
    };

    ParsedClauses {
        table: extract_table(input).map(str::to_owned),
        columns: extract_columns(input),
        conditions,
        order: extract_order(input),
        limit: extract_limit(input),
    }
}

pub fn extract_table(input: &str) -> Option<&str> {
    FROM_TABLE
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map(|table| table.as_str())
}

/// Whatever sits between SELECT and FROM, or `*`.
///
/// The columns are not validated in any way, the backend will complain if they're wrong.
pub fn extract_columns(input: &str) -> String {
    let columns = SELECT_COLUMNS
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map(|columns| WHITESPACE.replace_all(columns.as_str().trim(), " ").into_owned())
        .unwrap_or_default();

    if columns.is_empty() {
        "*".to_string()
    } else {
        columns
    }
}

/// Whatever comes after WHERE, up to GROUP BY, HAVING, UNION, ORDER BY, LIMIT or the end of the
/// query.
///
/// Unlike [split_conditions], this does not know about quotes. A quoted value containing
/// "LIMIT" will cut the clause short.
pub fn extract_where(input: &str) -> Option<&str> {
    WHERE_CLAUSE
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map(|clause| clause.as_str().trim())
        .filter(|clause| !clause.is_empty())
}

pub fn extract_order(input: &str) -> Option<Order> {
    let captures = ORDER_BY.captures(input)?;
    let descending = captures
        .get(2)
        .map(|direction| direction.as_str().eq_ignore_ascii_case("DESC"))
        .unwrap_or(false);

    Some(Order {
        column: captures[1].to_string(),
        descending,
    })
}

pub fn extract_limit(input: &str) -> Option<usize> {
    LIMIT
        .captures(input)
        .and_then(|captures| captures[1].parse().ok())
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LesserThan => "<",
            Comparison::LesserOrEqual => "<=",
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl<V> Condition<V> {
    pub fn column(&self) -> &str {
        match self {
            Condition::Equality { column, .. }
            | Condition::Comparison { column, .. }
            | Condition::NotNull { column } => column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::failures::Failure;

    #[test]
    fn test_extract_table() {
        let examples = vec![
            ("SELECT * FROM gps_data", Some("gps_data")),
            ("select * from gps_data where speler = 'x'", Some("gps_data")),
            ("SELECT *\nFROM\n  public.gps_data LIMIT 4", Some("public.gps_data")),
            ("SELECT FROM", None),
            ("SELECT 1", None),
        ];

        for (input, expected) in examples {
            assert_eq!(expected, extract_table(input), "Parsing: {}", input);
        }
    }

    #[test]
    fn test_extract_columns() {
        assert_eq!(
            "speler, datum",
            extract_columns("SELECT speler, datum FROM gps_data WHERE speler = 'Jan'")
        );
        assert_eq!(
            "speler, datum, afstand",
            extract_columns("SELECT speler,\n       datum,   afstand\nFROM gps_data")
        );
        assert_eq!("*", extract_columns("SELECT * FROM gps_data"));
        assert_eq!("*", extract_columns("gps_data"));
        assert_eq!("*", extract_columns("SELECT  FROM gps_data"));
    }

    #[test]
    fn test_extract_where() {
        let examples = vec![
            (
                "SELECT * FROM t WHERE speler = 'Jan' ORDER BY datum",
                Some("speler = 'Jan'"),
            ),
            ("SELECT * FROM t WHERE a = 1 LIMIT 5", Some("a = 1")),
            ("SELECT * FROM t where a = 1 and b = 2", Some("a = 1 and b = 2")),
            ("SELECT * FROM t WHERE a = 1;", Some("a = 1")),
            ("SELECT * FROM t WHERE a = 1\n  AND b = 2\n", Some("a = 1\n  AND b = 2")),
            (
                "SELECT * FROM t WHERE speler = 'Jan' GROUP BY speler HAVING count(*) > 1",
                Some("speler = 'Jan'"),
            ),
            ("SELECT * FROM t WHERE a = 1 HAVING a > 0", Some("a = 1")),
            ("SELECT * FROM t ORDER BY a", None),
            ("SELECT * FROM t WHERE LIMIT 3", None),
        ];

        for (input, expected) in examples {
            assert_eq!(expected, extract_where(input), "Parsing: {}", input);
        }
    }

    #[test]
    fn test_where_stops_at_keywords_inside_quotes() {
        // known limitation, the clause is cut before the quoted LIMIT
        assert_eq!(
            Some("notitie = 'NO"),
            extract_where("SELECT * FROM t WHERE notitie = 'NO LIMIT'")
        );
    }

    #[test]
    fn test_extract_order() {
        assert_eq!(
            Some(Order {
                column: "datum".to_string(),
                descending: true
            }),
            extract_order("SELECT * FROM t ORDER BY datum DESC LIMIT 10")
        );
        assert_eq!(
            Some(Order {
                column: "datum".to_string(),
                descending: false
            }),
            extract_order("SELECT * FROM t order by datum")
        );
        assert_eq!(
            Some(Order {
                column: "datum".to_string(),
                descending: false
            }),
            extract_order("SELECT * FROM t ORDER BY datum asc")
        );
        assert_eq!(None, extract_order("SELECT * FROM t"));
    }

    #[test]
    fn test_extract_limit() {
        assert_eq!(Some(50), extract_limit("SELECT * FROM t LIMIT 50"));
        assert_eq!(Some(0), extract_limit("SELECT * FROM t limit 0"));
        assert_eq!(None, extract_limit("SELECT * FROM t"));
        assert_eq!(None, extract_limit("SELECT * FROM t LIMIT ten"));
    }

    #[test]
    fn test_parse_query() {
        let mut failures = Failures::default();
        let parsed = parse_query(
            "SELECT * FROM gps_data WHERE speler = 'Jan' AND datum >= '2025-07-01' ORDER BY datum DESC LIMIT 10",
            &mut failures,
        );

        assert!(failures.is_empty());
        assert_eq!(Some("gps_data"), parsed.table.as_deref());
        assert_eq!("*", parsed.columns);
        assert_eq!(
            vec![
                Condition::Equality {
                    column: "speler".to_string(),
                    value: Operand::Literal("Jan".to_string()),
                },
                Condition::Comparison {
                    column: "datum".to_string(),
                    comparison: Comparison::GreaterOrEqual,
                    value: Operand::Literal("2025-07-01".to_string()),
                },
            ],
            parsed.conditions
        );
        assert_eq!(Some(10), parsed.limit);
        assert!(parsed.order.unwrap().descending);
    }

    #[test]
    fn test_parse_query_reports_dropped_parts() {
        let mut failures = Failures::default();
        let parsed = parse_query(
            "SELECT * FROM a JOIN b ON a.id = b.a_id WHERE a.x = 1 AND (a.y = 2 OR a.y = 3) GROUP BY a.x",
            &mut failures,
        );

        let failures: Vec<_> = failures.into();
        assert_eq!(3, failures.len());
        assert_eq!(1, parsed.conditions.len());
        assert_eq!("a.x", parsed.conditions[0].column());
    }

    #[test]
    fn test_quoted_keywords_are_not_clauses() {
        let mut failures = Failures::default();
        let parsed = parse_query(
            "SELECT * FROM clubs WHERE naam = 'Union Berlin' AND straat = \"Join Street\"",
            &mut failures,
        );

        assert!(failures.is_empty());
        assert_eq!(2, parsed.conditions.len());
    }

    #[test]
    fn test_group_by_is_ignored() {
        let mut failures = Failures::default();
        let parsed = parse_query(
            "SELECT * FROM gps_data WHERE speler = 'Jan' GROUP BY speler",
            &mut failures,
        );

        let failures: Vec<_> = failures.into();
        assert!(matches!(
            &failures[..],
            [Failure::Unsupported(UnsupportedConstruct::Clause(clause))] if clause == "GROUP BY"
        ));
        assert_eq!(
            vec![Condition::Equality {
                column: "speler".to_string(),
                value: Operand::Literal("Jan".to_string()),
            }],
            parsed.conditions
        );
    }

    #[test]
    fn test_malformed_query_degrades() {
        let mut failures = Failures::default();
        let parsed = parse_query("SELECT FROM", &mut failures);

        assert_eq!(None, parsed.table);
        assert_eq!("*", parsed.columns);
        assert!(parsed.conditions.is_empty());
        assert_eq!(None, parsed.order);
        assert_eq!(None, parsed.limit);
    }

    #[test]
    fn test_unterminated_quote_drops_where() {
        let mut failures = Failures::default();
        let parsed = parse_query("SELECT * FROM t WHERE a = 'open AND b = 2", &mut failures);

        assert!(parsed.conditions.is_empty());
        assert!(!failures.is_empty());
    }
}
