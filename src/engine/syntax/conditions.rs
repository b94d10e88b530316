//! Breaking WHERE clauses into conditions.
//!
//! Everything in here has to know about quotes. A value like `'Barry AND Co'` must not be split
//! into two conditions, and `'a>b'` must not be mistaken for a comparison.
use crate::engine::failures::{Failure, ParseFailure, UnsupportedConstruct};
use crate::engine::syntax::{Comparison, Condition, Operand};
use once_cell::sync::Lazy;
use regex::Regex;

static IS_NOT_NULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^(.*?)\s+IS\s+NOT\s+NULL$").expect("valid regex"));
static NAMED_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:([A-Za-z_]\w*)$").expect("valid regex"));

/// Operators are tried in this order. Two character operators have to come first, otherwise
/// `a >= 1` would be read as `a > '= 1'`.
const OPERATORS: [(&str, Option<Comparison>); 5] = [
    (">=", Some(Comparison::GreaterOrEqual)),
    ("<=", Some(Comparison::LesserOrEqual)),
    (">", Some(Comparison::GreaterThan)),
    ("<", Some(Comparison::LesserThan)),
    ("=", None),
];

/// Splits a WHERE clause on the AND keyword, ignoring ANDs inside quoted values.
pub fn split_conditions(where_clause: &str) -> Result<Vec<&str>, ParseFailure> {
    let mut conditions = Vec::new();
    let mut start = 0;
    let mut scanner = Unquoted::new(where_clause);

    while let Some((index, _)) = scanner.next() {
        if is_keyword_at(where_clause, index, "AND") {
            conditions.push(where_clause[start..index].trim());
            start = index + "AND".len();
        }
    }

    if scanner.in_quotes() {
        return Err(ParseFailure::UnterminatedQuote {
            clause: where_clause.to_string(),
        });
    }

    conditions.push(where_clause[start..].trim());
    conditions.retain(|condition| !condition.is_empty());

    Ok(conditions)
}

/// The text with every quoted value, quotes included, collapsed into a single space.
pub fn without_quoted(text: &str) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut next = 0;

    for (index, character) in Unquoted::new(text) {
        if index > next {
            kept.push(' ');
        }

        kept.push(character);
        next = index + character.len_utf8();
    }

    kept
}

/// Turns `speler = 'Jan'` into `Equality(speler, Jan)`.
///
/// `IS NOT NULL` is checked first, then operators in the order of [OPERATORS]. The column and
/// value are split on the first occurrence of the operator that is not inside quotes.
pub fn parse_condition(condition: &str) -> Result<Condition<Operand>, Failure> {
    let condition = condition.trim();

    check_supported(condition)?;

    if let Some(captures) = IS_NOT_NULL.captures(condition) {
        let column = captures[1].trim();
        if column.is_empty() {
            return Err(missing_column(condition));
        }

        return Ok(Condition::NotNull {
            column: column.to_string(),
        });
    }

    for (symbol, comparison) in OPERATORS {
        let Some(index) = find_unquoted(condition, symbol) else {
            continue;
        };

        let column = condition[..index].trim();
        if column.is_empty() {
            return Err(missing_column(condition));
        }

        let column = column.to_string();
        let value = parse_operand(&condition[index + symbol.len()..]);

        return Ok(match comparison {
            None => Condition::Equality { column, value },
            Some(comparison) => Condition::Comparison {
                column,
                comparison,
                value,
            },
        });
    }

    Err(ParseFailure::NoOperator {
        condition: condition.to_string(),
    }
    .into())
}

fn check_supported(text: &str) -> Result<(), UnsupportedConstruct> {
    let condition = || text.to_string();

    for (index, character) in Unquoted::new(text) {
        if character == '(' || character == ')' {
            return Err(UnsupportedConstruct::Grouping {
                condition: condition(),
            });
        }

        if text[index..].starts_with("<>") || text[index..].starts_with("!=") {
            return Err(UnsupportedConstruct::NotEqual {
                condition: condition(),
            });
        }

        if is_keyword_at(text, index, "OR") {
            return Err(UnsupportedConstruct::Disjunction {
                condition: condition(),
            });
        }
    }

    Ok(())
}

fn parse_operand(raw: &str) -> Operand {
    let raw = raw.trim();

    if raw == "?" {
        return Operand::Positional;
    }

    if let Some(captures) = NAMED_PLACEHOLDER.captures(raw) {
        return Operand::Named(captures[1].to_string());
    }

    Operand::Literal(strip_quotes(raw).to_string())
}

/// Removes one layer of matching single or double quotes.
fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }

    value
}

fn missing_column(condition: &str) -> Failure {
    ParseFailure::MissingColumn {
        condition: condition.to_string(),
    }
    .into()
}

fn find_unquoted(haystack: &str, needle: &str) -> Option<usize> {
    Unquoted::new(haystack)
        .map(|(index, _)| index)
        .find(|index| haystack[*index..].starts_with(needle))
}

/// True if `keyword` starts at `index` as a whole word, surrounded by whitespace.
fn is_keyword_at(text: &str, index: usize, keyword: &str) -> bool {
    let Some(candidate) = text.get(index..index + keyword.len()) else {
        return false;
    };

    let preceded_by_space = text[..index]
        .chars()
        .next_back()
        .map_or(false, char::is_whitespace);
    let followed_by_space = text[index + keyword.len()..]
        .chars()
        .next()
        .map_or(false, char::is_whitespace);

    candidate.eq_ignore_ascii_case(keyword) && preceded_by_space && followed_by_space
}

/// Iterates over the characters that are not part of a quoted value.
///
/// Quote characters themselves are skipped. Inside quotes, a backslash escapes the next character,
/// so `'it\'s'` is a single quoted value.
struct Unquoted<'a> {
    chars: std::str::CharIndices<'a>,
    open_quote: Option<char>,
}

impl<'a> Unquoted<'a> {
    fn new(text: &'a str) -> Self {
        Unquoted {
            chars: text.char_indices(),
            open_quote: None,
        }
    }

    fn in_quotes(&self) -> bool {
        self.open_quote.is_some()
    }
}

impl Iterator for Unquoted<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, character) = self.chars.next()?;

            match self.open_quote {
                Some(_) if character == '\\' => {
                    self.chars.next();
                }
                Some(quote) if character == quote => self.open_quote = None,
                Some(_) => {}
                None if character == '\'' || character == '"' => {
                    self.open_quote = Some(character)
                }
                None => return Some((index, character)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(value: &str) -> Operand {
        Operand::Literal(value.to_string())
    }

    #[test]
    fn test_without_quoted() {
        assert_eq!(
            "naam =   AND b = 1",
            without_quoted("naam = 'Union Berlin' AND b = 1")
        );
        assert_eq!("a = ", without_quoted(r#"a = "it\"s JOIN""#));
        assert_eq!("no quotes", without_quoted("no quotes"));
    }

    #[test]
    fn test_split_conditions() {
        assert_eq!(
            vec!["speler = 'Jan'", "datum >= '2025-07-01'", "afstand IS NOT NULL"],
            split_conditions("speler = 'Jan' AND datum >= '2025-07-01' AND afstand IS NOT NULL")
                .unwrap()
        );
        assert_eq!(vec!["a = 1", "b = 2"], split_conditions("a = 1 and b = 2").unwrap());
        assert_eq!(vec!["a = 1", "b = 2"], split_conditions("a = 1\n\tAND\nb = 2").unwrap());
        assert_eq!(vec!["a = 1"], split_conditions("a = 1").unwrap());
    }

    #[test]
    fn test_split_matches_naive_split_without_quotes() {
        let naive = Regex::new(r"(?i)\s+AND\s+").unwrap();
        let examples = [
            "a = 1",
            "a = 1 AND b = 2",
            "band = 3 AND brand > 4",
            "sprint_count >= 10 AND and_or = 1 and x IS NOT NULL",
        ];

        for example in examples {
            let expected: Vec<_> = naive.split(example).map(str::trim).collect();

            assert_eq!(expected, split_conditions(example).unwrap(), "Splitting: {}", example);
        }
    }

    #[test]
    fn test_split_ignores_quoted_and() {
        assert_eq!(
            vec!["speler = 'Barry AND Co'"],
            split_conditions("speler = 'Barry AND Co'").unwrap()
        );
        assert_eq!(
            vec!["speler = \"Barry AND Co\"", "team = 'A'"],
            split_conditions("speler = \"Barry AND Co\" AND team = 'A'").unwrap()
        );
        assert_eq!(
            vec!["speler = 'Barry\\' AND Co'"],
            split_conditions("speler = 'Barry\\' AND Co'").unwrap()
        );
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert!(matches!(
            split_conditions("speler = 'Barry AND team = 2"),
            Err(ParseFailure::UnterminatedQuote { .. })
        ));
    }

    #[test]
    fn test_operator_priority() {
        let examples = vec![
            ("leeftijd >= '18'", "leeftijd", Comparison::GreaterOrEqual, "18"),
            ("leeftijd <= 18", "leeftijd", Comparison::LesserOrEqual, "18"),
            ("leeftijd > 18", "leeftijd", Comparison::GreaterThan, "18"),
            ("leeftijd<18", "leeftijd", Comparison::LesserThan, "18"),
            ("datum >= \"2025-07-01\"", "datum", Comparison::GreaterOrEqual, "2025-07-01"),
        ];

        for (input, column, comparison, value) in examples {
            assert_eq!(
                Condition::Comparison {
                    column: column.to_string(),
                    comparison,
                    value: literal(value),
                },
                parse_condition(input).unwrap(),
                "Parsing: {}",
                input
            );
        }
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            Condition::Equality {
                column: "speler".to_string(),
                value: literal("Jan"),
            },
            parse_condition("  speler   =  'Jan' ").unwrap()
        );
        assert_eq!(
            Condition::Equality {
                column: "opmerking".to_string(),
                value: literal("a = b"),
            },
            parse_condition("opmerking = 'a = b'").unwrap()
        );
        assert_eq!(
            Condition::Equality {
                column: "doelpunten".to_string(),
                value: literal("3"),
            },
            parse_condition("doelpunten = 3").unwrap()
        );
    }

    #[test]
    fn test_operators_inside_quotes_are_ignored() {
        assert_eq!(
            Condition::Equality {
                column: "opmerking".to_string(),
                value: literal("a>b"),
            },
            parse_condition("opmerking = 'a>b'").unwrap()
        );
    }

    #[test]
    fn test_only_one_layer_of_quotes_is_stripped() {
        assert_eq!(
            Condition::Equality {
                column: "speler".to_string(),
                value: literal("'Jan'"),
            },
            parse_condition("speler = ''Jan''").unwrap()
        );
    }

    #[test]
    fn test_not_null() {
        assert_eq!(
            Condition::NotNull {
                column: "afstand".to_string()
            },
            parse_condition("afstand IS NOT NULL").unwrap()
        );
        assert_eq!(
            Condition::NotNull {
                column: "afstand".to_string()
            },
            parse_condition("afstand is not null").unwrap()
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            Condition::Equality {
                column: "speler".to_string(),
                value: Operand::Positional,
            },
            parse_condition("speler = ?").unwrap()
        );
        assert_eq!(
            Condition::Equality {
                column: "speler".to_string(),
                value: Operand::Named("naam".to_string()),
            },
            parse_condition("speler = :naam").unwrap()
        );
        assert_eq!(
            Condition::Equality {
                column: "speler".to_string(),
                value: literal("?"),
            },
            parse_condition("speler = '?'").unwrap()
        );
    }

    #[test]
    fn test_failures() {
        assert!(matches!(
            parse_condition("speler LIKE 'J%'"),
            Err(Failure::Parse(ParseFailure::NoOperator { .. }))
        ));
        assert!(matches!(
            parse_condition("= 'Jan'"),
            Err(Failure::Parse(ParseFailure::MissingColumn { .. }))
        ));
        assert!(matches!(
            parse_condition("speler = 'Jan' OR speler = 'Piet'"),
            Err(Failure::Unsupported(UnsupportedConstruct::Disjunction { .. }))
        ));
        assert!(matches!(
            parse_condition("(speler = 'Jan')"),
            Err(Failure::Unsupported(UnsupportedConstruct::Grouping { .. }))
        ));
        assert!(matches!(
            parse_condition("speler <> 'Jan'"),
            Err(Failure::Unsupported(UnsupportedConstruct::NotEqual { .. }))
        ));
        assert!(matches!(
            parse_condition("speler != 'Jan'"),
            Err(Failure::Unsupported(UnsupportedConstruct::NotEqual { .. }))
        ));
    }

    #[test]
    fn test_or_inside_quotes_is_a_value() {
        assert_eq!(
            Condition::Equality {
                column: "club".to_string(),
                value: literal("Oranje OR Rood (B)"),
            },
            parse_condition("club = 'Oranje OR Rood (B)'").unwrap()
        );
    }
}
