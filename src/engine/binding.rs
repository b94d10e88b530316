//! Replacing placeholders with parameter values.
//!
//! Only `column = ?` and `column = :name` take parameters. A placeholder anywhere else is dropped
//! without consuming anything, so the remaining `?`s still line up with the parameters that were
//! meant for them.
use crate::engine::failures::{Failures, ParseFailure, UnsupportedConstruct};
use crate::engine::syntax::{Condition, Operand, ParsedClauses};
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Params {
    #[default]
    None,
    /// Values for `?`, consumed left to right.
    Positional(Vec<String>),
    /// Values for `:name`.
    Named(BTreeMap<String, String>),
}

impl Params {
    pub fn positional<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Params::Named(
            values
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    fn get(&self, name: &str) -> Option<&String> {
        match self {
            Params::Named(values) => values.get(name),
            _ => None,
        }
    }
}

impl ParsedClauses<Operand> {
    pub fn bind(self, params: &Params, failures: &mut Failures) -> ParsedClauses {
        let ParsedClauses {
            table,
            columns,
            conditions,
            order,
            limit,
        } = self;

        ParsedClauses {
            table,
            columns,
            conditions: bind_conditions(conditions, params, failures),
            order,
            limit,
        }
    }
}

pub fn bind_conditions(
    conditions: Vec<Condition<Operand>>,
    params: &Params,
    failures: &mut Failures,
) -> Vec<Condition> {
    let positional: &[String] = match params {
        Params::Positional(values) => values,
        _ => &[],
    };
    let mut positional = positional.iter();
    let mut placeholder_nr = 0;

    let mut bound = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let condition = match condition {
            Condition::NotNull { column } => Condition::NotNull { column },
            Condition::Comparison {
                column,
                comparison,
                value: Operand::Literal(value),
            } => Condition::Comparison {
                column,
                comparison,
                value,
            },
            Condition::Comparison {
                column, comparison, ..
            } => {
                failures.report(UnsupportedConstruct::PlaceholderComparison { column, comparison });
                continue;
            }
            Condition::Equality { column, value } => {
                let value = match value {
                    Operand::Literal(value) => value,
                    Operand::Positional => {
                        placeholder_nr += 1;

                        match positional.next() {
                            Some(value) => value.clone(),
                            None => {
                                failures.report(ParseFailure::MissingParameter {
                                    column,
                                    position: placeholder_nr,
                                });
                                continue;
                            }
                        }
                    }
                    Operand::Named(name) => match params.get(&name) {
                        Some(value) => value.clone(),
                        None => {
                            failures.report(ParseFailure::UnknownParameter { column, name });
                            continue;
                        }
                    },
                };

                Condition::Equality { column, value }
            }
        };

        debug!("Bound condition: {:?}", condition);
        bound.push(condition);
    }

    bound
}
