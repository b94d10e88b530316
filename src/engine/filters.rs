//! Applies parsed clauses to a backend query.
use crate::backend::FilterableQuery;
use crate::engine::syntax::{Comparison, Condition, ParsedClauses};
use log::debug;

/// Projection first, then every condition in the order it was written, then ordering and limit.
///
/// Nothing is executed, the caller gets the query back and decides when to run it.
pub fn apply<Q>(query: Q, clauses: &ParsedClauses) -> Q
where
    Q: FilterableQuery,
{
    debug!("Selecting {}", clauses.columns);
    let query = query.select(&clauses.columns);

    let query = clauses.conditions.iter().fold(query, apply_condition);

    let query = match &clauses.order {
        Some(order) => query.order(&order.column, order.descending),
        None => query,
    };

    match clauses.limit {
        Some(limit) => query.limit(limit),
        None => query,
    }
}

pub fn apply_condition<Q>(query: Q, condition: &Condition) -> Q
where
    Q: FilterableQuery,
{
    debug!("Applying {:?}", condition);

    match condition {
        Condition::Equality { column, value } => query.eq(column, value),
        Condition::Comparison {
            column,
            comparison,
            value,
        } => match comparison {
            Comparison::GreaterThan => query.gt(column, value),
            Comparison::GreaterOrEqual => query.gte(column, value),
            Comparison::LesserThan => query.lt(column, value),
            Comparison::LesserOrEqual => query.lte(column, value),
        },
        Condition::NotNull { column } => query.not_is_null(column),
    }
}
