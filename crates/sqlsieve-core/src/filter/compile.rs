//! WHERE-clause compilation.

use serde_json::Value;

use super::{Condition, Filter, FilterValue, Operator};
use crate::error::Result;
use crate::ident;
use crate::params::Params;
use crate::value::{Normalizer, SqlValue};

/// Knobs for predicate compilation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateOptions<'a> {
    /// Wrap `like` / `not like` values as `%value%`.
    pub auto_wildcard: bool,
    /// Normalize comparison values with column-aware heuristics.
    pub normalizer: Option<&'a Normalizer>,
}

/// Compiles `filter` into a `WHERE ((...) OR (...))` clause.
///
/// Values are pushed onto `params` in clause order. When `soft_delete` names
/// a column, `column = 0` is ANDed into every group; an empty filter then
/// compiles to that single condition. Returns `None` for an empty filter
/// without soft-delete.
pub fn compile_where(
    filter: &Filter,
    soft_delete: Option<&str>,
    options: PredicateOptions<'_>,
    params: &mut Params<'_>,
) -> Result<Option<String>> {
    if filter.is_empty() {
        return match soft_delete {
            None => Ok(None),
            Some(column) => {
                compile_groups(&[vec![Condition::eq(column, 0)]], None, options, params).map(Some)
            }
        };
    }
    let guard = soft_delete.map(|column| Condition::eq(column, 0));
    compile_groups(filter.groups(), guard.as_ref(), options, params).map(Some)
}

fn compile_groups(
    groups: &[Vec<Condition>],
    guard: Option<&Condition>,
    options: PredicateOptions<'_>,
    params: &mut Params<'_>,
) -> Result<String> {
    let mut branches = Vec::with_capacity(groups.len());
    for group in groups {
        let mut terms = Vec::with_capacity(group.len() + 1);
        for condition in group.iter().chain(guard) {
            terms.push(compile_condition(condition, options, params)?);
        }
        branches.push(terms.join(" AND "));
    }
    Ok(format!("WHERE (({}))", branches.join(") OR (")))
}

fn compile_condition(
    condition: &Condition,
    options: PredicateOptions<'_>,
    params: &mut Params<'_>,
) -> Result<String> {
    let column = ident::quote(params.dialect(), condition.column())?;
    let operator = condition.operator();
    match condition.value() {
        FilterValue::List(items) if items.is_empty() => Ok(match operator {
            // Nothing is a member of the empty list.
            Operator::In => String::from("1 = 0"),
            _ => String::from("1 = 1"),
        }),
        FilterValue::List(items) => {
            let placeholders: Vec<String> = items
                .iter()
                .map(|item| params.push(bind(condition.column(), item, options)))
                .collect();
            Ok(format!("{column} {operator} ({})", placeholders.join(", ")))
        }
        FilterValue::Scalar(value) if operator.is_pattern() => {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let pattern = if options.auto_wildcard {
                format!("%{text}%")
            } else {
                text
            };
            let placeholder = params.push(SqlValue::Text(pattern));
            Ok(format!("{column} {operator} {placeholder}"))
        }
        FilterValue::Scalar(value) => {
            let placeholder = params.push(bind(condition.column(), value, options));
            Ok(format!("{column} {operator} {placeholder}"))
        }
    }
}

fn bind(column: &str, value: &Value, options: PredicateOptions<'_>) -> SqlValue {
    match options.normalizer {
        Some(normalizer) => SqlValue::from(normalizer.normalize(column, value)),
        None => SqlValue::from(value),
    }
}
