//! Filter trees: an OR of AND-groups of column comparisons.
//!
//! The wire shape is `[[["column", "op", value], ...], ...]`: the outer list
//! is OR-ed, each inner list is AND-ed. Conditions are validated when they
//! are built, so a [`Filter`] always compiles.

mod compile;

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

pub use compile::{compile_where, PredicateOptions};

use crate::error::{QueryError, Result};

/// Comparison operators accepted in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Less than (<)
    Lt,
    /// Greater than (>)
    Gt,
    /// Less than or equal (<=)
    Lte,
    /// Greater than or equal (>=)
    Gte,
    /// Pattern match (like)
    Like,
    /// Negated pattern match (not like)
    NotLike,
    /// List membership (in)
    In,
    /// Negated list membership (not in)
    NotIn,
}

impl Operator {
    /// Returns the SQL text of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Gte => ">=",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }

    /// Returns true for `in` / `not in`.
    #[must_use]
    pub const fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Returns true for `like` / `not like`.
    #[must_use]
    pub const fn is_pattern(self) -> bool {
        matches!(self, Self::Like | Self::NotLike)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "=" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            ">" => Ok(Self::Gt),
            "<=" => Ok(Self::Lte),
            ">=" => Ok(Self::Gte),
            "like" => Ok(Self::Like),
            "not like" => Ok(Self::NotLike),
            "in" => Ok(Self::In),
            "not in" => Ok(Self::NotIn),
            other => Err(QueryError::InvalidFilter(format!(
                "unsupported operator: {other:?}"
            ))),
        }
    }
}

/// The right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A single comparison value.
    Scalar(Value),
    /// The member list of `in` / `not in`.
    List(Vec<Value>),
}

/// One `column operator value` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    column: String,
    operator: Operator,
    value: FilterValue,
}

impl Condition {
    /// Builds a condition, checking the value shape against the operator.
    ///
    /// `in` / `not in` require a JSON array; every other operator requires a
    /// scalar (null, boolean, number or string).
    pub fn new(column: impl Into<String>, operator: Operator, value: Value) -> Result<Self> {
        let column = column.into();
        let value = match (operator.takes_list(), value) {
            (true, Value::Array(items)) => FilterValue::List(items),
            (true, other) => {
                return Err(QueryError::InvalidFilter(format!(
                    "operator {operator} on {column:?} requires a list, got {other}"
                )))
            }
            (false, other @ (Value::Array(_) | Value::Object(_))) => {
                return Err(QueryError::InvalidFilter(format!(
                    "operator {operator} on {column:?} requires a scalar, got {other}"
                )))
            }
            (false, scalar) => FilterValue::Scalar(scalar),
        };
        Ok(Self {
            column,
            operator,
            value,
        })
    }

    /// `column = value`
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(column, Operator::Eq, value)
    }

    /// `column != value`
    #[must_use]
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(column, Operator::Ne, value)
    }

    /// `column < value`
    #[must_use]
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(column, Operator::Lt, value)
    }

    /// `column > value`
    #[must_use]
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(column, Operator::Gt, value)
    }

    /// `column like pattern`
    #[must_use]
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::scalar(column, Operator::Like, Value::String(pattern.into()))
    }

    /// `column in (values...)`
    #[must_use]
    pub fn in_list<V: Into<Value>>(column: impl Into<String>, values: Vec<V>) -> Self {
        Self {
            column: column.into(),
            operator: Operator::In,
            value: FilterValue::List(values.into_iter().map(Into::into).collect()),
        }
    }

    /// `column not in (values...)`
    #[must_use]
    pub fn not_in_list<V: Into<Value>>(column: impl Into<String>, values: Vec<V>) -> Self {
        Self {
            column: column.into(),
            operator: Operator::NotIn,
            value: FilterValue::List(values.into_iter().map(Into::into).collect()),
        }
    }

    fn scalar(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        let value = match value.into() {
            // Structured scalars compare against their JSON text.
            structured @ (Value::Array(_) | Value::Object(_)) => {
                Value::String(structured.to_string())
            }
            scalar => scalar,
        };
        Self {
            column: column.into(),
            operator,
            value: FilterValue::Scalar(value),
        }
    }

    /// Parses the `["column", "op", value]` wire form.
    pub fn from_json(value: &Value) -> Result<Self> {
        let parts = value.as_array().ok_or_else(|| {
            QueryError::InvalidFilter(format!("condition must be an array, got {value}"))
        })?;
        let [column, operator, operand] = parts.as_slice() else {
            return Err(QueryError::InvalidFilter(format!(
                "condition must have 3 elements, got {}",
                parts.len()
            )));
        };
        let column = column.as_str().ok_or_else(|| {
            QueryError::InvalidIdentifier(format!("column must be a string, got {column}"))
        })?;
        let operator: Operator = operator
            .as_str()
            .ok_or_else(|| {
                QueryError::InvalidFilter(format!("operator must be a string, got {operator}"))
            })?
            .parse()?;
        Self::new(column, operator, operand.clone())
    }

    /// Returns the column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the operator.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the value.
    #[must_use]
    pub const fn value(&self) -> &FilterValue {
        &self.value
    }

    /// Number of parameters this condition binds.
    #[must_use]
    pub fn param_count(&self) -> usize {
        match &self.value {
            FilterValue::Scalar(_) => 1,
            FilterValue::List(items) => items.len(),
        }
    }
}

/// An OR of AND-groups. No groups means "match all rows".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    groups: Vec<Vec<Condition>>,
}

impl Filter {
    /// A filter matching every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter with a single AND-group.
    #[must_use]
    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::from_groups(vec![conditions])
    }

    /// Builds a filter from AND-groups.
    ///
    /// An empty AND-group is always true, so it makes the whole filter
    /// match every row.
    #[must_use]
    pub fn from_groups(groups: Vec<Vec<Condition>>) -> Self {
        if groups.is_empty() || groups.iter().any(Vec::is_empty) {
            return Self::all();
        }
        Self { groups }
    }

    /// Adds another OR-branch.
    #[must_use]
    pub fn or(mut self, group: Vec<Condition>) -> Self {
        if self.groups.is_empty() || group.is_empty() {
            // Either side already matches everything.
            return Self::all();
        }
        self.groups.push(group);
        self
    }

    /// Parses the `[[["column", "op", value], ...], ...]` wire form.
    ///
    /// `null`, `""`, `[]`, `[[]]` and `[[[]]]` all mean "match all".
    pub fn from_json(value: &Value) -> Result<Self> {
        let groups = match value {
            Value::Null => return Ok(Self::all()),
            Value::String(s) if s.is_empty() => return Ok(Self::all()),
            Value::Array(groups) => groups,
            other => {
                return Err(QueryError::InvalidFilter(format!(
                    "filter must be an array, got {other}"
                )))
            }
        };
        let mut parsed = Vec::with_capacity(groups.len());
        for group in groups {
            let conditions = group.as_array().ok_or_else(|| {
                QueryError::InvalidFilter(format!("filter group must be an array, got {group}"))
            })?;
            let conditions = conditions
                .iter()
                .filter(|c| !matches!(c, Value::Array(parts) if parts.is_empty()))
                .map(Condition::from_json)
                .collect::<Result<Vec<_>>>()?;
            parsed.push(conditions);
        }
        Ok(Self::from_groups(parsed))
    }

    /// One AND-group with `key = value` for every entry of `map`.
    ///
    /// Array values become `key in (...)`.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let conditions = map
            .iter()
            .map(|(column, value)| match value {
                Value::Array(_) => Condition::new(column.as_str(), Operator::In, value.clone()),
                _ => Condition::new(column.as_str(), Operator::Eq, value.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::and(conditions))
    }

    /// Resolves loosely shaped request input into a filter.
    ///
    /// - a string or number matches `primary_key`,
    /// - an object with a `filter` array uses it, AND-ing the remaining keys
    ///   into every group,
    /// - any other non-empty object becomes [`Filter::from_map`],
    /// - an empty object matches all rows.
    pub fn from_input(input: &Value, primary_key: &str) -> Result<Self> {
        match input {
            Value::String(_) | Value::Number(_) => {
                Condition::new(primary_key, Operator::Eq, input.clone())
                    .map(|c| Self::and(vec![c]))
            }
            Value::Object(map) => match map.get("filter") {
                Some(filter @ Value::Array(_)) => {
                    let base = Self::from_json(filter)?;
                    let rest: Map<String, Value> = map
                        .iter()
                        .filter(|(key, _)| key.as_str() != "filter")
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    let extra = Self::from_map(&rest)?;
                    if base.is_empty() {
                        return Ok(extra);
                    }
                    let extra = extra.groups.into_iter().next().unwrap_or_default();
                    let groups = base
                        .groups
                        .into_iter()
                        .map(|mut group| {
                            group.extend(extra.iter().cloned());
                            group
                        })
                        .collect();
                    Ok(Self { groups })
                }
                _ => Self::from_map(map),
            },
            other => Err(QueryError::InvalidFilter(format!(
                "Invalid filter input: {other}"
            ))),
        }
    }

    /// Returns true when the filter matches every row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns the AND-groups in order.
    #[must_use]
    pub fn groups(&self) -> &[Vec<Condition>] {
        &self.groups
    }

    /// Number of parameters the compiled filter binds.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.groups
            .iter()
            .flatten()
            .map(Condition::param_count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("NOT LIKE".parse::<Operator>().unwrap(), Operator::NotLike);
        assert_eq!(" in ".parse::<Operator>().unwrap(), Operator::In);
        assert!(matches!(
            "<>".parse::<Operator>(),
            Err(QueryError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_in_requires_list() {
        assert!(matches!(
            Condition::new("id", Operator::In, json!(5)),
            Err(QueryError::InvalidFilter(_))
        ));
        assert!(Condition::new("id", Operator::In, json!([1, 2])).is_ok());
    }

    #[test]
    fn test_scalar_rejects_list() {
        assert!(matches!(
            Condition::new("id", Operator::Eq, json!([1, 2])),
            Err(QueryError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_empty_shapes_match_all() {
        for empty in [json!(null), json!(""), json!([]), json!([[]]), json!([[[]]])] {
            assert!(Filter::from_json(&empty).unwrap().is_empty(), "{empty}");
        }
    }

    #[test]
    fn test_any_empty_group_matches_all() {
        let filter = Filter::from_json(&json!([[], [["a", "=", 1]]])).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_from_json_groups() {
        let filter = Filter::from_json(&json!([
            [["name", "=", "John"], ["age", ">", 18]],
            [["role", "in", ["admin", "owner"]]]
        ]))
        .unwrap();
        assert_eq!(filter.groups().len(), 2);
        assert_eq!(filter.groups()[0].len(), 2);
        assert_eq!(filter.groups()[1][0].operator(), Operator::In);
        assert_eq!(filter.param_count(), 4);
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        assert!(matches!(
            Filter::from_json(&json!("id = 1")),
            Err(QueryError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::from_json(&json!([["id", "=", 1]])),
            Err(QueryError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::from_json(&json!([[["id", "=="]]])),
            Err(QueryError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::from_json(&json!([[["id", "~", 1]]])),
            Err(QueryError::InvalidFilter(_))
        ));
        assert!(matches!(
            Filter::from_json(&json!([[[5, "=", 1]]])),
            Err(QueryError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_from_map() {
        let map = json!({"status": "active", "id": [1, 2]});
        let filter = Filter::from_map(map.as_object().unwrap()).unwrap();
        let group = &filter.groups()[0];
        assert_eq!(group[0].column(), "status");
        assert_eq!(group[0].operator(), Operator::Eq);
        assert_eq!(group[1].operator(), Operator::In);
    }

    #[test]
    fn test_from_input_scalar_is_primary_key() {
        let filter = Filter::from_input(&json!(42), "id").unwrap();
        assert_eq!(filter.groups()[0], vec![Condition::eq("id", 42)]);
        let filter = Filter::from_input(&json!("abc"), "uuid").unwrap();
        assert_eq!(filter.groups()[0], vec![Condition::eq("uuid", "abc")]);
    }

    #[test]
    fn test_from_input_merges_extra_keys() {
        let input = json!({
            "filter": [[["age", ">", 18]], [["vip", "=", 1]]],
            "tenant_id": 3
        });
        let filter = Filter::from_input(&input, "id").unwrap();
        assert_eq!(filter.groups().len(), 2);
        for group in filter.groups() {
            assert_eq!(group.last(), Some(&Condition::eq("tenant_id", 3)));
        }
    }

    #[test]
    fn test_from_input_empty_filter_uses_keys() {
        let input = json!({"filter": [[[]]], "tenant_id": 3});
        let filter = Filter::from_input(&input, "id").unwrap();
        assert_eq!(filter.groups(), &[vec![Condition::eq("tenant_id", 3)]]);
    }

    #[test]
    fn test_from_input_empty_object_matches_all() {
        assert!(Filter::from_input(&json!({}), "id").unwrap().is_empty());
    }

    #[test]
    fn test_from_input_rejects_other_shapes() {
        assert!(matches!(
            Filter::from_input(&json!(true), "id"),
            Err(QueryError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_or_with_match_all_stays_match_all() {
        let filter = Filter::all().or(vec![Condition::eq("a", 1)]);
        assert!(filter.is_empty());
        let filter = Filter::and(vec![Condition::eq("a", 1)]).or(vec![Condition::eq("b", 2)]);
        assert_eq!(filter.groups().len(), 2);
    }
}
