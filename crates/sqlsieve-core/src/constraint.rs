//! Unique-constraint specifications for conflict resolution.
//!
//! A spec lists the unique constraints a table carries. Each entry is either
//! a single column ([`Constraint::Simple`]) or a group of columns that are
//! unique together ([`Constraint::Composite`]). The JSON form accepts:
//!
//! ```text
//! ["email", ["tenant_id", "user_id"], {"org_id": true, "slug": true}]
//! ```
//!
//! where an object contributes its keys in insertion order.

use serde_json::Value;

use crate::error::{QueryError, Result};

/// One unique constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// A unique column.
    Simple(String),
    /// Columns that are unique together, in declaration order.
    Composite(Vec<String>),
}

impl Constraint {
    /// Builds a composite constraint.
    #[must_use]
    pub fn composite<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::Composite(columns.into_iter().map(Into::into).collect())
    }

    /// Returns the constrained columns.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        match self {
            Self::Simple(column) => std::slice::from_ref(column),
            Self::Composite(columns) => columns,
        }
    }

    fn from_json(entry: &Value) -> Result<Self> {
        let constraint = match entry {
            Value::String(column) => Self::Simple(column.clone()),
            Value::Array(columns) => Self::Composite(
                columns
                    .iter()
                    .map(|column| {
                        column.as_str().map(str::to_owned).ok_or_else(|| {
                            QueryError::InvalidConstraint(format!(
                                "constraint column must be a string, got {column}"
                            ))
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => Self::Composite(map.keys().cloned().collect()),
            other => {
                return Err(QueryError::InvalidConstraint(format!(
                    "unsupported constraint entry: {other}"
                )))
            }
        };
        if constraint.columns().iter().any(String::is_empty) {
            return Err(QueryError::InvalidConstraint(String::from(
                "constraint column names must not be empty",
            )));
        }
        if constraint.columns().is_empty() {
            return Err(QueryError::InvalidConstraint(String::from(
                "composite constraint needs at least one column",
            )));
        }
        Ok(constraint)
    }
}

impl From<&str> for Constraint {
    fn from(column: &str) -> Self {
        Self::Simple(column.to_owned())
    }
}

impl From<String> for Constraint {
    fn from(column: String) -> Self {
        Self::Simple(column)
    }
}

/// The declared unique constraints of a table, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSpec {
    entries: Vec<Constraint>,
}

impl ConstraintSpec {
    /// No constraints.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds a spec from entries.
    #[must_use]
    pub fn new(entries: Vec<Constraint>) -> Self {
        Self { entries }
    }

    /// Adds a constraint.
    #[must_use]
    pub fn with(mut self, constraint: impl Into<Constraint>) -> Self {
        self.entries.push(constraint.into());
        self
    }

    /// Parses the JSON form. `null` and `[]` mean no constraints; a bare
    /// string is a single simple constraint.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::none()),
            Value::String(_) => Ok(Self::new(vec![Constraint::from_json(value)?])),
            Value::Array(entries) => entries
                .iter()
                .map(Constraint::from_json)
                .collect::<Result<Vec<_>>>()
                .map(Self::new),
            other => Err(QueryError::InvalidConstraint(format!(
                "constraints must be an array, got {other}"
            ))),
        }
    }

    /// Returns the entries.
    #[must_use]
    pub fn entries(&self) -> &[Constraint] {
        &self.entries
    }

    /// Returns true when no constraint is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Splits the entries into composite groups and simple columns.
    #[must_use]
    pub fn parse(&self) -> ParsedConstraints {
        let mut parsed = ParsedConstraints::default();
        for entry in &self.entries {
            match entry {
                Constraint::Simple(column) => parsed.simple.push(column.clone()),
                Constraint::Composite(columns) => parsed.composite.push(columns.clone()),
            }
        }
        parsed
    }
}

impl<C: Into<Constraint>> FromIterator<C> for ConstraintSpec {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Constraints split by shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedConstraints {
    /// Composite groups in declaration order.
    pub composite: Vec<Vec<String>>,
    /// Simple columns in declaration order.
    pub simple: Vec<String>,
}

impl ParsedConstraints {
    /// Composite columns (group order, then column order) followed by simple
    /// columns. These are excluded from `UPDATE SET` on conflict.
    #[must_use]
    pub fn flatten(&self) -> Vec<String> {
        self.composite
            .iter()
            .flatten()
            .chain(&self.simple)
            .cloned()
            .collect()
    }

    /// Number of declared constraints.
    #[must_use]
    pub fn total(&self) -> usize {
        self.composite.len() + self.simple.len()
    }

    /// The conflict target used when only one constraint can be named: the
    /// first composite group, else the first simple column.
    #[must_use]
    pub fn first_target(&self) -> Option<Vec<String>> {
        self.composite
            .first()
            .cloned()
            .or_else(|| self.simple.first().map(|column| vec![column.clone()]))
    }

    /// Every constraint as a column group: composites first, then simples.
    #[must_use]
    pub fn groups(&self) -> Vec<Vec<String>> {
        self.composite
            .iter()
            .cloned()
            .chain(self.simple.iter().map(|column| vec![column.clone()]))
            .collect()
    }
}
