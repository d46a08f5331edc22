//! Explicit type-cast suffixes for bound parameters.
//!
//! Some dialects (PostgreSQL) infer a parameter's type from the bound value,
//! which breaks for JSON documents sent as text. A [`TypeCastRegistry`] is an
//! ordered list of rules that picks a cast target per column/value; the first
//! matching rule wins and unmatched values get no suffix.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use super::normalize::looks_like_json_document;
use super::ValueKind;
use crate::error::{QueryError, Result};

/// Content-sniffing predicate.
pub type ValueDetector = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A named cast target and the conditions under which it applies.
#[derive(Clone)]
pub struct TypeCastRule {
    target: String,
    patterns: Vec<Regex>,
    value_kinds: Vec<ValueKind>,
    detector: Option<ValueDetector>,
}

impl fmt::Debug for TypeCastRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCastRule")
            .field("target", &self.target)
            .field(
                "patterns",
                &self.patterns.iter().map(Regex::as_str).collect::<Vec<_>>(),
            )
            .field("value_kinds", &self.value_kinds)
            .field("detector", &self.detector.is_some())
            .finish()
    }
}

impl TypeCastRule {
    /// Creates a rule casting to `target` that matches nothing yet.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            patterns: Vec::new(),
            value_kinds: Vec::new(),
            detector: None,
        }
    }

    /// Adds a column-name pattern.
    pub fn pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            QueryError::Config(format!("invalid column pattern {pattern:?}: {e}"))
        })?;
        self.patterns.push(regex);
        Ok(self)
    }

    /// Restricts (or, without patterns, selects) the accepted value kinds.
    #[must_use]
    pub fn value_kinds(mut self, kinds: &[ValueKind]) -> Self {
        self.value_kinds.extend_from_slice(kinds);
        self
    }

    /// Adds a content-sniffing predicate that matches on its own.
    #[must_use]
    pub fn detector<F>(mut self, detector: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.detector = Some(Arc::new(detector));
        self
    }

    /// Returns the cast target.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns whether this rule applies to `value` stored in `column`.
    #[must_use]
    pub fn matches(&self, column: &str, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        if self.detector.as_ref().is_some_and(|detect| detect(value)) {
            return true;
        }
        let kind_ok =
            self.value_kinds.is_empty() || self.value_kinds.contains(&ValueKind::of(value));
        if self.patterns.is_empty() {
            !self.value_kinds.is_empty() && kind_ok
        } else {
            kind_ok && self.patterns.iter().any(|p| p.is_match(column))
        }
    }
}

/// Ordered set of cast rules, evaluated first-match-wins.
#[derive(Debug, Clone, Default)]
pub struct TypeCastRegistry {
    rules: Vec<TypeCastRule>,
}

impl TypeCastRegistry {
    /// A registry without rules: no placeholder gets a cast.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The PostgreSQL rule set: `jsonb`, then `bigint` ids, then `boolean`.
    #[must_use]
    pub fn postgres() -> Self {
        let jsonb = TypeCastRule::new("jsonb").detector(|value| match value {
            Value::Array(_) | Value::Object(_) => true,
            Value::String(s) => looks_like_json_document(s),
            _ => false,
        });
        let mut rules = vec![jsonb];
        if let Ok(bigint) = TypeCastRule::new("bigint")
            .pattern(r"^id$")
            .and_then(|rule| rule.pattern(r"_id$"))
        {
            rules.push(bigint.value_kinds(&[ValueKind::Integer]));
        }
        rules.push(TypeCastRule::new("boolean").value_kinds(&[ValueKind::Boolean]));
        Self { rules }
    }

    /// Appends a rule after the existing ones.
    pub fn push(&mut self, rule: TypeCastRule) {
        self.rules.push(rule);
    }

    /// Inserts a rule at `index`, ahead of the rules after it.
    pub fn insert(&mut self, index: usize, rule: TypeCastRule) {
        let index = index.min(self.rules.len());
        self.rules.insert(index, rule);
    }

    /// Returns the rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[TypeCastRule] {
        &self.rules
    }

    /// Returns the cast target for `value` in `column`, if any rule matches.
    #[must_use]
    pub fn cast_for(&self, column: &str, value: &Value) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(column, value))
            .map(TypeCastRule::target)
    }
}
