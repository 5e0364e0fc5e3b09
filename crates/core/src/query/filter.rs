//! Filter documents.
//!
//! A [`Filter`] is an ordered set of per-field conditions that renders to the
//! Mongo-style JSON shape (`{"price": {"$gte": 10, "$lte": 20}}`) and can be
//! evaluated against a JSON document.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::Error;

/// Compiled regular expression condition.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    compiled: Regex,
}

impl Pattern {
    pub fn new(source: &str, case_insensitive: bool) -> Result<Self, Error> {
        let compiled = RegexBuilder::new(source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| Error::Query(format!("invalid pattern {source:?}: {e}")))?;
        Ok(Self { source: source.to_string(), case_insensitive, compiled })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn is_match(&self, value: &str) -> bool {
        self.compiled.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

/// One operator applied to a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Gte(Value),
    Lte(Value),
    Regex(Pattern),
}

impl Condition {
    fn operator(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "$eq",
            Condition::Ne(_) => "$ne",
            Condition::In(_) => "$in",
            Condition::Gte(_) => "$gte",
            Condition::Lte(_) => "$lte",
            Condition::Regex(_) => "$regex",
        }
    }

    fn operand(&self) -> Value {
        match self {
            Condition::Eq(v) | Condition::Ne(v) | Condition::Gte(v) | Condition::Lte(v) => v.clone(),
            Condition::In(vs) => Value::Array(vs.clone()),
            Condition::Regex(p) => Value::String(p.source.clone()),
        }
    }

    /// Evaluate against the value found at the field path (`None` when missing).
    fn holds(&self, candidate: Option<&Value>) -> bool {
        match self {
            Condition::Eq(expected) => matches_eq(candidate, expected),
            Condition::Ne(expected) => !matches_eq(candidate, expected),
            Condition::In(options) => options.iter().any(|o| matches_eq(candidate, o)),
            Condition::Gte(bound) => any_scalar(candidate, |v| {
                matches!(compare_values(v, bound), Some(Ordering::Greater | Ordering::Equal))
            }),
            Condition::Lte(bound) => any_scalar(candidate, |v| {
                matches!(compare_values(v, bound), Some(Ordering::Less | Ordering::Equal))
            }),
            Condition::Regex(pattern) => any_scalar(candidate, |v| v.as_str().is_some_and(|s| pattern.is_match(s))),
        }
    }
}

/// Ordered per-field conditions. Every condition must hold for a match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: Vec<(String, Vec<Condition>)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition, merging with earlier conditions on the same field.
    pub fn with(mut self, field: &str, condition: Condition) -> Self {
        self.push(field, condition);
        self
    }

    /// A condition replaces an earlier one on the same field with the same
    /// operator, so the rendered document and the evaluated filter agree.
    pub fn push(&mut self, field: &str, condition: Condition) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, conditions)) => match conditions.iter_mut().find(|c| c.operator() == condition.operator()) {
                Some(existing) => *existing = condition,
                None => conditions.push(condition),
            },
            None => self.fields.push((field.to_string(), vec![condition])),
        }
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Eq(value.into()))
    }

    pub fn ne(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Ne(value.into()))
    }

    pub fn in_values<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.with(field, Condition::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gte(value.into()))
    }

    pub fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lte(value.into()))
    }

    /// Add a regular expression condition.
    ///
    /// # Errors
    ///
    /// Returns `Error::Query` if the pattern does not compile.
    pub fn regex(self, field: &str, pattern: &str, case_insensitive: bool) -> Result<Self, Error> {
        Ok(self.with(field, Condition::Regex(Pattern::new(pattern, case_insensitive)?)))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Conditions registered for a field, in insertion order.
    pub fn conditions(&self, field: &str) -> &[Condition] {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, c)| c.as_slice())
            .unwrap_or(&[])
    }

    /// Render the Mongo-style filter document.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        for (field, conditions) in &self.fields {
            let rendered = match conditions.as_slice() {
                [Condition::Eq(value)] => value.clone(),
                _ => {
                    let mut ops = Map::new();
                    for condition in conditions {
                        ops.insert(condition.operator().to_string(), condition.operand());
                        if let Condition::Regex(p) = condition
                            && p.case_insensitive
                        {
                            ops.insert("$options".to_string(), Value::String("i".into()));
                        }
                    }
                    Value::Object(ops)
                }
            };
            doc.insert(field.clone(), rendered);
        }
        Value::Object(doc)
    }

    /// Whether the document satisfies every condition.
    ///
    /// A path crossing an array matches on any element; `$ne` must hold for
    /// every element.
    pub fn matches(&self, doc: &Value) -> bool {
        self.fields.iter().all(|(field, conditions)| {
            let values = path_values(doc, field);
            conditions.iter().all(|c| match (values.as_slice(), c) {
                ([], _) => c.holds(None),
                (_, Condition::Ne(_)) => values.iter().all(|v| c.holds(Some(v))),
                _ => values.iter().any(|v| c.holds(Some(v))),
            })
        })
    }
}

/// Every value reached by a dotted path, fanning out over arrays met on the way
/// (`images.id` on `{"images": [{"id": 1}, {"id": 2}]}` yields `1` and `2`).
pub fn path_values<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    path.split('.').fold(vec![doc], |current, segment| {
        current
            .into_iter()
            .flat_map(|value| match value {
                Value::Object(map) => map.get(segment).into_iter().collect::<Vec<_>>(),
                Value::Array(items) => items.iter().filter_map(|item| item.get(segment)).collect(),
                _ => Vec::new(),
            })
            .collect()
    })
}

/// Resolve a dotted path (`category.slug`) to a single value. Arrays are not
/// traversed; use [`path_values`] for that.
pub fn lookup_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

/// Apply `pred` to the value, or to any element when the value is an array.
fn any_scalar(candidate: Option<&Value>, pred: impl Fn(&Value) -> bool) -> bool {
    match candidate {
        Some(Value::Array(items)) => items.iter().any(&pred),
        Some(value) => pred(value),
        None => false,
    }
}

fn matches_eq(candidate: Option<&Value>, expected: &Value) -> bool {
    match candidate {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(|v| values_equal(v, expected)),
        Some(value) => values_equal(value, expected),
    }
}

/// Equality with numeric normalisation (`50` equals `50.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between two values of the same kind; `None` across kinds.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
