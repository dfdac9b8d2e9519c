//! Raw input classification and lookup criteria.
//!
//! Incoming payloads are `serde_json::Value`s. For entity resolution only
//! their shape matters: a scalar is read as a literal identifier, a mapping
//! as a candidate attribute set, anything else is not looked up at all.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::entity::Record;

/// Shape of a raw payload, as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput<'a> {
    /// Bool, number or string: a literal identifier value.
    Scalar(&'a Value),
    /// An object: field name to value.
    Mapping(&'a Map<String, Value>),
    /// Null or array.
    Unsupported(&'a Value),
}

impl<'a> RawInput<'a> {
    /// Classifies a payload.
    #[must_use]
    pub fn classify(data: &'a Value) -> Self {
        match data {
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Self::Scalar(data),
            Value::Object(map) => Self::Mapping(map),
            Value::Null | Value::Array(_) => Self::Unsupported(data),
        }
    }

    /// Human-readable shape name.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Mapping(_) => "mapping",
            Self::Unsupported(Value::Null) => "null",
            Self::Unsupported(_) => "array",
        }
    }
}

/// A complete set of equality conditions for a one-row lookup.
///
/// Only constructible when every required field is present in the input,
/// so an incomplete group can never reach a store query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    fields: BTreeMap<String, Value>,
}

impl Criteria {
    /// Picks `field_names` out of `data`.
    ///
    /// Returns `None` when `field_names` is empty or when any of them is
    /// missing from `data`; partial matches are discarded.
    #[must_use]
    pub fn complete<S: AsRef<str>>(field_names: &[S], data: &Map<String, Value>) -> Option<Self> {
        if field_names.is_empty() {
            return None;
        }

        let mut fields = BTreeMap::new();
        for name in field_names {
            let name = name.as_ref();
            let value = data.get(name)?;
            fields.insert(name.to_string(), value.clone());
        }
        Some(Self { fields })
    }

    /// Value required for `field`, if it is part of the criteria.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Criteria as (field, value) pairs, sorted by field name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields in the criteria.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for criteria built through [`Criteria::complete`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True if any criterion is a JSON null.
    #[must_use]
    pub fn has_null(&self) -> bool {
        self.fields.values().any(Value::is_null)
    }

    /// True if every criterion equals the record's field value exactly.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }
}
