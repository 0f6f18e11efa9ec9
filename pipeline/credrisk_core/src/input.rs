//! Raw request input and feature vector assembly.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

use crate::error::AssemblyError;
use crate::schema::{FeatureSchema, FEATURE_COUNT, SCHEMA};

/// A single submitted value, before coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Already numeric.
    Number(f64),
    /// Text to be parsed as a number.
    Text(String),
}

impl RawValue {
    /// Coerce to a finite `f64`.
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{n}"),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<&JsonValue> for RawValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Number(n) => n
                .as_f64()
                .map(RawValue::Number)
                .unwrap_or_else(|| RawValue::Text(n.to_string())),
            JsonValue::String(s) => RawValue::Text(s.clone()),
            other => RawValue::Text(other.to_string()),
        }
    }
}

/// Named values for one request, as produced by the form layer.
///
/// Fields outside the schema are carried but ignored by [`assemble`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: HashMap<String, RawValue>,
}

impl RawInput {
    /// Empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` pairs; later duplicates win.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<RawValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build from a JSON object. Returns `None` when `value` is not an object.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            fields: object
                .iter()
                .map(|(k, v)| (k.clone(), RawValue::from(v)))
                .collect(),
        })
    }

    /// Set or replace a field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<RawValue> {
        self.fields.remove(name)
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    /// Number of submitted fields, including ones outside the schema.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether nothing was submitted.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Ordered, finite feature values in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Validate length and finiteness of `values`.
    pub fn new(values: &[f64]) -> Result<Self, AssemblyError> {
        let values: [f64; FEATURE_COUNT] =
            values.try_into().map_err(|_| AssemblyError::Length {
                expected: FEATURE_COUNT,
                got: values.len(),
            })?;
        if let Some((i, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(AssemblyError::NonFinite {
                field: SCHEMA.features()[i].field,
                value,
            });
        }
        Ok(Self { values })
    }

    /// Wrap values the caller has already checked.
    pub(crate) fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Values in schema order.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Always [`FEATURE_COUNT`].
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Never true.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Map `input` onto `schema`, coercing every field to a finite number.
///
/// Missing fields are never defaulted; the first absent or unparseable field
/// in schema order fails the whole assembly.
pub fn assemble(input: &RawInput, schema: &FeatureSchema) -> Result<FeatureVector, AssemblyError> {
    let mut values = [0.0_f64; FEATURE_COUNT];
    for (slot, field) in values.iter_mut().zip(schema.order()) {
        let raw = input
            .get(field)
            .ok_or_else(|| AssemblyError::MissingField(field.to_string()))?;
        *slot = raw.to_f64().ok_or_else(|| AssemblyError::InvalidValue {
            field: field.to_string(),
            raw: raw.to_string(),
        })?;
    }
    Ok(FeatureVector::from_array(values))
}
