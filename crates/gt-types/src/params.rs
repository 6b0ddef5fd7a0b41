//! Parameter values and named parameter configurations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{GtError, GtResult};

/// A concrete parameter value produced by a candidate generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Mapping from parameter name to value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterConfiguration {
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Integer value of `name`, `None` when absent.
    ///
    /// Floats with no fractional part are accepted so that configurations
    /// read from JSON (`7.0`) behave like integer literals.
    pub fn get_int(&self, name: &str) -> GtResult<Option<i64>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParameterValue::Int(v)) => Ok(Some(*v)),
            Some(ParameterValue::Float(v)) if v.fract() == 0.0 => Ok(Some(*v as i64)),
            Some(other) => Err(GtError::invalid(format!(
                "parameter '{name}' must be an integer, got {other}"
            ))),
        }
    }

    pub fn get_float(&self, name: &str) -> GtResult<Option<f64>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParameterValue::Float(v)) => Ok(Some(*v)),
            Some(ParameterValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(GtError::invalid(format!(
                "parameter '{name}' must be numeric, got {other}"
            ))),
        }
    }

    pub fn get_text(&self, name: &str) -> GtResult<Option<&str>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParameterValue::Text(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(GtError::invalid(format!(
                "parameter '{name}' must be text, got {other}"
            ))),
        }
    }
}

impl fmt::Display for ParameterConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl FromIterator<(String, ParameterValue)> for ParameterConfiguration {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_sorted_by_name() {
        let config = ParameterConfiguration::new()
            .with("ntree", 500i64)
            .with("mtry", 7i64);
        assert_eq!(config.to_string(), "mtry=7, ntree=500");
    }

    #[test]
    fn typed_accessors() {
        let config = ParameterConfiguration::new()
            .with("mtry", 7i64)
            .with("ntree", 1500.0)
            .with("split", "gini");

        assert_eq!(config.get_int("mtry").unwrap(), Some(7));
        assert_eq!(config.get_int("ntree").unwrap(), Some(1500));
        assert_eq!(config.get_float("mtry").unwrap(), Some(7.0));
        assert_eq!(config.get_text("split").unwrap(), Some("gini"));
        assert_eq!(config.get_int("missing").unwrap(), None);
        assert!(config.get_int("split").is_err());
    }

    #[test]
    fn fractional_float_is_not_an_int() {
        let config = ParameterConfiguration::new().with("mtry", 2.5);
        let err = config.get_int("mtry").unwrap_err();
        assert!(matches!(err, GtError::InvalidConfiguration { .. }));
    }

    #[test]
    fn json_round_trip_keeps_value_kinds() {
        let config: ParameterConfiguration =
            serde_json::from_str(r#"{"mtry": 3, "ratio": 0.5, "kind": "gini"}"#).unwrap();
        assert_eq!(config.get("mtry"), Some(&ParameterValue::Int(3)));
        assert_eq!(config.get("ratio"), Some(&ParameterValue::Float(0.5)));
        assert_eq!(config.get("kind"), Some(&ParameterValue::Text("gini".into())));
    }
}
