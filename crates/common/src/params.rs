use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Deployment parameters keyed by name (`region`, `zone`, `size`, `image`, ...)
pub type Params = BTreeMap<String, ParamValue>;

/// A single scalar deployment parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    /// Convert a JSON value into a parameter, rejecting nulls and nested documents
    pub fn from_json(key: &str, value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(ParamValue::Bool(b)),
            Value::String(s) => Ok(ParamValue::String(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ParamValue::Integer(i))
                } else if n.is_f64() {
                    Ok(ParamValue::Float(n.as_f64().unwrap_or_default()))
                } else {
                    Err(Error::Validation(format!(
                        "param '{}' is out of range: {}",
                        key, n
                    )))
                }
            }
            Value::Null => Err(Error::Validation(format!("param '{}' must not be null", key))),
            Value::Array(_) | Value::Object(_) => Err(Error::Validation(format!(
                "param '{}' must be a string, number or boolean",
                key
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Integer(i)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::String(s) => f.write_str(s),
        }
    }
}

/// Decode a params document.
///
/// Accepts a JSON object, or a string holding the JSON text of one (the
/// encoding older clients send).
pub fn params_from_json(value: Value) -> Result<Params> {
    let value = match value {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| Error::Validation(format!("params is not valid JSON: {}", e)))?,
        other => other,
    };

    let Value::Object(map) = value else {
        return Err(Error::Validation("params must be a JSON object".to_string()));
    };

    let mut params = Params::new();
    for (key, value) in map {
        if key.is_empty() {
            return Err(Error::Validation("param names must not be empty".to_string()));
        }
        let value = ParamValue::from_json(&key, value)?;
        params.insert(key, value);
    }
    Ok(params)
}

/// Shallow merge: keys in `patch` overwrite `base`, all other keys are kept
pub fn merge_params(base: &mut Params, patch: Params) {
    base.extend(patch);
}
