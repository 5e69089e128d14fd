//! Shared run state threaded through every pipeline step.
//!
//! A `Context` is an open mapping from option name to JSON value. The caller
//! seeds it before the run and any step may read or write any field; there is
//! no schema. Steps only read the fields relevant to them, and a missing field
//! surfaces as whatever error the reading step raises (usually via
//! [`Context::require_str`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a context from any serializable options struct.
    ///
    /// The value must serialize to a JSON object; each top-level field becomes
    /// one context entry.
    pub fn from_serialize<T: Serialize>(options: &T) -> Result<Self> {
        let value = serde_json::to_value(options)
            .map_err(|e| Error::internal_json(e.to_string(), Some("seed context".to_string())))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(Error::validation_invalid_argument(
                "context",
                format!("Context must be a JSON object, got {}", type_name(&other)),
                None,
                None,
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Truthiness of a boolean flag. Absent or non-boolean values are false.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(Value::Bool(true)))
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.str(key).ok_or_else(|| {
            Error::validation_invalid_argument(
                key,
                format!("Context field '{}' is not set", key),
                None,
                None,
            )
        })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flag_is_false_for_missing_and_non_bool() {
        let ctx =
            Context::from_value(json!({"lint": true, "test": "yes", "build": false})).unwrap();
        assert!(ctx.flag("lint"));
        assert!(!ctx.flag("test"));
        assert!(!ctx.flag("build"));
        assert!(!ctx.flag("publish"));
    }

    #[test]
    fn from_value_rejects_non_objects() {
        let err = Context::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert!(err.message.contains("array"));
    }

    #[test]
    fn require_str_names_the_missing_field() {
        let ctx = Context::new();
        let err = ctx.require_str("new_version").unwrap_err();
        assert_eq!(err.details["field"], "new_version");
    }

    #[test]
    fn set_overwrites_and_returns_previous() {
        let mut ctx = Context::new();
        assert!(ctx.set("new_version", "1.0.0").is_none());
        let previous = ctx.set("new_version", "1.1.0");
        assert_eq!(previous, Some(json!("1.0.0")));
        assert_eq!(ctx.str("new_version"), Some("1.1.0"));
    }

    #[test]
    fn from_serialize_flattens_struct_fields() {
        #[derive(Serialize)]
        struct Opts {
            lint: bool,
            #[serde(rename = "type")]
            release_type: String,
        }

        let ctx = Context::from_serialize(&Opts {
            lint: true,
            release_type: "minor".to_string(),
        })
        .unwrap();
        assert!(ctx.flag("lint"));
        assert_eq!(ctx.str("type"), Some("minor"));
        assert_eq!(
            serde_json::to_value(&ctx).unwrap(),
            json!({"lint": true, "type": "minor"})
        );
    }
}
