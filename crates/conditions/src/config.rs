//! Condition configuration records.

use crate::error::{ConditionError, Result};
use serde_json::{Map, Value};

/// One condition record, `{ "type": ..., <fields> }`.
///
/// Thin wrapper over a JSON object with typed field accessors. Constructors
/// read their fields through it, so a record coming from a config file and one
/// built in code go through the same checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionConfig {
    fields: Map<String, Value>,
}

impl ConditionConfig {
    /// Create an empty record of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("type".to_string(), Value::String(kind.into()));
        Self { fields }
    }

    /// Wrap a JSON value. Anything but an object is rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields: fields.clone() }),
            other => Err(ConditionError::InvalidField {
                field: "condition",
                reason: format!("expected an object, got {}", other),
            }),
        }
    }

    /// Set a field (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Kind name (`type` field).
    pub fn kind(&self) -> Option<&str> {
        self.get_str("type")
    }

    /// Raw field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String field. Numbers and booleans are not coerced.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Non-negative integer field, `default` when absent.
    pub fn get_u64(&self, key: &'static str, default: u64) -> Result<u64> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value.as_u64().ok_or_else(|| ConditionError::InvalidField {
                field: key,
                reason: format!("expected a non-negative integer, got {}", value),
            }),
        }
    }

    /// Numeric field, `default` when absent.
    pub fn get_f64(&self, key: &'static str, default: f64) -> Result<f64> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| ConditionError::InvalidField {
                field: key,
                reason: format!("expected a number, got {}", value),
            }),
        }
    }

    /// Nested record, `None` when absent or not an object.
    pub fn section(&self, key: &str) -> Option<ConditionConfig> {
        match self.fields.get(key) {
            Some(Value::Object(fields)) => Some(Self { fields: fields.clone() }),
            _ => None,
        }
    }

    /// Nested records given either as a list or as a keyed map.
    ///
    /// Entries that are not objects are skipped. Map entries keep file order.
    pub fn sections(&self, key: &str) -> Vec<ConditionConfig> {
        let entries: Box<dyn Iterator<Item = &Value>> = match self.fields.get(key) {
            Some(Value::Array(list)) => Box::new(list.iter()),
            Some(Value::Object(map)) => Box::new(map.values()),
            _ => return Vec::new(),
        };

        entries
            .filter_map(|entry| match entry {
                Value::Object(fields) => Some(Self { fields: fields.clone() }),
                other => {
                    tracing::warn!(field = key, entry = %other, "Ignoring non-object condition entry");
                    None
                }
            })
            .collect()
    }
}

impl TryFrom<Value> for ConditionConfig {
    type Error = ConditionError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_accessors() {
        let config = ConditionConfig::from_value(&json!({
            "type": "kills",
            "entity": "zombie",
            "amount": 10,
            "ratio": 2.5
        }))
        .unwrap();

        assert_eq!(config.kind(), Some("kills"));
        assert_eq!(config.get_str("entity"), Some("zombie"));
        assert_eq!(config.get_u64("amount", 50).unwrap(), 10);
        assert_eq!(config.get_u64("missing", 50).unwrap(), 50);
        assert_eq!(config.get_f64("ratio", 0.0).unwrap(), 2.5);
    }

    #[test]
    fn test_malformed_amount_is_rejected() {
        let config = ConditionConfig::new("kills").with("amount", -3);
        assert!(matches!(
            config.get_u64("amount", 50),
            Err(ConditionError::InvalidField { field: "amount", .. })
        ));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(ConditionConfig::from_value(&json!("kills")).is_err());
    }

    #[test]
    fn test_sections_list_and_map() {
        let list = ConditionConfig::from_value(&json!({
            "type": "composite",
            "conditions": [ { "type": "kills" }, 3, { "type": "break" } ]
        }))
        .unwrap();
        let kinds: Vec<_> = list
            .sections("conditions")
            .iter()
            .map(|c| c.kind().unwrap().to_string())
            .collect();
        assert_eq!(kinds, vec!["kills", "break"]);

        let map = ConditionConfig::from_value(&json!({
            "type": "composite",
            "conditions": {
                "second": { "type": "collect" },
                "first": { "type": "prerequisite" }
            }
        }))
        .unwrap();
        let kinds: Vec<_> = map
            .sections("conditions")
            .iter()
            .map(|c| c.kind().unwrap().to_string())
            .collect();
        assert_eq!(kinds, vec!["collect", "prerequisite"]);
    }
}
