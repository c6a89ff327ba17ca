//! Runtime values.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::function::Function;

/// A runtime value, shaped after JavaScript's.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The null value. Also stands in for `undefined`.
    #[default]
    Null,
    /// A boolean value.
    Boolean(bool),
    /// A numeric value (always f64, like JavaScript).
    Number(f64),
    /// A string value.
    String(String),
    /// An array of values.
    Array(Vec<Value>),
    /// An object with string keys.
    Object(HashMap<String, Value>),
    /// A callable.
    Function(Function),
}

impl Value {
    /// Coerce this value to a string.
    pub fn to_string_value(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::String(s) => s.clone(),
            Value::Number(n) => {
                if n.is_nan() {
                    "NaN".to_string()
                } else if n.is_infinite() {
                    if *n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
                } else if *n == n.trunc() && n.abs() < 1e15 {
                    // Integer-like numbers without decimal point
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|v| v.to_string_value()).collect();
                items.join(",")
            }
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!("[function {}]", f.name()),
        }
    }

    /// Coerce this value to a boolean.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Property lookup: `value[key]`. Missing properties read as null.
    pub fn get(&self, key: &Value) -> Value {
        match (self, key) {
            (Value::Object(map), Value::String(name)) => map.get(name).cloned().unwrap_or_default(),
            (Value::Array(arr), Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
                arr.get(*n as usize).cloned().unwrap_or_default()
            }
            (Value::Array(arr), Value::String(name)) if name == "length" => {
                Value::Number(arr.len() as f64)
            }
            (Value::String(s), Value::String(name)) if name == "length" => {
                Value::Number(s.chars().count() as f64)
            }
            _ => Value::Null,
        }
    }

    /// Parse a JSON string into a Value.
    pub fn from_json(s: &str) -> Result<Value, String> {
        let json: JsonValue =
            serde_json::from_str(s).map_err(|e| format!("JSON parse error: {}", e))?;
        Ok(Value::from_json_value(json))
    }

    fn from_json_value(json: JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from_json_value).collect())
            }
            JsonValue::Object(obj) => {
                let map = obj
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json_value(v)))
                    .collect();
                Value::Object(map)
            }
        }
    }

    /// Convert this Value to a JSON string. Functions encode as null.
    pub fn to_json(&self) -> String {
        let json = self.to_json_value();
        serde_json::to_string_pretty(&json).unwrap_or_else(|_| "null".to_string())
    }

    fn to_json_value(&self) -> JsonValue {
        match self {
            Value::Null | Value::Function(_) => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(arr) => JsonValue::Array(arr.iter().map(|v| v.to_json_value()).collect()),
            Value::Object(obj) => {
                let map: serde_json::Map<String, JsonValue> = obj
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect();
                JsonValue::Object(map)
            }
        }
    }
}

/// Strict equality. Functions compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}
