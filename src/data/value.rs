use serde::{Deserialize, Serialize};
use std::fmt;

/// A single dataset cell. Untagged so JSON export emits rows verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell. Strings are parsed so that CSV-loaded
    /// datasets (where every cell is text) still expose numeric columns.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a cell. Objects and arrays are handled
    /// by the flattening pass, not here.
    pub fn from_scalar(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            other => Value::Str(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_view_parses_strings() {
        assert_eq!(Value::Str(" 3.5 ".to_string()).as_f64(), Some(3.5));
        assert_eq!(Value::Int(4).as_f64(), Some(4.0));
        assert_eq!(Value::Str("n/a".to_string()).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
        assert_eq!(Value::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_display_null_is_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(12).to_string(), "12");
    }

    #[test]
    fn test_json_serialization_is_verbatim() {
        let row = vec![
            Value::Null,
            Value::Int(3),
            Value::Str("x".to_string()),
            Value::Bool(false),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,3,"x",false]"#);
    }
}
