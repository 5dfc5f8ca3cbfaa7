use serde::{Deserialize, Serialize};

pub mod error;
pub mod events;
pub mod ids;
pub mod schema;

pub use error::{BridgeError, BridgeResult};
pub use events::{BridgeEvent, Notification, SelectedObject, Selection};
pub use ids::{EngineId, RecordId};
pub use schema::{FieldDefinition, FieldType, ModelDescription, PropertyKind, TypeDefinition};

/// Property value exchanged between the engine and the record store.
///
/// Engine elements only ever hold the primitive variants. Records may also
/// hold `Reference` (another record's id) and `Array` (one value per engine
/// slot, in slot order).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Reference(RecordId),
    Array(Vec<Value>),
    Null,
}

impl Value {
    /// Get string value, returning None if not a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<RecordId> {
        match self {
            Value::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Reference(_) => "reference",
            Value::Array(_) => "array",
            Value::Null => "null",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Value::Reference(id)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Engine fixtures are written as plain JSON, so numbers, strings, booleans,
/// arrays and null map onto the primitive variants. JSON objects have no
/// counterpart.
impl TryFrom<serde_json::Value> for Value {
    type Error = BridgeError;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Boolean(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(BridgeError::InvalidValue {
                        message: format!("number {} does not fit an i64 or f64", n),
                    })
                }
            }
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Array(arr) => arr
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            serde_json::Value::Object(_) => Err(BridgeError::InvalidValue {
                message: "JSON objects cannot be stored in a property slot".to_string(),
            }),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = BridgeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| BridgeError::InvalidValue {
            message: format!("expected a float, got {}", value.kind_name()),
        })
    }
}

impl TryFrom<Value> for i64 {
    type Error = BridgeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_i64().ok_or_else(|| BridgeError::InvalidValue {
            message: format!("expected an integer, got {}", value.kind_name()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        let v = Value::Boolean(true);
        assert_eq!(v.as_bool(), Some(true));
        assert_eq!(v.as_i64(), None);

        let v = Value::Integer(42);
        assert_eq!(v.as_i64(), Some(42));
        assert_eq!(v.as_f64(), Some(42.0));

        let v = Value::Reference(RecordId::new(7));
        assert_eq!(v.as_reference(), Some(RecordId::new(7)));
        assert_eq!(v.as_i64(), None);

        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_value_from() {
        let v: Value = 0.5.into();
        assert_eq!(v, Value::Float(0.5));

        let v: Value = "wireframe".into();
        assert_eq!(v, Value::String("wireframe".to_string()));

        let v: Value = None::<i64>.into();
        assert_eq!(v, Value::Null);

        let v: Value = vec![1.0, 2.0].into();
        assert_eq!(v, Value::Array(vec![Value::Float(1.0), Value::Float(2.0)]));
    }

    #[test]
    fn test_value_from_json() {
        let json = serde_json::json!([1, 2.5, "x", true, null]);
        let v = Value::try_from(json).unwrap();
        assert_eq!(
            v,
            Value::Array(vec![
                Value::Integer(1),
                Value::Float(2.5),
                Value::String("x".to_string()),
                Value::Boolean(true),
                Value::Null,
            ])
        );

        let err = Value::try_from(serde_json::json!({"a": 1})).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidValue { .. }));
    }

    #[test]
    fn test_reference_survives_serialization() {
        // Integer and Reference must stay distinguishable on the wire
        let v = Value::Array(vec![Value::Integer(3), Value::Reference(RecordId::new(3))]);
        let json = serde_json::to_string(&v).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, parsed);
    }
}
