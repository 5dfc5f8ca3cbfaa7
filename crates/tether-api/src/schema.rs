//! Schema types for record definitions.
//!
//! A model description maps type names to their fields:
//!
//! ```yaml
//! Representation:
//!   Input:
//!     type: reference
//!   Opacity:
//!     type: float
//!     _label: Opacity
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Value;

/// Parsed model content: type name to field name to field definition.
pub type ModelDescription = BTreeMap<String, BTreeMap<String, FieldDefinition>>;

/// Type of a field in a record definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    #[serde(alias = "proxy")]
    Reference,
}

impl FieldType {
    /// Infer a field type from a sample engine element.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Integer(_) => FieldType::Integer,
            Value::Float(_) => FieldType::Float,
            Value::Boolean(_) => FieldType::Boolean,
            Value::Reference(_) => FieldType::Reference,
            Value::Array(items) => items.first().map_or(FieldType::String, FieldType::of_value),
            Value::String(_) | Value::Null => FieldType::String,
        }
    }
}

/// Schema for a single record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Number of elements; absent means one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, rename = "_label", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FieldDefinition {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            size: None,
            label: None,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Complete definition of one record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, fields: BTreeMap<String, FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn property_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }
}

/// Shape of a property transfer, decided once per property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar,
    ScalarList,
    Reference,
    ReferenceList,
}

impl PropertyKind {
    /// Kind of an engine property holding `count` slots; `None` when empty.
    pub fn for_count(is_reference: bool, count: usize) -> Option<Self> {
        match (is_reference, count) {
            (_, 0) => None,
            (true, 1) => Some(PropertyKind::Reference),
            (true, _) => Some(PropertyKind::ReferenceList),
            (false, 1) => Some(PropertyKind::Scalar),
            (false, _) => Some(PropertyKind::ScalarList),
        }
    }

    /// Kind of a record value about to be written to an engine property.
    pub fn for_value(is_reference: bool, value: &Value) -> Self {
        match (is_reference, value) {
            (true, Value::Array(_)) => PropertyKind::ReferenceList,
            (true, _) => PropertyKind::Reference,
            (false, Value::Array(_)) => PropertyKind::ScalarList,
            (false, _) => PropertyKind::Scalar,
        }
    }

    pub fn is_reference(self) -> bool {
        matches!(self, PropertyKind::Reference | PropertyKind::ReferenceList)
    }

    pub fn is_list(self) -> bool {
        matches!(self, PropertyKind::ScalarList | PropertyKind::ReferenceList)
    }
}
