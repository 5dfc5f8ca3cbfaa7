//! Record store contract
//!
//! - `Record`: schema-typed mirror of one engine object, with edit tracking
//! - `RecordStore`: definition loading and record lifecycle
//! - `UiLayer`: receives schema-derived artifacts it alone interprets

pub mod memory;
pub mod ui;

pub use memory::MemoryRecordStore;
pub use ui::{MemoryUiLayer, UiLayer};

use std::collections::{BTreeMap, BTreeSet};

use tether_api::{BridgeError, BridgeResult, EngineId, RecordId, TypeDefinition, Value};

/// One editable record bound to exactly one engine object.
///
/// `set` records the property name in the edited set whenever the value
/// actually changes; `commit` clears that set and makes the current values
/// the clean baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    type_name: String,
    object: EngineId,
    property_names: Vec<String>,
    properties: BTreeMap<String, Value>,
    edited: BTreeSet<String>,
}

impl Record {
    pub fn new(id: RecordId, definition: &TypeDefinition, object: EngineId) -> Self {
        Self {
            id,
            type_name: definition.name.clone(),
            object,
            property_names: definition.property_names(),
            properties: BTreeMap::new(),
            edited: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Engine object this record mirrors
    pub fn object(&self) -> &EngineId {
        &self.object
    }

    /// Property names declared by the record's schema
    pub fn property_names(&self) -> &[String] {
        &self.property_names
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Set a declared property. Returns whether the stored value changed.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> BridgeResult<bool> {
        self.check_declared(name)?;
        let value = value.into();
        if self.properties.get(name) == Some(&value) {
            return Ok(false);
        }
        self.properties.insert(name.to_string(), value);
        self.edited.insert(name.to_string());
        Ok(true)
    }

    /// Remove a declared property's value. Returns whether one was stored.
    pub fn clear(&mut self, name: &str) -> BridgeResult<bool> {
        self.check_declared(name)?;
        if self.properties.remove(name).is_none() {
            return Ok(false);
        }
        self.edited.insert(name.to_string());
        Ok(true)
    }

    fn check_declared(&self, name: &str) -> BridgeResult<()> {
        if self.property_names.iter().any(|n| n == name) {
            return Ok(());
        }
        Err(BridgeError::InvalidValue {
            message: format!("record type {} has no property {}", self.type_name, name),
        })
    }

    pub fn edited_property_names(&self) -> impl Iterator<Item = &String> {
        self.edited.iter()
    }

    pub fn is_edited(&self) -> bool {
        !self.edited.is_empty()
    }

    /// Clear the edited set, returning the names that were pending.
    pub fn commit(&mut self) -> Vec<String> {
        std::mem::take(&mut self.edited).into_iter().collect()
    }
}

/// Generic schema-driven record store.
pub trait RecordStore {
    fn has_definition(&self, type_name: &str) -> bool;

    fn definition(&self, type_name: &str) -> Option<&TypeDefinition>;

    /// Load a model description and return the type names it declares.
    /// Types that are already defined keep their first definition.
    fn load_model(&mut self, content: &str) -> BridgeResult<Vec<String>>;

    /// Create an empty record of a defined type, bound to `object`.
    fn create(&mut self, type_name: &str, object: &EngineId) -> BridgeResult<RecordId>;

    fn get(&self, id: RecordId) -> Option<&Record>;

    fn get_mut(&mut self, id: RecordId) -> Option<&mut Record>;

    fn delete(&mut self, id: RecordId) -> BridgeResult<Record>;

    fn record_ids(&self) -> Vec<RecordId>;
}
