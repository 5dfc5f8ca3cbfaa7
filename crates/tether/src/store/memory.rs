//! In-memory implementation of RecordStore

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::{Record, RecordStore};
use tether_api::{BridgeError, BridgeResult, EngineId, ModelDescription, RecordId, TypeDefinition};

/// HashMap-backed record store that understands YAML model descriptions.
///
/// Record ids come from a counter starting at one, so the same sequence of
/// operations always yields the same ids.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    definitions: HashMap<String, TypeDefinition>,
    records: BTreeMap<RecordId, Record>,
    next_id_counter: u64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records currently bound to `object`.
    pub fn records_for(&self, object: &EngineId) -> Vec<RecordId> {
        self.records
            .values()
            .filter(|r| r.object() == object)
            .map(Record::id)
            .collect()
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }
}

impl RecordStore for MemoryRecordStore {
    fn has_definition(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    fn definition(&self, type_name: &str) -> Option<&TypeDefinition> {
        self.definitions.get(type_name)
    }

    fn load_model(&mut self, content: &str) -> BridgeResult<Vec<String>> {
        let model: ModelDescription =
            serde_yaml::from_str(content).map_err(|e| BridgeError::InvalidValue {
                message: format!("malformed model description: {}", e),
            })?;

        let mut names = Vec::with_capacity(model.len());
        for (name, fields) in model {
            if !self.definitions.contains_key(&name) {
                debug!(
                    "[MemoryRecordStore] defined type {} with {} fields",
                    name,
                    fields.len()
                );
                self.definitions
                    .insert(name.clone(), TypeDefinition::new(name.clone(), fields));
            }
            names.push(name);
        }
        Ok(names)
    }

    fn create(&mut self, type_name: &str, object: &EngineId) -> BridgeResult<RecordId> {
        let definition =
            self.definitions
                .get(type_name)
                .ok_or_else(|| BridgeError::UnknownType {
                    type_name: type_name.to_string(),
                })?;
        self.next_id_counter += 1;
        let id = RecordId::new(self.next_id_counter);
        self.records
            .insert(id, Record::new(id, definition, object.clone()));
        Ok(id)
    }

    fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.records.get_mut(&id)
    }

    fn delete(&mut self, id: RecordId) -> BridgeResult<Record> {
        self.records
            .remove(&id)
            .ok_or(BridgeError::RecordNotFound { id })
    }

    fn record_ids(&self) -> Vec<RecordId> {
        self.records.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
Source:
  Count:
    type: integer
Representation:
  Input:
    type: proxy
  Opacity:
    type: float
    _label: Opacity
"#;

    #[test]
    fn test_load_model_registers_every_type() {
        let mut store = MemoryRecordStore::new();
        let mut names = store.load_model(MODEL).unwrap();
        names.sort();
        assert_eq!(names, vec!["Representation", "Source"]);
        assert!(store.has_definition("Source"));

        let rep = store.definition("Representation").unwrap();
        assert_eq!(rep.property_names(), vec!["Input", "Opacity"]);
        assert_eq!(rep.field("Opacity").unwrap().label.as_deref(), Some("Opacity"));
    }

    #[test]
    fn test_load_model_keeps_first_definition() {
        let mut store = MemoryRecordStore::new();
        store.load_model(MODEL).unwrap();
        store
            .load_model("Source:\n  Other:\n    type: string\n")
            .unwrap();
        assert_eq!(
            store.definition("Source").unwrap().property_names(),
            vec!["Count"]
        );
        assert_eq!(store.definition_count(), 2);
    }

    #[test]
    fn test_malformed_model_is_rejected() {
        let mut store = MemoryRecordStore::new();
        let err = store.load_model("Source: [not, a, map").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidValue { .. }));
        assert_eq!(store.definition_count(), 0);
    }

    #[test]
    fn test_create_and_delete_records() {
        let mut store = MemoryRecordStore::new();
        store.load_model(MODEL).unwrap();

        let s1 = EngineId::from("S1");
        let first = store.create("Source", &s1).unwrap();
        let second = store.create("Source", &EngineId::from("S2")).unwrap();
        assert_eq!(first, RecordId::new(1));
        assert_eq!(second, RecordId::new(2));
        assert_eq!(store.records_for(&s1), vec![first]);

        let removed = store.delete(first).unwrap();
        assert_eq!(removed.object(), &s1);
        assert!(store.get(first).is_none());
        assert!(matches!(
            store.delete(first),
            Err(BridgeError::RecordNotFound { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_create_unknown_type_fails() {
        let mut store = MemoryRecordStore::new();
        let err = store.create("Nope", &EngineId::from("X")).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownType { .. }));
        assert!(store.is_empty());
    }
}
