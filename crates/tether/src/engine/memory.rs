//! In-memory implementation of the engine contract
//!
//! Used as the reference engine in tests and as a stand-in for hosts that
//! want to exercise the bridge without a real processing engine.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::{Engine, PropertyInfo};
use tether_api::{BridgeError, BridgeResult, EngineId, Value};

/// HashMap-backed engine with property groups, active source/view tracking
/// and per-object apply counters.
///
/// # Example
///
/// ```rust
/// use tether::engine::{Engine, MemoryEngine};
/// use tether_api::Value;
///
/// let mut engine = MemoryEngine::new();
/// let source = engine.create_object("sources.Sphere", "Sphere1");
/// engine
///     .add_scalar(&source, Some("Properties"), "Radius", vec![Value::Float(0.5)])
///     .unwrap();
///
/// assert_eq!(engine.element_count(&source, "Radius").unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryEngine {
    objects: HashMap<EngineId, MemoryObject>,
    /// Counter for deterministic ID generation
    next_id_counter: u64,
    active_source: Option<EngineId>,
    active_view: Option<EngineId>,
    /// (source, view) -> representation
    representations: HashMap<(EngineId, EngineId), EngineId>,
}

#[derive(Debug, Clone)]
struct MemoryObject {
    classifier: String,
    label: String,
    groups: Vec<MemoryGroup>,
    properties: Vec<MemoryProperty>,
    hidden: bool,
    dirty: bool,
    apply_count: usize,
}

#[derive(Debug, Clone)]
struct MemoryGroup {
    name: String,
    properties: Vec<String>,
}

#[derive(Debug, Clone)]
struct MemoryProperty {
    name: String,
    slots: Slots,
}

#[derive(Debug, Clone)]
enum Slots {
    Elements(Vec<Value>),
    References(Vec<Option<EngineId>>),
}

impl MemoryObject {
    fn property(&self, name: &str) -> Option<&MemoryProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Grows `slots` so that `index` is addressable, padding with `fill`.
fn ensure_slot<T: Clone>(slots: &mut Vec<T>, index: usize, fill: T) {
    if slots.len() <= index {
        slots.resize(index + 1, fill);
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object with a generated numeric identifier.
    pub fn create_object(&mut self, classifier: &str, label: &str) -> EngineId {
        loop {
            self.next_id_counter += 1;
            let id = EngineId::new(self.next_id_counter.to_string());
            if !self.objects.contains_key(&id) {
                return self.insert_object(id, classifier, label);
            }
        }
    }

    /// Create an object under a caller-chosen identifier, replacing any
    /// previous object with that identifier.
    pub fn insert_object(&mut self, id: EngineId, classifier: &str, label: &str) -> EngineId {
        self.objects.insert(
            id.clone(),
            MemoryObject {
                classifier: classifier.to_string(),
                label: label.to_string(),
                groups: Vec::new(),
                properties: Vec::new(),
                hidden: false,
                dirty: false,
                apply_count: 0,
            },
        );
        id
    }

    pub fn add_scalar(
        &mut self,
        object: &EngineId,
        group: Option<&str>,
        name: &str,
        values: Vec<Value>,
    ) -> BridgeResult<()> {
        self.add_property(object, group, name, Slots::Elements(values))
    }

    pub fn add_reference(
        &mut self,
        object: &EngineId,
        group: Option<&str>,
        name: &str,
        targets: Vec<Option<EngineId>>,
    ) -> BridgeResult<()> {
        self.add_property(object, group, name, Slots::References(targets))
    }

    fn add_property(
        &mut self,
        object: &EngineId,
        group: Option<&str>,
        name: &str,
        slots: Slots,
    ) -> BridgeResult<()> {
        let obj = self.object_mut(object)?;
        if obj.property(name).is_some() {
            return Err(BridgeError::Engine {
                message: format!("object {} already has a property {}", object, name),
            });
        }
        obj.properties.push(MemoryProperty {
            name: name.to_string(),
            slots,
        });

        if let Some(group_name) = group {
            match obj.groups.iter_mut().find(|g| g.name == group_name) {
                Some(g) => g.properties.push(name.to_string()),
                None => obj.groups.push(MemoryGroup {
                    name: group_name.to_string(),
                    properties: vec![name.to_string()],
                }),
            }
        }
        Ok(())
    }

    pub fn set_active_source(&mut self, source: Option<EngineId>) {
        self.active_source = source;
    }

    pub fn set_active_view(&mut self, view: Option<EngineId>) {
        self.active_view = view;
    }

    pub fn add_representation(
        &mut self,
        source: EngineId,
        view: EngineId,
        representation: EngineId,
    ) {
        self.representations.insert((source, view), representation);
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of times `apply_pending_changes` flushed staged writes.
    pub fn apply_count(&self, object: &EngineId) -> usize {
        self.objects.get(object).map_or(0, |o| o.apply_count)
    }

    pub fn has_pending_changes(&self, object: &EngineId) -> bool {
        self.objects.get(object).is_some_and(|o| o.dirty)
    }

    pub fn is_hidden(&self, object: &EngineId) -> bool {
        self.objects.get(object).is_some_and(|o| o.hidden)
    }

    /// Current elements of a scalar property.
    pub fn elements(&self, object: &EngineId, name: &str) -> Option<Vec<Value>> {
        match &self.objects.get(object)?.property(name)?.slots {
            Slots::Elements(values) => Some(values.clone()),
            Slots::References(_) => None,
        }
    }

    /// Current slots of a reference property.
    pub fn references(&self, object: &EngineId, name: &str) -> Option<Vec<Option<EngineId>>> {
        match &self.objects.get(object)?.property(name)?.slots {
            Slots::References(targets) => Some(targets.clone()),
            Slots::Elements(_) => None,
        }
    }

    /// Empty every slot of a property, as when the engine drops its inputs.
    pub fn clear_property(&mut self, object: &EngineId, name: &str) -> BridgeResult<()> {
        match self.slots_mut(object, name)? {
            Slots::Elements(values) => values.clear(),
            Slots::References(targets) => targets.clear(),
        }
        Ok(())
    }

    fn object(&self, id: &EngineId) -> BridgeResult<&MemoryObject> {
        self.objects
            .get(id)
            .ok_or_else(|| BridgeError::ObjectNotFound { object: id.clone() })
    }

    fn object_mut(&mut self, id: &EngineId) -> BridgeResult<&mut MemoryObject> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| BridgeError::ObjectNotFound { object: id.clone() })
    }

    fn slots(&self, object: &EngineId, property: &str) -> BridgeResult<&Slots> {
        self.object(object)?
            .property(property)
            .map(|p| &p.slots)
            .ok_or_else(|| BridgeError::MissingProperty {
                object: object.clone(),
                property: property.to_string(),
            })
    }

    fn slots_mut(&mut self, object: &EngineId, property: &str) -> BridgeResult<&mut Slots> {
        let obj = self.object_mut(object)?;
        let target = obj
            .properties
            .iter_mut()
            .find(|p| p.name == property)
            .ok_or_else(|| BridgeError::MissingProperty {
                object: object.clone(),
                property: property.to_string(),
            })?;
        obj.dirty = true;
        Ok(&mut target.slots)
    }

    /// Build an engine from a JSON fixture.
    ///
    /// ```json
    /// {
    ///   "objects": [
    ///     {"id": "S1", "classifier": "sources.Sphere", "label": "Sphere1",
    ///      "properties": [{"name": "Count", "group": "Properties", "values": [5]}]},
    ///     {"id": "R1", "classifier": "representations.Geometry", "label": "Rep1",
    ///      "properties": [{"name": "Input", "references": ["S1"]}]}
    ///   ],
    ///   "active_source": "S1",
    ///   "active_view": "V1",
    ///   "representations": [{"source": "S1", "view": "V1", "representation": "R1"}]
    /// }
    /// ```
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        let fixture: Fixture =
            serde_json::from_str(json).map_err(|e| BridgeError::InvalidValue {
                message: format!("invalid engine fixture: {}", e),
            })?;

        let mut engine = Self::new();
        for object in fixture.objects {
            let id = engine.insert_object(
                EngineId::new(object.id),
                &object.classifier,
                object.label.as_deref().unwrap_or_default(),
            );
            for property in object.properties {
                match (property.values, property.references) {
                    (Some(values), None) => {
                        let values = values
                            .into_iter()
                            .map(Value::try_from)
                            .collect::<BridgeResult<Vec<_>>>()?;
                        engine.add_scalar(&id, property.group.as_deref(), &property.name, values)?;
                    }
                    (None, Some(targets)) => {
                        let targets = targets.into_iter().map(|t| t.map(EngineId::new)).collect();
                        engine.add_reference(
                            &id,
                            property.group.as_deref(),
                            &property.name,
                            targets,
                        )?;
                    }
                    _ => {
                        return Err(BridgeError::InvalidValue {
                            message: format!(
                                "property {} of {} needs exactly one of `values` or `references`",
                                property.name, id
                            ),
                        });
                    }
                }
            }
        }

        engine.active_source = fixture.active_source.map(EngineId::new);
        engine.active_view = fixture.active_view.map(EngineId::new);
        for pair in fixture.representations {
            engine.add_representation(
                EngineId::new(pair.source),
                EngineId::new(pair.view),
                EngineId::new(pair.representation),
            );
        }
        Ok(engine)
    }
}

#[derive(Debug, Deserialize)]
struct Fixture {
    objects: Vec<FixtureObject>,
    #[serde(default)]
    active_source: Option<String>,
    #[serde(default)]
    active_view: Option<String>,
    #[serde(default)]
    representations: Vec<FixtureRepresentation>,
}

#[derive(Debug, Deserialize)]
struct FixtureObject {
    id: String,
    classifier: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    properties: Vec<FixtureProperty>,
}

#[derive(Debug, Deserialize)]
struct FixtureProperty {
    name: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    values: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    references: Option<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct FixtureRepresentation {
    source: String,
    view: String,
    representation: String,
}

impl Engine for MemoryEngine {
    fn contains(&self, object: &EngineId) -> bool {
        self.objects.contains_key(object)
    }

    fn type_classifier(&self, object: &EngineId) -> BridgeResult<String> {
        Ok(self.object(object)?.classifier.clone())
    }

    fn object_label(&self, object: &EngineId) -> BridgeResult<String> {
        Ok(self.object(object)?.label.clone())
    }

    fn property_names(&self, object: &EngineId) -> BridgeResult<Vec<String>> {
        Ok(self
            .object(object)?
            .properties
            .iter()
            .map(|p| p.name.clone())
            .collect())
    }

    fn property_group_count(&self, object: &EngineId) -> BridgeResult<usize> {
        Ok(self.object(object)?.groups.len())
    }

    fn group_property_names(&self, object: &EngineId, group: usize) -> BridgeResult<Vec<String>> {
        self.object(object)?
            .groups
            .get(group)
            .map(|g| g.properties.clone())
            .ok_or_else(|| BridgeError::Engine {
                message: format!("object {} has no property group {}", object, group),
            })
    }

    fn property(&self, object: &EngineId, name: &str) -> BridgeResult<Option<PropertyInfo>> {
        Ok(self.object(object)?.property(name).map(|p| PropertyInfo {
            name: p.name.clone(),
            is_reference: matches!(p.slots, Slots::References(_)),
        }))
    }

    fn reference_count(&self, object: &EngineId, property: &str) -> BridgeResult<usize> {
        match self.slots(object, property)? {
            Slots::References(targets) => Ok(targets.len()),
            Slots::Elements(_) => Ok(0),
        }
    }

    fn reference_at(
        &self,
        object: &EngineId,
        property: &str,
        index: usize,
    ) -> BridgeResult<Option<EngineId>> {
        match self.slots(object, property)? {
            Slots::References(targets) => Ok(targets.get(index).cloned().flatten()),
            Slots::Elements(_) => Err(BridgeError::Engine {
                message: format!("{}.{} is not a reference property", object, property),
            }),
        }
    }

    fn set_reference(
        &mut self,
        object: &EngineId,
        property: &str,
        index: usize,
        target: Option<&EngineId>,
    ) -> BridgeResult<()> {
        if let Some(target) = target {
            if !self.objects.contains_key(target) {
                return Err(BridgeError::ObjectNotFound {
                    object: target.clone(),
                });
            }
        }
        match self.slots_mut(object, property)? {
            Slots::References(targets) => {
                ensure_slot(targets, index, None);
                targets[index] = target.cloned();
                Ok(())
            }
            Slots::Elements(_) => Err(BridgeError::Engine {
                message: format!("{}.{} is not a reference property", object, property),
            }),
        }
    }

    fn element_count(&self, object: &EngineId, property: &str) -> BridgeResult<usize> {
        match self.slots(object, property)? {
            Slots::Elements(values) => Ok(values.len()),
            Slots::References(_) => Ok(0),
        }
    }

    fn element_at(&self, object: &EngineId, property: &str, index: usize) -> BridgeResult<Value> {
        match self.slots(object, property)? {
            Slots::Elements(values) => Ok(values.get(index).cloned().unwrap_or(Value::Null)),
            Slots::References(_) => Err(BridgeError::Engine {
                message: format!("{}.{} is not a scalar property", object, property),
            }),
        }
    }

    fn set_element(
        &mut self,
        object: &EngineId,
        property: &str,
        index: usize,
        value: Value,
    ) -> BridgeResult<()> {
        if matches!(value, Value::Reference(_) | Value::Array(_)) {
            return Err(BridgeError::InvalidValue {
                message: format!(
                    "cannot store a {} in element {} of {}.{}",
                    value.kind_name(),
                    index,
                    object,
                    property
                ),
            });
        }
        match self.slots_mut(object, property)? {
            Slots::Elements(values) => {
                ensure_slot(values, index, Value::Null);
                values[index] = value;
                Ok(())
            }
            Slots::References(_) => Err(BridgeError::Engine {
                message: format!("{}.{} is not a scalar property", object, property),
            }),
        }
    }

    fn apply_pending_changes(&mut self, object: &EngineId) -> BridgeResult<()> {
        let obj = self.object_mut(object)?;
        obj.dirty = false;
        obj.apply_count += 1;
        debug!("[MemoryEngine] applied pending changes on {}", object);
        Ok(())
    }

    fn active_source(&self) -> Option<EngineId> {
        self.active_source.clone()
    }

    fn active_view(&self) -> Option<EngineId> {
        self.active_view.clone()
    }

    fn representation(&self, source: &EngineId, view: Option<&EngineId>) -> Option<EngineId> {
        let view = view?;
        self.representations
            .get(&(source.clone(), view.clone()))
            .cloned()
    }

    fn hide(&mut self, object: &EngineId) -> BridgeResult<()> {
        self.object_mut(object)?.hidden = true;
        Ok(())
    }

    fn delete_object(&mut self, object: &EngineId) -> BridgeResult<()> {
        self.objects
            .remove(object)
            .ok_or_else(|| BridgeError::ObjectNotFound {
                object: object.clone(),
            })?;

        // Drop every link to the removed object so the graph stays consistent
        for other in self.objects.values_mut() {
            for property in &mut other.properties {
                if let Slots::References(targets) = &mut property.slots {
                    for slot in targets.iter_mut() {
                        if slot.as_ref() == Some(object) {
                            *slot = None;
                        }
                    }
                }
            }
        }
        self.representations
            .retain(|(source, view), rep| source != object && view != object && rep != object);
        if self.active_source.as_ref() == Some(object) {
            self.active_source = None;
        }
        if self.active_view.as_ref() == Some(object) {
            self.active_view = None;
        }

        debug!(
            "[MemoryEngine] deleted {} ({} objects remain)",
            object,
            self.objects.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (MemoryEngine, EngineId, EngineId) {
        let mut engine = MemoryEngine::new();
        let source = engine.create_object("sources.Sphere", "Sphere1");
        engine
            .add_scalar(&source, Some("Properties"), "Count", vec![Value::Integer(5)])
            .unwrap();
        let rep = engine.create_object("representations.Geometry", "Rep1");
        engine
            .add_reference(&rep, Some("Inputs"), "Input", vec![Some(source.clone())])
            .unwrap();
        engine
            .add_scalar(&rep, None, "Opacity", vec![Value::Float(1.0)])
            .unwrap();
        (engine, source, rep)
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let mut engine = MemoryEngine::new();
        engine.insert_object(EngineId::from("1"), "a", "a");
        let id = engine.create_object("b", "b");
        assert_ne!(id, EngineId::from("1"));
        assert_eq!(engine.object_count(), 2);
    }

    #[test]
    fn test_groups_and_properties() {
        let (engine, _source, rep) = sample();
        assert_eq!(engine.property_group_count(&rep).unwrap(), 1);
        assert_eq!(engine.group_property_names(&rep, 0).unwrap(), vec!["Input"]);
        assert_eq!(engine.property_names(&rep).unwrap(), vec!["Input", "Opacity"]);
        assert!(engine.property(&rep, "Input").unwrap().unwrap().is_reference);
        assert!(engine.property(&rep, "Missing").unwrap().is_none());
    }

    #[test]
    fn test_set_element_marks_dirty_until_applied() {
        let (mut engine, _source, rep) = sample();
        engine
            .set_element(&rep, "Opacity", 0, Value::Float(0.5))
            .unwrap();
        assert!(engine.has_pending_changes(&rep));
        assert_eq!(
            engine.element_at(&rep, "Opacity", 0).unwrap(),
            Value::Float(0.5)
        );

        engine.apply_pending_changes(&rep).unwrap();
        assert!(!engine.has_pending_changes(&rep));
        assert_eq!(engine.apply_count(&rep), 1);
    }

    #[test]
    fn test_clear_property_empties_slots() {
        let (mut engine, source, rep) = sample();
        engine.clear_property(&rep, "Input").unwrap();
        assert_eq!(engine.reference_count(&rep, "Input").unwrap(), 0);
        assert!(engine.has_pending_changes(&rep));

        engine.clear_property(&source, "Count").unwrap();
        assert_eq!(engine.element_count(&source, "Count").unwrap(), 0);
        assert!(engine.clear_property(&source, "Ghost").is_err());
    }

    #[test]
    fn test_positional_write_extends_slots() {
        let (mut engine, source, _rep) = sample();
        engine
            .set_element(&source, "Count", 2, Value::Integer(9))
            .unwrap();
        assert_eq!(
            engine.elements(&source, "Count").unwrap(),
            vec![Value::Integer(5), Value::Null, Value::Integer(9)]
        );
        assert_eq!(engine.element_at(&source, "Count", 7).unwrap(), Value::Null);
    }

    #[test]
    fn test_set_reference_rejects_unknown_target() {
        let (mut engine, _source, rep) = sample();
        let err = engine
            .set_reference(&rep, "Input", 0, Some(&EngineId::from("nope")))
            .unwrap_err();
        assert!(matches!(err, BridgeError::ObjectNotFound { .. }));
    }

    #[test]
    fn test_delete_clears_dangling_links() {
        let (mut engine, source, rep) = sample();
        let view = engine.create_object("views.RenderView", "View1");
        engine.add_representation(source.clone(), view.clone(), rep.clone());
        engine.set_active_source(Some(source.clone()));

        engine.delete_object(&source).unwrap();

        assert!(!engine.contains(&source));
        assert_eq!(engine.references(&rep, "Input").unwrap(), vec![None]);
        assert_eq!(engine.representation(&source, Some(&view)), None);
        assert_eq!(engine.active_source(), None);
        assert!(matches!(
            engine.delete_object(&source),
            Err(BridgeError::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn test_from_json_fixture() {
        let engine = MemoryEngine::from_json(
            r#"{
                "objects": [
                    {"id": "S1", "classifier": "Source",
                     "properties": [{"name": "Count", "group": "Properties", "values": [5]}]},
                    {"id": "R1", "classifier": "Representation",
                     "properties": [{"name": "Input", "references": ["S1", null]}]}
                ],
                "active_source": "S1",
                "active_view": "V1",
                "representations": [{"source": "S1", "view": "V1", "representation": "R1"}]
            }"#,
        )
        .unwrap();

        let s1 = EngineId::from("S1");
        let r1 = EngineId::from("R1");
        assert_eq!(engine.elements(&s1, "Count").unwrap(), vec![Value::Integer(5)]);
        assert_eq!(engine.reference_count(&r1, "Input").unwrap(), 2);
        assert_eq!(engine.reference_at(&r1, "Input", 1).unwrap(), None);
        assert_eq!(engine.active_source(), Some(s1.clone()));
        assert_eq!(
            engine.representation(&s1, engine.active_view().as_ref()),
            Some(r1)
        );
    }

    #[test]
    fn test_from_json_rejects_ambiguous_property() {
        let err = MemoryEngine::from_json(
            r#"{"objects": [{"id": "S1", "classifier": "Source",
                "properties": [{"name": "Bad"}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidValue { .. }));
    }
}
