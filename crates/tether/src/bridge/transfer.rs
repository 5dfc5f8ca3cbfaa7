//! Property transfer between engine objects and records

use tracing::{debug, warn};

use super::Bridge;
use super::identity_map::BindingState;
use super::resolver::Resolution;
use crate::engine::Engine;
use crate::store::{RecordStore, UiLayer};
use tether_api::{BridgeError, BridgeEvent, BridgeResult, EngineId, PropertyKind, RecordId, Value};

/// One engine slot a push will write.
#[derive(Debug, Clone)]
enum SlotWrite {
    Element { index: usize, value: Value },
    Reference { index: usize, target: Option<EngineId> },
}

#[derive(Debug, Clone)]
struct PlannedWrite {
    property: String,
    slot: SlotWrite,
}

/// What a pull read from one engine property.
enum Pulled {
    Missing,
    Empty,
    Value(Value),
    /// A referenced object is still being resolved
    Deferred,
}

impl<E, S, U> Bridge<E, S, U>
where
    E: Engine,
    S: RecordStore,
    U: UiLayer,
{
    /// Copy the engine's current values into `record` and commit it.
    pub fn pull(&mut self, record: RecordId) -> BridgeResult<()> {
        let result = self.pull_record(record);
        self.finish_chain(result)
    }

    /// Re-pull the record bound to `object`. Returns `None` when the
    /// object is not bound.
    pub fn refresh(&mut self, object: &EngineId) -> BridgeResult<Option<RecordId>> {
        match self.identity.lookup(object) {
            BindingState::Resolved(record) => {
                self.pull(record)?;
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn pull_record(&mut self, record: RecordId) -> BridgeResult<()> {
        let (object, names) = {
            let rec = self
                .store
                .get(record)
                .ok_or(BridgeError::RecordNotFound { id: record })?;
            (rec.object().clone(), rec.property_names().to_vec())
        };

        let mut values = Vec::with_capacity(names.len());
        let mut deferred = false;
        for name in names {
            match self.read_property(&object, &name)? {
                Pulled::Missing => {
                    let missing = BridgeError::MissingProperty {
                        object: object.clone(),
                        property: name.clone(),
                    };
                    warn!("[Transfer] skipping on pull: {}", missing);
                    values.push((name, None));
                }
                Pulled::Empty => values.push((name, None)),
                Pulled::Value(value) => values.push((name, Some(value))),
                Pulled::Deferred => deferred = true,
            }
        }

        let rec = self
            .store
            .get_mut(record)
            .ok_or(BridgeError::RecordNotFound { id: record })?;
        // Properties the engine no longer fills lose their stale value
        for (name, value) in values {
            match value {
                Some(value) => rec.set(&name, value)?,
                None => rec.clear(&name)?,
            };
        }
        rec.commit();

        if deferred {
            self.chain.defer(object.clone(), record);
        }
        debug!("[Transfer] pulled {} into record {}", object, record);
        self.emit(BridgeEvent::RecordCommitted { record, object });
        Ok(())
    }

    fn read_property(&mut self, object: &EngineId, name: &str) -> BridgeResult<Pulled> {
        let Some(info) = self.engine.property(object, name)? else {
            return Ok(Pulled::Missing);
        };
        let count = if info.is_reference {
            self.engine.reference_count(object, name)?
        } else {
            self.engine.element_count(object, name)?
        };
        let Some(kind) = PropertyKind::for_count(info.is_reference, count) else {
            return Ok(Pulled::Empty);
        };

        match kind {
            PropertyKind::Scalar => Ok(Pulled::Value(self.engine.element_at(object, name, 0)?)),
            PropertyKind::ScalarList => {
                let values = (0..count)
                    .map(|i| self.engine.element_at(object, name, i))
                    .collect::<BridgeResult<Vec<_>>>()?;
                Ok(Pulled::Value(Value::Array(values)))
            }
            PropertyKind::Reference => self.read_reference(object, name, 0),
            PropertyKind::ReferenceList => {
                let mut values = Vec::with_capacity(count);
                for i in 0..count {
                    match self.read_reference(object, name, i)? {
                        Pulled::Value(value) => values.push(value),
                        other => return Ok(other),
                    }
                }
                Ok(Pulled::Value(Value::Array(values)))
            }
        }
    }

    /// Resolve the object in one reference slot. Empty slots read as `Null`.
    fn read_reference(&mut self, object: &EngineId, name: &str, index: usize) -> BridgeResult<Pulled> {
        let Some(target) = self.engine.reference_at(object, name, index)? else {
            return Ok(Pulled::Value(Value::Null));
        };
        match self.resolve_binding(&target)? {
            Resolution::Bound(record) => Ok(Pulled::Value(Value::Reference(record))),
            Resolution::InProgress => Ok(Pulled::Deferred),
        }
    }

    /// Write every edited property of `record` back to its engine object,
    /// then commit the record. Returns how many engine slots read back a
    /// different value after their write.
    ///
    /// Every edit is validated before the first slot is written, and slots
    /// already written are restored if a later write fails, so a failed push
    /// leaves the engine as it was and the record still edited. Changes are
    /// applied on the engine at most once per push.
    pub fn push(&mut self, record: RecordId) -> BridgeResult<usize> {
        let (object, edits) = {
            let rec = self
                .store
                .get(record)
                .ok_or(BridgeError::RecordNotFound { id: record })?;
            let edits: Vec<(String, Value)> = rec
                .edited_property_names()
                .map(|name| (name.clone(), rec.get(name).cloned().unwrap_or(Value::Null)))
                .collect();
            (rec.object().clone(), edits)
        };

        let plan = self.plan_push(&object, edits)?;
        let changed = self.write_plan(&object, &plan)?;

        if changed > 0 {
            self.engine.apply_pending_changes(&object)?;
        }
        if let Some(rec) = self.store.get_mut(record) {
            rec.commit();
        }
        debug!("[Transfer] pushed record {} to {} ({} changes)", record, object, changed);
        self.emit(BridgeEvent::RecordCommitted { record, object });
        Ok(changed)
    }

    fn plan_push(
        &self,
        object: &EngineId,
        edits: Vec<(String, Value)>,
    ) -> BridgeResult<Vec<PlannedWrite>> {
        let mut plan = Vec::new();
        for (name, value) in edits {
            let Some(info) = self.engine.property(object, &name)? else {
                let missing = BridgeError::MissingProperty {
                    object: object.clone(),
                    property: name,
                };
                if self.config.strict_push {
                    return Err(missing);
                }
                warn!("[Transfer] skipping on push: {}", missing);
                continue;
            };

            let slots = self.plan_property(info.is_reference, &value)?;
            plan.extend(slots.into_iter().map(|slot| PlannedWrite {
                property: name.clone(),
                slot,
            }));
        }
        Ok(plan)
    }

    fn plan_property(&self, is_reference: bool, value: &Value) -> BridgeResult<Vec<SlotWrite>> {
        match (PropertyKind::for_value(is_reference, value), value) {
            (PropertyKind::Scalar, Value::Null) => Ok(Vec::new()),
            (PropertyKind::Scalar, _) => Ok(vec![element_write(0, value)?]),
            (PropertyKind::ScalarList, Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(index, item)| element_write(index, item))
                .collect(),
            (PropertyKind::Reference, _) => Ok(vec![SlotWrite::Reference {
                index: 0,
                target: self.target_object(value)?,
            }]),
            (PropertyKind::ReferenceList, Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    Ok(SlotWrite::Reference {
                        index,
                        target: self.target_object(item)?,
                    })
                })
                .collect(),
            (kind, _) => Err(BridgeError::InvalidValue {
                message: format!("cannot push a {} as {:?}", value.kind_name(), kind),
            }),
        }
    }

    /// Engine object behind a record reference; `Null` clears the slot.
    fn target_object(&self, value: &Value) -> BridgeResult<Option<EngineId>> {
        match value {
            Value::Reference(id) => {
                let target = self
                    .store
                    .get(*id)
                    .map(|rec| rec.object().clone())
                    .ok_or(BridgeError::RecordNotFound { id: *id })?;
                if !self.engine.contains(&target) {
                    return Err(BridgeError::ObjectNotFound { object: target });
                }
                Ok(Some(target))
            }
            Value::Null => Ok(None),
            other => Err(BridgeError::InvalidValue {
                message: format!("expected a record reference, got {}", other.kind_name()),
            }),
        }
    }

    fn write_plan(&mut self, object: &EngineId, plan: &[PlannedWrite]) -> BridgeResult<usize> {
        let mut undo = Vec::new();
        let mut changed = 0;
        for write in plan {
            match self.write_slot(object, write) {
                Ok((previous, slot_changed)) => {
                    if let Some(slot) = previous {
                        undo.push(PlannedWrite {
                            property: write.property.clone(),
                            slot,
                        });
                    }
                    if slot_changed {
                        changed += 1;
                    }
                }
                Err(e) => {
                    self.restore(object, undo);
                    return Err(e);
                }
            }
        }
        Ok(changed)
    }

    /// Issue one write unless the slot already holds the value. Returns the
    /// slot's previous content when a write was issued, and whether the
    /// engine reads back something different from before.
    fn write_slot(
        &mut self,
        object: &EngineId,
        write: &PlannedWrite,
    ) -> BridgeResult<(Option<SlotWrite>, bool)> {
        let name = write.property.as_str();
        match &write.slot {
            SlotWrite::Element { index, value } => {
                let before = self.engine.element_at(object, name, *index)?;
                if before == *value {
                    return Ok((None, false));
                }
                self.engine.set_element(object, name, *index, value.clone())?;
                let after = self.engine.element_at(object, name, *index)?;
                let changed = after != before;
                Ok((Some(SlotWrite::Element { index: *index, value: before }), changed))
            }
            SlotWrite::Reference { index, target } => {
                let before = self.engine.reference_at(object, name, *index)?;
                if before == *target {
                    return Ok((None, false));
                }
                self.engine.set_reference(object, name, *index, target.as_ref())?;
                let after = self.engine.reference_at(object, name, *index)?;
                let changed = after != before;
                Ok((Some(SlotWrite::Reference { index: *index, target: before }), changed))
            }
        }
    }

    fn restore(&mut self, object: &EngineId, undo: Vec<PlannedWrite>) {
        for write in undo.into_iter().rev() {
            let name = write.property.as_str();
            let result = match write.slot {
                SlotWrite::Element { index, value } => {
                    self.engine.set_element(object, name, index, value)
                }
                SlotWrite::Reference { index, target } => {
                    self.engine.set_reference(object, name, index, target.as_ref())
                }
            };
            if let Err(e) = result {
                warn!("[Transfer] could not restore {}.{}: {}", object, name, e);
            }
        }
    }
}

/// Scalar slots only hold primitives.
fn element_write(index: usize, value: &Value) -> BridgeResult<SlotWrite> {
    if matches!(value, Value::Reference(_) | Value::Array(_)) {
        return Err(BridgeError::InvalidValue {
            message: format!("a scalar slot cannot hold a {}", value.kind_name()),
        });
    }
    Ok(SlotWrite::Element {
        index,
        value: value.clone(),
    })
}
