use tracing::{info, warn};

use super::Bridge;
use super::identity_map::BindingState;
use crate::engine::Engine;
use crate::store::{RecordStore, UiLayer};
use tether_api::{BridgeError, BridgeEvent, BridgeResult, EngineId, RecordId, Value};

impl<E, S, U> Bridge<E, S, U>
where
    E: Engine,
    S: RecordStore,
    U: UiLayer,
{
    /// Delete a bound primary object together with its representation in
    /// the active view.
    ///
    /// Both must be bound. Records go first (secondary before primary), then
    /// the engine hides and deletes the secondary and deletes the primary.
    /// Records that referenced either one are pulled again, the deletion
    /// events go out, and the selection is refreshed last. A failed refresh
    /// is returned as an error after the events were sent.
    pub fn delete(&mut self, primary: &EngineId) -> BridgeResult<()> {
        let primary_record = self.bound_record(primary)?;

        let view = self.engine.active_view();
        let secondary = match self.engine.representation(primary, view.as_ref()) {
            Some(object) => {
                let record = self.bound_record(&object)?;
                Some((object, record))
            }
            None => None,
        };

        if let Some((object, record)) = &secondary {
            self.store.delete(*record)?;
            self.identity.erase(object);
        }
        self.store.delete(primary_record)?;
        self.identity.erase(primary);

        if let Some((object, _)) = &secondary {
            self.engine.hide(object)?;
            self.engine.delete_object(object)?;
        }
        self.engine.delete_object(primary)?;
        info!(
            "[Deletion] deleted {} (record {}){}",
            primary,
            primary_record,
            secondary
                .as_ref()
                .map(|(object, record)| format!(" with {} (record {})", object, record))
                .unwrap_or_default()
        );

        let mut removed = vec![primary_record];
        if let Some((_, record)) = &secondary {
            removed.push(*record);
        }
        self.repull_referrers(&removed);

        if let Some((object, record)) = secondary {
            self.emit(BridgeEvent::Deleted { record, object });
        }
        self.emit(BridgeEvent::Deleted {
            record: primary_record,
            object: primary.clone(),
        });
        self.emit(BridgeEvent::DataChanged);

        self.on_active_change()?;
        Ok(())
    }

    /// Pull every record still holding a reference to a removed record.
    /// The engine already emptied those slots. Failures are logged only.
    fn repull_referrers(&mut self, removed: &[RecordId]) {
        let referrers: Vec<RecordId> = self
            .store
            .record_ids()
            .into_iter()
            .filter(|id| {
                self.store.get(*id).is_some_and(|rec| {
                    rec.property_names()
                        .iter()
                        .filter_map(|name| rec.get(name))
                        .any(|value| references_any(value, removed))
                })
            })
            .collect();

        for record in referrers {
            if let Err(e) = self.pull(record) {
                warn!("[Deletion] could not refresh record {}: {}", record, e);
            }
        }
    }

    fn bound_record(&self, object: &EngineId) -> BridgeResult<RecordId> {
        match self.identity.lookup(object) {
            BindingState::Resolved(record) => Ok(record),
            _ => Err(BridgeError::UnboundDeletionTarget {
                object: object.clone(),
            }),
        }
    }
}

fn references_any(value: &Value, records: &[RecordId]) -> bool {
    match value {
        Value::Reference(id) => records.contains(id),
        Value::Array(items) => items.iter().any(|item| references_any(item, records)),
        _ => false,
    }
}
