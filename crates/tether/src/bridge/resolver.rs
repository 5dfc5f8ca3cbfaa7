//! Binding resolution
//!
//! Resolving an object binds it, and everything it references, to records.
//! The identity map's `Pending` state marks objects whose resolution is on
//! the current chain, so a reference back into the chain is answered with
//! "in progress" instead of recursing again. Records that met such a
//! reference are pulled once more when the outermost call completes. When
//! the outermost call fails, every record it created is dropped again.

use tracing::{debug, warn};

use super::Bridge;
use super::dependencies::sub_objects;
use super::identity_map::BindingState;
use crate::engine::Engine;
use crate::store::{RecordStore, UiLayer};
use tether_api::{BridgeResult, EngineId, RecordId};

/// Outcome of binding one object inside a resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    Bound(RecordId),
    /// The object is an ancestor on the current chain
    InProgress,
}

/// Bookkeeping of the current top-level operation.
#[derive(Debug, Default)]
pub(crate) struct ResolutionChain {
    /// Records whose pull met an in-progress reference
    deferred: Vec<(EngineId, RecordId)>,
    /// Bindings created since the operation started
    created: Vec<(EngineId, RecordId)>,
}

impl ResolutionChain {
    pub(crate) fn defer(&mut self, object: EngineId, record: RecordId) {
        if !self.deferred.iter().any(|(_, r)| *r == record) {
            self.deferred.push((object, record));
        }
    }

    fn forget(&mut self, record: RecordId) {
        self.deferred.retain(|(_, r)| *r != record);
    }

    fn take(&mut self) -> Vec<(EngineId, RecordId)> {
        std::mem::take(&mut self.deferred)
    }

    fn created(&mut self, object: EngineId, record: RecordId) {
        self.created.push((object, record));
    }

    /// End the operation, returning the bindings it created.
    fn close(&mut self) -> Vec<(EngineId, RecordId)> {
        self.deferred.clear();
        std::mem::take(&mut self.created)
    }
}

impl<E, S, U> Bridge<E, S, U>
where
    E: Engine,
    S: RecordStore,
    U: UiLayer,
{
    /// Record bound to `object`, creating and populating it (and the
    /// records of everything it references) on first use.
    ///
    /// `None` in gives `None` out and leaves the identity map untouched.
    /// On failure no entry is left pending and no half-built record stays in
    /// the store.
    pub fn resolve(&mut self, object: Option<&EngineId>) -> BridgeResult<Option<RecordId>> {
        let Some(object) = object else {
            return Ok(None);
        };
        let result = self.resolve_binding(object);
        let resolution = self.finish_chain(result)?;
        Ok(match resolution {
            Resolution::Bound(record) => Some(record),
            Resolution::InProgress => None,
        })
    }

    pub(crate) fn resolve_binding(&mut self, object: &EngineId) -> BridgeResult<Resolution> {
        let type_name = self.type_name(object)?;
        if !self.registry.is_registered(&type_name, &self.store) {
            self.ensure_definition(object)?;
        }

        match self.identity.lookup(object) {
            BindingState::Resolved(record) => return Ok(Resolution::Bound(record)),
            BindingState::Pending => {
                debug!("[Resolver] {} is already being resolved", object);
                return Ok(Resolution::InProgress);
            }
            BindingState::Absent => {}
        }

        debug!("[Resolver] binding {} as {}", object, type_name);
        self.identity.reserve(object.clone())?;
        let mut created = None;
        match self.bind_new(object, &type_name, &mut created) {
            Ok(record) => Ok(Resolution::Bound(record)),
            Err(e) => {
                self.abandon(object, created);
                Err(e)
            }
        }
    }

    fn bind_new(
        &mut self,
        object: &EngineId,
        type_name: &str,
        created: &mut Option<RecordId>,
    ) -> BridgeResult<RecordId> {
        for sub in sub_objects(&self.engine, object)? {
            self.resolve_binding(&sub)?;
        }

        let record = self.store.create(type_name, object)?;
        *created = Some(record);
        self.chain.created(object.clone(), record);
        self.identity.finalize(object, record)?;
        self.pull_record(record)?;
        Ok(record)
    }

    /// Undo a failed binding: the entry goes back to absent and a record
    /// created for it leaves the store.
    fn abandon(&mut self, object: &EngineId, created: Option<RecordId>) {
        match created {
            Some(record) => {
                self.identity.erase(object);
                self.chain.forget(record);
                if let Err(e) = self.store.delete(record) {
                    debug!("[Resolver] record {} already gone: {}", record, e);
                }
                warn!("[Resolver] dropped binding {} -> {}", object, record);
            }
            None => {
                self.identity.release(object);
                warn!("[Resolver] released pending binding for {}", object);
            }
        }
    }

    /// Close a top-level operation. On success, records with deferred
    /// references are pulled again until none remain. On failure, every
    /// binding created during the operation is dropped, so no record is
    /// left with a back-reference that will never be filled in.
    pub(crate) fn finish_chain<T>(&mut self, result: BridgeResult<T>) -> BridgeResult<T> {
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                self.roll_back_chain();
                return Err(e);
            }
        };

        loop {
            let deferred = self.chain.take();
            if deferred.is_empty() {
                break;
            }
            for (object, record) in deferred {
                if self.store.get(record).is_none() {
                    continue;
                }
                debug!("[Resolver] completing deferred references of {}", object);
                if let Err(e) = self.pull_record(record) {
                    self.roll_back_chain();
                    return Err(e);
                }
            }
        }
        self.chain.close();
        Ok(value)
    }

    fn roll_back_chain(&mut self) {
        for (object, record) in self.chain.close().into_iter().rev() {
            if self.identity.record_for(&object) == Some(record) {
                self.identity.erase(&object);
            }
            if self.store.delete(record).is_ok() {
                warn!("[Resolver] rolled back binding {} -> {}", object, record);
            }
        }
    }
}
