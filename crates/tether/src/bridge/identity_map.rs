//! Engine object to record binding table

use std::collections::HashMap;

use tether_api::{BridgeError, BridgeResult, EngineId, RecordId};

/// Binding state of one engine object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Absent,
    /// Resolution has started but no record exists yet
    Pending,
    Resolved(RecordId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Pending,
    Resolved(RecordId),
}

/// Table of bindings between engine objects and records.
///
/// Transitions: `Absent -> Pending` (`reserve`), `Pending -> Resolved`
/// (`finalize`), `Pending -> Absent` (`release`) and `any -> Absent`
/// (`erase`). Nothing else mutates an entry.
#[derive(Debug, Default, Clone)]
pub struct IdentityMap {
    entries: HashMap<EngineId, Entry>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, object: &EngineId) -> BindingState {
        match self.entries.get(object) {
            None => BindingState::Absent,
            Some(Entry::Pending) => BindingState::Pending,
            Some(Entry::Resolved(record)) => BindingState::Resolved(*record),
        }
    }

    /// Record bound to `object`, if resolution finished.
    pub fn record_for(&self, object: &EngineId) -> Option<RecordId> {
        match self.lookup(object) {
            BindingState::Resolved(record) => Some(record),
            _ => None,
        }
    }

    pub fn reserve(&mut self, object: EngineId) -> BridgeResult<()> {
        if let Some(entry) = self.entries.get(&object) {
            return Err(BridgeError::BindingConflict {
                message: format!("cannot reserve an object already {:?}", entry),
                object,
            });
        }
        self.entries.insert(object, Entry::Pending);
        Ok(())
    }

    pub fn finalize(&mut self, object: &EngineId, record: RecordId) -> BridgeResult<()> {
        match self.entries.get(object) {
            Some(Entry::Pending) => {
                self.entries.insert(object.clone(), Entry::Resolved(record));
                Ok(())
            }
            other => Err(BridgeError::BindingConflict {
                object: object.clone(),
                message: format!("cannot finalize a binding in state {:?}", other),
            }),
        }
    }

    /// Drop a pending reservation. Resolved bindings are left alone.
    /// Returns whether an entry was released.
    pub fn release(&mut self, object: &EngineId) -> bool {
        if self.entries.get(object) == Some(&Entry::Pending) {
            self.entries.remove(object);
            true
        } else {
            false
        }
    }

    /// Remove the entry whatever its state, returning the state it had.
    pub fn erase(&mut self, object: &EngineId) -> BindingState {
        let previous = self.lookup(object);
        self.entries.remove(object);
        previous
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, Entry::Pending))
            .count()
    }

    /// Every finished binding, in no particular order.
    pub fn resolved(&self) -> impl Iterator<Item = (&EngineId, RecordId)> {
        self.entries.iter().filter_map(|(object, entry)| match entry {
            Entry::Resolved(record) => Some((object, *record)),
            Entry::Pending => None,
        })
    }
}
