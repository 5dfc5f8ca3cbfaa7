//! Engine accessor contract
//!
//! The bridge never owns engine objects. Everything it needs from the engine
//! goes through the `Engine` trait, addressed by `EngineId` handles.

pub mod memory;

pub use memory::MemoryEngine;

use tether_api::{BridgeResult, EngineId, Value};

/// Static description of one engine property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    /// True when the slots hold other engine objects rather than primitives
    pub is_reference: bool,
}

/// Narrow view of a stateful engine.
///
/// Calls run synchronously on the caller's thread. Writes made through
/// `set_element` and `set_reference` are readable right away but only take
/// effect downstream once `apply_pending_changes` is called for the object.
/// `delete_object` must have completed by the time it returns.
pub trait Engine {
    fn contains(&self, object: &EngineId) -> bool;

    /// Raw class of the object, before role-aware naming
    fn type_classifier(&self, object: &EngineId) -> BridgeResult<String>;

    /// Human-readable name, used in diagnostics and role rules
    fn object_label(&self, object: &EngineId) -> BridgeResult<String>;

    /// Every property name of the object, in declaration order
    fn property_names(&self, object: &EngineId) -> BridgeResult<Vec<String>>;

    fn property_group_count(&self, object: &EngineId) -> BridgeResult<usize>;

    fn group_property_names(&self, object: &EngineId, group: usize) -> BridgeResult<Vec<String>>;

    /// `None` when the object exposes no property with that name
    fn property(&self, object: &EngineId, name: &str) -> BridgeResult<Option<PropertyInfo>>;

    fn reference_count(&self, object: &EngineId, property: &str) -> BridgeResult<usize>;

    fn reference_at(
        &self,
        object: &EngineId,
        property: &str,
        index: usize,
    ) -> BridgeResult<Option<EngineId>>;

    fn set_reference(
        &mut self,
        object: &EngineId,
        property: &str,
        index: usize,
        target: Option<&EngineId>,
    ) -> BridgeResult<()>;

    fn element_count(&self, object: &EngineId, property: &str) -> BridgeResult<usize>;

    /// Out-of-range reads yield `Value::Null`
    fn element_at(&self, object: &EngineId, property: &str, index: usize) -> BridgeResult<Value>;

    fn set_element(
        &mut self,
        object: &EngineId,
        property: &str,
        index: usize,
        value: Value,
    ) -> BridgeResult<()>;

    fn apply_pending_changes(&mut self, object: &EngineId) -> BridgeResult<()>;

    fn active_source(&self) -> Option<EngineId>;

    fn active_view(&self) -> Option<EngineId>;

    /// Representation paired with `source` in `view`
    fn representation(&self, source: &EngineId, view: Option<&EngineId>) -> Option<EngineId>;

    fn hide(&mut self, object: &EngineId) -> BridgeResult<()>;

    fn delete_object(&mut self, object: &EngineId) -> BridgeResult<()>;
}
