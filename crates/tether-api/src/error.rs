use serde::{Deserialize, Serialize};

use crate::ids::{EngineId, RecordId};

/// Structured error types for bridge operations.
///
/// Only `MissingProperty` is recovered inside the bridge (logged and the
/// property skipped); every other variant reaches the notification handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum BridgeError {
    #[error("Object {object} has no property {property}")]
    MissingProperty { object: EngineId, property: String },

    #[error("Failed to load schema for type {type_name}: {message}")]
    SchemaLoad { type_name: String, message: String },

    #[error("Cannot delete {object}: it was never bound to a record")]
    UnboundDeletionTarget { object: EngineId },

    #[error("Engine object not found: {object}")]
    ObjectNotFound { object: EngineId },

    #[error("Record not found: {id}")]
    RecordNotFound { id: RecordId },

    #[error("No definition registered for type {type_name}")]
    UnknownType { type_name: String },

    #[error("Binding conflict for {object}: {message}")]
    BindingConflict { object: EngineId, message: String },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Engine error: {message}")]
    Engine { message: String },
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
