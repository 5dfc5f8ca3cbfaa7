//! Notifications consumed by the bridge and events it publishes.

use serde::{Deserialize, Serialize};

use crate::ids::{EngineId, RecordId};

/// Inbound notification from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// The engine's active object (or active view) changed
    ActiveObjectChanged,
    /// The user asked to delete a primary engine object
    DeleteRequested(EngineId),
    /// A record was edited in the property model and should be pushed
    RecordEdited(RecordId),
}

/// Outbound event announced to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// A type's model and UI description were loaded
    DefinitionRegistered { type_name: String },
    /// A record reached a clean state after pull or push; triggers a re-render
    RecordCommitted { record: RecordId, object: EngineId },
    /// Engine state changed and views should refresh
    DataChanged,
    /// A record and its engine object were removed together
    Deleted { record: RecordId, object: EngineId },
}

/// An engine object together with the record mirroring it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedObject {
    pub object: EngineId,
    pub record: RecordId,
}

/// Current selection, published as one value per change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub source: Option<SelectedObject>,
    pub representation: Option<SelectedObject>,
}

impl Selection {
    pub fn source_record(&self) -> Option<RecordId> {
        self.source.as_ref().map(|s| s.record)
    }

    pub fn representation_record(&self) -> Option<RecordId> {
        self.representation.as_ref().map(|s| s.record)
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.representation.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let events = vec![
            BridgeEvent::DefinitionRegistered {
                type_name: "Source".to_string(),
            },
            BridgeEvent::RecordCommitted {
                record: RecordId::new(1),
                object: EngineId::from("S1"),
            },
            BridgeEvent::DataChanged,
            BridgeEvent::Deleted {
                record: RecordId::new(2),
                object: EngineId::from("R1"),
            },
        ];

        for event in events {
            let json = serde_json::to_string(&event).expect("Failed to serialize event");
            let deserialized: BridgeEvent =
                serde_json::from_str(&json).expect("Failed to deserialize event");
            assert_eq!(event, deserialized);
        }
    }

    #[test]
    fn test_selection_default_is_empty() {
        let selection = Selection::default();
        assert!(selection.is_empty());
        assert_eq!(selection.source_record(), None);

        let selection = Selection {
            source: Some(SelectedObject {
                object: EngineId::from("S1"),
                record: RecordId::new(4),
            }),
            representation: None,
        };
        assert_eq!(selection.source_record(), Some(RecordId::new(4)));
        assert!(!selection.is_empty());
    }
}
