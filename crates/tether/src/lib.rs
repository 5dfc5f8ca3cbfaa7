pub mod bridge;
pub mod config;
pub mod content;
pub mod engine;
pub mod naming;
pub mod store;
pub mod telemetry;

pub use bridge::{BindingState, Bridge, IdentityMap};
pub use config::{BridgeConfig, RoleType};
pub use content::{ContentProvider, IntrospectingContentProvider, StaticContentProvider};
pub use engine::{Engine, MemoryEngine, PropertyInfo};
pub use naming::{ConfiguredTypeNamer, TypeNamer};
pub use store::{MemoryRecordStore, MemoryUiLayer, Record, RecordStore, UiLayer};
