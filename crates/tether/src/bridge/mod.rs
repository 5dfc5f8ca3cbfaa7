//! The bridge service
//!
//! `Bridge` owns the identity map and the schema registry, and holds the
//! engine, the record store and the UI layer it keeps in sync. Its
//! operations are split by concern:
//!
//! - `resolver`: lazy, cycle-safe binding of engine objects to records
//! - `transfer`: pull (engine to record) and push (record to engine)
//! - `deletion`: paired deletion across both systems
//! - `tracker`: active object selection

pub mod dependencies;
mod deletion;
pub mod identity_map;
mod resolver;
pub mod schema_registry;
mod tracker;
mod transfer;

pub use identity_map::{BindingState, IdentityMap};
pub use schema_registry::{DefinitionSources, SchemaRegistry};

use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::content::{ContentProvider, IntrospectingContentProvider};
use crate::engine::Engine;
use crate::naming::{ConfiguredTypeNamer, TypeNamer};
use crate::store::{MemoryUiLayer, RecordStore, UiLayer};
use resolver::ResolutionChain;
use tether_api::{BridgeEvent, BridgeResult, EngineId, Notification, Selection};

/// Keeps one engine and one record store consistent.
///
/// # Example
///
/// ```rust
/// use tether::bridge::Bridge;
/// use tether::engine::MemoryEngine;
/// use tether::store::{MemoryRecordStore, RecordStore};
/// use tether_api::Value;
///
/// let mut engine = MemoryEngine::new();
/// let sphere = engine.create_object("Sphere", "Sphere1");
/// engine
///     .add_scalar(&sphere, Some("Properties"), "Radius", vec![Value::Float(0.5)])
///     .unwrap();
///
/// let mut bridge = Bridge::new(engine, MemoryRecordStore::new());
/// let record = bridge.resolve(Some(&sphere)).unwrap().unwrap();
/// assert_eq!(
///     bridge.store().get(record).unwrap().get("Radius"),
///     Some(&Value::Float(0.5))
/// );
/// ```
pub struct Bridge<E, S, U = MemoryUiLayer>
where
    E: Engine,
    S: RecordStore,
    U: UiLayer,
{
    engine: E,
    store: S,
    ui: U,
    content: Box<dyn ContentProvider>,
    namer: Box<dyn TypeNamer>,
    config: BridgeConfig,
    identity: IdentityMap,
    registry: SchemaRegistry,
    chain: ResolutionChain,
    events: broadcast::Sender<BridgeEvent>,
    selection: watch::Sender<Selection>,
}

impl<E, S> Bridge<E, S, MemoryUiLayer>
where
    E: Engine,
    S: RecordStore,
{
    pub fn new(engine: E, store: S) -> Self {
        Self::from_config(engine, store, BridgeConfig::default())
    }

    /// Bridge whose type naming and push policy follow `config`.
    pub fn from_config(engine: E, store: S, config: BridgeConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (selection, _) = watch::channel(Selection::default());
        Self {
            engine,
            store,
            ui: MemoryUiLayer::new(),
            content: Box::new(IntrospectingContentProvider::new()),
            namer: Box::new(ConfiguredTypeNamer::from_config(&config)),
            config,
            identity: IdentityMap::new(),
            registry: SchemaRegistry::new(),
            chain: ResolutionChain::default(),
            events,
            selection,
        }
    }
}

impl<E, S, U> Bridge<E, S, U>
where
    E: Engine,
    S: RecordStore,
    U: UiLayer,
{
    pub fn with_ui<V: UiLayer>(self, ui: V) -> Bridge<E, S, V> {
        Bridge {
            engine: self.engine,
            store: self.store,
            ui,
            content: self.content,
            namer: self.namer,
            config: self.config,
            identity: self.identity,
            registry: self.registry,
            chain: self.chain,
            events: self.events,
            selection: self.selection,
        }
    }

    pub fn with_content_provider(mut self, content: impl ContentProvider + 'static) -> Self {
        self.content = Box::new(content);
        self
    }

    pub fn with_type_namer(mut self, namer: impl TypeNamer + 'static) -> Self {
        self.namer = Box::new(namer);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Direct engine access, for hosts that mutate the engine between
    /// notifications.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access, used by editors to change record values.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.registry
            .registered_types()
            .map(str::to_string)
            .collect()
    }

    /// Logical type name of `object`.
    pub fn type_name(&self, object: &EngineId) -> BridgeResult<String> {
        self.namer.type_name(&self.engine, object)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    pub fn watch_selection(&self) -> watch::Receiver<Selection> {
        self.selection.subscribe()
    }

    /// Current selection without subscribing.
    pub fn selection(&self) -> Selection {
        self.selection.borrow().clone()
    }

    /// Register the schema of `object`'s type, and of the types it depends
    /// on, unless already registered. Returns the newly registered types.
    pub fn ensure_definition(&mut self, object: &EngineId) -> BridgeResult<Vec<String>> {
        let sources = DefinitionSources {
            engine: &self.engine,
            content: self.content.as_ref(),
            namer: self.namer.as_ref(),
        };
        let result =
            self.registry
                .ensure_definition(&sources, &mut self.store, &mut self.ui, object);

        // Types registered before a failure stay registered, report them too
        let registered = self.registry.take_recent();
        for type_name in &registered {
            self.emit(BridgeEvent::DefinitionRegistered {
                type_name: type_name.clone(),
            });
        }
        result.map(|_| registered)
    }

    /// Dispatch one notification from the host.
    pub fn handle(&mut self, notification: Notification) -> BridgeResult<()> {
        debug!("[Bridge] handling {:?}", notification);
        let result = match notification {
            Notification::ActiveObjectChanged => self.on_active_change().map(|_| ()),
            Notification::DeleteRequested(object) => self.delete(&object),
            Notification::RecordEdited(record) => self.push(record).map(|changed| {
                if changed > 0 {
                    self.emit(BridgeEvent::DataChanged);
                }
            }),
        };
        if let Err(e) = &result {
            warn!("[Bridge] notification failed: {}", e);
        }
        result
    }

    /// Broadcast an event. Having no subscriber is not an error.
    fn emit(&self, event: BridgeEvent) {
        let _ = self.events.send(event);
    }
}
