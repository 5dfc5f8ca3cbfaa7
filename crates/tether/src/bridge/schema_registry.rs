//! On-demand schema registration
//!
//! A type is registered the first time an object of that type is met. Types
//! of referenced objects are registered before the referencing type, so a
//! model never mentions a type the store has not seen yet.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use super::dependencies::sub_objects;
use crate::content::ContentProvider;
use crate::engine::Engine;
use crate::naming::TypeNamer;
use crate::store::{RecordStore, UiLayer};
use tether_api::{BridgeError, BridgeResult, EngineId};

/// Read-only collaborators a registration walk draws from.
pub struct DefinitionSources<'a> {
    pub engine: &'a dyn Engine,
    pub content: &'a dyn ContentProvider,
    pub namer: &'a dyn TypeNamer,
}

/// Append-only set of registered type names.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    registered: BTreeSet<String>,
    /// Types registered since the last `take_recent`
    recent: Vec<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self, type_name: &str, store: &dyn RecordStore) -> bool {
        self.registered.contains(type_name) || store.has_definition(type_name)
    }

    pub fn registered_types(&self) -> impl Iterator<Item = &str> {
        self.registered.iter().map(String::as_str)
    }

    /// Types registered since the previous call, in registration order.
    pub fn take_recent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.recent)
    }

    /// Register the type of `object` and, first, the types of everything
    /// it references. No-op when the type is already registered.
    ///
    /// Registration is not rolled back: types loaded before an error stay
    /// registered.
    pub fn ensure_definition(
        &mut self,
        sources: &DefinitionSources<'_>,
        store: &mut dyn RecordStore,
        ui: &mut dyn UiLayer,
        object: &EngineId,
    ) -> BridgeResult<()> {
        let mut visited = HashSet::new();
        self.walk(sources, store, ui, object, &mut visited)
    }

    fn walk(
        &mut self,
        sources: &DefinitionSources<'_>,
        store: &mut dyn RecordStore,
        ui: &mut dyn UiLayer,
        object: &EngineId,
        visited: &mut HashSet<EngineId>,
    ) -> BridgeResult<()> {
        if !visited.insert(object.clone()) {
            return Ok(());
        }

        let type_name = sources.namer.type_name(sources.engine, object)?;
        if self.is_registered(&type_name, store) {
            return Ok(());
        }

        for sub in sub_objects(sources.engine, object)? {
            self.walk(sources, store, ui, &sub, visited)?;
        }

        // A sub-object of the same type may have registered it meanwhile
        if self.is_registered(&type_name, store) {
            return Ok(());
        }

        self.load(sources, store, ui, object, &type_name)
    }

    fn load(
        &mut self,
        sources: &DefinitionSources<'_>,
        store: &mut dyn RecordStore,
        ui: &mut dyn UiLayer,
        object: &EngineId,
        type_name: &str,
    ) -> BridgeResult<()> {
        debug!("[SchemaRegistry] loading {} from object {}", type_name, object);
        let schema_error = |e| into_schema_error(type_name, e);

        let model = sources
            .content
            .model_description(sources.engine, object, type_name)
            .map_err(schema_error)?;
        let declared = store.load_model(&model).map_err(schema_error)?;
        if !declared.iter().any(|name| name == type_name) {
            return Err(BridgeError::SchemaLoad {
                type_name: type_name.to_string(),
                message: format!("model description declares {:?} only", declared),
            });
        }
        ui.load_language(&model).map_err(schema_error)?;

        let layout = sources
            .content
            .ui_description(sources.engine, object, type_name)
            .map_err(schema_error)?;
        ui.load_ui(&layout).map_err(schema_error)?;

        self.registered.insert(type_name.to_string());
        self.recent.push(type_name.to_string());
        info!("[SchemaRegistry] registered type {}", type_name);
        Ok(())
    }
}

fn into_schema_error(type_name: &str, err: BridgeError) -> BridgeError {
    match err {
        err @ BridgeError::SchemaLoad { .. } => err,
        other => BridgeError::SchemaLoad {
            type_name: type_name.to_string(),
            message: other.to_string(),
        },
    }
}
