//! Schema content providers
//!
//! A content provider supplies, per type, the model description loaded into
//! the record store and the layout description loaded into the UI layer.

use std::collections::{BTreeMap, HashMap};

use crate::bridge::dependencies::ordered_property_names;
use crate::engine::Engine;
use tether_api::{
    BridgeError, BridgeResult, EngineId, FieldDefinition, FieldType, ModelDescription,
};

pub trait ContentProvider {
    /// YAML model description declaring `type_name`
    fn model_description(
        &self,
        engine: &dyn Engine,
        object: &EngineId,
        type_name: &str,
    ) -> BridgeResult<String>;

    /// XML layout description for `type_name`
    fn ui_description(
        &self,
        engine: &dyn Engine,
        object: &EngineId,
        type_name: &str,
    ) -> BridgeResult<String>;
}

/// Derives both descriptions from the live object's own properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntrospectingContentProvider;

impl IntrospectingContentProvider {
    pub fn new() -> Self {
        Self
    }

    fn field(engine: &dyn Engine, object: &EngineId, name: &str) -> BridgeResult<Option<FieldDefinition>> {
        let Some(info) = engine.property(object, name)? else {
            return Ok(None);
        };

        let (field_type, size) = if info.is_reference {
            (FieldType::Reference, engine.reference_count(object, name)?)
        } else {
            let size = engine.element_count(object, name)?;
            let field_type = if size > 0 {
                FieldType::of_value(&engine.element_at(object, name, 0)?)
            } else {
                FieldType::String
            };
            (field_type, size)
        };

        let mut field = FieldDefinition::new(field_type).with_label(name);
        if size > 1 {
            field = field.with_size(size);
        }
        Ok(Some(field))
    }
}

impl ContentProvider for IntrospectingContentProvider {
    fn model_description(
        &self,
        engine: &dyn Engine,
        object: &EngineId,
        type_name: &str,
    ) -> BridgeResult<String> {
        let mut fields = BTreeMap::new();
        for name in ordered_property_names(engine, object)? {
            if let Some(field) = Self::field(engine, object, &name)? {
                fields.insert(name, field);
            }
        }

        let mut model = ModelDescription::new();
        model.insert(type_name.to_string(), fields);
        serde_yaml::to_string(&model).map_err(|e| BridgeError::SchemaLoad {
            type_name: type_name.to_string(),
            message: e.to_string(),
        })
    }

    fn ui_description(
        &self,
        engine: &dyn Engine,
        object: &EngineId,
        type_name: &str,
    ) -> BridgeResult<String> {
        let mut xml = format!("<layout id=\"{}\">\n", escape_attribute(type_name));
        for name in ordered_property_names(engine, object)? {
            xml.push_str(&format!("  <input name=\"{}\" />\n", escape_attribute(&name)));
        }
        xml.push_str("</layout>\n");
        Ok(xml)
    }
}

fn escape_attribute(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Serves pre-written descriptions registered per type name.
#[derive(Debug, Default, Clone)]
pub struct StaticContentProvider {
    entries: HashMap<String, (String, String)>,
}

impl StaticContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(
        mut self,
        type_name: impl Into<String>,
        model: impl Into<String>,
        ui: impl Into<String>,
    ) -> Self {
        self.entries
            .insert(type_name.into(), (model.into(), ui.into()));
        self
    }

    fn entry(&self, type_name: &str) -> BridgeResult<&(String, String)> {
        self.entries
            .get(type_name)
            .ok_or_else(|| BridgeError::SchemaLoad {
                type_name: type_name.to_string(),
                message: "no content registered for this type".to_string(),
            })
    }
}

impl ContentProvider for StaticContentProvider {
    fn model_description(
        &self,
        _engine: &dyn Engine,
        _object: &EngineId,
        type_name: &str,
    ) -> BridgeResult<String> {
        self.entry(type_name).map(|(model, _)| model.clone())
    }

    fn ui_description(
        &self,
        _engine: &dyn Engine,
        _object: &EngineId,
        type_name: &str,
    ) -> BridgeResult<String> {
        self.entry(type_name).map(|(_, ui)| ui.clone())
    }
}
