//! Logical type naming for engine objects

use std::collections::BTreeMap;

use crate::config::{BridgeConfig, RoleType};
use crate::engine::Engine;
use tether_api::{BridgeResult, EngineId};

/// Maps an engine object to the schema type name its record uses.
pub trait TypeNamer {
    fn type_name(&self, engine: &dyn Engine, object: &EngineId) -> BridgeResult<String>;
}

/// Applies role rules first, then aliases, then falls back to the raw
/// classifier.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredTypeNamer {
    aliases: BTreeMap<String, String>,
    roles: Vec<RoleType>,
}

impl ConfiguredTypeNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            aliases: config.type_aliases.clone(),
            roles: config.role_types.clone(),
        }
    }

    pub fn with_alias(mut self, classifier: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.aliases.insert(classifier.into(), type_name.into());
        self
    }

    pub fn with_role(mut self, role: RoleType) -> Self {
        self.roles.push(role);
        self
    }
}

impl TypeNamer for ConfiguredTypeNamer {
    fn type_name(&self, engine: &dyn Engine, object: &EngineId) -> BridgeResult<String> {
        let classifier = engine.type_classifier(object)?;

        let role_rules: Vec<&RoleType> = self
            .roles
            .iter()
            .filter(|r| r.classifier == classifier)
            .collect();
        if !role_rules.is_empty() {
            let label = engine.object_label(object)?;
            if let Some(rule) = role_rules
                .into_iter()
                .find(|r| label.starts_with(&r.label_prefix))
            {
                return Ok(rule.type_name.clone());
            }
        }

        Ok(self.aliases.get(&classifier).cloned().unwrap_or(classifier))
    }
}
