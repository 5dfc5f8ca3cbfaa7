use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Bridge configuration, usually loaded from YAML.
///
/// ```yaml
/// log_filter: "tether=debug"
/// type_aliases:
///   sources.SphereSource: Sphere
/// role_types:
///   - classifier: representations.GeometryRepresentation
///     label_prefix: Outline
///     type_name: OutlineRepresentation
/// strict_push: false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub log_filter: String,
    /// Classifier to logical type name
    pub type_aliases: BTreeMap<String, String>,
    /// Rules for identically-classed objects that play different roles
    pub role_types: Vec<RoleType>,
    /// Treat a missing engine property during push as an error
    pub strict_push: bool,
    /// Buffer size of the event broadcast channel
    pub event_capacity: usize,
}

/// Objects of `classifier` whose label starts with `label_prefix` are typed
/// as `type_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleType {
    pub classifier: String,
    pub label_prefix: String,
    pub type_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            type_aliases: BTreeMap::new(),
            role_types: Vec::new(),
            strict_push: false,
            event_capacity: 256,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;

        Self::from_yaml_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: BridgeConfig = serde_yaml::from_str(content)?;
        if config.event_capacity == 0 {
            anyhow::bail!("event_capacity must be at least 1");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = BridgeConfig::from_yaml_str("strict_push: true\n").unwrap();
        assert!(config.strict_push);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.event_capacity, 256);
        assert!(config.role_types.is_empty());
    }

    #[test]
    fn test_role_types_and_aliases() {
        let config = BridgeConfig::from_yaml_str(
            r#"
type_aliases:
  sources.SphereSource: Sphere
role_types:
  - classifier: representations.Geometry
    label_prefix: Outline
    type_name: OutlineRepresentation
"#,
        )
        .unwrap();
        assert_eq!(
            config.type_aliases.get("sources.SphereSource").map(String::as_str),
            Some("Sphere")
        );
        assert_eq!(config.role_types[0].type_name, "OutlineRepresentation");
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(BridgeConfig::from_yaml_str("event_capacity: 0\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_filter: \"tether=debug\"").unwrap();
        let config = BridgeConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.log_filter, "tether=debug");

        let err = BridgeConfig::load_from_file(Path::new("/nonexistent/tether.yaml"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
