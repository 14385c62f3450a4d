// Adapter configuration
//
// The static options a host ships with the plugin: a default API key, the
// default logging verbosity, the OS capability level the permission policy
// is keyed on, and whether `start` is gated on permissions.

use crate::capability::ApiLevel;
use crate::codec::{identifier, ApiKey};
use crate::controller::ControllerDefaults;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

pub const ENV_API_KEY: &str = "MESHLINK_API_KEY";
pub const ENV_VERBOSE_LOGGING: &str = "MESHLINK_VERBOSE_LOGGING";
pub const ENV_API_LEVEL: &str = "MESHLINK_API_LEVEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterConfig {
    /// Used by `initialize` when the call carries no key. A malformed key is
    /// treated as absent.
    #[serde(deserialize_with = "lenient_api_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKey>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose_logging: Option<bool>,

    pub api_level: ApiLevel,

    /// Reject `start` until the default capability set is granted.
    pub permission_gate: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            verbose_logging: None,
            api_level: ApiLevel::default(),
            permission_gate: true,
        }
    }
}

fn lenient_api_key<'de, D>(deserializer: D) -> Result<Option<ApiKey>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(identifier::parse))
}

impl AdapterConfig {
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_API_KEY) {
            match identifier::parse(&value) {
                Some(key) => self.api_key = Some(key),
                None => tracing::warn!("Ignoring malformed {}", ENV_API_KEY),
            }
        }
        if let Some(value) = lookup(ENV_VERBOSE_LOGGING) {
            match value.trim().parse::<bool>() {
                Ok(verbose) => self.verbose_logging = Some(verbose),
                Err(_) => tracing::warn!("Ignoring malformed {}={:?}", ENV_VERBOSE_LOGGING, value),
            }
        }
        if let Some(value) = lookup(ENV_API_LEVEL) {
            match value.trim().parse::<u32>() {
                Ok(level) => self.api_level = ApiLevel(level),
                Err(_) => tracing::warn!("Ignoring malformed {}={:?}", ENV_API_LEVEL, value),
            }
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub fn controller_defaults(&self) -> ControllerDefaults {
        ControllerDefaults {
            api_key: self.api_key,
            verbose_logging: self.verbose_logging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::from_json("{}").unwrap();
        assert_eq!(config, AdapterConfig::default());
        assert!(config.permission_gate);
        assert_eq!(config.api_level, ApiLevel::TIRAMISU);
    }

    #[test]
    fn test_malformed_key_is_absent() {
        let config = AdapterConfig::from_json(r#"{"apiKey": "not-a-key"}"#).unwrap();
        assert_eq!(config.api_key, None);
        let config = AdapterConfig::from_json(r#"{"apiKey": 42}"#).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_camel_case_fields() {
        let key = uuid::Uuid::new_v4();
        let json = format!(
            r#"{{"apiKey": "{key}", "verboseLogging": false, "apiLevel": 30, "permissionGate": false}}"#
        );
        let config = AdapterConfig::from_json(&json).unwrap();
        assert_eq!(config.api_key, Some(key));
        assert_eq!(config.verbose_logging, Some(false));
        assert_eq!(config.api_level, ApiLevel(30));
        assert!(!config.permission_gate);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AdapterConfig {
            api_key: Some(uuid::Uuid::new_v4()),
            verbose_logging: Some(true),
            api_level: ApiLevel::Q,
            permission_gate: false,
        };
        config.save(&path).unwrap();
        assert_eq!(AdapterConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AdapterConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AdapterConfig::default());
    }

    #[test]
    fn test_overrides() {
        let key = uuid::Uuid::new_v4();
        let vars: HashMap<&str, String> = HashMap::from([
            (ENV_API_KEY, key.to_string()),
            (ENV_VERBOSE_LOGGING, "true".to_string()),
            (ENV_API_LEVEL, "nope".to_string()),
        ]);
        let mut config = AdapterConfig::default();
        config.apply_overrides(|name| vars.get(name).cloned());
        assert_eq!(config.api_key, Some(key));
        assert_eq!(config.verbose_logging, Some(true));
        assert_eq!(config.api_level, ApiLevel::TIRAMISU);
    }
}
