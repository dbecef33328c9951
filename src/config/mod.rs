mod placeholder;

pub use placeholder::{PLACEHOLDER_CONFIGURER_NAME, PlaceholderConfigurer};

use crate::error::{BootstrapError, Result};
use dashmap::DashMap;
use serde::Deserialize;
use std::env;
use std::sync::Arc;

const ENV_PREFIX: &str = "MESHESTRA_BOOTSTRAP_";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Create a service preloaded with the process environment.
    pub fn from_env() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.value().clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get(key)
            .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(BootstrapError::Internal(format!(
                    "configuration key '{key}' is not a boolean: '{raw}'"
                ))),
            })
            .transpose()
    }
}

/// Knobs for one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Consider prototype-scoped registrations during hook discovery.
    pub include_non_singletons: bool,
    /// Passed through to capability queries; declared capabilities make it
    /// irrelevant for discovery itself.
    pub allow_eager_init: bool,
    /// Build every non-lazy singleton once the hook chain is installed.
    pub pre_instantiate_singletons: bool,
    pub allow_definition_overriding: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            include_non_singletons: true,
            allow_eager_init: false,
            pre_instantiate_singletons: true,
            allow_definition_overriding: false,
        }
    }
}

impl BootstrapConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| BootstrapError::Internal(format!("invalid bootstrap configuration: {e}")))
    }

    /// Read `MESHESTRA_BOOTSTRAP_*` keys from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_service(&ConfigService::from_env())
    }

    /// Read `MESHESTRA_BOOTSTRAP_*` keys; missing keys keep their defaults.
    pub fn from_service(service: &ConfigService) -> Result<Self> {
        let mut config = Self::default();
        let key = |name: &str| format!("{ENV_PREFIX}{name}");

        if let Some(value) = service.get_bool(&key("INCLUDE_NON_SINGLETONS"))? {
            config.include_non_singletons = value;
        }
        if let Some(value) = service.get_bool(&key("ALLOW_EAGER_INIT"))? {
            config.allow_eager_init = value;
        }
        if let Some(value) = service.get_bool(&key("PRE_INSTANTIATE_SINGLETONS"))? {
            config.pre_instantiate_singletons = value;
        }
        if let Some(value) = service.get_bool(&key("ALLOW_DEFINITION_OVERRIDING"))? {
            config.allow_definition_overriding = value;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BootstrapConfig::default();
        assert!(config.include_non_singletons);
        assert!(!config.allow_eager_init);
        assert!(config.pre_instantiate_singletons);
        assert!(!config.allow_definition_overriding);
    }

    #[test]
    fn test_from_json_keeps_missing_defaults() {
        let config = BootstrapConfig::from_json(r#"{"pre_instantiate_singletons": false}"#).unwrap();
        assert!(!config.pre_instantiate_singletons);
        assert!(config.include_non_singletons);

        assert!(BootstrapConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_from_service() {
        let service = ConfigService::new()
            .with("MESHESTRA_BOOTSTRAP_INCLUDE_NON_SINGLETONS", "false")
            .with("MESHESTRA_BOOTSTRAP_ALLOW_DEFINITION_OVERRIDING", "yes");
        let config = BootstrapConfig::from_service(&service).unwrap();
        assert!(!config.include_non_singletons);
        assert!(config.allow_definition_overriding);
        assert!(config.pre_instantiate_singletons);

        let broken = ConfigService::new().with("MESHESTRA_BOOTSTRAP_ALLOW_EAGER_INIT", "maybe");
        assert!(BootstrapConfig::from_service(&broken).is_err());
    }
}
