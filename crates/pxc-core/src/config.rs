//! Configuration management for the credential controller.
//!
//! This module provides multi-layer configuration support with:
//! - File-based configuration
//! - Environment variable overrides
//! - Programmatic updates
//! - Schema validation
//!
//! ## Configuration Layers
//!
//! Configuration values are resolved in this priority order:
//! 1. Environment variables (`PXC_STORE__URL` sets `store.url`)
//! 2. Programmatically set values
//! 3. Values loaded from file
//! 4. Default values
//!
//! ## Example
//!
//! ```no_run
//! use pxc_core::config::{Config, ControllerConfig};
//!
//! // Load the typed controller configuration
//! let config = ControllerConfig::load_from("/etc/pxc-secrets/config.yml")?;
//!
//! // Or work with the raw layers
//! let mut raw = Config::load("/etc/pxc-secrets/config.yml")?;
//! raw.set("retry.max_attempts", 8)?;
//! let attempts: u32 = raw.get("retry.max_attempts").unwrap_or(5);
//! # Ok::<(), pxc_types::PxcError>(())
//! ```

use pxc_types::{PxcError, Result};
use pxc_types::config::{LogConfig, RetryConfig, StoreConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::fs;
use crate::util::data::{deep_merge, get_path, load_yaml};

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "PXC_";

/// Configuration layer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// Default values
    Default = 0,
    /// Values loaded from file
    Loaded = 1,
    /// Values set programmatically
    Set = 2,
    /// Values from environment variables
    Environment = 3,
}

impl ConfigLayer {
    /// Layers from lowest to highest priority.
    const ASCENDING: [ConfigLayer; 4] = [
        ConfigLayer::Default,
        ConfigLayer::Loaded,
        ConfigLayer::Set,
        ConfigLayer::Environment,
    ];
}

/// Main configuration structure with multi-layer support.
///
/// This is the low-level configuration type. For the typed view, see
/// `ControllerConfig`.
#[derive(Clone, Debug, Default)]
pub struct Config {
    layers: HashMap<ConfigLayer, Value>,
    file_path: Option<PathBuf>,
    schema: Option<Value>,
}

impl Config {
    /// Create a new configuration from a file path.
    ///
    /// If the file doesn't exist, an empty configuration is created.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut layers = HashMap::new();

        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| PxcError::Config(format!("Failed to read config file: {}", e)))?;

            let value = load_yaml(&content)
                .map_err(|e| PxcError::Config(format!("Failed to parse config: {}", e)))?;

            if !value.is_null() {
                layers.insert(ConfigLayer::Loaded, value);
            }
        }

        Ok(Self {
            layers,
            file_path: Some(path.to_path_buf()),
            schema: None,
        })
    }

    /// Install the default layer.
    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.layers.insert(ConfigLayer::Default, defaults);
        self
    }

    /// Set validation schema.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Apply overrides from `PXC_*` process environment variables.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_env_vars(std::env::vars())
    }

    /// Apply overrides from the given variables.
    ///
    /// Only names starting with `PXC_` are considered. The remainder is
    /// lowercased and `__` separates path segments, so `PXC_RETRY__MAX_ATTEMPTS`
    /// sets `retry.max_attempts`. Values are parsed as YAML scalars.
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut env_layer = Value::Object(Default::default());

        for (name, raw) in vars {
            let Some(rest) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }

            let key = rest.to_lowercase().replace("__", ".");
            let value = serde_yaml::from_str::<Value>(raw.as_ref())
                .unwrap_or_else(|_| Value::String(raw.as_ref().to_string()));

            Self::set_value_at_path(&mut env_layer, &key, value)?;
        }

        if env_layer.as_object().map_or(false, |map| !map.is_empty()) {
            self.layers.insert(ConfigLayer::Environment, env_layer);
        }

        Ok(self)
    }

    /// Get a configuration value by key, respecting layer priority.
    ///
    /// Returns None if the key doesn't exist in any layer.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        for layer in ConfigLayer::ASCENDING.iter().rev() {
            if let Some(layer_data) = self.layers.get(layer) {
                if let Some(value) = get_path(layer_data, key) {
                    if let Ok(typed_value) = serde_json::from_value(value.clone()) {
                        return Some(typed_value);
                    }
                }
            }
        }

        None
    }

    /// Set a configuration value programmatically.
    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| PxcError::Config(format!("Failed to serialize value: {}", e)))?;

        let set_layer = self
            .layers
            .entry(ConfigLayer::Set)
            .or_insert(Value::Object(Default::default()));

        Self::set_value_at_path(set_layer, key, value)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = self.file_path.as_ref().ok_or_else(|| {
            PxcError::Config("Cannot save: no file path set".to_string())
        })?;

        let yaml = serde_yaml::to_string(&self.merged_data())
            .map_err(|e| PxcError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, yaml)
            .map_err(|e| PxcError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get merged data from all layers.
    pub fn merged_data(&self) -> Value {
        let mut merged = Value::Object(serde_json::Map::new());

        for layer in &ConfigLayer::ASCENDING {
            if let Some(layer_data) = self.layers.get(layer) {
                merged = deep_merge(merged, layer_data.clone());
            }
        }

        merged
    }

    /// Validate configuration against schema (if set).
    pub fn validate(&self) -> Result<()> {
        if let Some(schema) = &self.schema {
            let instance = self.merged_data();

            let compiled = jsonschema::JSONSchema::compile(schema)
                .map_err(|e| PxcError::Config(format!("Invalid schema: {}", e)))?;

            let result = compiled.validate(&instance);
            if let Err(errors) = result {
                let error_msgs: Vec<String> = errors.map(|e| format!("{}", e)).collect();
                return Err(PxcError::Config(format!(
                    "Validation failed: {}",
                    error_msgs.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn set_value_at_path(data: &mut Value, path: &str, value: Value) -> Result<()> {
        let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
        let Some((last, parents)) = parts.split_last() else {
            return Err(PxcError::Config("Empty path".to_string()));
        };

        let mut current = data;
        for part in parents {
            if !current.is_object() {
                *current = Value::Object(Default::default());
            }
            current = match current {
                Value::Object(map) => map
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(Default::default())),
                _ => unreachable!("replaced by an object above"),
            };
        }

        if !current.is_object() {
            *current = Value::Object(Default::default());
        }
        if let Value::Object(map) = current {
            map.insert(last.to_string(), value);
        }

        Ok(())
    }
}

/// Typed controller configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Credential store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Optimistic-concurrency retry bounds
    #[serde(default)]
    pub retry: RetryConfig,

    /// Log configurations
    #[serde(default)]
    pub logs: Vec<LogConfig>,
}

impl ControllerConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from a specific path, applying `PXC_*`
    /// environment overrides and validating the result.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::load(path)?.with_env_overrides()?;
        Self::from_config(config)
    }

    /// Build the typed view from raw layers.
    pub fn from_config(config: Config) -> Result<Self> {
        let config = config
            .with_defaults(Self::defaults())
            .with_schema(Self::schema());
        config.validate()?;

        serde_json::from_value(config.merged_data())
            .map_err(|e| PxcError::Config(format!("Failed to parse controller config: {}", e)))
    }

    /// Get the default path for the controller configuration.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PxcError::Config("Could not determine home directory".to_string()))?;
        Ok(home.join(".pxc-secrets").join("config.yml"))
    }

    fn defaults() -> Value {
        serde_json::json!({
            "store": { "type": "memory" },
            "retry": RetryConfig::default(),
            "logs": [],
        })
    }

    fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "store": {
                    "type": "object",
                    "required": ["type"],
                    "properties": {
                        "type": { "enum": ["memory", "vault"] },
                        "url": { "type": "string" },
                        "timeout_secs": { "type": "integer", "minimum": 1 }
                    }
                },
                "retry": {
                    "type": "object",
                    "properties": {
                        "max_attempts": { "type": "integer", "minimum": 1, "maximum": 100 },
                        "base_delay_ms": { "type": "integer", "minimum": 0 },
                        "max_delay_ms": { "type": "integer", "minimum": 0 }
                    }
                },
                "logs": { "type": "array" }
            }
        })
    }
}
