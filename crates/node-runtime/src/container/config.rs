//! # Node Configuration
//!
//! Unified configuration for the API surface, storage and the address
//! callbacks subsystem.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. TOML file named by `QC_CONFIG`
//! 3. `QC_*` environment variables

use qc_18_address_callbacks::{DispatchConfig, ListenerConfig};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "QC_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Registration API configuration.
    pub api: ApiConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Transaction listener and reaper.
    pub listener: ListenerConfig,
    /// Callback delivery.
    pub dispatch: DispatchConfig,
}

impl NodeConfig {
    /// Defaults, then the `QC_CONFIG` file if set, then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing sections and fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&raw)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `QC_*` overrides. Unparsable values are logged and ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("QC_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => warn!(value = %port, "QC_API_PORT is not a valid port"),
            }
        }
        if let Some(dir) = lookup("QC_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup("QC_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(b) => self.storage.backend = b,
                Err(e) => warn!("{}", e),
            }
        }
        if let Some(referer) = lookup("QC_CALLBACK_REFERER") {
            self.dispatch.referer = referer;
        }
        if let Some(flag) = lookup("QC_DISPATCH_INSECURE_TLS") {
            match flag.parse() {
                Ok(insecure) => self.dispatch.accept_invalid_certs = insecure,
                Err(_) => warn!(value = %flag, "QC_DISPATCH_INSECURE_TLS must be true or false"),
            }
        }
    }

    /// Reject zero capacities, timeouts and periods.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listener.validate().map_err(ConfigError::Invalid)?;
        self.dispatch.validate().map_err(ConfigError::Invalid)?;
        if self.api.port == 0 {
            return Err(ConfigError::Invalid("api.port cannot be 0".into()));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    Read { path: PathBuf, message: String },
    /// Config file is not valid TOML for [`NodeConfig`].
    Parse(String),
    /// A value is out of range.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, message } => {
                write!(f, "cannot read config file {}: {}", path.display(), message)
            }
            ConfigError::Parse(msg) => write!(f, "invalid config file: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Registration API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address (localhost only by default).
    pub host: IpAddr,
    /// HTTP port.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9888,
        }
    }
}

impl ApiConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Key/value backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local; lost on restart.
    Memory,
    /// RocksDB under `data_dir` (requires the `rocksdb` feature).
    Rocksdb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::Rocksdb),
            other => Err(format!(
                "unknown storage backend '{}', expected memory or rocksdb",
                other
            )),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database directory for the RocksDB backend.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let backend = if cfg!(feature = "rocksdb") {
            StorageBackend::Rocksdb
        } else {
            StorageBackend::Memory
        };
        Self {
            backend,
            data_dir: PathBuf::from("./data/callbacks"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.api.port, 9888);
        assert_eq!(config.listener.queue_capacity, 10_000);
        assert_eq!(config.dispatch.referer, "Quantum-Chain Node");
        assert!(!config.dispatch.accept_invalid_certs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = NodeConfig::from_toml_str(
            r#"
            [api]
            port = 7000

            [storage]
            backend = "memory"

            [dispatch]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.api.port, 7000);
        assert_eq!(config.api.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.dispatch.max_attempts, 5);
        assert_eq!(config.dispatch.timeout_secs, 30);
        assert_eq!(config.listener, ListenerConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        assert!(matches!(
            NodeConfig::from_toml_str("[api]\nport = \"nope\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NodeConfig::default();
        config.apply_env_overrides(env(&[
            ("QC_API_PORT", "9999"),
            ("QC_DATA_DIR", "/var/lib/qc"),
            ("QC_STORAGE_BACKEND", "ROCKSDB"),
            ("QC_CALLBACK_REFERER", "Test Node"),
            ("QC_DISPATCH_INSECURE_TLS", "true"),
        ]));

        assert_eq!(config.api.port, 9999);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/qc"));
        assert_eq!(config.storage.backend, StorageBackend::Rocksdb);
        assert_eq!(config.dispatch.referer, "Test Node");
        assert!(config.dispatch.accept_invalid_certs);
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = NodeConfig::default();
        let before = config.clone();
        config.apply_env_overrides(env(&[
            ("QC_API_PORT", "not-a-port"),
            ("QC_STORAGE_BACKEND", "postgres"),
            ("QC_DISPATCH_INSECURE_TLS", "yes"),
        ]));
        assert_eq!(config, before);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = NodeConfig::default();
        config.listener.queue_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
