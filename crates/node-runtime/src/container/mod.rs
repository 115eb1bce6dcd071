//! # Subsystem Container
//!
//! Configuration plus the container that owns running subsystem instances.

pub mod config;
pub mod subsystems;

pub use config::{ApiConfig, ConfigError, NodeConfig, StorageBackend, StorageConfig};
pub use subsystems::{CallbackService, SubsystemContainer};
