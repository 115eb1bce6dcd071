//! # Node Runtime Library
//!
//! This library exposes the internal modules of the node runtime for testing.
//! The main entry point is the `main.rs` binary.
//!
//! ## Modules
//!
//! - `container/` - Configuration and the subsystem container
//! - `adapters/` - Storage backends
//! - `api/` - Registration HTTP API (axum)

pub mod adapters;
pub mod api;
pub mod container;

pub use api::{build_router, serve, AppState};
pub use container::{NodeConfig, SubsystemContainer};
