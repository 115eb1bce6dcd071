//! # Ports Layer
//!
//! Hexagonal architecture ports (interfaces) for the Address Callbacks subsystem.
//!
//! - **Driving Ports (Inbound)**: APIs consumed by the registration surface
//! - **Driven Ports (Outbound)**: SPIs implemented by adapters (storage, HTTP, annotation)

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
