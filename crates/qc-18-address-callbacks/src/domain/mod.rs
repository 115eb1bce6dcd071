//! # Domain Layer
//!
//! Pure domain logic for the Address Callbacks subsystem: URL validation,
//! payload and record types, limits, and the error taxonomy.
//!
//! This module contains NO I/O dependencies. Storage, HTTP and transaction
//! annotation are reached through the `ports` module.

pub mod entities;
pub mod errors;
pub mod validation;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use validation::is_url;
pub use value_objects::*;
