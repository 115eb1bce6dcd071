//! Registration API client.

pub mod client;
pub mod types;

pub use client::{ApiError, CallbacksApiClient};
pub use types::*;
