//! QC-Callbacks: client for the address callback registration API.

pub mod api;
