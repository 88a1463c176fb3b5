//! kvant-hex: hexagonal users & orders API library (core + inbound HTTP)

pub mod config;
pub mod errors;

pub mod application;

pub use kvant_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)
