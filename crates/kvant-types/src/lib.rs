//! kvant-types: domain entities and repository ports shared by every crate.

pub mod domain;
pub mod ports;
