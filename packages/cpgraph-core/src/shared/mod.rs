//! Shared infrastructure used by every feature module.

pub mod models;
