//! # Cachet Config
//!
//! Configuration management for Cachet.
//! Supports layered configuration from files and environment variables,
//! validation before any cache is built, and runtime refresh.

mod loader;
mod settings;
mod validation;

pub use loader::*;
pub use settings::*;
pub use validation::*;
