//! Configuration module for gridsnap
//!
//! Provides types and parsing for `gridsnap.toml` configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
