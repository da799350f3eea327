//! Configuration module for tilegfx builds
//!
//! Provides types and parsing for `tilegfx.toml` build configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
