//! Configuration management for explorer-fx
//!
//! - **store**: the debounced, schema-versioned JSON store (authoritative)
//! - **legacy**: INI mirror writer and one-time legacy reader
//! - **presets**: named color bundles layered on the store

pub mod debounce;
pub mod defaults;
pub mod document;
pub mod legacy;
pub mod paths;
pub mod presets;
pub mod store;

pub use paths::ConfigPaths;
pub use presets::{PresetError, Rgba};
pub use store::{ConfigError, ConfigStore};
