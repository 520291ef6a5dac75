//! Configuration model for psprov.
//!
//! This module defines the Config struct that represents the provisioner's
//! YAML config file. It supplies defaults for every optional field, collects
//! all validation problems in one pass, and resolves the config into the
//! immutable [`Settings`] used during a run.

mod model;
mod operations;
mod settings;
pub mod types;


// Re-export public API
pub use model::Config;
pub use settings::Settings;
pub use types::parse_duration;
