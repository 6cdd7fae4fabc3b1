//! Declarative validation of `quire.yml`.
//!
//! A [`Schema`] lists named options in validation order. A [`Config`]
//! holds the raw user values for a schema and resolves them in place with
//! [`Config::validate`], collecting errors and warnings in a
//! [`ValidationResult`]. [`load_config`] wraps the whole flow for a file on
//! disk using the default schema.

pub mod base;
pub mod defaults;
pub mod errors;
pub mod hooks;
pub mod loader;
pub mod options;
pub mod registry;
pub mod value;

pub use base::{Config, Pass, Schema, Validate, ValidationResult};
pub use errors::{ConfigError, OptionError, ValidationError};
pub use loader::{ConfigSource, load_config, load_config_with_schema};
pub use options::ConfigOption;
pub use registry::{FsRegistry, Registry, StaticRegistry, ThemeInfo, default_themes_dir};
