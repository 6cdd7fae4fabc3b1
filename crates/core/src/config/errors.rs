//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

/// An option-local validation failure.
///
/// The message is what users see next to the option name; the variants only
/// exist so callers and tests can match on the common shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required option has no value and no default.
    #[error("Required configuration not provided.")]
    Required,

    /// Value has the wrong type.
    #[error("Expected type: {expected} but received: {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Value has the right type but the wrong length.
    #[error("Expected type: {expected} with length {length} but received: {value} with length {actual}")]
    LengthMismatch { expected: String, length: usize, value: String, actual: usize },

    /// Value is not one of the allowed choices.
    #[error("Expected one of: {choices} but received: {value}")]
    InvalidChoice { choices: String, value: String },

    /// A nested option of a sub-configuration failed.
    #[error("Sub-option '{option}': {error}")]
    SubOption { option: String, error: Box<ValidationError> },

    /// Any other option-specific failure.
    #[error("{0}")]
    Invalid(String),
}

impl ValidationError {
    /// Create an option-specific error from a message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch { expected: expected.into(), actual: actual.into() }
    }
}

/// Errors raised while constructing options or schemas.
///
/// These are programming errors in a schema definition and surface
/// immediately, never during validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    /// A choice option was given no choices.
    #[error("choice option requires at least one choice")]
    EmptyChoices,

    /// The default of a choice option is not one of its choices.
    #[error("default '{default}' is not one of the choices {choices:?}")]
    InvalidDefault { default: String, choices: Vec<String> },

    /// The same option name was declared twice in one schema.
    #[error("duplicate option '{0}' in schema")]
    DuplicateName(String),
}

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file does not exist.
    #[error("Config file '{0}' does not exist.")]
    NotFound(String),

    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML.
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The top level of the config file is not a mapping.
    #[error("config file {0} must contain a mapping of option names to values")]
    NotAMapping(PathBuf),

    /// An `INHERIT` chain refers back to a file already being loaded.
    #[error("config file {0} inherits from itself")]
    InheritCycle(PathBuf),

    /// The path could not be expanded (e.g. `~` without a home directory).
    #[error("cannot expand config path '{0}'")]
    Expand(String),

    /// A `!ENV` tag is neither a variable name nor a list of them.
    #[error("invalid !ENV tag in {path}: {message}")]
    EnvTag { path: PathBuf, message: String },

    /// The schema itself is malformed.
    #[error(transparent)]
    Schema(#[from] OptionError),

    /// Validation failed; the individual problems have been logged.
    #[error("{0}")]
    Aborted(String),
}
