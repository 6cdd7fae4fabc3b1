#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Configuration validation engine for the quire documentation publisher.

pub mod config;

pub use config::{Config, ConfigError, ConfigSource, Registry, Schema, load_config};
