//! Markdown extensions, plugins and hooks: the options that consult the
//! registry for installed components.

use serde_yaml::{Mapping, Value};

use super::paths::resolve_path;
use super::structure::expect_list;
use crate::config::base::{Config, Pass, Validate};
use crate::config::errors::ValidationError;
use crate::config::value::{key, type_name};

/// Split list or mapping entries into `(name, config)` pairs.
///
/// `invalid` is the message used for entries of the wrong shape.
fn named_entries(value: Value, invalid: &str) -> Result<Vec<(String, Value)>, ValidationError> {
    let err = || ValidationError::invalid(invalid);
    match value {
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok((name, Value::Null)),
                Value::Mapping(map) if map.len() == 1 => {
                    let (name, config) = map.into_iter().next().ok_or_else(err)?;
                    let Value::String(name) = name else { return Err(err()) };
                    Ok((name, config))
                }
                _ => Err(err()),
            })
            .collect(),
        Value::Mapping(map) => map
            .into_iter()
            .map(|(name, config)| match name {
                Value::String(name) => Ok((name, config)),
                _ => Err(err()),
            })
            .collect(),
        _ => Err(err()),
    }
}

/// The Markdown extensions to enable, plus their settings.
///
/// The resolved value is the list of extension names with the built-ins
/// first. Per-extension settings are written to the sibling `configkey`.
#[derive(Debug, Clone)]
pub struct MarkdownExtensions {
    builtins: Vec<String>,
    configkey: String,
    default: Value,
}

impl Default for MarkdownExtensions {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownExtensions {
    pub fn new() -> Self {
        Self {
            builtins: Vec::new(),
            configkey: "mdx_configs".to_string(),
            default: Value::Sequence(Vec::new()),
        }
    }

    /// Extensions that are always enabled.
    pub fn builtins<I, S>(mut self, builtins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builtins = builtins.into_iter().map(Into::into).collect();
        self
    }

    /// Sibling option receiving the per-extension settings.
    pub fn configkey(mut self, configkey: impl Into<String>) -> Self {
        self.configkey = configkey.into();
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }
}

impl Validate for MarkdownExtensions {
    fn default_value(&self) -> Option<Value> {
        Some(self.default.clone())
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let entries = named_entries(value, "Invalid Markdown Extensions configuration")?;

        let mut names: Vec<String> = self.builtins.clone();
        let mut configs = Mapping::new();
        for (name, config) in entries {
            match config {
                Value::Null => {}
                Value::Mapping(map) => {
                    if !map.is_empty() {
                        configs.insert(key(&name), Value::Mapping(map));
                    }
                }
                _ => {
                    return Err(ValidationError::invalid(format!(
                        "Invalid config options for Markdown Extension '{name}'."
                    )));
                }
            }
            if !names.contains(&name) {
                names.push(name);
            }
        }

        for name in &names {
            if let Err(reason) = pass.registry().markdown_extension(name) {
                return Err(ValidationError::invalid(format!(
                    "Failed to load extension '{name}'.\n{reason}"
                )));
            }
        }

        pass.carry(Value::Mapping(configs));
        Ok(Value::Sequence(names.into_iter().map(Value::String).collect()))
    }

    fn post_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        _key: &str,
    ) -> Result<(), ValidationError> {
        let carried = match pass.take_carry() {
            Some(Value::Mapping(map)) => map,
            _ => Mapping::new(),
        };
        let mut merged = match config.get(&self.configkey) {
            Some(Value::Mapping(existing)) => existing.clone(),
            _ => Mapping::new(),
        };
        for (name, settings) in carried {
            merged.insert(name, settings);
        }
        config.set(&self.configkey, Value::Mapping(merged));
        Ok(())
    }
}

/// Plugins to enable, resolved to a mapping of name to settings.
#[derive(Debug, Clone)]
pub struct Plugins {
    default: Value,
    hooks_key: Option<String>,
}

impl Default for Plugins {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugins {
    pub fn new() -> Self {
        Self { default: Value::Sequence(Vec::new()), hooks_key: None }
    }

    /// Sibling [`Hooks`] option whose modules are registered as plugins.
    pub fn hooks_key(mut self, key: impl Into<String>) -> Self {
        self.hooks_key = Some(key.into());
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }
}

impl Validate for Plugins {
    fn default_value(&self) -> Option<Value> {
        Some(self.default.clone())
    }

    fn pre_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        _key: &str,
    ) -> Result<(), ValidationError> {
        let hooks = self
            .hooks_key
            .as_deref()
            .and_then(|hooks_key| config.get(hooks_key))
            .and_then(Value::as_sequence)
            .map(|items| items.iter().filter(|item| item.is_string()).cloned().collect())
            .unwrap_or_default();
        pass.carry(Value::Sequence(hooks));
        Ok(())
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let hooks = match pass.take_carry() {
            Some(Value::Sequence(hooks)) => hooks,
            _ => Vec::new(),
        };
        let entries =
            named_entries(value, "Invalid Plugins configuration. Expected a list or dict.")?;

        let mut plugins = Mapping::new();
        for (name, config) in entries {
            let config = match config {
                Value::Null => Mapping::new(),
                Value::Mapping(map) => map,
                _ => {
                    return Err(ValidationError::invalid(format!(
                        "Invalid config options for the \"{name}\" plugin."
                    )));
                }
            };
            // Entries registered by the hooks option carry their module path.
            let is_hook = config.contains_key("hook") && hooks.contains(&key(&name));
            if !is_hook && !pass.registry().has_plugin(&name) {
                return Err(ValidationError::invalid(format!(
                    "The \"{name}\" plugin is not installed"
                )));
            }
            plugins.insert(key(&name), Value::Mapping(config));
        }

        Ok(Value::Mapping(plugins))
    }
}

/// Local hook modules, registered as plugins under their given path.
#[derive(Debug, Clone)]
pub struct Hooks {
    plugins_key: String,
}

impl Hooks {
    pub fn new(plugins_key: impl Into<String>) -> Self {
        Self { plugins_key: plugins_key.into() }
    }
}

impl Validate for Hooks {
    fn default_value(&self) -> Option<Value> {
        Some(Value::Sequence(Vec::new()))
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let items = expect_list(value)?;
        let mut modules = Mapping::new();

        for item in &items {
            let Some(given) = item.as_str() else {
                return Err(ValidationError::type_mismatch("str", type_name(item)));
            };
            let path = resolve_path(pass.config_dir(), given);
            let module = pass.registry().load_hook(&path).map_err(|why| {
                ValidationError::invalid(format!("Failed to load hook '{given}': {why}"))
            })?;

            let mut entry = Mapping::new();
            entry.insert(key("hook"), Value::String(module.path.to_string_lossy().into_owned()));
            entry.insert(
                key("events"),
                Value::Sequence(module.events.into_iter().map(Value::String).collect()),
            );
            modules.insert(key(given), Value::Mapping(entry));
        }

        pass.carry(Value::Mapping(modules));
        Ok(Value::Sequence(items))
    }

    fn post_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        _key: &str,
    ) -> Result<(), ValidationError> {
        let Some(Value::Mapping(modules)) = pass.take_carry() else {
            return Ok(());
        };
        if modules.is_empty() {
            return Ok(());
        }
        match config.get_mut(&self.plugins_key) {
            Some(Value::Mapping(plugins)) => {
                for (name, entry) in modules {
                    plugins.insert(name, entry);
                }
            }
            Some(Value::Null) | None => config.set(&self.plugins_key, Value::Mapping(modules)),
            Some(other) => {
                // The plugins option already reported its own error.
                tracing::debug!(
                    plugins = %self.plugins_key,
                    kind = type_name(other),
                    "not registering hooks into invalid plugins value"
                );
            }
        }
        Ok(())
    }
}
