//! The option contract, the config container and the validation orchestrator.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::errors::{OptionError, ValidationError};
use super::options::{Address, ConfigOption, ThemeSettings};
use super::registry::Registry;
use super::value::{key, key_string};

/// The capability every option type implements.
///
/// For each option of a schema the orchestrator calls `pre_validation`,
/// `run_validation` and `post_validation` in that order before moving on to
/// the next option. A `pre_validation` failure does not stop
/// `run_validation`; a `run_validation` failure skips `post_validation`.
pub trait Validate: fmt::Debug + Send + Sync {
    /// Whether a null value is an error.
    fn is_required(&self) -> bool {
        false
    }

    /// Value substituted when the option is absent or null.
    fn default_value(&self) -> Option<Value> {
        None
    }

    /// Inspect or rewrite the raw value before coercion.
    fn pre_validation(
        &self,
        _pass: &mut Pass<'_>,
        _config: &mut Config,
        _key: &str,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Coerce a non-null raw value into its resolved form.
    fn run_validation(&self, _pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        Ok(value)
    }

    /// Derive or cross-check the resolved value against its siblings.
    fn post_validation(
        &self,
        _pass: &mut Pass<'_>,
        _config: &mut Config,
        _key: &str,
    ) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// State scoped to the validation of a single option.
///
/// Options never keep warnings on themselves; everything produced during a
/// pass lives here and is flushed by the orchestrator.
pub struct Pass<'a> {
    registry: &'a dyn Registry,
    config_file_path: Option<PathBuf>,
    warnings: Vec<String>,
    carry: Option<Value>,
    relocated: Vec<String>,
}

impl<'a> Pass<'a> {
    /// Create a pass for a container loaded from `config_file_path`.
    pub fn new(registry: &'a dyn Registry, config_file_path: Option<PathBuf>) -> Self {
        Self { registry, config_file_path, warnings: Vec::new(), carry: None, relocated: Vec::new() }
    }

    /// A fresh pass sharing this pass's registry and file context.
    pub fn child(&self) -> Pass<'a> {
        Pass::new(self.registry, self.config_file_path.clone())
    }

    /// The injected lookup capability for themes, extensions and hooks.
    pub fn registry(&self) -> &'a dyn Registry {
        self.registry
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Directory relative paths are resolved against.
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_file_path.as_deref().and_then(Path::parent)
    }

    /// Record a non-fatal warning for the current option.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Hand data from `run_validation` to `post_validation` of the same option.
    pub fn carry(&mut self, value: Value) {
        self.carry = Some(value);
    }

    pub fn take_carry(&mut self) -> Option<Value> {
        self.carry.take()
    }

    /// Ask the orchestrator to re-validate `key` because this option moved a
    /// value into it.
    pub fn relocate(&mut self, key: impl Into<String>) {
        self.relocated.push(key.into());
    }

    fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.warnings, self.relocated)
    }

    /// Move this pass's warnings into `parent`.
    pub(crate) fn drain_into(self, parent: &mut Pass<'_>) {
        parent.warnings.extend(self.warnings);
    }
}

/// An ordered set of named options.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    options: Vec<(String, ConfigOption)>,
}

impl Schema {
    /// Build a schema from `(name, option)` pairs.
    ///
    /// # Panics
    ///
    /// Panics when a name is declared twice; schemas are written by
    /// programmers, so this is a bug in the schema definition.
    pub fn new<I, K>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, ConfigOption)>,
        K: Into<String>,
    {
        match Self::try_new(options) {
            Ok(schema) => schema,
            Err(e) => panic!("{e}"),
        }
    }

    /// Build a schema, rejecting duplicate names.
    pub fn try_new<I, K>(options: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = (K, ConfigOption)>,
        K: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut collected = Vec::new();
        for (name, option) in options {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(OptionError::DuplicateName(name));
            }
            collected.push((name, option));
        }
        Ok(Self { options: collected })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigOption)> {
        self.options.iter().map(|(name, option)| (name.as_str(), option))
    }

    pub fn get(&self, name: &str) -> Option<&ConfigOption> {
        self.options.iter().find(|(n, _)| n == name).map(|(_, option)| option)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.options.iter().position(|(n, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Errors and warnings of a validation pass, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<(String, ValidationError)>,
    pub warnings: Vec<(String, String)>,
}

impl ValidationResult {
    /// Whether the validated container is usable.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, key: &str, error: ValidationError) {
        self.errors.push((key.to_string(), error));
    }

    pub fn add_warning(&mut self, key: &str, warning: impl Into<String>) {
        self.warnings.push((key.to_string(), warning.into()));
    }

    /// Drop everything recorded for `key`.
    fn forget(&mut self, key: &str) {
        self.errors.retain(|(k, _)| k != key);
        self.warnings.retain(|(k, _)| k != key);
    }
}

/// A mapping of option names to values, bound to a schema.
#[derive(Debug, Clone)]
pub struct Config {
    schema: Arc<Schema>,
    values: Mapping,
    user_keys: HashSet<String>,
    moved_keys: HashSet<String>,
    config_file_path: Option<PathBuf>,
}

impl Config {
    /// Create an empty container for `schema`.
    ///
    /// `config_file_path` is the file the values come from; relative paths
    /// are resolved against its directory.
    pub fn new(schema: Arc<Schema>, config_file_path: Option<PathBuf>) -> Self {
        Self {
            schema,
            values: Mapping::new(),
            user_keys: HashSet::new(),
            moved_keys: HashSet::new(),
            config_file_path,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_file_path.as_deref().and_then(Path::parent)
    }

    /// Merge raw user values into the container.
    ///
    /// Declared options that are missing or null receive their default.
    pub fn load_dict(&mut self, raw: Mapping) {
        for (name, option) in self.schema.iter() {
            if self.values.get(name).is_none_or(Value::is_null) {
                self.values.insert(key(name), option.default_value().unwrap_or(Value::Null));
            }
        }
        for (k, v) in raw {
            let name = key_string(&k);
            let v = match v {
                Value::Null => self
                    .schema
                    .get(&name)
                    .and_then(ConfigOption::default_value)
                    .unwrap_or(Value::Null),
                other => {
                    self.user_keys.insert(name.clone());
                    self.moved_keys.remove(&name);
                    other
                }
            };
            self.values.insert(key(&name), v);
        }
    }

    /// Validate every option in schema order.
    ///
    /// The container is updated in place with resolved values. Warnings are
    /// scoped to the call, so validating twice without changes in between
    /// yields the same result.
    pub fn validate(&mut self, registry: &dyn Registry) -> ValidationResult {
        let schema = Arc::clone(&self.schema);
        let mut result = ValidationResult::default();

        for (index, (name, option)) in schema.iter().enumerate() {
            let relocated = self.validate_option(registry, name, option, &mut result);
            for target in relocated {
                let Some(position) = schema.position(&target) else { continue };
                if position >= index {
                    continue;
                }
                debug!(option = %target, source = %name, "re-validating relocated option");
                result.forget(&target);
                if let Some(target_option) = schema.get(&target) {
                    self.validate_option(registry, &target, target_option, &mut result);
                }
            }
        }

        let unknown: Vec<String> = self
            .values
            .keys()
            .map(key_string)
            .filter(|name| !schema.contains(name))
            .collect();
        for name in unknown {
            result.add_warning(&name, format!("Unrecognised configuration name: {name}"));
        }

        result
    }

    fn validate_option(
        &mut self,
        registry: &dyn Registry,
        name: &str,
        option: &ConfigOption,
        result: &mut ValidationResult,
    ) -> Vec<String> {
        let mut pass = Pass::new(registry, self.config_file_path.clone());

        debug!(option = name, "pre-validation");
        if let Err(e) = option.pre_validation(&mut pass, self, name) {
            result.add_error(name, e);
        }

        let mut value = self.get(name).cloned().unwrap_or(Value::Null);
        if value.is_null() {
            value = option.default_value().unwrap_or(Value::Null);
        }

        let resolved = if value.is_null() {
            if option.is_required() { Err(ValidationError::Required) } else { Ok(Value::Null) }
        } else {
            debug!(option = name, "run-validation");
            option.run_validation(&mut pass, value)
        };

        match resolved {
            Ok(value) => {
                self.set(name, value);
                debug!(option = name, "post-validation");
                if let Err(e) = option.post_validation(&mut pass, self, name) {
                    result.add_error(name, e);
                }
            }
            Err(e) => result.add_error(name, e),
        }

        let (warnings, relocated) = pass.into_parts();
        for warning in warnings {
            result.add_warning(name, warning);
        }
        relocated
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    /// The value of `name` when it is a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_path(&self, name: &str) -> Option<PathBuf> {
        self.get_str(name).map(PathBuf::from)
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_sequence).map(Vec::as_slice)
    }

    /// The parsed `HOST:PORT` of an address option.
    pub fn address(&self, name: &str) -> Option<Address> {
        self.get_str(name).and_then(|s| s.parse().ok())
    }

    /// The resolved settings of a theme option.
    pub fn theme(&self, name: &str) -> Option<ThemeSettings> {
        self.get(name).and_then(|v| serde_yaml::from_value(v.clone()).ok())
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(key(name), value);
    }

    /// Remove `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.user_keys.remove(name);
        self.moved_keys.remove(name);
        self.values.remove(name)
    }

    /// Whether the user supplied a non-null value for `name`.
    pub fn is_user_supplied(&self, name: &str) -> bool {
        self.user_keys.contains(name)
    }

    /// Record that the value of `name` was moved to another option.
    pub(crate) fn mark_moved(&mut self, name: &str) {
        self.moved_keys.insert(name.to_string());
    }

    /// Whether an earlier pass moved the value of `name` elsewhere.
    pub fn was_moved(&self, name: &str) -> bool {
        self.moved_keys.contains(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.values.keys().map(key_string)
    }

    pub fn values_mut(&mut self) -> &mut Mapping {
        &mut self.values
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.values
    }

    pub fn into_mapping(self) -> Mapping {
        self.values
    }
}
