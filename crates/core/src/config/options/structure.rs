//! Nested and repeated options.

use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use super::ConfigOption;
use crate::config::base::{Config, Pass, Schema, Validate};
use crate::config::errors::ValidationError;
use crate::config::value::{repr, repr_keys, type_name};

/// Unwrap a sequence or fail with the list-of-items message.
pub(crate) fn expect_list(value: Value) -> Result<Vec<Value>, ValidationError> {
    match value {
        Value::Sequence(items) => Ok(items),
        other => Err(ValidationError::invalid(format!(
            "Expected a list of items, but a {} was given.",
            type_name(&other)
        ))),
    }
}

/// A mapping validated against its own schema.
///
/// Without validation only the declared keys are defaulted; unknown keys and
/// invalid values are passed through untouched.
#[derive(Debug, Clone)]
pub struct SubConfig {
    schema: Arc<Schema>,
    validate: bool,
}

impl SubConfig {
    /// A sub-configuration that only applies defaults.
    pub fn new(schema: Schema) -> Self {
        Self { schema: Arc::new(schema), validate: false }
    }

    /// A sub-configuration whose values are fully validated.
    pub fn validated(schema: Schema) -> Self {
        Self { schema: Arc::new(schema), validate: true }
    }

    /// An open mapping with no declared keys.
    pub fn open() -> Self {
        Self::new(Schema::default())
    }
}

impl Validate for SubConfig {
    fn default_value(&self) -> Option<Value> {
        Some(Value::Mapping(Mapping::new()))
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let raw = match value {
            Value::Mapping(raw) => raw,
            other => {
                return Err(ValidationError::invalid(format!(
                    "The configuration is invalid. The expected type was a key value mapping \
                     but we got an object of type: {}",
                    type_name(&other)
                )));
            }
        };

        let mut nested =
            Config::new(Arc::clone(&self.schema), pass.config_file_path().map(Into::into));
        nested.load_dict(raw);

        if self.validate {
            let result = nested.validate(pass.registry());
            if let Some((option, error)) = result.errors.into_iter().next() {
                return Err(ValidationError::SubOption { option, error: Box::new(error) });
            }
            for (option, warning) in result.warnings {
                pass.warn(format!("Sub-option '{option}': {warning}"));
            }
        }

        Ok(Value::Mapping(nested.into_mapping()))
    }
}

/// A list whose every element is validated by one item option.
#[derive(Debug, Clone)]
pub struct ListOfItems {
    item: Box<ConfigOption>,
    default: Option<Value>,
}

impl ListOfItems {
    pub fn new(item: impl Into<ConfigOption>) -> Self {
        Self { item: Box::new(item.into()), default: None }
    }

    /// Value used when the list is absent. Without one the list is required.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

impl Validate for ListOfItems {
    fn is_required(&self) -> bool {
        self.default.is_none()
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let items = expect_list(value)?;
        if items.is_empty() {
            return Ok(Value::Sequence(items));
        }

        let keys: Vec<String> = (0..items.len()).map(|i| format!("[{i}]")).collect();
        let mut scratch =
            Config::new(Arc::new(Schema::default()), pass.config_file_path().map(Into::into));
        for (key, item) in keys.iter().zip(items) {
            scratch.set(key, item);
        }

        let mut passes: Vec<Pass<'_>> = keys.iter().map(|_| pass.child()).collect();

        for (key, item_pass) in keys.iter().zip(passes.iter_mut()) {
            self.item.pre_validation(item_pass, &mut scratch, key)?;
        }
        for (key, item_pass) in keys.iter().zip(passes.iter_mut()) {
            let raw = scratch.get(key).cloned().unwrap_or(Value::Null);
            let resolved = self.item.run_validation(item_pass, raw)?;
            scratch.set(key, resolved);
        }
        for (key, item_pass) in keys.iter().zip(passes.iter_mut()) {
            self.item.post_validation(item_pass, &mut scratch, key)?;
        }

        for item_pass in passes {
            item_pass.drain_into(pass);
        }

        let resolved = keys.iter().map(|key| scratch.get(key).cloned().unwrap_or(Value::Null));
        Ok(Value::Sequence(resolved.collect()))
    }
}

/// A list of fully validated sub-configurations sharing one schema.
pub fn config_items(schema: Schema) -> ListOfItems {
    ListOfItems::new(SubConfig::validated(schema))
}

/// The site navigation tree.
#[derive(Debug, Clone, Default)]
pub struct Nav;

impl Nav {
    pub fn new() -> Self {
        Self
    }

    fn describe(value: &Value) -> String {
        match value {
            Value::Mapping(map) if !map.is_empty() => format!("dict with keys {}", repr_keys(map)),
            Value::Null | Value::String(_) => repr(value),
            other => format!("a {}: {}", type_name(other), repr(other)),
        }
    }

    fn check_list(pass: &mut Pass<'_>, value: &Value, top: bool) -> Result<(), ValidationError> {
        match value {
            Value::Sequence(items) => items.iter().try_for_each(|item| Self::check_item(pass, item)),
            Value::Mapping(map) if !map.is_empty() && !top => {
                pass.warn(format!("Expected nav to be a list, got {}", Self::describe(value)));
                map.values().try_for_each(|child| Self::check_list(pass, child, false))
            }
            Value::String(_) if !top => Ok(()),
            other => Err(ValidationError::invalid(format!(
                "Expected nav to be a list, got {}",
                Self::describe(other)
            ))),
        }
    }

    fn check_item(pass: &mut Pass<'_>, item: &Value) -> Result<(), ValidationError> {
        match item {
            Value::String(_) => Ok(()),
            Value::Mapping(map) if map.len() == 1 => {
                map.values().try_for_each(|child| Self::check_list(pass, child, false))
            }
            Value::Mapping(_) => Err(ValidationError::invalid(format!(
                "Expected nav item to be a dict of size 1, got {}",
                Self::describe(item)
            ))),
            other => Err(ValidationError::invalid(format!(
                "Expected nav item to be a string or dict, got {}",
                Self::describe(other)
            ))),
        }
    }
}

impl Validate for Nav {
    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        Self::check_list(pass, &value, true)?;
        match value {
            Value::Sequence(items) if items.is_empty() => Ok(Value::Null),
            other => Ok(other),
        }
    }
}
