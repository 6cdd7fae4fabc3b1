//! Passthrough, type, choice, private and deprecated options.

use std::fmt;

use serde_yaml::Value;

use super::{ConfigOption, requirement_builders};
use crate::config::base::{Config, Pass, Validate};
use crate::config::errors::{OptionError, ValidationError};
use crate::config::value::{insert_path, repr, type_name};

/// The concrete value shapes a [`Type`] option can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Dict,
}

impl Kind {
    /// Whether `value` has this shape.
    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Kind::Null, Value::Null) => true,
            (Kind::Bool, Value::Bool(_)) => true,
            (Kind::Int, Value::Number(n)) => !n.is_f64(),
            (Kind::Float, Value::Number(n)) => n.is_f64(),
            (Kind::Str, Value::String(_)) => true,
            (Kind::List, Value::Sequence(_)) => true,
            (Kind::Dict, Value::Mapping(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Str => "str",
            Kind::List => "list",
            Kind::Dict => "dict",
        };
        f.write_str(name)
    }
}

/// Accepts any value. Useful for plain required/defaulted settings.
#[derive(Debug, Clone)]
pub struct Any {
    required: bool,
    default: Option<Value>,
}

impl Default for Any {
    fn default() -> Self {
        Self::new()
    }
}

impl Any {
    pub fn new() -> Self {
        Self { required: false, default: None }
    }
}

requirement_builders!(Any);

impl Validate for Any {
    fn is_required(&self) -> bool {
        self.required
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }
}

/// Accepts values of one of a set of kinds, optionally with an exact length.
#[derive(Debug, Clone)]
pub struct Type {
    kinds: Vec<Kind>,
    length: Option<usize>,
    required: bool,
    default: Option<Value>,
}

impl Type {
    pub fn new(kind: Kind) -> Self {
        Self::any_of([kind])
    }

    /// Accept any of `kinds`.
    pub fn any_of(kinds: impl IntoIterator<Item = Kind>) -> Self {
        Self { kinds: kinds.into_iter().collect(), length: None, required: false, default: None }
    }

    /// Require strings, lists and mappings to have exactly `length` elements.
    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    fn expected(&self) -> String {
        match self.kinds.as_slice() {
            [single] => single.to_string(),
            kinds => {
                let names: Vec<String> = kinds.iter().map(Kind::to_string).collect();
                format!("({})", names.join(", "))
            }
        }
    }

    /// Type-check `value` without the required/default handling.
    pub(crate) fn check(&self, value: &Value) -> Result<(), ValidationError> {
        if !self.kinds.iter().any(|kind| kind.matches(value)) {
            return Err(ValidationError::type_mismatch(self.expected(), type_name(value)));
        }

        if let Some(length) = self.length {
            let actual = match value {
                Value::String(s) => s.chars().count(),
                Value::Sequence(items) => items.len(),
                Value::Mapping(map) => map.len(),
                _ => return Ok(()),
            };
            if actual != length {
                return Err(ValidationError::LengthMismatch {
                    expected: self.expected(),
                    length,
                    value: repr(value),
                    actual,
                });
            }
        }

        Ok(())
    }
}

requirement_builders!(Type);

impl Validate for Type {
    fn is_required(&self) -> bool {
        self.required
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn run_validation(&self, _pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        self.check(&value)?;
        Ok(value)
    }
}

/// Restricts a value to a fixed set of strings.
#[derive(Debug, Clone)]
pub struct Choice {
    choices: Vec<String>,
    required: bool,
    default: Option<String>,
}

impl Choice {
    /// Create a choice option. An empty set of choices is rejected.
    pub fn new<I, S>(choices: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        if choices.is_empty() {
            return Err(OptionError::EmptyChoices);
        }
        Ok(Self { choices, required: false, default: None })
    }

    /// Set the default, which must itself be one of the choices.
    pub fn default(mut self, default: impl Into<String>) -> Result<Self, OptionError> {
        let default = default.into();
        if !self.choices.contains(&default) {
            return Err(OptionError::InvalidDefault { default, choices: self.choices });
        }
        self.default = Some(default);
        Ok(self)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    fn render_choices(&self) -> String {
        let quoted: Vec<String> = self.choices.iter().map(|c| format!("'{c}'")).collect();
        match quoted.as_slice() {
            [single] => format!("({single},)"),
            _ => format!("({})", quoted.join(", ")),
        }
    }
}

impl Validate for Choice {
    fn is_required(&self) -> bool {
        self.required
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone().map(Value::String)
    }

    fn run_validation(&self, _pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        match &value {
            Value::String(s) if self.choices.contains(s) => Ok(value),
            _ => Err(ValidationError::InvalidChoice {
                choices: self.render_choices(),
                value: repr(&value),
            }),
        }
    }
}

/// A slot reserved for values written by other options.
#[derive(Debug, Clone, Default)]
pub struct Private;

impl Private {
    pub fn new() -> Self {
        Self
    }
}

impl Validate for Private {
    fn pre_validation(
        &self,
        _pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        if config.is_user_supplied(key) {
            return Err(ValidationError::invalid("For internal use only."));
        }
        Ok(())
    }
}

/// A deprecated, renamed or removed option.
#[derive(Debug, Clone, Default)]
pub struct Deprecated {
    moved_to: Option<String>,
    message: Option<String>,
    removed: bool,
    option_type: Option<Box<ConfigOption>>,
}

impl Deprecated {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move present values to the dot-separated path `target`.
    pub fn moved_to(mut self, target: impl Into<String>) -> Self {
        self.moved_to = Some(target.into());
        self
    }

    /// Replace the default message. `{}` is substituted with the option name.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Reject present values instead of warning.
    pub fn removed(mut self) -> Self {
        self.removed = true;
        self
    }

    /// Validate present values with `option` before handling the deprecation.
    pub fn option_type(mut self, option: impl Into<ConfigOption>) -> Self {
        self.option_type = Some(Box::new(option.into()));
        self
    }

    fn render_message(&self, key: &str) -> String {
        if let Some(custom) = &self.message {
            return custom.replace("{}", key);
        }

        let mut message = if self.removed {
            format!("The configuration option '{key}' was removed from quire.")
        } else {
            format!(
                "The configuration option '{key}' has been deprecated and will be removed in a future release."
            )
        };
        if let Some(target) = &self.moved_to {
            message.push_str(&format!(" Use '{target}' instead."));
        }
        message
    }
}

impl Validate for Deprecated {
    fn pre_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        let value = match config.get(key).filter(|v| !v.is_null()).cloned() {
            Some(value) => value,
            None => {
                // Already moved by an earlier pass; the target holds the value.
                if config.was_moved(key) {
                    pass.warn(self.render_message(key));
                }
                return Ok(());
            }
        };

        let value = match &self.option_type {
            Some(option) => {
                let resolved = option.run_validation(pass, value)?;
                config.set(key, resolved.clone());
                resolved
            }
            None => value,
        };

        if self.removed {
            return Err(ValidationError::invalid(self.render_message(key)));
        }
        pass.warn(self.render_message(key));

        let Some(target) = &self.moved_to else {
            return Ok(());
        };
        if insert_path(config.values_mut(), target, value).is_ok() {
            config.set(key, Value::Null);
            config.mark_moved(key);
            let root = target.split('.').next().unwrap_or(target);
            pass.relocate(root);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::base::Schema;
    use crate::config::options::testing::{get_config, validate_with, yaml};
    use crate::config::registry::StaticRegistry;

    fn one(option: impl Into<ConfigOption>) -> Schema {
        Schema::new([("option", option.into())])
    }

    #[test]
    fn test_any_optional_and_required() {
        let (config, _) = get_config(one(Any::new()), "option: null").unwrap();
        assert_eq!(config.get("option"), Some(&Value::Null));

        let err = get_config(one(Any::new().required()), "option: null").unwrap_err();
        assert_eq!(err, "option=\"Required configuration not provided.\"");

        let (config, _) = get_config(one(Any::new().required()), "option: 2").unwrap();
        assert_eq!(config.get("option"), Some(&yaml("2")));
    }

    #[test]
    fn test_any_default() {
        let (config, _) = get_config(one(Any::new().default(1)), "option: null").unwrap();
        assert_eq!(config.get("option"), Some(&yaml("1")));

        let (config, _) = get_config(one(Any::new().default(1)), "option: 2").unwrap();
        assert_eq!(config.get("option"), Some(&yaml("2")));
    }

    #[test]
    fn test_type_single() {
        let (config, _) = get_config(one(Type::new(Kind::Str)), "option: Testing").unwrap();
        assert_eq!(config.get_str("option"), Some("Testing"));
    }

    #[test]
    fn test_type_multiple() {
        let schema = || one(Type::any_of([Kind::List, Kind::Dict]));
        assert!(get_config(schema(), "option: [1, 2, 3]").is_ok());
        assert!(get_config(schema(), "option: {a: 1}").is_ok());

        let err = get_config(schema(), "option: text").unwrap_err();
        assert_eq!(err, "option=\"Expected type: (list, dict) but received: str\"");
    }

    #[test]
    fn test_type_length() {
        let schema = || one(Type::new(Kind::Str).length(7));
        assert!(get_config(schema(), "option: Testing").is_ok());

        let err = get_config(schema(), "option: Testing Long").unwrap_err();
        assert_eq!(
            err,
            "option=\"Expected type: str with length 7 but received: 'Testing Long' with length 12\""
        );
    }

    #[test]
    fn test_int_is_not_float() {
        let err = get_config(one(Type::new(Kind::Int)), "option: 1.5").unwrap_err();
        assert_eq!(err, "option=\"Expected type: int but received: float\"");
    }

    #[test]
    fn test_choice_required() {
        let choice = Choice::new(["python", "node"]).unwrap().required();
        let (config, _) = get_config(one(choice.clone()), "option: python").unwrap();
        assert_eq!(config.get_str("option"), Some("python"));

        let err = get_config(one(choice), "{}").unwrap_err();
        assert_eq!(err, "option=\"Required configuration not provided.\"");
    }

    #[test]
    fn test_choice_optional() {
        let choice = Choice::new(["python", "node"]).unwrap();
        let (config, _) = get_config(one(choice.clone()), "").unwrap();
        assert_eq!(config.get("option"), Some(&Value::Null));

        let (config, _) = get_config(one(choice), "option: null").unwrap();
        assert_eq!(config.get("option"), Some(&Value::Null));
    }

    #[test]
    fn test_choice_default() {
        let choice = Choice::new(["a", "b", "c"]).unwrap().default("b").unwrap();
        let (config, _) = get_config(one(choice.clone()), "").unwrap();
        assert_eq!(config.get_str("option"), Some("b"));

        let (config, _) = get_config(one(choice.clone()), "option: null").unwrap();
        assert_eq!(config.get_str("option"), Some("b"));

        let err = get_config(one(choice), "option: go").unwrap_err();
        assert_eq!(err, "option=\"Expected one of: ('a', 'b', 'c') but received: 'go'\"");
    }

    #[test]
    fn test_choice_non_string_value() {
        let choice = Choice::new(["foo", "bar"]).unwrap();
        let err = get_config(one(choice), "option: true").unwrap_err();
        assert_eq!(err, "option=\"Expected one of: ('foo', 'bar') but received: true\"");
    }

    #[test]
    fn test_choice_invalid_default() {
        let err = Choice::new(["a", "b"]).unwrap().default("c").unwrap_err();
        assert_eq!(
            err,
            OptionError::InvalidDefault {
                default: "c".to_string(),
                choices: vec!["a".to_string(), "b".to_string()],
            }
        );
        assert!(Choice::new(["a", "b"]).unwrap().required().default("c").is_err());
    }

    #[test]
    fn test_choice_requires_choices() {
        let empty: [&str; 0] = [];
        assert_eq!(Choice::new(empty).unwrap_err(), OptionError::EmptyChoices);
    }

    #[test]
    fn test_private_rejects_user_values() {
        let err = get_config(one(Private::new()), "option: somevalue").unwrap_err();
        assert_eq!(err, "option=\"For internal use only.\"");
        assert!(get_config(one(Private::new()), "").is_ok());
    }

    #[test]
    fn test_deprecated_simple() {
        let schema = Schema::new([("d", ConfigOption::from(Deprecated::new()))]);
        let (_, warnings) = get_config(schema, "d: value").unwrap();
        assert_eq!(
            warnings,
            vec![(
                "d".to_string(),
                "The configuration option 'd' has been deprecated and will be removed in a future release."
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_deprecated_custom_message() {
        let schema =
            Schema::new([("d", ConfigOption::from(Deprecated::new().message("custom message for {} key")))]);
        let (_, warnings) = get_config(schema, "d: value").unwrap();
        assert_eq!(warnings, vec![("d".to_string(), "custom message for d key".to_string())]);
    }

    #[test]
    fn test_deprecated_with_type() {
        let schema = || {
            Schema::new([("d", ConfigOption::from(Deprecated::new().option_type(Type::new(Kind::Str))))])
        };
        let (_, warnings) = get_config(schema(), "d: value").unwrap();
        assert_eq!(warnings.len(), 1);

        let (_, warnings) = get_config(schema(), "d: null").unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_deprecated_with_invalid_type() {
        let schema =
            Schema::new([("d", ConfigOption::from(Deprecated::new().option_type(Type::new(Kind::List))))]);
        let err = get_config(schema, "d: value").unwrap_err();
        assert_eq!(err, "d=\"Expected type: list but received: str\"");
    }

    #[test]
    fn test_removed_option() {
        let schema =
            Schema::new([("d", ConfigOption::from(Deprecated::new().removed().moved_to("foo")))]);
        let err = get_config(schema, "d: value").unwrap_err();
        assert_eq!(
            err,
            "d=\"The configuration option 'd' was removed from quire. Use 'foo' instead.\""
        );
    }

    #[test]
    fn test_deprecated_move() {
        let schema = Schema::new([
            ("new", ConfigOption::from(Type::new(Kind::Str))),
            ("old", Deprecated::new().moved_to("new").into()),
        ]);
        let (config, warnings) = get_config(schema, "old: value").unwrap();
        assert_eq!(config.get_str("new"), Some("value"));
        assert_eq!(config.get("old"), Some(&Value::Null));
        assert_eq!(
            warnings,
            vec![(
                "old".to_string(),
                "The configuration option 'old' has been deprecated and will be removed in a future release. Use 'new' instead."
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_deprecated_move_complex() {
        let schema = Schema::new([
            ("foo", ConfigOption::from(Type::new(Kind::Dict))),
            ("old", Deprecated::new().moved_to("foo.bar").into()),
        ]);
        let (config, _) = get_config(schema, "old: value").unwrap();
        assert_eq!(config.get("foo"), Some(&yaml("{bar: value}")));
        assert_eq!(config.get("old"), Some(&Value::Null));
    }

    #[test]
    fn test_deprecated_move_existing() {
        let schema = Schema::new([
            ("foo", ConfigOption::from(Type::new(Kind::Dict))),
            ("old", Deprecated::new().moved_to("foo.bar").into()),
        ]);
        let (config, warnings) =
            get_config(schema, "{old: value, foo: {existing: existing}}").unwrap();
        assert_eq!(config.get("foo"), Some(&yaml("{existing: existing, bar: value}")));
        assert_eq!(config.get("old"), Some(&Value::Null));
        assert_eq!(
            warnings,
            vec![(
                "old".to_string(),
                "The configuration option 'old' has been deprecated and will be removed in a future release. Use 'foo.bar' instead."
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_deprecated_move_warns_on_every_pass() {
        let schema = Schema::new([
            ("nav", ConfigOption::from(Type::new(Kind::List))),
            ("pages", Deprecated::new().moved_to("nav").into()),
        ]);
        let registry = StaticRegistry::builtin();
        let (mut config, first) = validate_with(schema, "pages: [a.md]", None, &registry);
        let second = config.validate(&registry);

        let expected = vec![(
            "pages".to_string(),
            "The configuration option 'pages' has been deprecated and will be removed in a future release. Use 'nav' instead."
                .to_string(),
        )];
        assert_eq!(first.warnings, expected);
        assert_eq!(first, second);
        assert_eq!(config.get("nav"), Some(&yaml("[a.md]")));
        assert!(config.was_moved("pages"));
    }

    #[test]
    fn test_deprecated_move_invalid() {
        let schema = Schema::new([
            ("foo", ConfigOption::from(Type::new(Kind::Dict))),
            ("old", Deprecated::new().moved_to("foo.bar").into()),
        ]);
        let err = get_config(schema, "{old: value, foo: wrong type}").unwrap_err();
        assert_eq!(err, "foo=\"Expected type: dict but received: str\"");
    }
}
