//! Theme selection and resolution.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::paths::resolve_path;
use crate::config::base::{Config, Pass, Validate};
use crate::config::errors::ValidationError;
use crate::config::value::{key, key_string, repr, type_name};

/// Templates every theme renders as standalone pages.
const BASE_STATIC_TEMPLATES: [&str; 2] = ["404.html", "sitemap.xml"];

/// Keys of the resolved theme mapping that are not theme variables.
const RESERVED_KEYS: [&str; 5] = ["name", "custom_dir", "dirs", "static_templates", "locale"];

/// A language tag such as `en` or `pt_BR`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Locale {
    pub language: String,
    pub territory: Option<String>,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ['_', '-']);
        let language = parts.next().unwrap_or_default();
        if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("invalid locale '{s}'"));
        }
        Ok(Self {
            language: language.to_ascii_lowercase(),
            territory: parts.next().filter(|t| !t.is_empty()).map(str::to_string),
        })
    }
}

impl TryFrom<String> for Locale {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.territory {
            Some(territory) => write!(f, "{}_{territory}", self.language),
            None => f.write_str(&self.language),
        }
    }
}

/// Typed view of a resolved theme option.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThemeSettings {
    pub name: Option<String>,
    #[serde(default)]
    pub custom_dir: Option<PathBuf>,
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
    #[serde(default)]
    pub static_templates: BTreeSet<String>,
    pub locale: Locale,
    /// Theme variables: the theme's defaults overlaid by the user's keys.
    #[serde(flatten)]
    pub vars: BTreeMap<String, Value>,
}

impl ThemeSettings {
    pub fn get(&self, var: &str) -> Option<&Value> {
        self.vars.get(var)
    }
}

/// The site theme, given as a name or as a mapping with `name` and settings.
#[derive(Debug, Clone)]
pub struct Theme {
    default: Option<Value>,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    pub fn new() -> Self {
        Self { default: None }
    }

    pub fn default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(Value::String(name.into()));
        self
    }
}

fn theme_error(message: impl Into<String>) -> ValidationError {
    ValidationError::invalid(message)
}

impl Validate for Theme {
    fn is_required(&self) -> bool {
        true
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let theme = match value {
            Value::String(name) => {
                let mut theme = Mapping::new();
                theme.insert(key("name"), Value::String(name));
                theme
            }
            Value::Mapping(theme) => {
                if !theme.contains_key("name") {
                    return Err(theme_error("No theme name set."));
                }
                theme
            }
            other => {
                return Err(theme_error(format!(
                    "Invalid type {}. Expected a string or key/value pairs.",
                    type_name(&other)
                )));
            }
        };

        match theme.get("name") {
            Some(Value::Null) | None => {}
            Some(Value::String(name)) => {
                let registry = pass.registry();
                if registry.theme(name).is_none() {
                    let available = registry.theme_names().join(", ");
                    return Err(theme_error(format!(
                        "Unrecognised theme name: '{name}'. The available installed themes are: {available}"
                    )));
                }
            }
            Some(other) => {
                return Err(theme_error(format!(
                    "Unrecognised theme name: {}. The available installed themes are: {}",
                    repr(other),
                    pass.registry().theme_names().join(", ")
                )));
            }
        }

        Ok(Value::Mapping(theme))
    }

    fn post_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        key_name: &str,
    ) -> Result<(), ValidationError> {
        let Some(Value::Mapping(theme)) = config.get(key_name).cloned() else {
            return Ok(());
        };
        let name = theme.get("name").and_then(Value::as_str).map(str::to_string);

        let custom_dir = match theme.get("custom_dir") {
            None | Some(Value::Null) => None,
            Some(Value::String(dir)) => {
                let path = resolve_path(pass.config_dir(), dir);
                if !path.is_dir() {
                    return Err(theme_error(format!(
                        "The path set in custom_dir ('{}') does not exist.",
                        path.display()
                    )));
                }
                Some(path)
            }
            Some(other) => {
                return Err(ValidationError::type_mismatch("str", type_name(other)));
            }
        };

        if name.is_none() && custom_dir.is_none() {
            return Err(theme_error("At least one of 'name' or 'custom_dir' must be defined."));
        }

        let info = name.as_deref().and_then(|n| pass.registry().theme(n));

        let locale = match theme.get("locale") {
            None => info.as_ref().and_then(|i| i.locale.clone()).unwrap_or_else(|| "en".to_string()),
            Some(Value::String(locale)) => locale.clone(),
            Some(_) => return Err(theme_error("'locale' must be a string.")),
        };
        locale.parse::<Locale>().map_err(theme_error)?;

        let mut dirs = Vec::new();
        if let Some(dir) = &custom_dir {
            dirs.push(Value::String(dir.to_string_lossy().into_owned()));
        }
        if let Some(info) = &info {
            dirs.push(Value::String(info.dir.to_string_lossy().into_owned()));
        }

        let mut static_templates: BTreeSet<String> =
            BASE_STATIC_TEMPLATES.iter().map(|t| t.to_string()).collect();
        if let Some(info) = &info {
            static_templates.extend(info.static_templates.iter().cloned());
        }
        if let Some(Value::Sequence(user)) = theme.get("static_templates") {
            static_templates.extend(user.iter().filter_map(Value::as_str).map(str::to_string));
        }

        let mut resolved = Mapping::new();
        resolved.insert(key("name"), name.map_or(Value::Null, Value::String));
        if let Some(dir) = custom_dir {
            resolved.insert(key("custom_dir"), Value::String(dir.to_string_lossy().into_owned()));
        }
        resolved.insert(key("dirs"), Value::Sequence(dirs));
        resolved.insert(
            key("static_templates"),
            Value::Sequence(static_templates.into_iter().map(Value::String).collect()),
        );
        resolved.insert(key("locale"), Value::String(locale));

        if let Some(info) = info {
            for (k, v) in info.vars {
                resolved.insert(k, v);
            }
        }
        for (k, v) in theme {
            if !RESERVED_KEYS.contains(&key_string(&k).as_str()) {
                resolved.insert(k, v);
            }
        }

        config.set(key_name, Value::Mapping(resolved));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::base::Schema;
    use crate::config::options::ConfigOption;
    use crate::config::options::testing::get_config;

    fn one(option: Theme) -> Schema {
        Schema::new([("theme", ConfigOption::from(option))])
    }

    fn settings(src: &str) -> ThemeSettings {
        let (config, _) = get_config(one(Theme::new()), src).unwrap();
        config.theme("theme").unwrap()
    }

    #[test]
    fn test_theme_as_string() {
        let theme = settings("theme: quire");
        assert_eq!(theme.name.as_deref(), Some("quire"));
        assert_eq!(theme.locale.language, "en");
        assert!(theme.static_templates.contains("404.html"));
    }

    #[test]
    fn test_uninstalled_theme() {
        for src in ["theme: quire2", "theme: {name: quire2}"] {
            let err = get_config(one(Theme::new()), src).unwrap_err();
            assert!(
                err.starts_with(
                    "theme=\"Unrecognised theme name: 'quire2'. The available installed themes are: "
                ),
                "{err}"
            );
            assert!(err.contains("readthedocs"), "{err}");
        }
    }

    #[test]
    fn test_theme_default() {
        let (config, _) = get_config(one(Theme::new().default("quire")), "theme: null").unwrap();
        assert_eq!(config.theme("theme").unwrap().name.as_deref(), Some("quire"));
    }

    #[test]
    fn test_theme_required_without_default() {
        let err = get_config(one(Theme::new()), "").unwrap_err();
        assert_eq!(err, "theme=\"Required configuration not provided.\"");
    }

    #[test]
    fn test_theme_as_simple_config() {
        assert_eq!(settings("theme: {name: quire}").name.as_deref(), Some("quire"));
    }

    #[test]
    fn test_theme_as_complex_config() {
        let custom_dir = tempfile::tempdir().unwrap();
        let src = format!(
            "theme: {{name: quire, custom_dir: '{}', static_templates: [sitemap.html], show_sidebar: false}}",
            custom_dir.path().display()
        );
        let theme = settings(&src);
        assert_eq!(theme.name.as_deref(), Some("quire"));
        assert_eq!(theme.dirs.first(), Some(&custom_dir.path().to_path_buf()));
        let expected: BTreeSet<String> =
            ["404.html", "sitemap.html", "sitemap.xml"].iter().map(|s| s.to_string()).collect();
        assert_eq!(theme.static_templates, expected);
        assert_eq!(theme.get("show_sidebar"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_theme_defaults_overlaid_by_user() {
        let theme = settings("theme: {name: readthedocs, navigation_depth: 2}");
        assert_eq!(theme.get("navigation_depth").and_then(Value::as_u64), Some(2));
        assert_eq!(theme.get("collapse_navigation"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_theme_name_is_null() {
        let err = get_config(one(Theme::new()), "theme: {name: null}").unwrap_err();
        assert_eq!(err, "theme=\"At least one of 'name' or 'custom_dir' must be defined.\"");
    }

    #[test]
    fn test_theme_missing_name() {
        let err = get_config(one(Theme::new()), "theme: {custom_dir: custom}").unwrap_err();
        assert_eq!(err, "theme=\"No theme name set.\"");
    }

    #[test]
    fn test_theme_invalid_type() {
        let err = get_config(one(Theme::new()), "theme: [quire2]").unwrap_err();
        assert_eq!(err, "theme=\"Invalid type list. Expected a string or key/value pairs.\"");
    }

    #[test]
    fn test_custom_dir_only() {
        let custom_dir = tempfile::tempdir().unwrap();
        let theme = settings(&format!("theme: {{name: null, custom_dir: '{}'}}", custom_dir.path().display()));
        assert_eq!(theme.name, None);
        assert_eq!(theme.dirs, vec![custom_dir.path().to_path_buf()]);
    }

    #[test]
    fn test_missing_custom_dir() {
        let base = tempfile::tempdir().unwrap();
        let path = base.path().join("inexisting_custom_dir");
        let err = get_config(one(Theme::new()), &format!("theme: {{name: null, custom_dir: '{}'}}", path.display()))
            .unwrap_err();
        assert_eq!(err, format!("theme=\"The path set in custom_dir ('{}') does not exist.\"", path.display()));
    }

    #[test]
    fn test_locale_must_be_string() {
        for src in ["theme: {name: quire, locale: null}", "theme: {name: quire, locale: 0}"] {
            let err = get_config(one(Theme::new()), src).unwrap_err();
            assert_eq!(err, "theme=\"'locale' must be a string.\"");
        }
    }

    #[test]
    fn test_locale() {
        let theme = settings("theme: {name: quire, locale: fr}");
        assert_eq!(theme.locale, Locale { language: "fr".into(), territory: None });

        let theme = settings("theme: {name: quire, locale: pt_BR}");
        assert_eq!(theme.locale.territory.as_deref(), Some("BR"));
        assert_eq!(theme.locale.to_string(), "pt_BR");
    }

    #[test]
    fn test_resolved_theme_revalidates() {
        let registry = crate::config::registry::StaticRegistry::builtin();
        let (mut config, first) = crate::config::options::testing::validate_with(
            one(Theme::new()),
            "theme: {name: readthedocs, locale: de}",
            None,
            &registry,
        );
        let resolved = config.get("theme").cloned();
        let second = config.validate(&registry);
        assert_eq!(first, second);
        assert_eq!(config.get("theme").cloned(), resolved);
    }
}
