//! Reading `quire.yml` from disk and running it through validation.

use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use shellexpand::full;
use tracing::{debug, error, info, warn};

use super::base::{Config, Schema, ValidationResult};
use super::defaults;
use super::errors::ConfigError;
use super::registry::Registry;
use super::value::{deep_merge, type_name};

/// File names looked up by [`ConfigSource::Discover`], in priority order.
pub const CONFIG_FILE_NAMES: &[&str] = &["quire.yml", "quire.yaml"];

/// Key naming a parent file to inherit values from.
const INHERIT_KEY: &str = "INHERIT";

/// Where to read the configuration from.
#[derive(Debug)]
pub enum ConfigSource {
    /// Look for `quire.yml`, then `quire.yaml`, in the working directory.
    Discover,
    /// A path as typed by the user; `~` and environment variables are expanded.
    Path(String),
    /// An open handle. The loader reads it to the end and closes it.
    File { file: fs::File, path: PathBuf },
    /// A handle that was already closed; the file is opened again by path.
    Reopen(PathBuf),
}

/// Load, validate and return the project configuration.
///
/// Errors and warnings are logged as they are found. Any error aborts the
/// load, as do warnings when the resolved `strict` option is true.
pub fn load_config(
    source: ConfigSource,
    overrides: Mapping,
    registry: &dyn Registry,
) -> Result<Config, ConfigError> {
    load_config_with_schema(defaults::schema()?, source, overrides, registry)
}

/// Like [`load_config`], for a custom schema.
pub fn load_config_with_schema(
    schema: Schema,
    source: ConfigSource,
    overrides: Mapping,
    registry: &dyn Registry,
) -> Result<Config, ConfigError> {
    let (text, path) = read_source(source)?;
    info!("Loading configuration file: {}", path.display());

    let mut raw = parse_with_inherit(&text, &path, &mut Vec::new(), &env_lookup)?;
    for (k, v) in overrides {
        if !v.is_null() {
            raw.insert(k, v);
        }
    }

    let mut config = Config::new(Arc::new(schema), Some(path));
    config.load_dict(raw);
    let result = config.validate(registry);
    report(&result);

    if !result.errors.is_empty() {
        return Err(ConfigError::Aborted(format!(
            "Aborted with {} configuration errors!",
            result.errors.len()
        )));
    }
    if config.get_bool("strict") == Some(true) && !result.warnings.is_empty() {
        return Err(ConfigError::Aborted(format!(
            "Aborted with {} configuration warnings in 'strict' mode!",
            result.warnings.len()
        )));
    }
    Ok(config)
}

fn report(result: &ValidationResult) {
    for (key, e) in &result.errors {
        error!("Config value '{key}': {e}");
    }
    for (key, warning) in &result.warnings {
        warn!("Config value '{key}': {warning}");
    }
}

/// Find the config file in `dir`, preferring the `.yml` extension.
pub fn discover(dir: &Path) -> Result<PathBuf, ConfigError> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ConfigError::NotFound(CONFIG_FILE_NAMES[0].to_string()))
}

fn read_source(source: ConfigSource) -> Result<(String, PathBuf), ConfigError> {
    match source {
        ConfigSource::Discover => {
            let cwd = env::current_dir()
                .map_err(|source| ConfigError::Read { path: PathBuf::from("."), source })?;
            let path = discover(&cwd)?;
            Ok((read_file(&path)?, path))
        }
        ConfigSource::Path(given) => {
            let path = absolute(&expand_path(&given)?)?;
            if !path.exists() {
                return Err(ConfigError::NotFound(given));
            }
            Ok((read_file(&path)?, path))
        }
        ConfigSource::File { mut file, path } => {
            let path = absolute(&path)?;
            let mut text = String::new();
            file.read_to_string(&mut text)
                .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
            drop(file);
            Ok((text, path))
        }
        ConfigSource::Reopen(path) => {
            let path = absolute(&path)?;
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            debug!(path = %path.display(), "re-opening closed config file");
            Ok((read_file(&path)?, path))
        }
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })
}

fn expand_path(input: &str) -> Result<PathBuf, ConfigError> {
    let expanded = full(input).map_err(|_| ConfigError::Expand(input.to_string()))?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Parse `text` and merge it over the file named by its `INHERIT` key.
///
/// `chain` holds the files currently being loaded, to detect cycles.
fn parse_with_inherit(
    text: &str,
    path: &Path,
    chain: &mut Vec<PathBuf>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Mapping, ConfigError> {
    let identity = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if chain.contains(&identity) {
        return Err(ConfigError::InheritCycle(path.to_path_buf()));
    }
    chain.push(identity);

    let mut raw = parse_mapping(text, path, lookup)?;
    let Some(parent) = raw.remove(INHERIT_KEY) else {
        chain.pop();
        return Ok(raw);
    };
    let parent = match parent {
        Value::String(parent) => parent,
        other => {
            return Err(ConfigError::Aborted(format!(
                "The '{INHERIT_KEY}' key of {} must be a path, not a {}.",
                path.display(),
                type_name(&other)
            )));
        }
    };

    let base_dir = path.parent().unwrap_or(Path::new("."));
    let parent_path = base_dir.join(&parent);
    if !parent_path.exists() {
        return Err(ConfigError::NotFound(parent_path.display().to_string()));
    }
    debug!(child = %path.display(), parent = %parent_path.display(), "inheriting configuration");

    let parent_text = read_file(&parent_path)?;
    let mut merged = parse_with_inherit(&parent_text, &parent_path, chain, lookup)?;
    deep_merge(&mut merged, raw);
    chain.pop();
    Ok(merged)
}

/// Parse a YAML document whose top level must be a mapping.
fn parse_mapping(
    text: &str,
    path: &Path,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Mapping, ConfigError> {
    let value: Value = serde_yaml::from_str(text)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    match resolve_env(value, path, lookup)? {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(map) => Ok(map),
        _ => Err(ConfigError::NotAMapping(path.to_path_buf())),
    }
}

/// Replace `!ENV` tagged nodes with values from the environment.
///
/// `!ENV NAME` yields the variable or null. `!ENV [A, B, default]` yields
/// the first variable that is set, else the last element as a literal.
fn resolve_env(
    value: Value,
    path: &Path,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Value, ConfigError> {
    match value {
        Value::Tagged(tagged) if tagged.tag == "ENV" => env_value(tagged.value, path, lookup),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| resolve_env(item, path, lookup))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut out = Mapping::new();
            for (k, v) in map {
                out.insert(k, resolve_env(v, path, lookup)?);
            }
            Ok(Value::Mapping(out))
        }
        other => Ok(other),
    }
}

fn env_value(
    node: Value,
    path: &Path,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Value, ConfigError> {
    let tag_error = |message: String| ConfigError::EnvTag { path: path.to_path_buf(), message };
    let (names, default) = match node {
        Value::String(name) => (vec![name], Value::Null),
        Value::Sequence(mut items) => {
            if items.len() < 2 {
                return Err(tag_error("a list needs at least one variable and a default".into()));
            }
            let default = items.pop().unwrap_or(Value::Null);
            let names = items
                .into_iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name),
                    other => Err(tag_error(format!("expected a variable name, got {}", type_name(&other)))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            (names, default)
        }
        other => {
            return Err(tag_error(format!("expected a name or a list, got {}", type_name(&other))));
        }
    };

    Ok(names
        .iter()
        .find_map(|name| lookup(name))
        .map_or(default, |raw| scalar_from_env(&raw)))
}

/// Interpret an environment value the way a plain YAML scalar would be.
fn scalar_from_env(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => v,
        Ok(Value::Null) if !raw.trim().is_empty() => Value::Null,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::registry::StaticRegistry;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn parse(text: &str, vars: &[(&str, &str)]) -> Result<Mapping, ConfigError> {
        let lookup = |name: &str| {
            vars.iter().find(|(k, _)| *k == name).map(|(_, v)| (*v).to_string())
        };
        parse_mapping(text, Path::new("quire.yml"), &lookup)
    }

    #[test]
    fn discover_prefers_yml() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "quire.yaml", "site_name: yaml");
        assert_eq!(discover(dir.path()).unwrap(), dir.path().join("quire.yaml"));
        write(dir.path(), "quire.yml", "site_name: yml");
        assert_eq!(discover(dir.path()).unwrap(), dir.path().join("quire.yml"));
    }

    #[test]
    fn discover_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "Config file 'quire.yml' does not exist.");
    }

    #[test]
    fn env_tag_scalar() {
        let raw = parse("site_name: !ENV SITE_NAME\nstrict: !ENV STRICT", &[("SITE_NAME", "Docs"), ("STRICT", "true")])
            .unwrap();
        assert_eq!(raw.get("site_name"), Some(&Value::String("Docs".into())));
        assert_eq!(raw.get("strict"), Some(&Value::Bool(true)));
    }

    #[test]
    fn env_tag_unset_is_null() {
        let raw = parse("site_name: !ENV UNSET_NAME", &[]).unwrap();
        assert_eq!(raw.get("site_name"), Some(&Value::Null));
    }

    #[test]
    fn env_tag_fallbacks() {
        let text = "site_name: !ENV [FIRST, SECOND, fallback]";
        let raw = parse(text, &[("SECOND", "second")]).unwrap();
        assert_eq!(raw.get("site_name"), Some(&Value::String("second".into())));
        let raw = parse(text, &[]).unwrap();
        assert_eq!(raw.get("site_name"), Some(&Value::String("fallback".into())));
    }

    #[test]
    fn env_tag_nested() {
        let raw = parse("extra: {version: !ENV VERSION}", &[("VERSION", "1.2")]).unwrap();
        let extra = raw.get("extra").and_then(Value::as_mapping).unwrap();
        assert_eq!(extra.get("version").and_then(Value::as_f64), Some(1.2));
    }

    #[test]
    fn env_tag_invalid() {
        let err = parse("site_name: !ENV {a: b}", &[]).unwrap_err();
        assert!(matches!(err, ConfigError::EnvTag { .. }), "{err}");
        let err = parse("site_name: !ENV [only_default]", &[]).unwrap_err();
        assert!(matches!(err, ConfigError::EnvTag { .. }), "{err}");
    }

    #[test]
    fn top_level_must_be_mapping() {
        assert!(matches!(parse("- a\n- b", &[]).unwrap_err(), ConfigError::NotAMapping(_)));
        assert!(parse("", &[]).unwrap().is_empty());
    }

    #[test]
    fn inherit_deep_merges() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "base.yml",
            "site_name: base\ntheme: {name: quire, locale: fr}\nextra: {a: 1, b: 2}",
        );
        let child = write(dir.path(), "quire.yml", "INHERIT: base.yml\nextra: {b: 3}\ntheme: {locale: de}");
        let text = fs::read_to_string(&child).unwrap();
        let raw = parse_with_inherit(&text, &child, &mut Vec::new(), &|_| None).unwrap();

        assert!(!raw.contains_key(INHERIT_KEY));
        assert_eq!(raw.get("site_name"), Some(&Value::String("base".into())));
        let expected: Value = serde_yaml::from_str("{a: 1, b: 3}").unwrap();
        assert_eq!(raw.get("extra"), Some(&expected));
        let expected: Value = serde_yaml::from_str("{name: quire, locale: de}").unwrap();
        assert_eq!(raw.get("theme"), Some(&expected));
    }

    #[test]
    fn inherit_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yml", "INHERIT: b.yml");
        let b = write(dir.path(), "b.yml", "INHERIT: a.yml");
        let text = fs::read_to_string(&b).unwrap();
        let err = parse_with_inherit(&text, &b, &mut Vec::new(), &|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::InheritCycle(_)), "{err}");
    }

    #[test]
    fn overrides_replace_file_values() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        let path = write(dir.path(), "quire.yml", "site_name: From file\nsite_dir: out");

        let mut overrides = Mapping::new();
        overrides.insert(Value::from("site_name"), Value::from("From override"));
        overrides.insert(Value::from("site_dir"), Value::Null);

        let config = load_config(
            ConfigSource::Path(path.display().to_string()),
            overrides,
            &StaticRegistry::builtin(),
        )
        .unwrap();
        assert_eq!(config.get_str("site_name"), Some("From override"));
        assert_eq!(config.get_path("site_dir"), Some(dir.path().join("out")));
    }

    #[test]
    fn open_file_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        let path = write(dir.path(), "quire.yml", "site_name: Handle");

        let file = fs::File::open(&path).unwrap();
        let config = load_config(
            ConfigSource::File { file, path: path.clone() },
            Mapping::new(),
            &StaticRegistry::builtin(),
        )
        .unwrap();
        assert_eq!(config.config_file_path(), Some(path.as_path()));

        let config =
            load_config(ConfigSource::Reopen(path.clone()), Mapping::new(), &StaticRegistry::builtin())
                .unwrap();
        assert_eq!(config.get_str("site_name"), Some("Handle"));
    }
}
