//! Filesystem path options.

use std::path::{Component, Path, PathBuf};

use serde_yaml::Value;

use super::requirement_builders;
use super::structure::expect_list;
use crate::config::base::{Config, Pass, Validate};
use crate::config::errors::ValidationError;
use crate::config::value::type_name;

/// What kind of filesystem entry a path option refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathKind {
    #[default]
    Any,
    Dir,
    File,
}

impl PathKind {
    fn exists(self, path: &Path) -> bool {
        match self {
            PathKind::Any => path.exists(),
            PathKind::Dir => path.is_dir(),
            PathKind::File => path.is_file(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            PathKind::Any => "file or directory",
            PathKind::Dir => "directory",
            PathKind::File => "file",
        }
    }
}

/// Resolve `given` against `base` (or the working directory) and normalize it.
pub(crate) fn resolve_path(base: Option<&Path>, given: &str) -> PathBuf {
    let given = Path::new(given);
    if given.is_absolute() {
        return normalize(given);
    }
    let base = match base {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().unwrap_or_default(),
    };
    normalize(&base.join(given))
}

/// Lexically remove `.` and `..` components.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn expect_str(value: &Value) -> Result<&str, ValidationError> {
    value.as_str().ok_or_else(|| ValidationError::type_mismatch("str", type_name(value)))
}

/// A path to a file, a directory or either.
#[derive(Debug, Clone)]
pub struct FilesystemObject {
    kind: PathKind,
    exists: bool,
    required: bool,
    default: Option<Value>,
}

impl FilesystemObject {
    pub fn new(kind: PathKind) -> Self {
        Self { kind, exists: false, required: false, default: None }
    }

    pub fn dir() -> Self {
        Self::new(PathKind::Dir)
    }

    pub fn file() -> Self {
        Self::new(PathKind::File)
    }

    /// Require the resolved path to exist.
    pub fn exists(mut self) -> Self {
        self.exists = true;
        self
    }

    fn resolve(&self, pass: &Pass<'_>, value: &Value) -> Result<PathBuf, ValidationError> {
        let given = expect_str(value)?;
        let path = resolve_path(pass.config_dir(), given);
        if self.exists && !self.kind.exists(&path) {
            return Err(ValidationError::invalid(format!(
                "The path '{}' isn't an existing {}.",
                path.display(),
                self.kind.describe()
            )));
        }
        Ok(path)
    }
}

requirement_builders!(FilesystemObject);

impl Validate for FilesystemObject {
    fn is_required(&self) -> bool {
        self.required
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let path = self.resolve(pass, &value)?;
        Ok(Value::String(path.to_string_lossy().into_owned()))
    }
}

/// The documentation source directory. It must exist and must not be the
/// directory holding the config file.
#[derive(Debug, Clone)]
pub struct DocsDir {
    inner: FilesystemObject,
}

impl Default for DocsDir {
    fn default() -> Self {
        Self::new()
    }
}

impl DocsDir {
    pub fn new() -> Self {
        Self { inner: FilesystemObject::dir().exists() }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.inner = self.inner.default(value);
        self
    }
}

impl Validate for DocsDir {
    fn is_required(&self) -> bool {
        self.inner.is_required()
    }

    fn default_value(&self) -> Option<Value> {
        self.inner.default_value()
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        self.inner.run_validation(pass, value)
    }

    fn post_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        let (Some(config_dir), Some(docs)) = (pass.config_dir(), config.get_str(key)) else {
            return Ok(());
        };
        if normalize(Path::new(docs)) == normalize(config_dir) {
            return Err(ValidationError::invalid(format!(
                "The '{key}' should not be the parent directory of the config file. \
                 Use a child directory instead so that the '{key}' is a sibling of the config file."
            )));
        }
        Ok(())
    }
}

/// The build output directory, which must not nest with the docs directory.
#[derive(Debug, Clone)]
pub struct SiteDir {
    inner: FilesystemObject,
    docs_key: String,
}

impl Default for SiteDir {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteDir {
    pub fn new() -> Self {
        Self { inner: FilesystemObject::dir(), docs_key: "docs_dir".to_string() }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.inner = self.inner.default(value);
        self
    }

    /// Name of the sibling option holding the docs directory.
    pub fn docs_key(mut self, key: impl Into<String>) -> Self {
        self.docs_key = key.into();
        self
    }
}

impl Validate for SiteDir {
    fn is_required(&self) -> bool {
        self.inner.is_required()
    }

    fn default_value(&self) -> Option<Value> {
        self.inner.default_value()
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        self.inner.run_validation(pass, value)
    }

    fn post_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        let (Some(site), Some(docs)) = (config.get_str(key), config.get_str(&self.docs_key)) else {
            return Ok(());
        };
        // The docs option may not have been validated yet.
        let docs = resolve_path(pass.config_dir(), docs);
        let site = normalize(Path::new(site));
        let docs_key = &self.docs_key;

        if docs.starts_with(&site) {
            return Err(ValidationError::invalid(format!(
                "The '{docs_key}' should not be within the '{key}' as this can mean the source files \
                 are overwritten by the output or it will be deleted if --clean is passed to quire build. \
                 ({key}: '{}', {docs_key}: '{}')",
                site.display(),
                docs.display()
            )));
        }
        if site.starts_with(&docs) {
            return Err(ValidationError::invalid(format!(
                "The '{key}' should not be within the '{docs_key}' as this leads to the build directory \
                 being copied into itself and duplicate nested files in the '{key}'. \
                 ({key}: '{}', {docs_key}: '{}')",
                site.display(),
                docs.display()
            )));
        }
        Ok(())
    }
}

/// A list of paths that must all exist.
#[derive(Debug, Clone)]
pub struct ListOfPaths {
    default: Option<Value>,
}

impl Default for ListOfPaths {
    fn default() -> Self {
        Self::new()
    }
}

impl ListOfPaths {
    pub fn new() -> Self {
        Self { default: None }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

impl Validate for ListOfPaths {
    fn is_required(&self) -> bool {
        self.default.is_none()
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let items = expect_list(value)?;
        let mut resolved = Vec::with_capacity(items.len());
        for item in &items {
            let given = expect_str(item)?;
            let path = resolve_path(pass.config_dir(), given);
            if !path.exists() {
                return Err(ValidationError::invalid(format!(
                    "The path '{given}' isn't an existing file or directory."
                )));
            }
            resolved.push(Value::String(path.to_string_lossy().into_owned()));
        }
        Ok(Value::Sequence(resolved))
    }
}
