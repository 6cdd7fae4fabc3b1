//! Lookup of installed themes, Markdown extensions, plugins and hooks.
//!
//! Options never discover components themselves; they ask the [`Registry`]
//! passed to [`Config::validate`](super::base::Config::validate). Lookups are
//! made on every call and never cached.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::warn;
use walkdir::WalkDir;

use super::hooks::{self, HookModule};
use super::value::key;

/// Name of the optional manifest inside a theme directory.
pub const THEME_MANIFEST: &str = "theme.yml";

/// What the registry knows about an installed theme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeInfo {
    /// Directory holding the theme's templates.
    pub dir: PathBuf,
    pub static_templates: Vec<String>,
    /// Locale used when the user sets none.
    pub locale: Option<String>,
    /// Default values of the theme's variables.
    pub vars: Mapping,
}

/// The capability options use to look up installed components.
pub trait Registry {
    /// Names of the installed themes, sorted.
    fn theme_names(&self) -> Vec<String>;

    fn theme(&self, name: &str) -> Option<ThemeInfo>;

    /// Check that a Markdown extension can be loaded, or explain why not.
    fn markdown_extension(&self, name: &str) -> Result<(), String>;

    fn has_plugin(&self, name: &str) -> bool;

    /// Load the hook module at an absolute path.
    fn load_hook(&self, path: &Path) -> Result<HookModule, String>;
}

/// Markdown extensions shipped with the renderer.
const BUILTIN_EXTENSIONS: &[&str] = &[
    "abbr",
    "admonition",
    "attr_list",
    "codehilite",
    "def_list",
    "extra",
    "fenced_code",
    "footnotes",
    "legacy_attrs",
    "legacy_em",
    "md_in_html",
    "meta",
    "nl2br",
    "sane_lists",
    "smarty",
    "tables",
    "toc",
    "wikilinks",
];

/// Plugins shipped with quire.
const BUILTIN_PLUGINS: &[&str] = &["search"];

/// Strip the package prefix of fully qualified extension names.
fn short_extension_name(name: &str) -> &str {
    name.strip_prefix("markdown.extensions.").unwrap_or(name)
}

/// An in-memory registry.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    themes: BTreeMap<String, ThemeInfo>,
    extensions: BTreeSet<String>,
    plugins: BTreeSet<String>,
}

impl StaticRegistry {
    /// An empty registry: no themes, extensions or plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// The components bundled with quire itself.
    pub fn builtin() -> Self {
        let mut readthedocs_vars = Mapping::new();
        readthedocs_vars.insert(key("collapse_navigation"), Value::Bool(true));
        readthedocs_vars.insert(key("navigation_depth"), Value::from(4));
        readthedocs_vars.insert(key("sticky_navigation"), Value::Bool(true));

        let mut quire_vars = Mapping::new();
        quire_vars.insert(key("navigation_depth"), Value::from(2));
        quire_vars.insert(key("highlightjs"), Value::Bool(true));

        Self::new()
            .with_theme(
                "quire",
                ThemeInfo {
                    dir: builtin_theme_dir("quire"),
                    static_templates: vec!["404.html".to_string(), "sitemap.xml".to_string()],
                    locale: Some("en".to_string()),
                    vars: quire_vars,
                },
            )
            .with_theme(
                "readthedocs",
                ThemeInfo {
                    dir: builtin_theme_dir("readthedocs"),
                    static_templates: vec!["404.html".to_string(), "sitemap.xml".to_string()],
                    locale: Some("en".to_string()),
                    vars: readthedocs_vars,
                },
            )
            .with_extensions(BUILTIN_EXTENSIONS.iter().copied())
            .with_plugins(BUILTIN_PLUGINS.iter().copied())
    }

    pub fn with_theme(mut self, name: impl Into<String>, info: ThemeInfo) -> Self {
        self.themes.insert(name.into(), info);
        self
    }

    pub fn with_extensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_plugins<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Marker location of a theme compiled into quire.
fn builtin_theme_dir(name: &str) -> PathBuf {
    Path::new("<builtin>").join("themes").join(name)
}

impl Registry for StaticRegistry {
    fn theme_names(&self) -> Vec<String> {
        self.themes.keys().cloned().collect()
    }

    fn theme(&self, name: &str) -> Option<ThemeInfo> {
        self.themes.get(name).cloned()
    }

    fn markdown_extension(&self, name: &str) -> Result<(), String> {
        if self.extensions.contains(short_extension_name(name)) {
            Ok(())
        } else {
            Err(format!("No extension named '{name}' is installed."))
        }
    }

    fn has_plugin(&self, name: &str) -> bool {
        self.plugins.contains(name)
    }

    fn load_hook(&self, path: &Path) -> Result<HookModule, String> {
        hooks::load_hook(path).map_err(|e| e.to_string())
    }
}

/// Contents of a theme's `theme.yml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThemeManifest {
    static_templates: Vec<String>,
    locale: Option<String>,
    #[serde(flatten)]
    vars: Mapping,
}

/// A registry that discovers themes in directories on disk.
///
/// Each subdirectory of a theme directory is a theme named after it.
/// Themes found on disk shadow the built-in ones; extensions and plugins
/// are the built-in sets.
#[derive(Debug, Clone)]
pub struct FsRegistry {
    theme_dirs: Vec<PathBuf>,
    builtin: StaticRegistry,
}

impl FsRegistry {
    pub fn new(theme_dirs: Vec<PathBuf>) -> Self {
        Self { theme_dirs, builtin: StaticRegistry::builtin() }
    }

    /// Theme directories searched, in priority order.
    pub fn theme_dirs(&self) -> &[PathBuf] {
        &self.theme_dirs
    }

    /// Every `(name, dir)` found on disk; earlier theme directories win.
    fn discover(&self) -> BTreeMap<String, PathBuf> {
        let mut found = BTreeMap::new();
        for root in &self.theme_dirs {
            if !root.is_dir() {
                continue;
            }
            for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(dir = %root.display(), error = %e, "failed to read theme directory");
                        continue;
                    }
                };
                if !entry.file_type().is_dir() {
                    continue;
                }
                let Some(name) = entry.file_name().to_str() else { continue };
                found.entry(name.to_string()).or_insert_with(|| entry.path().to_path_buf());
            }
        }
        found
    }
}

fn read_manifest(dir: &Path) -> ThemeManifest {
    let path = dir.join(THEME_MANIFEST);
    let Ok(source) = fs::read_to_string(&path) else {
        return ThemeManifest::default();
    };
    match serde_yaml::from_str::<Option<ThemeManifest>>(&source) {
        Ok(manifest) => manifest.unwrap_or_default(),
        Err(e) => {
            warn!(manifest = %path.display(), error = %e, "ignoring invalid theme manifest");
            ThemeManifest::default()
        }
    }
}

impl Registry for FsRegistry {
    fn theme_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.discover().into_keys().collect();
        names.extend(self.builtin.theme_names());
        names.into_iter().collect()
    }

    fn theme(&self, name: &str) -> Option<ThemeInfo> {
        let Some(dir) = self.discover().remove(name) else {
            return self.builtin.theme(name);
        };
        let manifest = read_manifest(&dir);
        Some(ThemeInfo {
            dir,
            static_templates: manifest.static_templates,
            locale: manifest.locale,
            vars: manifest.vars,
        })
    }

    fn markdown_extension(&self, name: &str) -> Result<(), String> {
        self.builtin.markdown_extension(name)
    }

    fn has_plugin(&self, name: &str) -> bool {
        self.builtin.has_plugin(name)
    }

    fn load_hook(&self, path: &Path) -> Result<HookModule, String> {
        self.builtin.load_hook(path)
    }
}

/// Default directory for user-installed themes: `~/.config/quire/themes/`.
pub fn default_themes_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("quire").join("themes");
    }
    let config = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    config.join("quire").join("themes")
}
