//! Loading of Lua hook modules.
//!
//! A hook module is a Lua script that returns a table. Every function-valued
//! field named `on_<event>` subscribes the module to `<event>`. Scripts are
//! evaluated in a sandbox with no file, process or module-loading access.

use std::fs;
use std::path::{Path, PathBuf};

use mlua::{Lua, LuaOptions, StdLib, Value};
use thiserror::Error;

/// Maximum memory a hook script may allocate while being loaded.
const MEMORY_LIMIT: usize = 10 * 1024 * 1024;

/// Errors that can occur when loading a hook module.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook file does not exist or cannot be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The script failed to evaluate.
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// The script evaluated to something other than a table.
    #[error("hook module must return a table, got {0}")]
    NotATable(String),
}

/// A loaded hook module and the events it subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookModule {
    pub path: PathBuf,
    /// Event names without the `on_` prefix, sorted.
    pub events: Vec<String>,
}

/// Create a Lua state with the restricted standard library.
fn sandboxed_lua() -> Result<Lua, mlua::Error> {
    let libs = StdLib::TABLE | StdLib::STRING | StdLib::UTF8 | StdLib::MATH;
    let lua = Lua::new_with(libs, LuaOptions::default())?;
    lua.set_memory_limit(MEMORY_LIMIT)?;

    let globals = lua.globals();
    for name in [
        "dofile",
        "loadfile",
        "load",
        "require",
        "package",
        "io",
        "os",
        "debug",
        "collectgarbage",
    ] {
        globals.set(name, Value::Nil)?;
    }
    Ok(lua)
}

/// Evaluate the hook script at `path` and collect its `on_*` handlers.
pub fn load_hook(path: &Path) -> Result<HookModule, HookError> {
    let source = fs::read_to_string(path)
        .map_err(|source| HookError::Io { path: path.to_path_buf(), source })?;

    let lua = sandboxed_lua()?;
    let value: Value = lua.load(source.as_str()).set_name(path.display().to_string()).eval()?;
    let table = match value {
        Value::Table(table) => table,
        other => return Err(HookError::NotATable(other.type_name().to_string())),
    };

    let mut events = Vec::new();
    for pair in table.pairs::<Value, Value>() {
        let (name, handler) = pair?;
        let (Value::String(name), Value::Function(_)) = (name, handler) else { continue };
        let name = name.to_string_lossy().to_string();
        if let Some(event) = name.strip_prefix("on_")
            && !event.is_empty()
        {
            events.push(event.to_string());
        }
    }
    events.sort();

    tracing::debug!(hook = %path.display(), ?events, "loaded hook module");
    Ok(HookModule { path: path.to_path_buf(), events })
}
