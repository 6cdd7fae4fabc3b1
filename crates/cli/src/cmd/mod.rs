pub mod check;
pub mod themes;

use std::path::PathBuf;

use quire_core::config::registry::{FsRegistry, default_themes_dir};

/// A registry searching the given directories, then the user theme directory.
pub fn registry(themes_dirs: &[PathBuf]) -> FsRegistry {
    let mut dirs = themes_dirs.to_vec();
    dirs.push(default_themes_dir());
    FsRegistry::new(dirs)
}
