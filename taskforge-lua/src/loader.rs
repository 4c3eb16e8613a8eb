//! Loading kind files from disk
//!
//! A kinds directory holds one kind per `<name>.lua` file or per
//! `<name>/kind.lua` subdirectory. Files are loaded in sorted path order and
//! each one is evaluated in a fresh sandbox, so kind files cannot leak
//! globals into each other.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use mlua::Value as LuaValue;
use tracing::debug;

use crate::definition::KindDefinition;
use crate::module::ModuleRegistry;
use crate::parser::definition_from_lua;
use crate::sandbox::create_sandbox;

/// File name of a kind defined in its own directory
pub const KIND_FILE: &str = "kind.lua";

/// Load one kind file
///
/// # Errors
/// Fails if the file cannot be read, the sandbox cannot be set up, or the
/// definition is invalid
pub fn load_kind_file(path: &Path, modules: &ModuleRegistry) -> Result<KindDefinition> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read kind file {}", path.display()))?;

    let lua = create_sandbox().map_err(|e| anyhow!("Failed to create sandbox: {}", e))?;
    modules
        .register_all(&lua)
        .map_err(|e| anyhow!("Failed to register Lua modules: {}", e))?;

    let value: LuaValue = lua
        .load(source.as_str())
        .set_name(format!("@{}", path.display()))
        .eval()
        .map_err(|e| anyhow!("Failed to evaluate kind file {}: {}", path.display(), e))?;

    let definition = definition_from_lua(&lua, value)
        .with_context(|| format!("Invalid kind file {}", path.display()))?;
    debug!(
        "Loaded kind '{}' from {} ({} tasks)",
        definition.name,
        path.display(),
        definition.tasks.len()
    );
    Ok(definition)
}

/// Kind files under `dir`, in sorted order
pub fn find_kind_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read kinds directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            let kind_file = path.join(KIND_FILE);
            if kind_file.is_file() {
                files.push(kind_file);
            }
        } else if path.extension().is_some_and(|ext| ext == "lua") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every kind under `dir`
///
/// # Errors
/// Fails on the first invalid kind file, or when two files define a kind
/// of the same name
pub fn load_kinds_dir(dir: &Path, modules: &ModuleRegistry) -> Result<Vec<KindDefinition>> {
    let mut definitions: Vec<KindDefinition> = Vec::new();
    for path in find_kind_files(dir)? {
        let definition = load_kind_file(&path, modules)?;
        if definitions.iter().any(|d| d.name == definition.name) {
            bail!(
                "Kind '{}' is defined more than once (again in {})",
                definition.name,
                path.display()
            );
        }
        definitions.push(definition);
    }
    Ok(definitions)
}
