//! Kind definition parser
//!
//! Evaluates a kind file and converts the table it returns into a
//! [`KindDefinition`]. The table is first converted into JSON as a whole, so
//! everything downstream works on `serde_json` values; Lua functions inside
//! a definition are rejected.

use anyhow::{Context, Result, anyhow, bail};
use mlua::{DeserializeOptions, Lua, LuaSerdeExt, Value as LuaValue};
use serde_json::{Map, Value};
use taskforge_core::{TaskRecord, TransformSpec};

use crate::definition::KindDefinition;

/// Parse a kind definition from Lua source code
///
/// The source is evaluated in `lua`, which should be a sandbox from
/// [`create_sandbox`](crate::sandbox::create_sandbox) with the caller's
/// modules registered.
///
/// # Errors
/// Returns an error if:
/// - The Lua source is invalid or raises an error
/// - The returned value is not a table
/// - `name` is missing, or a field has the wrong type
///
/// # Example
/// ```no_run
/// use taskforge_lua::parser::parse_kind_definition;
/// use taskforge_lua::sandbox::create_sandbox;
///
/// let lua = create_sandbox()?;
/// let definition = parse_kind_definition(&lua, r#"
///     return kind.define {
///         name = "build",
///         transforms = { "build-task" },
///         tasks = {
///             ["linux64/opt"] = { treeherder = { symbol = "B" } },
///         },
///     }
/// "#)?;
/// assert_eq!(definition.name, "build");
/// assert_eq!(definition.tasks.len(), 1);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_kind_definition(lua: &Lua, source: &str) -> Result<KindDefinition> {
    let value: LuaValue = lua
        .load(source)
        .eval()
        .map_err(|e| anyhow!("Failed to evaluate kind definition: {}", e))?;
    definition_from_lua(lua, value)
}

/// Convert the value a kind file returned into a definition
pub fn definition_from_lua(lua: &Lua, value: LuaValue) -> Result<KindDefinition> {
    if !value.is_table() {
        bail!(
            "Kind file must return a table, got {}",
            value.type_name()
        );
    }

    let json: Value = lua
        .from_value_with(value, DeserializeOptions::new().sort_keys(true))
        .map_err(|e| anyhow!("Kind definition is not plain data: {}", e))?;

    definition_from_json(json)
}

/// Build a definition from its JSON form
pub fn definition_from_json(json: Value) -> Result<KindDefinition> {
    let Value::Object(mut table) = json else {
        bail!("Kind definition must be a table");
    };

    let name = match table.remove("name") {
        Some(Value::String(name)) if !name.is_empty() => name,
        Some(other) => bail!("Field 'name' must be a non-empty string, got {}", other),
        None => bail!("Kind definition must have a 'name' field"),
    };

    let description = match take(&mut table, &["description"]) {
        None => None,
        Some(Value::String(desc)) => Some(desc),
        Some(other) => bail!(
            "Kind '{}': field 'description' must be a string, got {}",
            name,
            other
        ),
    };

    let kind_dependencies = parse_kind_dependencies(
        &name,
        take(&mut table, &["kind-dependencies", "kind_dependencies"]),
    )?;
    let transforms = parse_transforms(&name, take(&mut table, &["transforms"]))?;
    let task_defaults =
        parse_task_defaults(&name, take(&mut table, &["task-defaults", "task_defaults"]))?;
    let tasks = parse_tasks(&name, take(&mut table, &["tasks"]))?;

    if let Some(unknown) = table.keys().next() {
        bail!("Kind '{}': unknown field '{}'", name, unknown);
    }

    Ok(KindDefinition {
        name,
        description,
        kind_dependencies,
        transforms,
        task_defaults,
        tasks,
    })
}

/// Remove the first present spelling of a field
fn take(table: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| table.remove(*key))
}

/// Lua has no empty list; `{}` converts to an empty mapping
fn as_list(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) if map.is_empty() => Some(Vec::new()),
        _ => None,
    }
}

fn parse_kind_dependencies(kind: &str, value: Option<Value>) -> Result<Vec<String>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = as_list(value).ok_or_else(|| {
        anyhow!("Kind '{}': field 'kind-dependencies' must be a list of kind names", kind)
    })?;

    items
        .into_iter()
        .map(|item| match item {
            Value::String(dep) => Ok(dep),
            other => Err(anyhow!(
                "Kind '{}': kind-dependencies entry must be a string, got {}",
                kind,
                other
            )),
        })
        .collect()
}

fn parse_transforms(kind: &str, value: Option<Value>) -> Result<Vec<TransformSpec>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = as_list(value).ok_or_else(|| {
        anyhow!("Kind '{}': field 'transforms' must be a list", kind)
    })?;

    items
        .iter()
        .map(|item| {
            TransformSpec::from_value(item).ok_or_else(|| {
                anyhow!(
                    "Kind '{}': transform must be a name or a table with a 'name' field, got {}",
                    kind,
                    item
                )
            })
        })
        .collect()
}

fn parse_task_defaults(kind: &str, value: Option<Value>) -> Result<Option<Map<String, Value>>> {
    match value {
        None => Ok(None),
        Some(Value::Object(defaults)) if defaults.is_empty() => Ok(None),
        Some(Value::Object(defaults)) => Ok(Some(defaults)),
        Some(other) => bail!(
            "Kind '{}': field 'task-defaults' must be a table, got {}",
            kind,
            other
        ),
    }
}

fn parse_tasks(kind: &str, value: Option<Value>) -> Result<Vec<TaskRecord>> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                TaskRecord::from_value(item).with_context(|| {
                    format!("Kind '{}': task #{} must be a table", kind, index + 1)
                })
            })
            .collect(),
        Some(Value::Object(by_name)) => {
            let mut entries: Vec<(String, Value)> = by_name.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            entries
                .into_iter()
                .map(|(key, item)| {
                    let mut task = TaskRecord::from_value(item).with_context(|| {
                        format!("Kind '{}': task '{}' must be a table", kind, key)
                    })?;
                    if task.name.is_none() {
                        task.name = Some(key);
                    }
                    Ok(task)
                })
                .collect()
        }
        Some(other) => bail!(
            "Kind '{}': field 'tasks' must be a list or a table, got {}",
            kind,
            other
        ),
    }
}
