//! Lua sandbox creation
//!
//! Kind files run in a restricted sandbox without filesystem, process or
//! network access. The `kind` module is always injected since every kind
//! file needs it; `params` and `log` are registered by the caller through a
//! [`ModuleRegistry`](crate::module::ModuleRegistry).

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib, Table, Value};

/// Create a restricted Lua sandbox
///
/// Only the table, string and math libraries are loaded. `require`,
/// `dofile` and `loadfile` are removed so a kind file cannot pull in other
/// code.
///
/// # Example
/// ```no_run
/// use taskforge_lua::sandbox::create_sandbox;
///
/// let lua = create_sandbox()?;
/// let kind: mlua::Table = lua
///     .load(r#"
///         return kind.define {
///             name = "build",
///             tasks = { kind.task { name = "linux64" } },
///         }
///     "#)
///     .eval()?;
/// let name: String = kind.get("name")?;
/// assert_eq!(name, "build");
/// # Ok::<(), mlua::Error>(())
/// ```
pub fn create_sandbox() -> LuaResult<Lua> {
    // IO, OS, PACKAGE and DEBUG are never loaded
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH,
        LuaOptions::default(),
    )?;

    lua.globals().set("require", mlua::Nil)?;
    lua.globals().set("dofile", mlua::Nil)?;
    lua.globals().set("loadfile", mlua::Nil)?;

    register_kind_module(&lua)?;

    Ok(lua)
}

/// Register the `kind` module
///
/// Helpers for writing kind definitions. `define` and `task` return their
/// argument unchanged; they exist so kind files read declaratively and so
/// editor stubs can type them.
fn register_kind_module(lua: &Lua) -> LuaResult<()> {
    let kind = lua.create_table()?;

    // kind.define(definition)
    let define_fn = lua.create_function(|_, definition: Table| Ok(definition))?;
    kind.set("define", define_fn)?;

    // kind.task(task)
    let task_fn = lua.create_function(|_, task: Table| Ok(task))?;
    kind.set("task", task_fn)?;

    // kind.transform(name, options?) -> { name = name, ...options }
    let transform_fn = lua.create_function(|lua, (name, options): (String, Option<Table>)| {
        transform_spec(lua, name, options)
    })?;
    kind.set("transform", transform_fn)?;

    // kind.keyed_by(param, alternatives) -> { ["by-" .. param] = alternatives }
    let keyed_by_fn = lua.create_function(|lua, (param, alternatives): (String, Table)| {
        let keyed = lua.create_table()?;
        keyed.set(format!("by-{}", param), alternatives)?;
        Ok(keyed)
    })?;
    kind.set("keyed_by", keyed_by_fn)?;

    // kind.builder()
    let builder_fn = lua.create_function(|lua, ()| create_kind_builder(lua))?;
    kind.set("builder", builder_fn)?;

    lua.globals().set("kind", kind)?;

    Ok(())
}

fn transform_spec(lua: &Lua, name: String, options: Option<Table>) -> LuaResult<Table> {
    let spec = lua.create_table()?;
    if let Some(options) = options {
        for pair in options.pairs::<Value, Value>() {
            let (key, value) = pair?;
            spec.set(key, value)?;
        }
    }
    spec.set("name", name)?;
    Ok(spec)
}

/// Append `value` to the list stored under `key` in the builder
fn push_to(lua: &Lua, builder: &Table, key: &str, value: impl mlua::IntoLua) -> LuaResult<()> {
    let list: Table = match builder.get::<Option<Table>>(key)? {
        Some(t) => t,
        None => {
            let t = lua.create_table()?;
            builder.set(key, t.clone())?;
            t
        }
    };
    list.push(value)
}

/// Create a kind builder instance with fluent API methods
fn create_kind_builder(lua: &Lua) -> LuaResult<Table> {
    let builder = lua.create_table()?;
    let metatable = lua.create_table()?;

    // Builder methods return self for chaining
    let name_fn = lua.create_function(|_, (builder, name): (Table, String)| {
        builder.set("_name", name)?;
        Ok(builder)
    })?;
    metatable.set("name", name_fn)?;

    let description_fn = lua.create_function(|_, (builder, desc): (Table, String)| {
        builder.set("_description", desc)?;
        Ok(builder)
    })?;
    metatable.set("description", description_fn)?;

    let depends_on_fn = lua.create_function(|lua, (builder, kind): (Table, String)| {
        push_to(lua, &builder, "_dependencies", kind)?;
        Ok(builder)
    })?;
    metatable.set("depends_on", depends_on_fn)?;

    let transform_fn = lua.create_function(
        |lua, (builder, name, options): (Table, String, Option<Table>)| {
            let spec = transform_spec(lua, name, options)?;
            push_to(lua, &builder, "_transforms", spec)?;
            Ok(builder)
        },
    )?;
    metatable.set("transform", transform_fn)?;

    let defaults_fn = lua.create_function(|_, (builder, defaults): (Table, Table)| {
        builder.set("_defaults", defaults)?;
        Ok(builder)
    })?;
    metatable.set("defaults", defaults_fn)?;

    let task_fn = lua.create_function(|lua, (builder, task): (Table, Table)| {
        push_to(lua, &builder, "_tasks", task)?;
        Ok(builder)
    })?;
    metatable.set("task", task_fn)?;

    // build() converts the builder to a kind definition table
    let build_fn = lua.create_function(|lua, builder: Table| {
        let definition = lua.create_table()?;

        if let Some(name) = builder.get::<Option<String>>("_name")? {
            definition.set("name", name)?;
        }
        if let Some(desc) = builder.get::<Option<String>>("_description")? {
            definition.set("description", desc)?;
        }
        if let Some(deps) = builder.get::<Option<Table>>("_dependencies")? {
            definition.set("kind-dependencies", deps)?;
        }
        if let Some(transforms) = builder.get::<Option<Table>>("_transforms")? {
            definition.set("transforms", transforms)?;
        }
        if let Some(defaults) = builder.get::<Option<Table>>("_defaults")? {
            definition.set("task-defaults", defaults)?;
        }
        if let Some(tasks) = builder.get::<Option<Table>>("_tasks")? {
            definition.set("tasks", tasks)?;
        }

        Ok(definition)
    })?;
    metatable.set("build", build_fn)?;

    // Set __index to the metatable itself so methods are accessible
    metatable.set("__index", metatable.clone())?;
    builder.set_metatable(Some(metatable))?;

    Ok(builder)
}

/// Lua Language Server stubs for the `kind` module
pub fn kind_stubs() -> String {
    r#"---@meta

---@class TransformSpec
---@field name string Registered transform name
---@field [string] any Transform options

---@class KindDefinition
---@field name string Kind name
---@field description? string
---@field ["kind-dependencies"]? string[] Kinds whose tasks this kind consumes
---@field transforms? (string|TransformSpec)[] Transforms applied in order
---@field ["task-defaults"]? table Merged into every task before the transforms run
---@field tasks? table[]|table<string, table> Tasks, as a list or keyed by name

---@class KindBuilder
local KindBuilder = {}

---@param name string
---@return KindBuilder
function KindBuilder:name(name) end

---@param desc string
---@return KindBuilder
function KindBuilder:description(desc) end

---@param kind string
---@return KindBuilder
function KindBuilder:depends_on(kind) end

---@param name string
---@param options? table
---@return KindBuilder
function KindBuilder:transform(name, options) end

---@param defaults table
---@return KindBuilder
function KindBuilder:defaults(defaults) end

---@param task table
---@return KindBuilder
function KindBuilder:task(task) end

---@return KindDefinition
function KindBuilder:build() end

---Helpers for kind definitions
---@class kind
kind = {}

---Declare a kind; returns the definition unchanged
---@param definition KindDefinition
---@return KindDefinition
function kind.define(definition) end

---Declare a task; returns the task unchanged
---@param task table
---@return table
function kind.task(task) end

---Name a transform with options
---@param name string
---@param options? table
---@return TransformSpec
---
---@usage
---transforms = { kind.transform("resolve-keys", { fields = { "worker.max-run-time" } }) }
function kind.transform(name, options) end

---Build a value keyed by a parameter or attribute
---@param param string Parameter or attribute name, without the "by-" prefix
---@param alternatives table<string, any> Values by literal or glob pattern, plus "default"
---@return table
---
---@usage
---worker = { ["max-run-time"] = kind.keyed_by("platform", { ["linux.*"] = 3600, default = 7200 }) }
function kind.keyed_by(param, alternatives) end

---Start a fluent kind definition
---@return KindBuilder
function kind.builder() end
"#
    .to_string()
}
