//! Parameter module for kind files
//!
//! Gives kind files read-only access to the graph parameters, so a kind
//! can decide which tasks to declare (for example only on some projects).
//! The module is generic over [`ParamProvider`]; the CLI passes the real
//! parameter store, tests pass fixed values.

use std::sync::Arc;

use crate::module::{LuaModule, ModuleMetadata};
use mlua::SerializeOptions;
use mlua::prelude::*;
use serde_json::Value;
use taskforge_core::Parameters;

/// Source of parameter values
pub trait ParamProvider: Send + Sync {
    /// Get a parameter by name
    fn get(&self, name: &str) -> Option<Value>;

    /// All parameter names
    fn names(&self) -> Vec<String>;
}

impl ParamProvider for Parameters {
    fn get(&self, name: &str) -> Option<Value> {
        Parameters::get(self, name).ok().cloned()
    }

    fn names(&self) -> Vec<String> {
        Parameters::names(self)
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Read-only `params` module
pub struct ParamsModule<P: ParamProvider> {
    provider: Arc<P>,
}

impl<P: ParamProvider> ParamsModule<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

fn to_lua(lua: &Lua, value: &Value) -> LuaResult<LuaValue> {
    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.to_value_with(value, options)
}

impl<P: ParamProvider + 'static> LuaModule for ParamsModule<P> {
    fn id(&self) -> &'static str {
        "params"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let table = lua.create_table()?;

        // params.get(name, default?)
        {
            let provider = Arc::clone(&self.provider);
            table.set(
                "get",
                lua.create_function(move |lua, (name, default): (String, Option<LuaValue>)| {
                    match provider.get(&name) {
                        Some(value) => to_lua(lua, &value),
                        None => Ok(default.unwrap_or(LuaValue::Nil)),
                    }
                })?,
            )?;
        }

        // params.require(name)
        {
            let provider = Arc::clone(&self.provider);
            table.set(
                "require",
                lua.create_function(move |lua, name: String| {
                    let value = provider.get(&name).ok_or_else(|| {
                        LuaError::RuntimeError(format!("Required parameter '{}' is not set", name))
                    })?;
                    to_lua(lua, &value)
                })?,
            )?;
        }

        // params.has(name)
        {
            let provider = Arc::clone(&self.provider);
            table.set(
                "has",
                lua.create_function(move |_, name: String| Ok(provider.get(&name).is_some()))?,
            )?;
        }

        // params.names()
        {
            let provider = Arc::clone(&self.provider);
            table.set(
                "names",
                lua.create_function(move |lua, ()| lua.create_sequence_from(provider.names()))?,
            )?;
        }

        lua.globals().set(self.id(), table)?;
        Ok(())
    }

    fn stubs(&self) -> String {
        r#"---@meta

---Read-only access to the graph parameters
---@class params
params = {}

---Get a parameter, or `default` when it is not set
---@param name string Parameter name, e.g. "project" or "release-type"
---@param default? any Value returned when the parameter is not set
---@return any value
---
---@usage
---if params.get("project") == "mozilla-central" then
---  tasks["nightly"] = { ... }
---end
function params.get(name, default) end

---Get a parameter that must be set
---Raises an error when the parameter is missing
---@param name string Parameter name
---@return any value
function params.require(name) end

---Check whether a parameter is set
---@param name string Parameter name
---@return boolean
function params.has(name) end

---Names of all parameters
---@return string[]
function params.names() end
"#
        .to_string()
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            id: self.id(),
            version: "1.0.0",
            description: "Read-only graph parameters for kind files",
        }
    }
}
