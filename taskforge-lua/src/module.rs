use anyhow::{Result, bail};
use mlua::prelude::*;

/// Trait for Taskforge Lua modules.
///
/// Each module provides functionality to kind files evaluated in the
/// sandbox. Modules must have a unique identifier and register their
/// functions under a global table of that name.
///
/// # Example
///
/// ```rust
/// use taskforge_lua::module::LuaModule;
/// use mlua::prelude::*;
///
/// struct PlatformModule;
///
/// impl LuaModule for PlatformModule {
///     fn id(&self) -> &'static str {
///         "platform"
///     }
///
///     fn register(&self, lua: &Lua) -> LuaResult<()> {
///         let table = lua.create_table()?;
///         table.set("default", "linux64")?;
///         lua.globals().set(self.id(), table)?;
///         Ok(())
///     }
///
///     fn stubs(&self) -> String {
///         "---@meta\n---@class platform\nplatform = {}\n".to_string()
///     }
/// }
/// ```
pub trait LuaModule: Send + Sync {
    /// Returns the unique identifier for this module.
    ///
    /// This is the global name the module is reachable under in Lua; an
    /// `id()` of `"params"` makes `params.get(...)` available.
    fn id(&self) -> &'static str;

    /// Registers this module's functions and values into the Lua context.
    ///
    /// # Errors
    /// Returns `LuaError` if a function or table cannot be created
    fn register(&self, lua: &Lua) -> LuaResult<()>;

    /// Lua Language Server stubs for this module, starting with `---@meta`
    fn stubs(&self) -> String;

    /// Module metadata, for listings and editor setup
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            id: self.id(),
            version: "0.1.0",
            description: "",
        }
    }
}

/// Metadata about a Lua module
#[derive(Debug, Clone)]
pub struct ModuleMetadata {
    /// Module identifier
    pub id: &'static str,
    /// Module version (semver)
    pub version: &'static str,
    /// Brief description of module functionality
    pub description: &'static str,
}

/// Registry of the modules made available to kind files
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn LuaModule>>,
}

impl ModuleRegistry {
    /// Creates a new empty module registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module
    ///
    /// # Errors
    /// Fails if a module with the same ID is already registered
    pub fn register<M: LuaModule + 'static>(&mut self, module: M) -> Result<()> {
        let id = module.id();
        if self.modules.iter().any(|m| m.id() == id) {
            bail!("Module with id '{}' is already registered", id);
        }
        self.modules.push(Box::new(module));
        Ok(())
    }

    /// Returns all registered modules
    pub fn modules(&self) -> &[Box<dyn LuaModule>] {
        &self.modules
    }

    /// Registers all modules into a Lua context
    ///
    /// # Errors
    /// Returns the first error encountered during registration
    pub fn register_all(&self, lua: &Lua) -> LuaResult<()> {
        for module in &self.modules {
            module.register(lua)?;
        }
        Ok(())
    }

    /// Stubs of every registered module, concatenated
    pub fn generate_stubs(&self) -> String {
        let mut stubs = String::new();
        for module in &self.modules {
            stubs.push_str(&module.stubs());
            stubs.push_str("\n\n");
        }
        stubs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlatformModule;

    impl LuaModule for PlatformModule {
        fn id(&self) -> &'static str {
            "platform"
        }

        fn register(&self, lua: &Lua) -> LuaResult<()> {
            let table = lua.create_table()?;
            table.set("default", "linux64")?;
            lua.globals().set(self.id(), table)?;
            Ok(())
        }

        fn stubs(&self) -> String {
            "---@meta\n---@class platform\nplatform = {}".to_string()
        }
    }

    #[test]
    fn test_module_registration() {
        let mut registry = ModuleRegistry::new();
        registry.register(PlatformModule).unwrap();

        let ids: Vec<_> = registry.modules().iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["platform"]);

        let lua = Lua::new();
        registry.register_all(&lua).unwrap();
        let value: String = lua.load("return platform.default").eval().unwrap();
        assert_eq!(value, "linux64");
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ModuleRegistry::new();
        registry.register(PlatformModule).unwrap();
        let err = registry.register(PlatformModule).unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_stub_generation() {
        let mut registry = ModuleRegistry::new();
        registry.register(PlatformModule).unwrap();

        let stubs = registry.generate_stubs();
        assert!(stubs.contains("---@meta"));
        assert!(stubs.contains("platform = {}"));
    }
}
