//! Taskforge Lua kind definitions
//!
//! This crate loads kind definitions written in Lua. It includes:
//! - Module trait and registry for Lua modules
//! - A restricted sandbox with the `kind` helper module
//! - The `params` and `log` modules
//! - Parsing of kind tables into [`KindDefinition`]s
//! - Loading of a whole kinds directory
//! - Stub generation for editor support

pub mod definition;
pub mod loader;
pub mod module;
pub mod modules;
pub mod parser;
pub mod sandbox;

pub use definition::KindDefinition;
pub use loader::{load_kind_file, load_kinds_dir};
pub use module::{LuaModule, ModuleMetadata, ModuleRegistry};
pub use modules::{LogModule, LogSink, ParamProvider, ParamsModule, TracingSink};
pub use parser::parse_kind_definition;
pub use sandbox::{create_sandbox, kind_stubs};
