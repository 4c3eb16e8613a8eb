//! Logging module for kind files
//!
//! Kind files log through a [`LogSink`]. The CLI uses [`TracingSink`], which
//! forwards messages into `tracing`; tests collect them in memory.

use crate::module::{LuaModule, ModuleMetadata};
use mlua::prelude::*;
use std::sync::{Arc, Mutex};

/// Severity of a message logged from Lua
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Trait for log sinks
pub trait LogSink: Send + Sync {
    /// Write a log message
    fn write(&mut self, level: LogLevel, message: &str);
}

/// Sink forwarding to `tracing`, tagged with the kind file being evaluated
#[derive(Debug, Clone)]
pub struct TracingSink {
    source: String,
}

impl TracingSink {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl LogSink for TracingSink {
    fn write(&mut self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(source = %self.source, "{}", message),
            LogLevel::Info => tracing::info!(source = %self.source, "{}", message),
            LogLevel::Warning => tracing::warn!(source = %self.source, "{}", message),
            LogLevel::Error => tracing::error!(source = %self.source, "{}", message),
        }
    }
}

/// `log` module
pub struct LogModule<S: LogSink> {
    sink: Arc<Mutex<S>>,
}

impl<S: LogSink> LogModule<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }
}

impl<S: LogSink + 'static> LuaModule for LogModule<S> {
    fn id(&self) -> &'static str {
        "log"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let log_table = lua.create_table()?;

        let levels = [
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warning", LogLevel::Warning),
            ("error", LogLevel::Error),
        ];
        for (name, level) in levels {
            let sink = Arc::clone(&self.sink);
            log_table.set(
                name,
                lua.create_function(move |_, msg: String| {
                    sink.lock()
                        .map_err(|e| LuaError::RuntimeError(format!("Failed to lock sink: {}", e)))?
                        .write(level, &msg);
                    Ok(())
                })?,
            )?;
        }

        lua.globals().set(self.id(), log_table)?;
        Ok(())
    }

    fn stubs(&self) -> String {
        r#"---@meta

---Logging from kind files
---@class log
log = {}

---Log a debug message
---@param msg string The message to log
function log.debug(msg) end

---Log an info message
---@param msg string The message to log
function log.info(msg) end

---Log a warning message
---@param msg string The message to log
function log.warning(msg) end

---Log an error message
---@param msg string The message to log
function log.error(msg) end
"#
        .to_string()
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            id: self.id(),
            version: "1.0.0",
            description: "Logging for kind files",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Collected = Arc<Mutex<Vec<(LogLevel, String)>>>;

    struct CollectingSink {
        messages: Collected,
    }

    impl CollectingSink {
        fn new() -> (Self, Collected) {
            let messages = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    messages: Arc::clone(&messages),
                },
                messages,
            )
        }
    }

    impl LogSink for CollectingSink {
        fn write(&mut self, level: LogLevel, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((level, message.to_string()));
        }
    }

    #[test]
    fn test_log_all_levels() {
        let (sink, messages) = CollectingSink::new();
        let lua = Lua::new();
        LogModule::new(sink).register(&lua).unwrap();

        lua.load(r#"log.debug("debug")"#).exec().unwrap();
        lua.load(r#"log.info("info")"#).exec().unwrap();
        lua.load(r#"log.warning("warning")"#).exec().unwrap();
        lua.load(r#"log.error("error")"#).exec().unwrap();

        let logs = messages.lock().unwrap();
        assert_eq!(
            logs.iter().map(|(l, _)| *l).collect::<Vec<_>>(),
            vec![LogLevel::Debug, LogLevel::Info, LogLevel::Warning, LogLevel::Error]
        );
        assert_eq!(logs[1].1, "info");
    }

    #[test]
    fn test_tracing_sink_accepts_messages() {
        let lua = Lua::new();
        LogModule::new(TracingSink::new("kinds/build.lua"))
            .register(&lua)
            .unwrap();
        lua.load(r#"log.info("declared 3 tasks")"#).exec().unwrap();
    }

    #[test]
    fn test_log_module_stubs() {
        let (sink, _messages) = CollectingSink::new();
        let stubs = LogModule::new(sink).stubs();

        assert!(stubs.contains("log = {}"));
        assert!(stubs.contains("function log.warning"));
    }
}
