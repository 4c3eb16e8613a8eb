//! Lua modules available to kind files
//!
//! Each module is generic over a small provider trait, so the CLI can hand
//! in the real parameter store and a tracing sink while tests use fixed
//! values and in-memory sinks.

pub mod log;
pub mod params;

pub use log::{LogLevel, LogModule, LogSink, TracingSink};
pub use params::{ParamProvider, ParamsModule};
