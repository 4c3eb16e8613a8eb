//! Core domain types
//!
//! Task records, dotted field paths and kind metadata shared by the core
//! library, the kind loader and the command line.

pub mod kind;
pub mod path;
pub mod task;
