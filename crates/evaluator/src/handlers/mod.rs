//! Per-command semantics
//!
//! One module per command family. Handlers receive an
//! [`crate::dispatch::Invocation`] with resolved tokens and a captured
//! origin; semantic failure is reported through diagnostics, never
//! through the `Result` (which is reserved for evaluator-fatal
//! conditions).

pub mod cmake_path;
pub mod directory;
pub mod fileops;
pub mod find_package;
pub mod include;
pub mod install;
pub mod lists;
pub mod math;
pub mod message;
pub mod misc;
pub mod project;
pub mod strings;
pub mod targets;
pub mod vars;
