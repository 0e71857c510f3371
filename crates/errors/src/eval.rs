//! Evaluator error types
//!
//! These cover conditions that stop the evaluator itself. Recoverable
//! script problems are reported as diagnostics on the event stream instead.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum EvalError {
    #[error("evaluation stopped: {reason}")]
    Stopped { reason: String },

    #[error("out of memory while {context}")]
    OutOfMemory { context: String },

    #[error("entry script not found: {path}")]
    MissingEntryScript { path: String },

    #[error("include depth limit of {limit} exceeded at {file}")]
    IncludeDepthExceeded { limit: usize, file: String },

    #[error("scope stack corrupted: {message}")]
    ScopeCorruption { message: String },
}
