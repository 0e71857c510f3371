//! Diagnostics taxonomy
//!
//! A diagnostic is a structured, recoverable report: what went wrong
//! (`cause`), where (`Origin` on the carrying event), which component and
//! command noticed it, an optional `hint` for the script author, and a
//! class/code pair for the run report's counters.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagSeverity {
    Warning,
    Error,
}

/// Broad cause classification used for run-report counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagClass {
    /// Malformed arguments, unknown subcommand, missing keyword.
    InputError,
    /// Command or code path this evaluator declares unimplemented.
    EngineLimitation,
    /// Filesystem failure, forbidden path, missing module file.
    IoEnvError,
    /// Unbalanced policy/scope stacks, PARENT_SCOPE at global scope.
    PolicyConflict,
}

/// Stable machine-readable code for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagCode {
    UnknownCommand,
    Unsupported,
    BadArguments,
    SecurityViolation,
    IoError,
    PolicyConflict,
    FatalError,
    NotFound,
}

/// One structured diagnostic. Carried inside `EventData::Diagnostic` so it
/// interleaves with regular events in emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagSeverity,
    /// Evaluator component that raised it (`dispatcher`, `file`, `flow`, ...).
    pub component: String,
    /// The command name as written in the script.
    pub command: String,
    pub cause: String,
    /// Optional guidance; empty when there is nothing useful to say.
    pub hint: String,
    pub class: DiagClass,
    pub code: DiagCode,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        severity: DiagSeverity,
        component: impl Into<String>,
        command: impl Into<String>,
        cause: impl Into<String>,
        hint: impl Into<String>,
        class: DiagClass,
        code: DiagCode,
    ) -> Self {
        Self {
            severity,
            component: component.into(),
            command: command.into(),
            cause: cause.into(),
            hint: hint.into(),
            class,
            code,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == DiagSeverity::Error
    }
}
