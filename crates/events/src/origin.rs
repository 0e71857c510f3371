//! Source origin attached to every event

use serde::{Deserialize, Serialize};

/// Where an event came from: source file, line and the command that
/// produced it. Attached to every event and diagnostic so consumers can
/// report accurate backtraces without holding the AST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub file: String,
    pub line: usize,
    pub command: String,
}

impl Origin {
    #[must_use]
    pub fn new(file: impl Into<String>, line: usize, command: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            command: command.into(),
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({})", self.file, self.line, self.command)
    }
}
