//! Target-domain support types

use serde::{Deserialize, Serialize};

/// What kind of build entity a `TargetDeclare` introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Executable,
    StaticLibrary,
    SharedLibrary,
    ModuleLibrary,
    ObjectLibrary,
    InterfaceLibrary,
    UnknownLibrary,
    /// `add_custom_target`
    Custom,
}

impl TargetKind {
    #[must_use]
    pub fn is_library(self) -> bool {
        !matches!(self, Self::Executable | Self::Custom)
    }
}

/// How a `TargetPropSet` combines with an existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPropOp {
    /// Replace the property.
    Set,
    /// Append as a new list element.
    AppendList,
    /// Append as raw string concatenation.
    AppendString,
}

/// Usage-requirement visibility on `target_*` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Public,
    Interface,
    /// Pre-3.0 signatures without a visibility keyword.
    Unspecified,
}
