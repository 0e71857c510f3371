//! Project-domain support types

use serde::{Deserialize, Serialize};

/// Which signature produced a `CustomCommand` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomCommandKind {
    /// `add_custom_command(OUTPUT ...)`
    Output,
    /// `add_custom_command(TARGET ...)`
    Target,
    /// `add_custom_target(... COMMAND ...)`
    TargetStep,
}
