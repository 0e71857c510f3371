//! Install-domain support types

use serde::{Deserialize, Serialize};

/// The flavor of an `InstallAddRule` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallRuleKind {
    File,
    Program,
    Directory,
    Target,
}
