//! The tagged event sum type
//!
//! One variant per semantic fact. Support enums (`TargetKind`,
//! `TargetPropOp`, `Visibility`, `InstallRuleKind`) live in the domain
//! modules and are re-exported here.

use serde::{Deserialize, Serialize};

use crate::diag::Diagnostic;
use crate::origin::Origin;

pub mod directory;
pub mod install;
pub mod project;
pub mod target;

pub use directory::*;
pub use install::*;
pub use project::*;
pub use target::*;

/// One emitted event: origin plus tagged payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub origin: Origin,
    #[serde(flatten)]
    pub data: EventData,
}

impl Event {
    #[must_use]
    pub fn new(origin: Origin, data: EventData) -> Self {
        Self { origin, data }
    }

    /// The snake_case tag of this event, as serialized.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.data.tag()
    }
}

/// Every fact the evaluator can emit, as a single sum type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventData {
    /// `project()` was evaluated.
    ProjectDeclare {
        name: String,
        version: String,
        description: String,
        languages: String,
    },

    /// A target came into existence (`add_executable`, `add_library`,
    /// `add_custom_target`).
    TargetDeclare { name: String, kind: TargetKind },

    /// One source file attached to a target, in argument order.
    TargetAddSource { target: String, path: String },

    TargetIncludeDirectories {
        target: String,
        visibility: Visibility,
        path: String,
        system: bool,
        before: bool,
    },

    TargetCompileDefinitions {
        target: String,
        visibility: Visibility,
        item: String,
    },

    TargetCompileOptions {
        target: String,
        visibility: Visibility,
        item: String,
    },

    TargetLinkLibraries {
        target: String,
        visibility: Visibility,
        item: String,
    },

    TargetLinkOptions {
        target: String,
        visibility: Visibility,
        item: String,
    },

    TargetLinkDirectories {
        target: String,
        visibility: Visibility,
        path: String,
    },

    /// Property write on a target. Generator expressions in `value` are
    /// preserved byte-for-byte, semicolons included.
    TargetPropSet {
        target: String,
        key: String,
        value: String,
        op: TargetPropOp,
    },

    DirectoryIncludeDirectories {
        path: String,
        system: bool,
        before: bool,
    },

    DirectoryLinkDirectories { path: String, before: bool },

    GlobalCompileOptions { item: String },

    GlobalCompileDefinitions { item: String },

    GlobalLinkOptions { item: String },

    GlobalLinkLibraries { item: String },

    /// One `(item, destination)` install pair.
    InstallAddRule {
        kind: InstallRuleKind,
        item: String,
        destination: String,
    },

    /// `set(... CACHE ...)` wrote a cache entry.
    SetCacheEntry {
        key: String,
        value: String,
        entry_type: String,
        docstring: String,
        force: bool,
    },

    /// Outcome of a `find_package()` call.
    FindPackage {
        package: String,
        version_requested: String,
        found: bool,
        module_mode: bool,
    },

    /// `add_test()` registered a test.
    TestDeclare { name: String, command: String },

    /// `enable_testing()` was evaluated.
    TestingEnabled,

    /// `add_custom_command` / `add_custom_target` command step.
    CustomCommand {
        kind: CustomCommandKind,
        attached_to: String,
        outputs: Vec<String>,
        command: String,
    },

    CpackComponent {
        name: String,
        display_name: String,
        group: String,
        depends: Vec<String>,
    },

    CpackComponentGroup {
        name: String,
        display_name: String,
        parent_group: String,
    },

    CpackInstallType { name: String, display_name: String },

    /// A diagnostic, interleaved with regular events in emission order.
    Diagnostic(Diagnostic),
}

impl EventData {
    /// The serialized tag for this variant.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ProjectDeclare { .. } => "project_declare",
            Self::TargetDeclare { .. } => "target_declare",
            Self::TargetAddSource { .. } => "target_add_source",
            Self::TargetIncludeDirectories { .. } => "target_include_directories",
            Self::TargetCompileDefinitions { .. } => "target_compile_definitions",
            Self::TargetCompileOptions { .. } => "target_compile_options",
            Self::TargetLinkLibraries { .. } => "target_link_libraries",
            Self::TargetLinkOptions { .. } => "target_link_options",
            Self::TargetLinkDirectories { .. } => "target_link_directories",
            Self::TargetPropSet { .. } => "target_prop_set",
            Self::DirectoryIncludeDirectories { .. } => "directory_include_directories",
            Self::DirectoryLinkDirectories { .. } => "directory_link_directories",
            Self::GlobalCompileOptions { .. } => "global_compile_options",
            Self::GlobalCompileDefinitions { .. } => "global_compile_definitions",
            Self::GlobalLinkOptions { .. } => "global_link_options",
            Self::GlobalLinkLibraries { .. } => "global_link_libraries",
            Self::InstallAddRule { .. } => "install_add_rule",
            Self::SetCacheEntry { .. } => "set_cache_entry",
            Self::FindPackage { .. } => "find_package",
            Self::TestDeclare { .. } => "test_declare",
            Self::TestingEnabled => "testing_enabled",
            Self::CustomCommand { .. } => "custom_command",
            Self::CpackComponent { .. } => "cpack_component",
            Self::CpackComponentGroup { .. } => "cpack_component_group",
            Self::CpackInstallType { .. } => "cpack_install_type",
            Self::Diagnostic(_) => "diagnostic",
        }
    }
}
