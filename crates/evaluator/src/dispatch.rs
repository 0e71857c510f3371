//! Command dispatcher and capability registry
//!
//! The registry is a closed, versioned table: every command this
//! evaluator understands, its implementation level, and how it degrades.
//! Unknown commands get the uniform fallback (a warning diagnostic, then
//! continue). User-defined commands shadow built-ins.

use cmeval_errors::Error;
use cmeval_events::{DiagClass, DiagCode, DiagSeverity, Origin};
use cmeval_parser::CommandNode;

use crate::context::Evaluator;
use crate::resolver::Token;

/// How much of the upstream command semantics this evaluator implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandImplLevel {
    Full,
    Partial,
    Missing,
}

/// What happens when an unimplemented path is hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFallback {
    /// Warn and continue as a no-op.
    NoopWarn,
    /// Emit an error diagnostic and continue.
    ErrorContinue,
}

/// One row of the capability registry.
#[derive(Debug, Clone, Copy)]
pub struct Capability {
    pub name: &'static str,
    pub level: CommandImplLevel,
    pub fallback: CommandFallback,
}

const fn cap(name: &'static str, level: CommandImplLevel, fallback: CommandFallback) -> Capability {
    Capability {
        name,
        level,
        fallback,
    }
}

use CommandFallback::{ErrorContinue, NoopWarn};
use CommandImplLevel::{Full, Partial};

/// Central capability registry consumed by the dispatcher, the `COMMAND`
/// predicate, and embedders.
static COMMAND_CAPS: &[Capability] = &[
    cap("add_compile_options", Full, NoopWarn),
    cap("add_custom_command", Partial, ErrorContinue),
    cap("add_custom_target", Full, NoopWarn),
    cap("add_definitions", Full, NoopWarn),
    cap("add_executable", Full, NoopWarn),
    cap("add_library", Full, NoopWarn),
    cap("add_link_options", Full, NoopWarn),
    cap("add_subdirectory", Full, NoopWarn),
    cap("add_test", Partial, ErrorContinue),
    cap("block", Full, NoopWarn),
    cap("break", Full, NoopWarn),
    cap("cmake_minimum_required", Full, NoopWarn),
    cap("cmake_path", Partial, ErrorContinue),
    cap("cmake_policy", Full, NoopWarn),
    cap("continue", Full, NoopWarn),
    cap("cpack_add_component", Full, NoopWarn),
    cap("cpack_add_component_group", Full, NoopWarn),
    cap("cpack_add_install_type", Full, NoopWarn),
    cap("enable_testing", Full, NoopWarn),
    cap("endblock", Full, NoopWarn),
    cap("file", Partial, ErrorContinue),
    cap("find_package", Partial, ErrorContinue),
    cap("include", Partial, ErrorContinue),
    cap("include_directories", Full, NoopWarn),
    cap("include_guard", Full, NoopWarn),
    cap("install", Full, NoopWarn),
    cap("link_directories", Full, NoopWarn),
    cap("link_libraries", Full, NoopWarn),
    cap("list", Full, NoopWarn),
    cap("math", Full, NoopWarn),
    cap("message", Full, NoopWarn),
    cap("project", Full, NoopWarn),
    cap("return", Full, NoopWarn),
    cap("set", Full, NoopWarn),
    cap("set_property", Partial, ErrorContinue),
    cap("set_target_properties", Full, NoopWarn),
    cap("string", Full, NoopWarn),
    cap("target_compile_definitions", Full, NoopWarn),
    cap("target_compile_options", Full, NoopWarn),
    cap("target_include_directories", Full, NoopWarn),
    cap("target_link_directories", Full, NoopWarn),
    cap("target_link_libraries", Full, NoopWarn),
    cap("target_link_options", Full, NoopWarn),
    cap("try_compile", Full, NoopWarn),
    cap("unset", Full, NoopWarn),
];

/// The closed capability table, in name order.
#[must_use]
pub fn capabilities() -> &'static [Capability] {
    COMMAND_CAPS
}

/// Case-insensitive registry lookup.
#[must_use]
pub fn capability_for(name: &str) -> Option<&'static Capability> {
    COMMAND_CAPS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// A dispatched command: origin captured, arguments resolved.
pub(crate) struct Invocation {
    pub name: String,
    pub line: usize,
    pub origin: Origin,
    pub args: Vec<Token>,
}

impl Invocation {
    /// First argument keyword check, common in signature parsing.
    pub(crate) fn first_is(&self, keyword: &str) -> bool {
        self.args.first().is_some_and(|t| t.eq_keyword(keyword))
    }
}

impl Evaluator {
    /// Route one command node. Pre-conditions are enforced here
    /// uniformly: flow flags short-circuit, the origin is captured, and
    /// arguments are resolved once.
    pub(crate) fn dispatch_command(&mut self, node: &CommandNode) -> Result<(), Error> {
        if self.flow_interrupted() {
            return Ok(());
        }

        let lowered = node.name.to_ascii_lowercase();
        let origin = self.origin(node.line, &node.name);

        // User commands shadow built-ins.
        if self.user_cmd_defined(&lowered) {
            let args = self.resolve_args(&node.args)?;
            return self.user_cmd_invoke(&lowered, &args, &origin);
        }

        let Some(capability) = capability_for(&lowered) else {
            self.emit_diag(
                DiagSeverity::Warning,
                "dispatcher",
                &node.name,
                origin,
                format!("Unknown command '{}'", node.name),
                "The command is not in this evaluator's capability table",
                DiagClass::EngineLimitation,
                DiagCode::UnknownCommand,
            );
            return Ok(());
        };

        let args = self.resolve_args(&node.args)?;
        if self.should_stop() {
            return Ok(());
        }
        let inv = Invocation {
            name: lowered,
            line: node.line,
            origin,
            args,
        };
        self.route(capability, &inv)
    }

    /// Emit the capability-row fallback diagnostic for an unimplemented
    /// path inside a known command.
    pub(crate) fn unsupported_path(
        &mut self,
        capability_name: &str,
        inv: &Invocation,
        detail: impl Into<String>,
    ) {
        let fallback = capability_for(capability_name).map_or(NoopWarn, |c| c.fallback);
        let severity = match fallback {
            NoopWarn => DiagSeverity::Warning,
            ErrorContinue => DiagSeverity::Error,
        };
        self.emit_diag(
            severity,
            "dispatcher",
            &inv.name,
            inv.origin.clone(),
            detail,
            "This code path is not implemented by the evaluator",
            DiagClass::EngineLimitation,
            DiagCode::Unsupported,
        );
    }

    #[allow(clippy::too_many_lines)]
    fn route(&mut self, capability: &Capability, inv: &Invocation) -> Result<(), Error> {
        debug_assert!(capability.name.eq_ignore_ascii_case(&inv.name));
        match inv.name.as_str() {
            "set" => self.cmd_set(inv),
            "unset" => self.cmd_unset(inv),

            "project" => self.cmd_project(inv),
            "cmake_minimum_required" => self.cmd_cmake_minimum_required(inv),
            "cmake_policy" => self.cmd_cmake_policy(inv),

            "add_executable" => self.cmd_add_executable(inv),
            "add_library" => self.cmd_add_library(inv),
            "add_custom_target" => self.cmd_add_custom_target(inv),
            "target_include_directories"
            | "target_compile_definitions"
            | "target_compile_options"
            | "target_link_libraries"
            | "target_link_options"
            | "target_link_directories" => self.cmd_target_usage(inv),
            "set_target_properties" => self.cmd_set_target_properties(inv),
            "set_property" => self.cmd_set_property(inv),

            "add_definitions" => self.cmd_add_definitions(inv),
            "add_compile_options" => self.cmd_add_compile_options(inv),
            "add_link_options" => self.cmd_add_link_options(inv),
            "link_libraries" => self.cmd_link_libraries(inv),
            "link_directories" => self.cmd_link_directories(inv),
            "include_directories" => self.cmd_include_directories(inv),

            "install" => self.cmd_install(inv),
            "file" => self.cmd_file(inv),
            "find_package" => self.cmd_find_package(inv),
            "message" => self.cmd_message(inv),

            "include" => self.cmd_include(inv),
            "add_subdirectory" => self.cmd_add_subdirectory(inv),
            "include_guard" => self.cmd_include_guard(inv),

            "string" => self.cmd_string(inv),
            "list" => self.cmd_list(inv),
            "math" => self.cmd_math(inv),
            "cmake_path" => self.cmd_cmake_path(inv),

            "block" => self.cmd_block(inv),
            "endblock" => self.cmd_endblock(inv),
            "break" => self.cmd_break(inv),
            "continue" => self.cmd_continue(inv),
            "return" => self.cmd_return(inv),

            "enable_testing" => self.cmd_enable_testing(inv),
            "add_test" => self.cmd_add_test(inv),
            "add_custom_command" => self.cmd_add_custom_command(inv),
            "try_compile" => self.cmd_try_compile(inv),
            "cpack_add_component" => self.cmd_cpack_add_component(inv),
            "cpack_add_component_group" => self.cmd_cpack_add_component_group(inv),
            "cpack_add_install_type" => self.cmd_cpack_add_install_type(inv),

            other => {
                debug_assert!(false, "capability row without handler: {other}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_sorted_and_unique() {
        for pair in COMMAND_CAPS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(capability_for("ADD_EXECUTABLE").is_some());
        assert!(capability_for("Set").is_some());
        assert!(capability_for("no_such_command").is_none());
    }

    #[test]
    fn partial_rows_error_continue() {
        let file = capability_for("file").unwrap();
        assert_eq!(file.level, CommandImplLevel::Partial);
        assert_eq!(file.fallback, CommandFallback::ErrorContinue);
        let set = capability_for("set").unwrap();
        assert_eq!(set.level, CommandImplLevel::Full);
    }
}
