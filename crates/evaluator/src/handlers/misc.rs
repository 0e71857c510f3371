//! Testing, custom commands, try_compile, and cpack registration

use cmeval_errors::Error;
use cmeval_events::{CustomCommandKind, DiagClass, DiagCode, DiagSeverity, EventData};

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::resolver::Token;

fn keyword_value(args: &[Token], keyword: &str) -> Option<String> {
    args.iter()
        .position(|t| t.eq_keyword(keyword))
        .and_then(|i| args.get(i + 1))
        .map(|t| t.text.clone())
}

/// Words following `COMMAND` up to the next option keyword.
fn command_words(args: &[Token], stop_words: &[&str]) -> Option<String> {
    let pos = args.iter().position(|t| t.eq_keyword("COMMAND"))?;
    let words: Vec<&str> = args[pos + 1..]
        .iter()
        .take_while(|t| !stop_words.iter().any(|w| t.eq_keyword(w)))
        .map(|t| t.text.as_str())
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

impl Evaluator {
    pub(crate) fn cmd_enable_testing(&mut self, inv: &Invocation) -> Result<(), Error> {
        self.var_set("CMAKE_TESTING_ENABLED".into(), "1".into());
        self.emit(inv.origin.clone(), EventData::TestingEnabled);
        Ok(())
    }

    pub(crate) fn cmd_add_test(&mut self, inv: &Invocation) -> Result<(), Error> {
        let stop_words = [
            "COMMAND",
            "CONFIGURATIONS",
            "WORKING_DIRECTORY",
            "COMMAND_EXPAND_LISTS",
        ];

        if inv.first_is("NAME") {
            let Some(name) = keyword_value(&inv.args, "NAME") else {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_test(NAME ...) requires a test name",
                    "Usage: add_test(NAME <name> COMMAND <command> [<arg>...])",
                );
                return Ok(());
            };
            let Some(command) = command_words(&inv.args, &stop_words) else {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_test(NAME ...) requires COMMAND",
                    "Usage: add_test(NAME <name> COMMAND <command> [<arg>...])",
                );
                return Ok(());
            };
            self.emit(inv.origin.clone(), EventData::TestDeclare { name, command });
            return Ok(());
        }

        // Legacy signature: add_test(<name> <command> [<arg>...]).
        if inv.args.len() < 2 {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "add_test() requires a name and a command",
                "Usage: add_test(<name> <command> [<arg>...])",
            );
            return Ok(());
        }
        let name = inv.args[0].text.clone();
        let command = inv.args[1..]
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.emit(inv.origin.clone(), EventData::TestDeclare { name, command });
        Ok(())
    }

    pub(crate) fn cmd_add_custom_command(&mut self, inv: &Invocation) -> Result<(), Error> {
        let stop_words = [
            "COMMAND",
            "OUTPUT",
            "DEPENDS",
            "BYPRODUCTS",
            "IMPLICIT_DEPENDS",
            "MAIN_DEPENDENCY",
            "WORKING_DIRECTORY",
            "COMMENT",
            "DEPFILE",
            "JOB_POOL",
            "VERBATIM",
            "APPEND",
            "USES_TERMINAL",
            "COMMAND_EXPAND_LISTS",
            "PRE_BUILD",
            "PRE_LINK",
            "POST_BUILD",
        ];

        if inv.first_is("OUTPUT") {
            let outputs: Vec<String> = inv.args[1..]
                .iter()
                .take_while(|t| !stop_words.iter().any(|w| t.eq_keyword(w)))
                .map(|t| t.text.clone())
                .collect();
            let Some(command) = command_words(&inv.args, &stop_words) else {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_custom_command(OUTPUT ...) requires COMMAND",
                    "Usage: add_custom_command(OUTPUT <outputs>... COMMAND <command> [<arg>...])",
                );
                return Ok(());
            };
            self.emit(
                inv.origin.clone(),
                EventData::CustomCommand {
                    kind: CustomCommandKind::Output,
                    attached_to: String::new(),
                    outputs,
                    command,
                },
            );
            return Ok(());
        }

        if inv.first_is("TARGET") {
            let Some(target) = inv.args.get(1).map(|t| t.text.clone()) else {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_custom_command(TARGET ...) requires a target name",
                    "Usage: add_custom_command(TARGET <target> PRE_BUILD|PRE_LINK|POST_BUILD COMMAND ...)",
                );
                return Ok(());
            };
            if !self.target_known(&target) {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_custom_command(TARGET ...) called on unknown target",
                    target,
                );
                return Ok(());
            }
            let Some(command) = command_words(&inv.args, &stop_words) else {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_custom_command(TARGET ...) requires COMMAND",
                    "Usage: add_custom_command(TARGET <target> PRE_BUILD|PRE_LINK|POST_BUILD COMMAND ...)",
                );
                return Ok(());
            };
            self.emit(
                inv.origin.clone(),
                EventData::CustomCommand {
                    kind: CustomCommandKind::Target,
                    attached_to: target,
                    outputs: Vec::new(),
                    command,
                },
            );
            return Ok(());
        }

        self.unsupported_path(
            "add_custom_command",
            inv,
            "add_custom_command() supports only the OUTPUT and TARGET signatures",
        );
        Ok(())
    }

    pub(crate) fn cmd_try_compile(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(result_var) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "try_compile() requires a result variable",
                "Usage: try_compile(<result> ...)",
            );
            return Ok(());
        };
        // No toolchain probing here: assume the check passes and say so.
        self.var_set(result_var, "TRUE".to_string());
        self.emit_diag(
            DiagSeverity::Warning,
            "dispatcher",
            &inv.name,
            inv.origin.clone(),
            "try_compile() does not compile; the result is assumed TRUE",
            "Downstream consumers must not rely on real compiler checks",
            DiagClass::EngineLimitation,
            DiagCode::Unsupported,
        );
        Ok(())
    }

    pub(crate) fn cmd_cpack_add_component(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(name) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cpack_add_component() requires a component name",
                "Usage: cpack_add_component(<name> [DISPLAY_NAME <text>] [GROUP <group>] [DEPENDS <comp>...])",
            );
            return Ok(());
        };
        let display_name = keyword_value(&inv.args, "DISPLAY_NAME").unwrap_or_default();
        let group = keyword_value(&inv.args, "GROUP").unwrap_or_default();
        let option_keywords = [
            "DISPLAY_NAME",
            "DESCRIPTION",
            "GROUP",
            "DEPENDS",
            "INSTALL_TYPES",
            "HIDDEN",
            "REQUIRED",
            "DISABLED",
            "DOWNLOADED",
            "ARCHIVE_FILE",
            "PLIST",
        ];
        let depends: Vec<String> = inv
            .args
            .iter()
            .position(|t| t.eq_keyword("DEPENDS"))
            .map(|i| {
                inv.args[i + 1..]
                    .iter()
                    .take_while(|t| !option_keywords.iter().any(|w| t.eq_keyword(w)))
                    .map(|t| t.text.clone())
                    .collect()
            })
            .unwrap_or_default();
        self.emit(
            inv.origin.clone(),
            EventData::CpackComponent {
                name,
                display_name,
                group,
                depends,
            },
        );
        Ok(())
    }

    pub(crate) fn cmd_cpack_add_component_group(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(name) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cpack_add_component_group() requires a group name",
                "Usage: cpack_add_component_group(<name> [DISPLAY_NAME <text>] [PARENT_GROUP <group>])",
            );
            return Ok(());
        };
        self.emit(
            inv.origin.clone(),
            EventData::CpackComponentGroup {
                name,
                display_name: keyword_value(&inv.args, "DISPLAY_NAME").unwrap_or_default(),
                parent_group: keyword_value(&inv.args, "PARENT_GROUP").unwrap_or_default(),
            },
        );
        Ok(())
    }

    pub(crate) fn cmd_cpack_add_install_type(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(name) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cpack_add_install_type() requires a name",
                "Usage: cpack_add_install_type(<name> [DISPLAY_NAME <text>])",
            );
            return Ok(());
        };
        self.emit(
            inv.origin.clone(),
            EventData::CpackInstallType {
                name,
                display_name: keyword_value(&inv.args, "DISPLAY_NAME").unwrap_or_default(),
            },
        );
        Ok(())
    }
}
