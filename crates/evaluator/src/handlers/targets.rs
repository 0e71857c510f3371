//! Target declaration and per-target usage commands

use cmeval_errors::Error;
use cmeval_events::{
    CustomCommandKind, DiagClass, DiagCode, DiagSeverity, EventData, Origin, TargetKind,
    TargetPropOp, Visibility,
};
use cmeval_types::{is_cmake_true, join_list, split_list_genex_aware};

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::paths;

impl Evaluator {
    fn target_name_must_be_new(&mut self, inv: &Invocation, name: &str) -> bool {
        if !self.target_known(name) {
            return true;
        }
        self.input_error(
            &inv.name,
            inv.origin.clone(),
            "Target name already exists",
            name,
        );
        false
    }

    fn declare_alias(&mut self, inv: &Invocation, alias: &str, referent: &str) {
        if !self.target_known(referent) {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "ALIAS target does not exist",
                referent,
            );
            return;
        }
        if self.target_is_alias(referent) {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "ALIAS target cannot reference another ALIAS target",
                referent,
            );
            return;
        }
        self.target_register(alias);
        self.target_register_alias(alias);
    }

    fn emit_bool_prop(&mut self, origin: &Origin, target: &str, key: &str) {
        self.emit(
            origin.clone(),
            EventData::TargetPropSet {
                target: target.to_string(),
                key: key.to_string(),
                value: "1".to_string(),
                op: TargetPropOp::Set,
            },
        );
    }

    /// `add_subdirectory(SYSTEM)` marks targets declared beneath it.
    fn apply_subdir_system_default(&mut self, origin: &Origin, target: &str) {
        let raw = self.var_get("CMEVAL_SUBDIR_SYSTEM_DEFAULT");
        if raw.is_empty() || !is_cmake_true(&raw) {
            return;
        }
        self.emit(
            origin.clone(),
            EventData::TargetPropSet {
                target: target.to_string(),
                key: "SYSTEM".to_string(),
                value: "1".to_string(),
                op: TargetPropOp::Set,
            },
        );
    }

    /// Replay accumulated directory-level compile state onto a freshly
    /// declared target.
    fn apply_global_compile_state(&mut self, origin: &Origin, target: &str) {
        let defs = self.var_get(super::directory::GLOBAL_DEFS_VAR);
        for item in split_list_genex_aware(&defs) {
            self.emit(
                origin.clone(),
                EventData::TargetCompileDefinitions {
                    target: target.to_string(),
                    visibility: Visibility::Unspecified,
                    item,
                },
            );
        }
        let opts = self.var_get(super::directory::GLOBAL_OPTS_VAR);
        for item in split_list_genex_aware(&opts) {
            self.emit(
                origin.clone(),
                EventData::TargetCompileOptions {
                    target: target.to_string(),
                    visibility: Visibility::Unspecified,
                    item,
                },
            );
        }
    }

    pub(crate) fn cmd_add_executable(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(name) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "add_executable() missing target name",
                "Usage: add_executable(<name> [WIN32] [MACOSX_BUNDLE] [EXCLUDE_FROM_ALL] <sources...>)",
            );
            return Ok(());
        };
        if !self.target_name_must_be_new(inv, &name) {
            return Ok(());
        }

        if inv.args.get(1).is_some_and(|t| t.eq_keyword("ALIAS")) {
            if inv.args.len() != 3 {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_executable(ALIAS ...) expects exactly an alias name and a real target",
                    "Usage: add_executable(<name> ALIAS <target>)",
                );
                return Ok(());
            }
            let referent = inv.args[2].text.clone();
            self.declare_alias(inv, &name, &referent);
            return Ok(());
        }

        let mut is_imported = false;
        let mut is_global = false;
        let mut is_win32 = false;
        let mut is_macosx_bundle = false;
        let mut is_exclude_from_all = false;
        let mut source_start = 1usize;

        if inv.args.get(1).is_some_and(|t| t.eq_keyword("IMPORTED")) {
            is_imported = true;
            source_start = 2;
            if inv
                .args
                .get(source_start)
                .is_some_and(|t| t.eq_keyword("GLOBAL"))
            {
                is_global = true;
                source_start += 1;
            }
            if source_start < inv.args.len() {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_executable(IMPORTED ...) does not accept source files",
                    "Usage: add_executable(<name> IMPORTED [GLOBAL])",
                );
                return Ok(());
            }
        }

        if !is_imported {
            for (i, tok) in inv.args.iter().enumerate().skip(1) {
                if tok.eq_keyword("WIN32") {
                    is_win32 = true;
                    source_start = i + 1;
                } else if tok.eq_keyword("MACOSX_BUNDLE") {
                    is_macosx_bundle = true;
                    source_start = i + 1;
                } else if tok.eq_keyword("EXCLUDE_FROM_ALL") {
                    is_exclude_from_all = true;
                    source_start = i + 1;
                } else {
                    source_start = i;
                    break;
                }
            }
        }

        self.target_register(&name);
        self.emit(
            inv.origin.clone(),
            EventData::TargetDeclare {
                name: name.clone(),
                kind: TargetKind::Executable,
            },
        );
        if is_imported {
            self.emit_bool_prop(&inv.origin, &name, "IMPORTED");
            if is_global {
                self.emit_bool_prop(&inv.origin, &name, "IMPORTED_GLOBAL");
            }
        } else {
            self.apply_subdir_system_default(&inv.origin, &name);
            if is_win32 {
                self.emit_bool_prop(&inv.origin, &name, "WIN32_EXECUTABLE");
            }
            if is_macosx_bundle {
                self.emit_bool_prop(&inv.origin, &name, "MACOSX_BUNDLE");
            }
            if is_exclude_from_all {
                self.emit_bool_prop(&inv.origin, &name, "EXCLUDE_FROM_ALL");
            }
            for tok in &inv.args[source_start..] {
                self.emit(
                    inv.origin.clone(),
                    EventData::TargetAddSource {
                        target: name.clone(),
                        path: tok.text.clone(),
                    },
                );
            }
            self.apply_global_compile_state(&inv.origin, &name);
        }
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    pub(crate) fn cmd_add_library(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(name) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "add_library() missing target name",
                "Usage: add_library(<name> [STATIC|SHARED|MODULE|OBJECT|INTERFACE|UNKNOWN] [EXCLUDE_FROM_ALL] <sources...>)",
            );
            return Ok(());
        };
        if !self.target_name_must_be_new(inv, &name) {
            return Ok(());
        }

        if inv.args.get(1).is_some_and(|t| t.eq_keyword("ALIAS")) {
            if inv.args.len() != 3 {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_library(ALIAS ...) expects exactly an alias name and a real target",
                    "Usage: add_library(<name> ALIAS <target>)",
                );
                return Ok(());
            }
            let referent = inv.args[2].text.clone();
            self.declare_alias(inv, &name, &referent);
            return Ok(());
        }

        self.target_register(&name);

        let mut kind = TargetKind::UnknownLibrary;
        let mut has_explicit_type = false;
        let mut is_imported = false;
        let mut is_global = false;
        let mut is_exclude_from_all = false;
        let mut i = 1usize;

        if let Some(tok) = inv.args.get(i) {
            let explicit = if tok.eq_keyword("STATIC") {
                Some(TargetKind::StaticLibrary)
            } else if tok.eq_keyword("SHARED") {
                Some(TargetKind::SharedLibrary)
            } else if tok.eq_keyword("MODULE") {
                Some(TargetKind::ModuleLibrary)
            } else if tok.eq_keyword("OBJECT") {
                Some(TargetKind::ObjectLibrary)
            } else if tok.eq_keyword("INTERFACE") {
                Some(TargetKind::InterfaceLibrary)
            } else if tok.eq_keyword("UNKNOWN") {
                Some(TargetKind::UnknownLibrary)
            } else {
                None
            };
            if let Some(k) = explicit {
                kind = k;
                has_explicit_type = true;
                i += 1;
            }
        }

        if inv.args.get(i).is_some_and(|t| t.eq_keyword("IMPORTED")) {
            is_imported = true;
            i += 1;
            if !has_explicit_type {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_library(IMPORTED ...) requires an explicit library type",
                    "Usage: add_library(<name> <STATIC|SHARED|MODULE|OBJECT|INTERFACE|UNKNOWN> IMPORTED [GLOBAL])",
                );
                return Ok(());
            }
            if inv.args.get(i).is_some_and(|t| t.eq_keyword("GLOBAL")) {
                is_global = true;
                i += 1;
            }
            if i < inv.args.len() {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "add_library(IMPORTED ...) does not accept source files",
                    "Usage: add_library(<name> <type> IMPORTED [GLOBAL])",
                );
                return Ok(());
            }
        }

        if !is_imported {
            if !has_explicit_type {
                kind = if is_cmake_true(&self.var_get("BUILD_SHARED_LIBS")) {
                    TargetKind::SharedLibrary
                } else {
                    TargetKind::StaticLibrary
                };
            }
            if inv
                .args
                .get(i)
                .is_some_and(|t| t.eq_keyword("EXCLUDE_FROM_ALL"))
            {
                is_exclude_from_all = true;
                i += 1;
            }
        }

        self.emit(
            inv.origin.clone(),
            EventData::TargetDeclare {
                name: name.clone(),
                kind,
            },
        );
        if is_imported {
            self.emit_bool_prop(&inv.origin, &name, "IMPORTED");
            if is_global {
                self.emit_bool_prop(&inv.origin, &name, "IMPORTED_GLOBAL");
            }
        } else {
            self.apply_subdir_system_default(&inv.origin, &name);
            if is_exclude_from_all {
                self.emit_bool_prop(&inv.origin, &name, "EXCLUDE_FROM_ALL");
            }
            for tok in &inv.args[i..] {
                self.emit(
                    inv.origin.clone(),
                    EventData::TargetAddSource {
                        target: name.clone(),
                        path: tok.text.clone(),
                    },
                );
            }
            self.apply_global_compile_state(&inv.origin, &name);
        }
        Ok(())
    }

    pub(crate) fn cmd_add_custom_target(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(name) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "add_custom_target() missing target name",
                "Usage: add_custom_target(<name> [ALL] [COMMAND <cmd>...])",
            );
            return Ok(());
        };
        if !self.target_name_must_be_new(inv, &name) {
            return Ok(());
        }

        self.target_register(&name);
        self.emit(
            inv.origin.clone(),
            EventData::TargetDeclare {
                name: name.clone(),
                kind: TargetKind::Custom,
            },
        );

        if let Some(cmd_pos) = inv.args.iter().position(|t| t.eq_keyword("COMMAND")) {
            let stop_words = [
                "COMMAND",
                "COMMENT",
                "DEPENDS",
                "BYPRODUCTS",
                "WORKING_DIRECTORY",
                "JOB_POOL",
                "VERBATIM",
                "USES_TERMINAL",
                "COMMAND_EXPAND_LISTS",
                "SOURCES",
            ];
            let words: Vec<&str> = inv.args[cmd_pos + 1..]
                .iter()
                .take_while(|t| !stop_words.iter().any(|w| t.eq_keyword(w)))
                .map(|t| t.text.as_str())
                .collect();
            if !words.is_empty() {
                self.emit(
                    inv.origin.clone(),
                    EventData::CustomCommand {
                        kind: CustomCommandKind::TargetStep,
                        attached_to: name,
                        outputs: Vec::new(),
                        command: words.join(" "),
                    },
                );
            }
        }
        Ok(())
    }

    /// Shared handler for the six `target_*` usage commands.
    pub(crate) fn cmd_target_usage(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(target) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                format!("{}() missing target name", inv.name),
                "",
            );
            return Ok(());
        };
        if !self.target_known(&target) {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                format!("{}() called on unknown target", inv.name),
                target,
            );
            return Ok(());
        }

        let is_include_dirs = inv.name == "target_include_directories";
        let current_src = {
            let dir = self.var_get("CMAKE_CURRENT_SOURCE_DIR");
            if dir.is_empty() {
                self.source_dir.clone()
            } else {
                dir
            }
        };

        let mut visibility = Visibility::Unspecified;
        let mut system = false;
        let mut before = false;
        for tok in &inv.args[1..] {
            if tok.eq_keyword("PRIVATE") {
                visibility = Visibility::Private;
                continue;
            }
            if tok.eq_keyword("PUBLIC") {
                visibility = Visibility::Public;
                continue;
            }
            if tok.eq_keyword("INTERFACE") {
                visibility = Visibility::Interface;
                continue;
            }
            if is_include_dirs && tok.eq_keyword("SYSTEM") {
                system = true;
                continue;
            }
            if is_include_dirs && tok.eq_keyword("BEFORE") {
                before = true;
                continue;
            }
            if is_include_dirs && tok.eq_keyword("AFTER") {
                before = false;
                continue;
            }
            if tok.text.is_empty() {
                continue;
            }

            let data = match inv.name.as_str() {
                "target_include_directories" => EventData::TargetIncludeDirectories {
                    target: target.clone(),
                    visibility,
                    path: paths::resolve_for_argument(&tok.text, &current_src, true),
                    system,
                    before,
                },
                "target_compile_definitions" => EventData::TargetCompileDefinitions {
                    target: target.clone(),
                    visibility,
                    item: tok.text.clone(),
                },
                "target_compile_options" => EventData::TargetCompileOptions {
                    target: target.clone(),
                    visibility,
                    item: tok.text.clone(),
                },
                "target_link_libraries" => EventData::TargetLinkLibraries {
                    target: target.clone(),
                    visibility,
                    item: tok.text.clone(),
                },
                "target_link_options" => EventData::TargetLinkOptions {
                    target: target.clone(),
                    visibility,
                    item: tok.text.clone(),
                },
                "target_link_directories" => EventData::TargetLinkDirectories {
                    target: target.clone(),
                    visibility,
                    path: paths::resolve_for_argument(&tok.text, &current_src, true),
                },
                _ => unreachable!("dispatch routes only target usage commands here"),
            };
            self.emit(inv.origin.clone(), data);
        }
        Ok(())
    }

    pub(crate) fn cmd_set_target_properties(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(props_pos) = inv.args.iter().position(|t| t.eq_keyword("PROPERTIES")) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "set_target_properties() requires PROPERTIES",
                "Usage: set_target_properties(<targets...> PROPERTIES <key> <value> ...)",
            );
            return Ok(());
        };
        let targets: Vec<String> = inv.args[..props_pos]
            .iter()
            .map(|t| t.text.clone())
            .collect();
        let pairs = &inv.args[props_pos + 1..];
        if targets.is_empty() || pairs.is_empty() || pairs.len() % 2 != 0 {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "set_target_properties() requires targets and key/value pairs",
                "Usage: set_target_properties(<targets...> PROPERTIES <key> <value> ...)",
            );
            return Ok(());
        }

        for target in &targets {
            if !self.target_known(target) {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "set_target_properties() called on unknown target",
                    target,
                );
                continue;
            }
            for pair in pairs.chunks_exact(2) {
                self.emit(
                    inv.origin.clone(),
                    EventData::TargetPropSet {
                        target: target.clone(),
                        key: pair[0].text.clone(),
                        value: pair[1].text.clone(),
                        op: TargetPropOp::Set,
                    },
                );
            }
        }
        Ok(())
    }

    pub(crate) fn cmd_set_property(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(scope_tok) = inv.args.first() else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "set_property() missing scope",
                "Usage: set_property(TARGET <targets...> [APPEND|APPEND_STRING] PROPERTY <name> <values...>)",
            );
            return Ok(());
        };

        if !scope_tok.eq_keyword("TARGET") {
            // Only target scope is modeled; other scopes degrade per the
            // capability row but stay warnings so scripts keep working.
            self.emit_diag(
                DiagSeverity::Warning,
                "dispatcher",
                &inv.name,
                inv.origin.clone(),
                format!(
                    "set_property({} ...) scope is not supported",
                    scope_tok.text.to_ascii_uppercase()
                ),
                "Only set_property(TARGET ...) is evaluated",
                DiagClass::EngineLimitation,
                DiagCode::Unsupported,
            );
            return Ok(());
        }

        let Some(prop_pos) = inv.args.iter().position(|t| t.eq_keyword("PROPERTY")) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "set_property() requires PROPERTY",
                "Usage: set_property(TARGET <targets...> [APPEND|APPEND_STRING] PROPERTY <name> <values...>)",
            );
            return Ok(());
        };

        let mut op = TargetPropOp::Set;
        let mut targets: Vec<String> = Vec::new();
        for tok in &inv.args[1..prop_pos] {
            if tok.eq_keyword("APPEND") {
                op = TargetPropOp::AppendList;
            } else if tok.eq_keyword("APPEND_STRING") {
                op = TargetPropOp::AppendString;
            } else {
                targets.push(tok.text.clone());
            }
        }
        let Some(key) = inv.args.get(prop_pos + 1).map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "set_property() requires a property name after PROPERTY",
                "",
            );
            return Ok(());
        };
        let values: Vec<&str> = inv.args[prop_pos + 2..]
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        let value = join_list(&values);

        for target in &targets {
            if !self.target_known(target) {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "set_property(TARGET ...) called on unknown target",
                    target,
                );
                continue;
            }
            self.emit(
                inv.origin.clone(),
                EventData::TargetPropSet {
                    target: target.clone(),
                    key: key.clone(),
                    value: value.clone(),
                    op,
                },
            );
        }
        Ok(())
    }
}
