//! `install()` — signature-dispatched rule emission
//!
//! Every accepted signature boils down to one `InstallAddRule` event per
//! `(item, destination)` pair. Script/code/export flavors encode their
//! payload in the item with a `TAG::` prefix so the downstream assembler
//! can tell them apart without extra variants.

use cmeval_errors::Error;
use cmeval_events::{EventData, InstallRuleKind};

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::resolver::Token;

fn is_files_like_keyword(tok: &Token) -> bool {
    [
        "DESTINATION",
        "TYPE",
        "RENAME",
        "PERMISSIONS",
        "CONFIGURATIONS",
        "COMPONENT",
        "OPTIONAL",
        "EXCLUDE_FROM_ALL",
        "FILE_PERMISSIONS",
        "DIRECTORY_PERMISSIONS",
        "USE_SOURCE_PERMISSIONS",
        "NO_SOURCE_PERMISSIONS",
        "FILES_MATCHING",
        "PATTERN",
        "REGEX",
        "MESSAGE_NEVER",
        "FOLLOW_SYMLINK_CHAIN",
    ]
    .iter()
    .any(|k| tok.eq_keyword(k))
}

fn is_targets_keyword(tok: &Token) -> bool {
    [
        "EXPORT",
        "RUNTIME_DEPENDENCIES",
        "RUNTIME_DEPENDENCY_SET",
        "INCLUDES",
        "DESTINATION",
        "PERMISSIONS",
        "CONFIGURATIONS",
        "COMPONENT",
        "NAMELINK_COMPONENT",
        "OPTIONAL",
        "EXCLUDE_FROM_ALL",
        "NAMELINK_ONLY",
        "NAMELINK_SKIP",
        "ARCHIVE",
        "LIBRARY",
        "RUNTIME",
        "OBJECTS",
        "FRAMEWORK",
        "BUNDLE",
        "PRIVATE_HEADER",
        "PUBLIC_HEADER",
        "RESOURCE",
        "FILE_SET",
        "CXX_MODULES_BMI",
    ]
    .iter()
    .any(|k| tok.eq_keyword(k))
}

/// GNU-style destination for `install(... TYPE <type>)`.
fn destination_from_type(ty: &str) -> Option<&'static str> {
    let table: &[(&str, &str)] = &[
        ("BIN", "bin"),
        ("SBIN", "sbin"),
        ("LIB", "lib"),
        ("INCLUDE", "include"),
        ("SYSCONF", "etc"),
        ("SHAREDSTATE", "com"),
        ("LOCALSTATE", "var"),
        ("RUNSTATE", "var/run"),
        ("DATA", "share"),
        ("INFO", "share/info"),
        ("LOCALE", "share/locale"),
        ("MAN", "share/man"),
        ("DOC", "share/doc"),
    ];
    table
        .iter()
        .find(|(k, _)| ty.eq_ignore_ascii_case(k))
        .map(|(_, v)| *v)
}

impl Evaluator {
    fn install_emit_rule(
        &mut self,
        inv: &Invocation,
        kind: InstallRuleKind,
        item: String,
        destination: String,
    ) {
        self.emit(
            inv.origin.clone(),
            EventData::InstallAddRule {
                kind,
                item,
                destination,
            },
        );
    }

    fn install_collect_destinations(&mut self, inv: &Invocation, start: usize) -> Option<Vec<String>> {
        let mut destinations = Vec::new();
        let mut i = start;
        while i < inv.args.len() {
            if inv.args[i].eq_keyword("DESTINATION") {
                let Some(dest) = inv.args.get(i + 1) else {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        "install(... DESTINATION) requires a destination path",
                        "Usage: ... DESTINATION <dir>",
                    );
                    return None;
                };
                destinations.push(dest.text.clone());
                i += 1;
            }
            i += 1;
        }
        Some(destinations)
    }

    #[allow(clippy::too_many_lines)]
    fn install_files_like(&mut self, inv: &Invocation, kind: InstallRuleKind) {
        let mut items = Vec::new();
        let mut i = 1usize;
        while i < inv.args.len() {
            if is_files_like_keyword(&inv.args[i]) {
                break;
            }
            items.push(inv.args[i].text.clone());
            i += 1;
        }

        let mut destination = String::new();
        let mut ty = String::new();
        while i < inv.args.len() {
            let tok = &inv.args[i];
            if tok.eq_keyword("DESTINATION") {
                let Some(dest) = inv.args.get(i + 1) else {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        "install(... DESTINATION) requires a destination path",
                        "Usage: ... DESTINATION <dir>",
                    );
                    return;
                };
                destination = dest.text.clone();
                i += 1;
            } else if tok.eq_keyword("TYPE") {
                let Some(type_tok) = inv.args.get(i + 1) else {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        "install(... TYPE) requires a type name",
                        "Valid examples: BIN, LIB, INCLUDE, DATA, DOC",
                    );
                    return;
                };
                ty = type_tok.text.clone();
                i += 1;
            } else if tok.eq_keyword("RENAME")
                || tok.eq_keyword("COMPONENT")
                || tok.eq_keyword("PATTERN")
                || tok.eq_keyword("REGEX")
            {
                // Keyword with one payload argument we do not model.
                if i + 1 < inv.args.len() {
                    i += 1;
                }
            }
            i += 1;
        }

        if !destination.is_empty() && !ty.is_empty() {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install() TYPE and DESTINATION cannot be used together",
                "Choose TYPE or DESTINATION",
            );
            return;
        }
        if destination.is_empty() && !ty.is_empty() {
            match destination_from_type(&ty) {
                Some(mapped) => destination = mapped.to_string(),
                None => {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        "install() unknown TYPE value",
                        ty,
                    );
                    return;
                }
            }
        }
        if destination.is_empty() {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install() missing DESTINATION/TYPE",
                "Usage: install(FILES|PROGRAMS|DIRECTORY <items...> DESTINATION <dir>)",
            );
            return;
        }
        if items.is_empty() {
            // install(DIRECTORY DESTINATION <dir>) creates the destination
            // only; other signatures need items.
            if kind != InstallRuleKind::Directory {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "install() has no items for the selected signature",
                    "Usage: install(FILES|PROGRAMS|DIRECTORY <items...> DESTINATION <dir>)",
                );
            }
            return;
        }

        for item in items {
            self.install_emit_rule(inv, kind, item, destination.clone());
        }
    }

    fn install_targets_like(&mut self, inv: &Invocation, imported_runtime_artifacts: bool) {
        let mut targets = Vec::new();
        let mut i = 1usize;
        while i < inv.args.len() {
            if is_targets_keyword(&inv.args[i]) {
                break;
            }
            targets.push(inv.args[i].text.clone());
            i += 1;
        }
        if targets.is_empty() {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install(TARGETS/IMPORTED_RUNTIME_ARTIFACTS) requires at least one target",
                "Usage: install(TARGETS <tgt>... DESTINATION <dir>)",
            );
            return;
        }

        let Some(mut destinations) = self.install_collect_destinations(inv, i) else {
            return;
        };
        if destinations.is_empty() {
            // Some artifact categories have implicit destinations; keep
            // the rule with an empty destination rather than dropping it.
            destinations.push(String::new());
        }

        for target in targets {
            let item = if imported_runtime_artifacts {
                format!("IMPORTED_RUNTIME_ARTIFACTS::{target}")
            } else {
                target
            };
            for destination in &destinations {
                self.install_emit_rule(
                    inv,
                    InstallRuleKind::Target,
                    item.clone(),
                    destination.clone(),
                );
            }
        }
    }

    fn install_script_code(&mut self, inv: &Invocation) {
        let mut emitted_any = false;
        let mut i = 0usize;
        while i < inv.args.len() {
            let tok = &inv.args[i];
            if tok.eq_keyword("SCRIPT") || tok.eq_keyword("CODE") {
                let is_code = tok.eq_keyword("CODE");
                let Some(payload) = inv.args.get(i + 1) else {
                    let (cause, hint) = if is_code {
                        ("install(CODE) requires code content", "Usage: install(CODE <code>)")
                    } else {
                        ("install(SCRIPT) requires a script path", "Usage: install(SCRIPT <script>)")
                    };
                    self.input_error(&inv.name, inv.origin.clone(), cause, hint);
                    return;
                };
                let tag = if is_code { "CODE" } else { "SCRIPT" };
                let item = format!("{tag}::{}", payload.text);
                self.install_emit_rule(inv, InstallRuleKind::File, item, String::new());
                emitted_any = true;
                i += 2;
                continue;
            }

            let is_option = tok.eq_keyword("ALL_COMPONENTS")
                || tok.eq_keyword("EXCLUDE_FROM_ALL")
                || tok.eq_keyword("COMPONENT");
            if !is_option {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "install(SCRIPT/CODE) received an unexpected argument",
                    tok.text.clone(),
                );
                return;
            }
            if tok.eq_keyword("COMPONENT") && i + 1 < inv.args.len() {
                i += 1;
            }
            i += 1;
        }

        if !emitted_any {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install(SCRIPT/CODE) requires at least one SCRIPT or CODE clause",
                "Usage: install([[SCRIPT <file>] [CODE <code>]] [COMPONENT <component>])",
            );
        }
    }

    fn install_export_like(&mut self, inv: &Invocation, tag: &str) {
        if inv.args.len() < 2 {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install(EXPORT ...) requires an export name",
                "Usage: install(EXPORT <name> DESTINATION <dir>)",
            );
            return;
        }
        let Some(destinations) = self.install_collect_destinations(inv, 2) else {
            return;
        };
        if destinations.is_empty() {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install(EXPORT ...) requires DESTINATION",
                "Usage: install(EXPORT <name> DESTINATION <dir>)",
            );
            return;
        }
        let item = format!("{tag}::{}", inv.args[1].text);
        for destination in destinations {
            self.install_emit_rule(inv, InstallRuleKind::File, item.clone(), destination);
        }
    }

    fn install_runtime_dependency_set(&mut self, inv: &Invocation) {
        if inv.args.len() < 2 {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install(RUNTIME_DEPENDENCY_SET) requires a set name",
                "Usage: install(RUNTIME_DEPENDENCY_SET <set> DESTINATION <dir>)",
            );
            return;
        }
        let Some(destinations) = self.install_collect_destinations(inv, 2) else {
            return;
        };
        if destinations.is_empty() {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install(RUNTIME_DEPENDENCY_SET) requires DESTINATION",
                "Usage: install(RUNTIME_DEPENDENCY_SET <set> DESTINATION <dir>)",
            );
            return;
        }
        let item = format!("RUNTIME_DEPENDENCY_SET::{}", inv.args[1].text);
        for destination in destinations {
            self.install_emit_rule(inv, InstallRuleKind::Target, item.clone(), destination);
        }
    }

    pub(crate) fn cmd_install(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(signature) = inv.args.first() else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install() requires a signature keyword",
                "Usage: install(TARGETS|FILES|PROGRAMS|DIRECTORY|SCRIPT|CODE|EXPORT ...)",
            );
            return Ok(());
        };

        if signature.eq_keyword("TARGETS") {
            self.install_targets_like(inv, false);
        } else if signature.eq_keyword("FILES") {
            self.install_files_like(inv, InstallRuleKind::File);
        } else if signature.eq_keyword("PROGRAMS") {
            self.install_files_like(inv, InstallRuleKind::Program);
        } else if signature.eq_keyword("DIRECTORY") {
            self.install_files_like(inv, InstallRuleKind::Directory);
        } else if signature.eq_keyword("SCRIPT") || signature.eq_keyword("CODE") {
            self.install_script_code(inv);
        } else if signature.eq_keyword("EXPORT") {
            self.install_export_like(inv, "EXPORT");
        } else if signature.eq_keyword("EXPORT_ANDROID_MK") {
            self.install_export_like(inv, "EXPORT_ANDROID_MK");
        } else if signature.eq_keyword("RUNTIME_DEPENDENCY_SET") {
            self.install_runtime_dependency_set(inv);
        } else if signature.eq_keyword("IMPORTED_RUNTIME_ARTIFACTS") {
            self.install_targets_like(inv, true);
        } else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "install() unsupported rule type",
                signature.text.clone(),
            );
        }
        Ok(())
    }
}
