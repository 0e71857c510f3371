//! `project`, `cmake_minimum_required`, `cmake_policy`

use cmeval_errors::Error;
use cmeval_events::{DiagClass, DiagCode, DiagSeverity, EventData};
use cmeval_types::{join_list, CmakeVersion};

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::policy::{self, PolicyStatus};

impl Evaluator {
    pub(crate) fn cmd_project(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(name) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "project() missing name",
                "Usage: project(<name> [VERSION v] [DESCRIPTION d] [LANGUAGES ...])",
            );
            return Ok(());
        };

        let mut version = String::new();
        let mut description = String::new();
        let mut languages: Vec<String> = Vec::new();

        let mut i = 1usize;
        while i < inv.args.len() {
            let tok = &inv.args[i];
            if tok.eq_keyword("VERSION") && i + 1 < inv.args.len() {
                i += 1;
                version = inv.args[i].text.clone();
            } else if tok.eq_keyword("DESCRIPTION") && i + 1 < inv.args.len() {
                i += 1;
                description = inv.args[i].text.clone();
            } else if tok.eq_keyword("LANGUAGES") {
                languages = inv.args[i + 1..].iter().map(|t| t.text.clone()).collect();
                break;
            }
            i += 1;
        }
        let languages = join_list(&languages);

        let mut project_src = self.var_get("CMAKE_CURRENT_SOURCE_DIR");
        if project_src.is_empty() {
            project_src = self.source_dir.clone();
        }
        let mut project_bin = self.var_get("CMAKE_CURRENT_BINARY_DIR");
        if project_bin.is_empty() {
            project_bin = self.binary_dir.clone();
        }

        self.var_set("PROJECT_NAME".into(), name.clone());
        self.var_set("PROJECT_VERSION".into(), version.clone());
        self.var_set("PROJECT_SOURCE_DIR".into(), project_src.clone());
        self.var_set("PROJECT_BINARY_DIR".into(), project_bin.clone());
        self.var_set("PROJECT_DESCRIPTION".into(), description.clone());

        if self.var_get("CMAKE_PROJECT_NAME").is_empty() {
            self.var_set("CMAKE_PROJECT_NAME".into(), name.clone());
        }

        self.var_set(format!("{name}_SOURCE_DIR"), project_src);
        self.var_set(format!("{name}_BINARY_DIR"), project_bin);
        self.var_set(format!("{name}_VERSION"), version.clone());
        self.var_set(format!("{name}_DESCRIPTION"), description.clone());

        self.emit(
            inv.origin.clone(),
            EventData::ProjectDeclare {
                name,
                version,
                description,
                languages,
            },
        );
        Ok(())
    }

    pub(crate) fn cmd_cmake_minimum_required(&mut self, inv: &Invocation) -> Result<(), Error> {
        if inv.args.len() < 2 || !inv.args[0].eq_keyword("VERSION") {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cmake_minimum_required() expects VERSION",
                "Usage: cmake_minimum_required(VERSION <min>[...<max>] [FATAL_ERROR])",
            );
            return Ok(());
        }
        if inv.args.len() > 3 || (inv.args.len() == 3 && !inv.args[2].eq_keyword("FATAL_ERROR")) {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cmake_minimum_required() received invalid arguments",
                "Usage: cmake_minimum_required(VERSION <min>[...<max>] [FATAL_ERROR])",
            );
            return Ok(());
        }

        let range_token = &inv.args[1].text;
        let Some((min_version, max_version)) = CmakeVersion::parse_range_strict(range_token)
        else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cmake_minimum_required() received invalid VERSION token",
                range_token.clone(),
            );
            return Ok(());
        };
        if min_version > policy::BASELINE_VERSION {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cmake_minimum_required() requires a newer CMake than the evaluator baseline",
                range_token.clone(),
            );
            return Ok(());
        }
        if let Some(max) = max_version {
            if max < min_version {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_minimum_required() requires max version >= min version",
                    range_token.clone(),
                );
                return Ok(());
            }
        }

        let (min_token, max_token) = match range_token.find("...") {
            Some(pos) => (range_token[..pos].to_string(), range_token[pos + 3..].to_string()),
            None => (range_token.clone(), range_token.clone()),
        };

        let mut policy_version = max_version.unwrap_or(min_version);
        let mut policy_token = if max_version.is_some() { max_token } else { min_token.clone() };
        if policy_version < policy::POLICY_FLOOR {
            policy_version = policy::POLICY_FLOOR;
            policy_token = policy::POLICY_FLOOR_STRING.to_string();
        }

        self.var_set("CMAKE_MINIMUM_REQUIRED_VERSION".into(), min_token);
        self.var_set("CMAKE_POLICY_VERSION".into(), policy_token);
        self.policy_apply_version_defaults(policy_version);
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    pub(crate) fn cmd_cmake_policy(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(sub) = inv.args.first() else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cmake_policy() missing subcommand",
                "Expected one of: VERSION, SET, GET, PUSH, POP",
            );
            return Ok(());
        };

        if sub.eq_keyword("VERSION") {
            if inv.args.len() != 2 {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(VERSION ...) expects exactly one version argument",
                    "Usage: cmake_policy(VERSION <min>[...<max>])",
                );
                return Ok(());
            }
            let range_token = &inv.args[1].text;
            let Some((min_version, max_version)) = CmakeVersion::parse_range_strict(range_token)
            else {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(VERSION ...) received invalid version token",
                    range_token.clone(),
                );
                return Ok(());
            };
            if min_version < policy::POLICY_FLOOR {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(VERSION ...) requires minimum version >= 2.4",
                    range_token.clone(),
                );
                return Ok(());
            }
            if min_version > policy::BASELINE_VERSION {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(VERSION ...) min version exceeds the evaluator baseline",
                    range_token.clone(),
                );
                return Ok(());
            }
            if let Some(max) = max_version {
                if max < min_version {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        "cmake_policy(VERSION ...) requires max version >= min version",
                        range_token.clone(),
                    );
                    return Ok(());
                }
            }
            let policy_version = max_version.unwrap_or(min_version);
            let policy_token = match range_token.find("...") {
                Some(pos) => range_token[pos + 3..].to_string(),
                None => range_token.clone(),
            };
            self.var_set("CMAKE_POLICY_VERSION".into(), policy_token);
            self.policy_apply_version_defaults(policy_version);
            return Ok(());
        }

        if sub.eq_keyword("SET") {
            if inv.args.len() != 3 {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(SET ...) expects exactly a policy id and a value",
                    "Usage: cmake_policy(SET CMP0077 NEW)",
                );
                return Ok(());
            }
            let id = &inv.args[1].text;
            if !policy::is_known_policy(id) {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(SET ...) requires a known CMP policy id",
                    id.clone(),
                );
                return Ok(());
            }
            let Some(status) = PolicyStatus::parse(&inv.args[2].text) else {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(SET ...) requires OLD or NEW",
                    inv.args[2].text.clone(),
                );
                return Ok(());
            };
            self.policy_set(id, status);
            return Ok(());
        }

        if sub.eq_keyword("GET") {
            if inv.args.len() != 3 {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(GET ...) expects exactly a policy id and an output variable",
                    "Usage: cmake_policy(GET CMP0077 out_var)",
                );
                return Ok(());
            }
            let id = inv.args[1].text.clone();
            if !policy::is_known_policy(&id) {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(GET ...) requires a known CMP policy id",
                    id,
                );
                return Ok(());
            }
            let value = self.policy_get_effective(&id);
            self.var_set(inv.args[2].text.clone(), value);
            return Ok(());
        }

        if sub.eq_keyword("PUSH") {
            if inv.args.len() != 1 {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(PUSH) does not accept extra arguments",
                    "Usage: cmake_policy(PUSH)",
                );
                return Ok(());
            }
            self.policy_push();
            return Ok(());
        }

        if sub.eq_keyword("POP") {
            if inv.args.len() != 1 {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(POP) does not accept extra arguments",
                    "Usage: cmake_policy(POP)",
                );
                return Ok(());
            }
            if !self.policy_pop() {
                self.emit_diag(
                    DiagSeverity::Error,
                    "dispatcher",
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_policy(POP) called without matching PUSH",
                    "Add cmake_policy(PUSH) before POP",
                    DiagClass::PolicyConflict,
                    DiagCode::PolicyConflict,
                );
                self.request_stop();
            }
            return Ok(());
        }

        self.input_error(
            &inv.name,
            inv.origin.clone(),
            "Unknown cmake_policy() subcommand",
            sub.text.clone(),
        );
        self.request_stop();
        Ok(())
    }
}
