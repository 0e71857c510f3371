//! `find_package()` — module and config mode resolution
//!
//! Module mode searches `CMAKE_MODULE_PATH` for `Find<Name>.cmake`;
//! config mode searches `CMAKE_PREFIX_PATH` for `<Name>Config.cmake`
//! (plus the lowercase `-config` and `lib/cmake/<Name>/` layouts) and
//! honors a sibling `<Name>ConfigVersion.cmake`. Found scripts evaluate
//! in the caller's scope with the `<Name>_FIND_*` variables bound, and a
//! script-set `<Name>_FOUND` always wins over the engine's verdict.

use cmeval_errors::Error;
use cmeval_events::{DiagClass, DiagCode, DiagSeverity, EventData};
use cmeval_types::{is_cmake_true, join_list, split_list_genex_aware};

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::driver::FileScope;
use crate::paths;

#[derive(Debug, Default)]
struct FindRequest {
    package: String,
    version: String,
    exact: bool,
    quiet: bool,
    required: bool,
    module_only: bool,
    config_only: bool,
    components: Vec<String>,
}

impl Evaluator {
    pub(crate) fn cmd_find_package(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(request) = self.find_parse(inv) else {
            return Ok(());
        };

        self.find_bind_request_vars(&request);

        // A script-set <Name>_FOUND must win; clear the slate first.
        let found_var = format!("{}_FOUND", request.package);
        self.var_unset(&found_var);

        let mut module_mode = false;
        let mut located = false;
        if !request.config_only {
            if let Some(module_file) = self.find_module_file(&request.package) {
                module_mode = true;
                located = self.execute_file(&module_file, &FileScope::Shared)?;
            }
        }
        if !located && !request.module_only {
            located = self.find_config_package(&request)?;
        }

        if !self.var_defined(&found_var) {
            self.var_set(found_var.clone(), if located { "1" } else { "0" }.to_string());
        }
        let found = is_cmake_true(&self.var_get(&found_var));

        self.emit(
            inv.origin.clone(),
            EventData::FindPackage {
                package: request.package.clone(),
                version_requested: request.version.clone(),
                found,
                module_mode,
            },
        );

        if !found {
            if request.required {
                self.emit_diag(
                    DiagSeverity::Error,
                    "find_package",
                    &inv.name,
                    inv.origin.clone(),
                    format!("find_package() could not find required package '{}'", request.package),
                    "Adjust CMAKE_MODULE_PATH/CMAKE_PREFIX_PATH or drop REQUIRED",
                    DiagClass::IoEnvError,
                    DiagCode::NotFound,
                );
                self.request_stop();
            } else if !request.quiet {
                self.emit_diag(
                    DiagSeverity::Warning,
                    "find_package",
                    &inv.name,
                    inv.origin.clone(),
                    format!("find_package() could not find package '{}'", request.package),
                    "Pass QUIET to silence this warning",
                    DiagClass::IoEnvError,
                    DiagCode::NotFound,
                );
            }
        }
        Ok(())
    }

    fn find_parse(&mut self, inv: &Invocation) -> Option<FindRequest> {
        let Some(package) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "find_package() requires a package name",
                "Usage: find_package(<name> [version] [EXACT] [QUIET] [REQUIRED] [CONFIG|MODULE] [COMPONENTS ...])",
            );
            return None;
        };

        let mut request = FindRequest {
            package,
            ..FindRequest::default()
        };
        let mut in_components = false;
        for tok in &inv.args[1..] {
            if tok.eq_keyword("EXACT") {
                request.exact = true;
            } else if tok.eq_keyword("QUIET") {
                request.quiet = true;
            } else if tok.eq_keyword("REQUIRED") {
                request.required = true;
                in_components = true; // REQUIRED may be followed by components
            } else if tok.eq_keyword("MODULE") {
                request.module_only = true;
            } else if tok.eq_keyword("CONFIG") || tok.eq_keyword("NO_MODULE") {
                request.config_only = true;
            } else if tok.eq_keyword("COMPONENTS") || tok.eq_keyword("OPTIONAL_COMPONENTS") {
                in_components = true;
            } else if tok.eq_keyword("NO_POLICY_SCOPE") || tok.eq_keyword("GLOBAL") {
                // Accepted, no effect in this evaluator.
            } else if in_components {
                request.components.push(tok.text.clone());
            } else if request.version.is_empty()
                && tok.text.chars().next().is_some_and(|c| c.is_ascii_digit())
            {
                request.version = tok.text.clone();
            } else {
                request.components.push(tok.text.clone());
            }
        }
        Some(request)
    }

    fn find_bind_request_vars(&mut self, request: &FindRequest) {
        let name = &request.package;
        if request.required {
            self.var_set(format!("{name}_FIND_REQUIRED"), "1".to_string());
        }
        if request.quiet {
            self.var_set(format!("{name}_FIND_QUIETLY"), "1".to_string());
        }
        if !request.version.is_empty() {
            self.var_set(format!("{name}_FIND_VERSION"), request.version.clone());
        }
        if request.exact {
            self.var_set(format!("{name}_FIND_VERSION_EXACT"), "1".to_string());
        }
        self.var_set(
            format!("{name}_FIND_COMPONENTS"),
            join_list(&request.components),
        );
        for component in &request.components {
            self.var_set(format!("{name}_FIND_REQUIRED_{component}"), "1".to_string());
        }
    }

    fn find_module_file(&self, package: &str) -> Option<String> {
        let module_path = self.var_get("CMAKE_MODULE_PATH");
        let current_src = self.var_get("CMAKE_CURRENT_SOURCE_DIR");
        for dir in split_list_genex_aware(&module_path) {
            let dir = paths::resolve_for_argument(&dir, &current_src, false);
            let candidate = paths::join(&dir, &format!("Find{package}.cmake"));
            if std::path::Path::new(&candidate).is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn find_config_candidates(&self, package: &str) -> Vec<String> {
        let prefix_path = self.var_get("CMAKE_PREFIX_PATH");
        let current_src = self.var_get("CMAKE_CURRENT_SOURCE_DIR");
        let lower = package.to_ascii_lowercase();
        let mut candidates = Vec::new();
        for prefix in split_list_genex_aware(&prefix_path) {
            let prefix = paths::resolve_for_argument(&prefix, &current_src, false);
            candidates.push(paths::join(&prefix, &format!("{package}Config.cmake")));
            candidates.push(paths::join(&prefix, &format!("{lower}-config.cmake")));
            let cmake_dir = paths::join(&prefix, &format!("lib/cmake/{package}"));
            candidates.push(paths::join(&cmake_dir, &format!("{package}Config.cmake")));
            candidates.push(paths::join(&cmake_dir, &format!("{lower}-config.cmake")));
        }
        candidates
    }

    fn find_config_package(&mut self, request: &FindRequest) -> Result<bool, Error> {
        let candidates = self.find_config_candidates(&request.package);
        for config_file in candidates {
            if !std::path::Path::new(&config_file).is_file() {
                continue;
            }
            if !self.find_version_accepted(request, &config_file)? {
                return Ok(false);
            }
            return self.execute_file(&config_file, &FileScope::Shared);
        }
        Ok(false)
    }

    /// Evaluate the sibling `<Name>ConfigVersion.cmake`, if present,
    /// and apply its verdict.
    fn find_version_accepted(
        &mut self,
        request: &FindRequest,
        config_file: &str,
    ) -> Result<bool, Error> {
        if request.version.is_empty() {
            return Ok(true);
        }
        let version_file = {
            let base = config_file
                .strip_suffix("Config.cmake")
                .or_else(|| config_file.strip_suffix("-config.cmake"));
            match base {
                Some(base) if config_file.ends_with("Config.cmake") => {
                    format!("{base}ConfigVersion.cmake")
                }
                Some(base) => format!("{base}-config-version.cmake"),
                None => return Ok(true),
            }
        };
        if !std::path::Path::new(&version_file).is_file() {
            return Ok(true);
        }

        self.var_set("PACKAGE_FIND_NAME".into(), request.package.clone());
        self.var_set("PACKAGE_FIND_VERSION".into(), request.version.clone());
        self.var_unset("PACKAGE_VERSION");
        self.var_unset("PACKAGE_VERSION_COMPATIBLE");
        self.var_unset("PACKAGE_VERSION_EXACT");

        if !self.execute_file(&version_file, &FileScope::Shared)? {
            return Ok(true);
        }

        let accepted = if request.exact {
            is_cmake_true(&self.var_get("PACKAGE_VERSION_EXACT"))
        } else {
            is_cmake_true(&self.var_get("PACKAGE_VERSION_COMPATIBLE"))
        };
        Ok(accepted)
    }
}
