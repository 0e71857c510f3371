//! `include`, `add_subdirectory`, `include_guard`

use cmeval_errors::Error;
use cmeval_events::{DiagClass, DiagCode, DiagSeverity};
use cmeval_types::split_list_genex_aware;

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::driver::FileScope;
use crate::paths;

impl Evaluator {
    pub(crate) fn cmd_include(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(name) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "include() requires a file or module name",
                "Usage: include(<file|module> [OPTIONAL] [RESULT_VARIABLE <var>])",
            );
            return Ok(());
        };
        let optional = inv.args.iter().any(|t| t.eq_keyword("OPTIONAL"));
        let result_var = inv
            .args
            .iter()
            .position(|t| t.eq_keyword("RESULT_VARIABLE"))
            .and_then(|i| inv.args.get(i + 1))
            .map(|t| t.text.clone());

        let current_src = self.current_source_dir();
        let is_module_name = !name.contains('/') && !name.contains('\\')
            && !name.to_ascii_lowercase().ends_with(".cmake");

        let mut candidate = None;
        if is_module_name {
            let module_path = self.var_get("CMAKE_MODULE_PATH");
            for dir in split_list_genex_aware(&module_path) {
                let dir = paths::resolve_for_argument(&dir, &current_src, false);
                let path = paths::join(&dir, &format!("{name}.cmake"));
                if std::path::Path::new(&path).is_file() {
                    candidate = Some(path);
                    break;
                }
            }
        } else {
            let path = paths::resolve_for_argument(&name, &current_src, false);
            if std::path::Path::new(&path).is_file() {
                candidate = Some(path);
            }
        }

        match candidate {
            Some(path) => {
                // Same variable scope: include() does not push.
                self.execute_file(&path, &FileScope::Shared)?;
                if let Some(var) = result_var {
                    self.var_set(var, path);
                }
            }
            None => {
                if let Some(var) = result_var {
                    self.var_set(var, "NOTFOUND".to_string());
                }
                if !optional {
                    self.emit_diag(
                        DiagSeverity::Error,
                        "dispatcher",
                        &inv.name,
                        inv.origin.clone(),
                        "include() could not find the requested file",
                        name,
                        DiagClass::IoEnvError,
                        DiagCode::NotFound,
                    );
                }
            }
        }
        Ok(())
    }

    pub(crate) fn cmd_add_subdirectory(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(source_arg) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "add_subdirectory() requires a source directory",
                "Usage: add_subdirectory(<source_dir> [<binary_dir>] [SYSTEM] [EXCLUDE_FROM_ALL])",
            );
            return Ok(());
        };

        let mut system = false;
        let mut explicit_bin: Option<String> = None;
        for tok in &inv.args[1..] {
            if tok.eq_keyword("SYSTEM") {
                system = true;
            } else if tok.eq_keyword("EXCLUDE_FROM_ALL") {
                // Accepted; target-level exclusion is per-target state.
            } else if explicit_bin.is_none() {
                explicit_bin = Some(tok.text.clone());
            }
        }

        let current_src = self.current_source_dir();
        let current_bin = self.current_binary_dir();
        let source_dir = paths::resolve_for_argument(&source_arg, &current_src, false);

        let binary_dir = if let Some(bin) = explicit_bin {
            paths::resolve_for_argument(&bin, &current_bin, false)
        } else if paths::is_absolute(&source_arg) {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "add_subdirectory() with an absolute source requires an explicit binary directory",
                "Usage: add_subdirectory(<source_dir> <binary_dir>)",
            );
            return Ok(());
        } else {
            paths::normalize(&paths::join(&current_bin, &source_arg))
        };

        let list_file = paths::join(&source_dir, "CMakeLists.txt");
        if !std::path::Path::new(&list_file).is_file() {
            self.emit_diag(
                DiagSeverity::Error,
                "dispatcher",
                &inv.name,
                inv.origin.clone(),
                "add_subdirectory() source directory has no CMakeLists.txt",
                source_dir,
                DiagClass::IoEnvError,
                DiagCode::NotFound,
            );
            return Ok(());
        }

        self.execute_file(
            &list_file,
            &FileScope::Subdirectory {
                source_dir,
                binary_dir,
                system_default: system,
            },
        )?;
        Ok(())
    }

    pub(crate) fn cmd_include_guard(&mut self, _inv: &Invocation) -> Result<(), Error> {
        // GLOBAL/DIRECTORY arguments are accepted; the guard key is the
        // canonical file path either way.
        let key = paths::normalize(&self.current_file);
        if !self.include_guards.insert(key) {
            self.return_requested = true;
        }
        Ok(())
    }
}
