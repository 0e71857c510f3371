//! Execution driver
//!
//! Runs script files node by node, checking the cooperative flow flags at
//! every statement boundary. `include` evaluates in the caller's variable
//! scope; `add_subdirectory` pushes a scope and swaps the current
//! source/binary directories for the nested evaluation. `return()` is
//! consumed at the file boundary it returns out of.

use cmeval_errors::{Error, EvalError};
use cmeval_events::{DiagClass, DiagCode, DiagSeverity};
use cmeval_parser::{parse_script, Node};

use crate::context::Evaluator;
use crate::paths;
use crate::usercmd::UserCommandKind;

/// How a nested file shares state with its caller.
#[derive(Debug, Clone)]
pub(crate) enum FileScope {
    /// Same variable scope (`include`, `find_package` scripts).
    Shared,
    /// New scope with redirected current dirs (`add_subdirectory`).
    Subdirectory {
        source_dir: String,
        binary_dir: String,
        system_default: bool,
    },
}

impl Evaluator {
    /// Execute `<source-dir>/CMakeLists.txt`.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry script is missing or an internal
    /// invariant breaks; script-level problems surface as diagnostics.
    pub fn run(&mut self) -> Result<(), Error> {
        let entry = paths::join(&self.source_dir, "CMakeLists.txt");
        if !std::path::Path::new(&entry).exists() {
            return Err(EvalError::MissingEntryScript { path: entry }.into());
        }
        self.execute_file(&entry, &FileScope::Shared)?;
        self.report.finalize(self.should_stop());
        Ok(())
    }

    /// Evaluate script text directly as the entry file. Used by tests and
    /// embedders that already hold the source in memory.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::run`]; parse failures of the entry text
    /// are returned as errors after a diagnostic is emitted.
    pub fn run_source_text(&mut self, text: &str) -> Result<(), Error> {
        let virtual_path = paths::join(&self.source_dir, "CMakeLists.txt");
        let previous_file = std::mem::replace(&mut self.current_file, virtual_path.clone());
        self.var_set("CMAKE_CURRENT_LIST_FILE".into(), virtual_path.clone());
        self.var_set("CMAKE_CURRENT_LIST_DIR".into(), self.source_dir.clone());

        let script = match parse_script(text, &virtual_path) {
            Ok(script) => script,
            Err(parse_err) => {
                let origin = self.origin(0, "parser");
                self.emit_diag(
                    DiagSeverity::Error,
                    "parser",
                    "",
                    origin,
                    parse_err.to_string(),
                    "",
                    DiagClass::InputError,
                    DiagCode::BadArguments,
                );
                self.request_stop();
                self.current_file = previous_file;
                return Err(parse_err.into());
            }
        };

        let result = self.execute_nodes(&script.nodes);
        self.return_requested = false;
        self.current_file = previous_file;
        self.report.finalize(self.should_stop());
        result
    }

    /// Execute all statements of one node sequence, honoring the
    /// cooperative flags between statements.
    pub(crate) fn execute_nodes(&mut self, nodes: &[Node]) -> Result<(), Error> {
        for node in nodes {
            if self.flow_interrupted() {
                break;
            }
            self.execute_node(node)?;
        }
        Ok(())
    }

    fn execute_node(&mut self, node: &Node) -> Result<(), Error> {
        match node {
            Node::Command(cmd) => self.dispatch_command(cmd),
            Node::If(n) => self.run_if(n),
            Node::ForEach(n) => self.run_foreach(n),
            Node::While(n) => self.run_while(n),
            Node::FunctionDef(def) => self.user_cmd_register(UserCommandKind::Function, def),
            Node::MacroDef(def) => self.user_cmd_register(UserCommandKind::Macro, def),
        }
    }

    /// Read, parse and execute a script file. Returns `Ok(false)` when
    /// the file cannot be read (the caller decides whether that is an
    /// error); parse failures emit a diagnostic and stop the run.
    pub(crate) fn execute_file(&mut self, file_path: &str, scope: &FileScope) -> Result<bool, Error> {
        if self.include_depth >= self.config.limits.max_include_depth {
            return Err(EvalError::IncludeDepthExceeded {
                limit: self.config.limits.max_include_depth,
                file: file_path.to_string(),
            }
            .into());
        }

        let Ok(text) = std::fs::read_to_string(file_path) else {
            return Ok(false);
        };

        let script = match parse_script(&text, file_path) {
            Ok(script) => script,
            Err(parse_err) => {
                let origin = self.origin(0, "parser");
                self.emit_diag(
                    DiagSeverity::Error,
                    "parser",
                    "",
                    origin,
                    parse_err.to_string(),
                    "",
                    DiagClass::InputError,
                    DiagCode::BadArguments,
                );
                self.request_stop();
                return Ok(true);
            }
        };

        let previous_file = std::mem::replace(&mut self.current_file, file_path.to_string());
        let previous_list_file = self.var_get("CMAKE_CURRENT_LIST_FILE");
        let previous_list_dir = self.var_get("CMAKE_CURRENT_LIST_DIR");

        let pushed_scope = match scope {
            FileScope::Shared => false,
            FileScope::Subdirectory {
                source_dir,
                binary_dir,
                system_default,
            } => {
                self.scope_push();
                self.var_set("CMAKE_CURRENT_SOURCE_DIR".into(), source_dir.clone());
                self.var_set("CMAKE_CURRENT_BINARY_DIR".into(), binary_dir.clone());
                if *system_default {
                    self.var_set(
                        "CMEVAL_SUBDIR_SYSTEM_DEFAULT".into(),
                        "1".into(),
                    );
                }
                true
            }
        };
        self.var_set("CMAKE_CURRENT_LIST_FILE".into(), file_path.to_string());
        self.var_set(
            "CMAKE_CURRENT_LIST_DIR".into(),
            paths::parent(file_path).to_string(),
        );

        self.include_depth += 1;
        let result = self.execute_nodes(&script.nodes);
        self.include_depth -= 1;

        // return() stops at the file it returns out of.
        self.return_requested = false;

        if pushed_scope {
            self.scope_pop()?;
        } else {
            self.var_set("CMAKE_CURRENT_LIST_FILE".into(), previous_list_file);
            self.var_set("CMAKE_CURRENT_LIST_DIR".into(), previous_list_dir);
        }
        self.current_file = previous_file;

        result.map(|()| true)
    }
}
