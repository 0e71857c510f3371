//! User-defined commands
//!
//! `function()` bodies run in a fresh variable scope; `macro()` bodies run
//! in the caller's scope with textual argument substitution through a
//! macro-bind frame consulted before the variable environment. Bodies are
//! stored as AST slices, never re-serialized text.

use cmeval_errors::Error;
use cmeval_events::Origin;
use cmeval_parser::{Node, UserCommandDefNode};
use cmeval_types::join_list;

use crate::context::Evaluator;
use crate::resolver::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommandKind {
    Function,
    Macro,
}

#[derive(Debug, Clone)]
pub struct UserCommand {
    pub kind: UserCommandKind,
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Node>,
}

impl Evaluator {
    /// Register a `function()` or `macro()` definition.
    pub(crate) fn user_cmd_register(
        &mut self,
        kind: UserCommandKind,
        def: &UserCommandDefNode,
    ) -> Result<(), Error> {
        let command = match kind {
            UserCommandKind::Function => "function",
            UserCommandKind::Macro => "macro",
        };
        let args = self.resolve_args(&def.args)?;
        let Some(name_tok) = args.first() else {
            let origin = self.origin(def.line, command);
            self.input_error(
                command,
                origin,
                format!("{command}() requires a command name"),
                format!("Usage: {command}(<name> [<param>...])"),
            );
            return Ok(());
        };
        let name = name_tok.text.to_ascii_lowercase();
        let params = args[1..].iter().map(|t| t.text.clone()).collect();
        self.user_commands.insert(
            name.clone(),
            UserCommand {
                kind,
                name,
                params,
                body: def.body.clone(),
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn user_cmd_defined(&self, name: &str) -> bool {
        self.user_commands.contains_key(&name.to_ascii_lowercase())
    }

    /// Invoke a user command with already-resolved arguments.
    pub(crate) fn user_cmd_invoke(
        &mut self,
        name: &str,
        args: &[Token],
        _origin: &Origin,
    ) -> Result<(), Error> {
        let Some(cmd) = self.user_commands.get(&name.to_ascii_lowercase()).cloned() else {
            return Ok(());
        };

        let values: Vec<&str> = args.iter().map(|t| t.text.as_str()).collect();
        let extras: Vec<&str> = values.iter().skip(cmd.params.len()).copied().collect();

        match cmd.kind {
            UserCommandKind::Function => {
                self.scope_push();
                self.bind_invocation_vars(&cmd, &values, &extras, BindTarget::Scope);
                let result = self.execute_nodes(&cmd.body);
                self.scope_pop()?;
                // return() inside a function stops at the call boundary.
                self.return_requested = false;
                result
            }
            UserCommandKind::Macro => {
                self.macro_frames.push(std::collections::HashMap::new());
                self.bind_invocation_vars(&cmd, &values, &extras, BindTarget::MacroFrame);
                let result = self.execute_nodes(&cmd.body);
                self.macro_frames.pop();
                // return() inside a macro propagates to the caller.
                result
            }
        }
    }

    fn bind_invocation_vars(
        &mut self,
        cmd: &UserCommand,
        values: &[&str],
        extras: &[&str],
        target: BindTarget,
    ) {
        let bind = |eval: &mut Self, key: String, value: String| match target {
            BindTarget::Scope => eval.var_set(key, value),
            BindTarget::MacroFrame => {
                if let Some(frame) = eval.macro_frames.last_mut() {
                    frame.insert(key, value);
                }
            }
        };

        bind(self, "ARGC".to_string(), values.len().to_string());
        bind(self, "ARGV".to_string(), join_list(values));
        bind(self, "ARGN".to_string(), join_list(extras));
        for (i, value) in values.iter().enumerate() {
            bind(self, format!("ARGV{i}"), (*value).to_string());
        }
        for (i, param) in cmd.params.iter().enumerate() {
            let value = values.get(i).copied().unwrap_or_default();
            bind(self, param.clone(), value.to_string());
        }
    }

    /// Textual macro binding for the innermost executing macro.
    #[must_use]
    pub(crate) fn macro_bind_get(&self, name: &str) -> Option<&String> {
        self.macro_frames.last()?.get(name)
    }
}

#[derive(Debug, Clone, Copy)]
enum BindTarget {
    Scope,
    MacroFrame,
}
