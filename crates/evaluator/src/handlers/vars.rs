//! `set` and `unset`

use cmeval_errors::Error;
use cmeval_events::{DiagClass, DiagCode, DiagSeverity, EventData};
use cmeval_types::join_list;

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::resolver::texts;

/// `ENV{NAME}` target of `set`/`unset`.
fn env_target(name: &str) -> Option<&str> {
    name.strip_prefix("ENV{")?.strip_suffix('}')
}

impl Evaluator {
    pub(crate) fn cmd_set(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(var) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "set() requires a variable name",
                "Usage: set(<variable> <value>... [PARENT_SCOPE | CACHE <type> <doc> [FORCE]])",
            );
            return Ok(());
        };

        if let Some(env_name) = env_target(&var) {
            let value = join_list(&texts(&inv.args[1..]));
            self.env_set(env_name, value);
            return Ok(());
        }

        // set(<var>) with no value unsets.
        if inv.args.len() == 1 {
            self.var_unset(&var);
            return Ok(());
        }

        let mut parent_scope = false;
        let mut cache_idx = 0usize;
        for (i, tok) in inv.args.iter().enumerate().skip(1) {
            if tok.eq_keyword("PARENT_SCOPE") {
                parent_scope = true;
                break;
            }
            if tok.eq_keyword("CACHE") {
                cache_idx = i;
                break;
            }
        }

        let value_end = if parent_scope {
            inv.args.len() - 1
        } else if cache_idx > 0 {
            cache_idx
        } else {
            inv.args.len()
        };
        let value = join_list(&texts(&inv.args[1..value_end]));

        if parent_scope {
            if !self.var_set_parent(var.clone(), value.clone()) {
                self.emit_diag(
                    DiagSeverity::Error,
                    "set",
                    &inv.name,
                    inv.origin.clone(),
                    "PARENT_SCOPE used without a parent scope",
                    "Use PARENT_SCOPE only inside a function or subdirectory",
                    DiagClass::PolicyConflict,
                    DiagCode::PolicyConflict,
                );
            }
        } else {
            self.var_set(var.clone(), value.clone());
        }

        if cache_idx > 0 {
            let entry_type = inv
                .args
                .get(cache_idx + 1)
                .map(|t| t.text.clone())
                .unwrap_or_default();
            let docstring = inv
                .args
                .get(cache_idx + 2)
                .map(|t| t.text.clone())
                .unwrap_or_default();
            let force = inv
                .args
                .get(cache_idx + 3)
                .is_some_and(|t| t.eq_keyword("FORCE"));
            self.cache_entries.insert(var.clone(), value.clone());
            self.emit(
                inv.origin.clone(),
                EventData::SetCacheEntry {
                    key: var,
                    value,
                    entry_type,
                    docstring,
                    force,
                },
            );
        }
        Ok(())
    }

    pub(crate) fn cmd_unset(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(var) = inv.args.first().map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "unset() requires a variable name",
                "Usage: unset(<variable> [CACHE | PARENT_SCOPE])",
            );
            return Ok(());
        };

        if let Some(env_name) = env_target(&var) {
            self.env_unset(env_name);
            return Ok(());
        }

        match inv.args.get(1) {
            None => self.var_unset(&var),
            Some(tok) if tok.eq_keyword("CACHE") => {
                self.cache_entries.remove(&var);
            }
            Some(tok) if tok.eq_keyword("PARENT_SCOPE") => {
                if !self.var_unset_parent(&var) {
                    self.emit_diag(
                        DiagSeverity::Error,
                        "set",
                        &inv.name,
                        inv.origin.clone(),
                        "PARENT_SCOPE used without a parent scope",
                        "Use PARENT_SCOPE only inside a function or subdirectory",
                        DiagClass::PolicyConflict,
                        DiagCode::PolicyConflict,
                    );
                }
            }
            Some(other) => {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "unset() received an unexpected argument",
                    other.text.clone(),
                );
            }
        }
        Ok(())
    }
}
