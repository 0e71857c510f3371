//! Flow controller
//!
//! Loop and block frames plus break/continue/return propagation. The
//! request flags form a small state machine read at statement boundaries;
//! nothing here is modeled with unwinding.
//!
//! `block`/`endblock` are matched at run time with an explicit frame
//! stack so an unbalanced `endblock` is a policy-conflict diagnostic.

use cmeval_errors::Error;
use cmeval_events::{DiagClass, DiagCode, DiagSeverity};
use cmeval_parser::{ForEachNode, IfNode, WhileNode};

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::resolver::Token;

/// What one `block()` pushed, captured at push time so `endblock` does
/// not have to re-parse options.
#[derive(Debug, Clone)]
pub struct BlockFrame {
    pub variable_scope_pushed: bool,
    pub policy_scope_pushed: bool,
    pub propagate: Vec<String>,
}

impl Evaluator {
    // ---- block / endblock ---------------------------------------------

    pub(crate) fn cmd_block(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(frame) = self.block_parse_options(inv) else {
            return Ok(());
        };

        if frame.variable_scope_pushed {
            self.scope_push();
        }
        if frame.policy_scope_pushed {
            self.policy_push();
        }
        self.block_frames.push(frame);
        Ok(())
    }

    fn block_parse_options(&mut self, inv: &Invocation) -> Option<BlockFrame> {
        let mut frame = BlockFrame {
            variable_scope_pushed: true,
            policy_scope_pushed: true,
            propagate: Vec::new(),
        };

        let mut i = 0usize;
        if inv.args.first().is_some_and(|t| t.eq_keyword("SCOPE_FOR")) {
            frame.variable_scope_pushed = false;
            frame.policy_scope_pushed = false;
            i += 1;

            let mut has_scope_item = false;
            while let Some(tok) = inv.args.get(i) {
                if tok.eq_keyword("VARIABLES") {
                    frame.variable_scope_pushed = true;
                    has_scope_item = true;
                    i += 1;
                } else if tok.eq_keyword("POLICIES") {
                    frame.policy_scope_pushed = true;
                    has_scope_item = true;
                    i += 1;
                } else {
                    break;
                }
            }
            if !has_scope_item {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "block(SCOPE_FOR ...) requires VARIABLES and/or POLICIES",
                    "Usage: block([SCOPE_FOR VARIABLES POLICIES] [PROPAGATE <vars...>])",
                );
                return None;
            }
        }

        if inv.args.get(i).is_some_and(|t| t.eq_keyword("PROPAGATE")) {
            i += 1;
            if i >= inv.args.len() {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "block(PROPAGATE ...) requires at least one variable name",
                    "Usage: block(PROPAGATE <var1> <var2> ...)",
                );
                return None;
            }
            frame.propagate = inv.args[i..].iter().map(|t| t.text.clone()).collect();
            i = inv.args.len();
        }

        if let Some(extra) = inv.args.get(i) {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "block() received unsupported argument",
                extra.text.clone(),
            );
            return None;
        }

        if !frame.propagate.is_empty() && !frame.variable_scope_pushed {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "block(PROPAGATE ...) requires variable scope",
                "Use SCOPE_FOR VARIABLES (or omit SCOPE_FOR) when using PROPAGATE",
            );
            return None;
        }

        Some(frame)
    }

    pub(crate) fn cmd_endblock(&mut self, inv: &Invocation) -> Result<(), Error> {
        if !inv.args.is_empty() {
            self.emit_diag(
                DiagSeverity::Warning,
                "flow",
                &inv.name,
                inv.origin.clone(),
                "endblock() arguments are ignored",
                "",
                DiagClass::InputError,
                DiagCode::BadArguments,
            );
        }

        let Some(frame) = self.block_frames.pop() else {
            self.emit_diag(
                DiagSeverity::Error,
                "flow",
                &inv.name,
                inv.origin.clone(),
                "endblock() called without matching block()",
                "Add block() before endblock()",
                DiagClass::PolicyConflict,
                DiagCode::PolicyConflict,
            );
            return Ok(());
        };

        // Propagation only covers variables the block's own frame wrote.
        if frame.variable_scope_pushed && self.scope_depth() > 1 {
            for name in &frame.propagate {
                if !self.var_defined_in_current_scope(name) {
                    continue;
                }
                let value = self.var_get(name);
                self.var_set_parent(name.clone(), value);
            }
        }

        if frame.policy_scope_pushed && !self.policy_pop() {
            self.emit_diag(
                DiagSeverity::Error,
                "flow",
                &inv.name,
                inv.origin.clone(),
                "endblock() failed to restore policy scope",
                "Ensure the policy stack is balanced inside block()",
                DiagClass::PolicyConflict,
                DiagCode::PolicyConflict,
            );
            return Ok(());
        }
        if frame.variable_scope_pushed {
            self.scope_pop()?;
        }
        Ok(())
    }

    // ---- break / continue / return ------------------------------------

    pub(crate) fn cmd_break(&mut self, inv: &Invocation) -> Result<(), Error> {
        if self.loop_depth == 0 {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "break() used outside of a loop",
                "Use break() only inside foreach()/while()",
            );
            return Ok(());
        }
        self.break_requested = true;
        Ok(())
    }

    pub(crate) fn cmd_continue(&mut self, inv: &Invocation) -> Result<(), Error> {
        if self.loop_depth == 0 {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "continue() used outside of a loop",
                "Use continue() only inside foreach()/while()",
            );
            return Ok(());
        }
        self.continue_requested = true;
        Ok(())
    }

    pub(crate) fn cmd_return(&mut self, _inv: &Invocation) -> Result<(), Error> {
        self.return_requested = true;
        Ok(())
    }

    // ---- structured flow nodes ----------------------------------------

    pub(crate) fn run_if(&mut self, node: &IfNode) -> Result<(), Error> {
        for branch in &node.branches {
            let tokens = self.resolve_args(&branch.condition)?;
            let branch_origin = self.origin(branch.line, "if");
            match self.eval_condition(&tokens, &branch_origin) {
                Ok(true) => return self.execute_nodes(&branch.body),
                Ok(false) => {}
                Err(message) => {
                    let origin = self.origin(branch.line, "if");
                    self.input_error(
                        "if",
                        origin,
                        format!("if() given a malformed condition: {message}"),
                        "",
                    );
                    return Ok(());
                }
            }
        }
        self.execute_nodes(&node.else_body)
    }

    pub(crate) fn run_while(&mut self, node: &WhileNode) -> Result<(), Error> {
        self.loop_depth += 1;
        let result = loop {
            if self.should_stop() || self.return_requested {
                break Ok(());
            }
            let tokens = match self.resolve_args(&node.condition) {
                Ok(t) => t,
                Err(e) => break Err(e),
            };
            let loop_origin = self.origin(node.line, "while");
            let keep_going = match self.eval_condition(&tokens, &loop_origin) {
                Ok(v) => v,
                Err(message) => {
                    let origin = self.origin(node.line, "while");
                    self.input_error(
                        "while",
                        origin,
                        format!("while() given a malformed condition: {message}"),
                        "",
                    );
                    break Ok(());
                }
            };
            if !keep_going {
                break Ok(());
            }
            if let Err(e) = self.execute_nodes(&node.body) {
                break Err(e);
            }
            if self.continue_requested {
                self.continue_requested = false;
            }
            if self.break_requested {
                self.break_requested = false;
                break Ok(());
            }
        };
        self.loop_depth -= 1;
        result
    }

    pub(crate) fn run_foreach(&mut self, node: &ForEachNode) -> Result<(), Error> {
        let args = self.resolve_args(&node.args)?;
        let origin = self.origin(node.line, "foreach");
        if args.is_empty() {
            self.input_error(
                "foreach",
                origin,
                "foreach() requires a loop variable",
                "Usage: foreach(<var> <items...>) or foreach(<var> RANGE ...) or foreach(<var...> IN ...)",
            );
            return Ok(());
        }

        let Some(plan) = self.foreach_plan(&args, &origin) else {
            return Ok(());
        };

        // CMP0124 NEW scopes loop variables to the loop: prior state is
        // restored on exit. OLD leaks the last iteration's value.
        let restore_prior = self.policy_get_effective("CMP0124") == "NEW";
        let saved: Vec<(String, Option<String>)> = plan
            .vars
            .iter()
            .map(|v| {
                let prior = if self.var_defined_in_current_scope(v) {
                    Some(self.var_get(v))
                } else {
                    None
                };
                (v.clone(), prior)
            })
            .collect();

        self.loop_depth += 1;
        let mut result = Ok(());
        'iterations: for bindings in &plan.iterations {
            if self.should_stop() || self.return_requested {
                break;
            }
            for (var, value) in plan.vars.iter().zip(bindings) {
                self.var_set(var.clone(), value.clone());
            }
            if let Err(e) = self.execute_nodes(&node.body) {
                result = Err(e);
                break 'iterations;
            }
            if self.continue_requested {
                self.continue_requested = false;
            }
            if self.break_requested {
                self.break_requested = false;
                break;
            }
        }
        self.loop_depth -= 1;

        if restore_prior {
            for (var, prior) in saved {
                match prior {
                    Some(value) => self.var_set(var, value),
                    None => self.var_unset(&var),
                }
            }
        }

        result
    }

    /// Work out the loop variables and per-iteration bindings.
    fn foreach_plan(&mut self, args: &[Token], origin: &cmeval_events::Origin) -> Option<ForeachPlan> {
        // RANGE form.
        if args.len() >= 2 && args[1].eq_keyword("RANGE") {
            let numbers: Vec<i64> = match args[2..]
                .iter()
                .map(|t| t.text.trim().parse::<i64>())
                .collect::<Result<_, _>>()
            {
                Ok(n) => n,
                Err(_) => {
                    self.input_error(
                        "foreach",
                        origin.clone(),
                        "foreach(RANGE ...) requires integer bounds",
                        "Usage: foreach(<var> RANGE <stop>) or foreach(<var> RANGE <start> <stop> [<step>])",
                    );
                    return None;
                }
            };
            let (start, stop, step) = match numbers.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step] => (*start, *stop, *step),
                _ => {
                    self.input_error(
                        "foreach",
                        origin.clone(),
                        "foreach(RANGE ...) expects 1 to 3 bounds",
                        "",
                    );
                    return None;
                }
            };
            if step <= 0 || stop < start {
                self.input_error(
                    "foreach",
                    origin.clone(),
                    "foreach(RANGE ...) requires stop >= start and a positive step",
                    "",
                );
                return None;
            }
            let mut iterations = Vec::new();
            let mut value = start;
            while value <= stop {
                iterations.push(vec![value.to_string()]);
                value += step;
            }
            return Some(ForeachPlan {
                vars: vec![args[0].text.clone()],
                iterations,
            });
        }

        // IN LISTS / ITEMS / ZIP_LISTS form.
        if let Some(in_pos) = args.iter().position(|t| t.eq_keyword("IN")) {
            let vars: Vec<String> = args[..in_pos].iter().map(|t| t.text.clone()).collect();
            if vars.is_empty() {
                self.input_error(
                    "foreach",
                    origin.clone(),
                    "foreach(IN ...) requires at least one loop variable",
                    "",
                );
                return None;
            }

            let rest = &args[in_pos + 1..];
            if rest.first().is_some_and(|t| t.eq_keyword("ZIP_LISTS")) {
                return self.foreach_zip_plan(&vars, &rest[1..], origin);
            }

            let mut items = Vec::new();
            let mut mode: Option<&str> = None;
            for tok in rest {
                if tok.eq_keyword("LISTS") {
                    mode = Some("LISTS");
                    continue;
                }
                if tok.eq_keyword("ITEMS") {
                    mode = Some("ITEMS");
                    continue;
                }
                match mode {
                    Some("LISTS") => {
                        let value = self.var_get(&tok.text);
                        items.extend(cmeval_types::split_list_genex_aware(&value));
                    }
                    Some("ITEMS") => items.push(tok.text.clone()),
                    _ => {
                        self.input_error(
                            "foreach",
                            origin.clone(),
                            "foreach(IN ...) expects LISTS, ITEMS or ZIP_LISTS",
                            tok.text.clone(),
                        );
                        return None;
                    }
                }
            }
            if vars.len() != 1 {
                self.input_error(
                    "foreach",
                    origin.clone(),
                    "foreach(IN LISTS/ITEMS) accepts exactly one loop variable",
                    "",
                );
                return None;
            }
            return Some(ForeachPlan {
                iterations: items.into_iter().map(|i| vec![i]).collect(),
                vars,
            });
        }

        // Plain items form.
        Some(ForeachPlan {
            vars: vec![args[0].text.clone()],
            iterations: args[1..]
                .iter()
                .map(|t| vec![t.text.clone()])
                .collect(),
        })
    }

    fn foreach_zip_plan(
        &mut self,
        vars: &[String],
        list_names: &[Token],
        origin: &cmeval_events::Origin,
    ) -> Option<ForeachPlan> {
        let lists: Vec<Vec<String>> = list_names
            .iter()
            .map(|t| cmeval_types::split_list_genex_aware(&self.var_get(&t.text)))
            .collect();
        if lists.is_empty() {
            self.input_error(
                "foreach",
                origin.clone(),
                "foreach(IN ZIP_LISTS) requires at least one list",
                "",
            );
            return None;
        }

        let bound_vars: Vec<String> = if vars.len() == 1 {
            (0..lists.len()).map(|i| format!("{}_{i}", vars[0])).collect()
        } else if vars.len() == lists.len() {
            vars.to_vec()
        } else {
            self.input_error(
                "foreach",
                origin.clone(),
                "foreach(IN ZIP_LISTS) variable count must be 1 or match the list count",
                "",
            );
            return None;
        };

        let rows = lists.iter().map(Vec::len).max().unwrap_or(0);
        let iterations = (0..rows)
            .map(|row| {
                lists
                    .iter()
                    .map(|list| list.get(row).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Some(ForeachPlan {
            vars: bound_vars,
            iterations,
        })
    }
}

struct ForeachPlan {
    vars: Vec<String>,
    iterations: Vec<Vec<String>>,
}
