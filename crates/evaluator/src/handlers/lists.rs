//! `list()` sub-operations
//!
//! Lists are semicolon strings held in variables; every sub-operation
//! reads the variable, edits the split form, and writes it back. Indices
//! may be negative (counted from the end) as the language defines.

use cmeval_errors::Error;
use cmeval_types::{join_list, split_list_genex_aware};

use crate::context::Evaluator;
use crate::dispatch::Invocation;

/// Map a possibly negative index into the list. `None` when out of range.
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len_i = i64::try_from(len).ok()?;
    let actual = if index < 0 { len_i + index } else { index };
    if (0..len_i).contains(&actual) {
        usize::try_from(actual).ok()
    } else {
        None
    }
}

impl Evaluator {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn cmd_list(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(sub) = inv.args.first() else {
            self.input_error(&inv.name, inv.origin.clone(), "list() missing subcommand", "");
            return Ok(());
        };
        let a = &inv.args;
        let Some(list_var) = a.get(1).map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "list() missing list variable",
                "",
            );
            return Ok(());
        };
        let mut items = split_list_genex_aware(&self.var_get(&list_var));

        if sub.eq_keyword("LENGTH") {
            let Some(out) = a.get(2) else {
                return self.list_usage(inv, "list(LENGTH <list> <out>)");
            };
            self.var_set(out.text.clone(), items.len().to_string());
        } else if sub.eq_keyword("GET") {
            if a.len() < 4 {
                return self.list_usage(inv, "list(GET <list> <index>... <out>)");
            }
            let out = a[a.len() - 1].text.clone();
            let mut selected = Vec::new();
            for tok in &a[2..a.len() - 1] {
                let Ok(index) = tok.text.parse::<i64>() else {
                    return self.list_usage(inv, "list(GET ...) requires integer indices");
                };
                let Some(pos) = resolve_index(items.len(), index) else {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        "list(GET ...) index out of range",
                        tok.text.clone(),
                    );
                    return Ok(());
                };
                selected.push(items[pos].clone());
            }
            self.var_set(out, join_list(&selected));
        } else if sub.eq_keyword("APPEND") {
            items.extend(a[2..].iter().map(|t| t.text.clone()));
            self.var_set(list_var, join_list(&items));
        } else if sub.eq_keyword("PREPEND") {
            let mut new_items: Vec<String> = a[2..].iter().map(|t| t.text.clone()).collect();
            new_items.extend(items);
            self.var_set(list_var, join_list(&new_items));
        } else if sub.eq_keyword("INSERT") {
            if a.len() < 4 {
                return self.list_usage(inv, "list(INSERT <list> <index> <element>...)");
            }
            let Ok(index) = a[2].text.parse::<i64>() else {
                return self.list_usage(inv, "list(INSERT ...) requires an integer index");
            };
            let pos = if items.is_empty() && index == 0 {
                0
            } else {
                match resolve_index(items.len() + 1, index) {
                    Some(p) => p,
                    None => {
                        self.input_error(
                            &inv.name,
                            inv.origin.clone(),
                            "list(INSERT ...) index out of range",
                            a[2].text.clone(),
                        );
                        return Ok(());
                    }
                }
            };
            let tail = items.split_off(pos);
            items.extend(a[3..].iter().map(|t| t.text.clone()));
            items.extend(tail);
            self.var_set(list_var, join_list(&items));
        } else if sub.eq_keyword("JOIN") {
            if a.len() != 4 {
                return self.list_usage(inv, "list(JOIN <list> <glue> <out>)");
            }
            self.var_set(a[3].text.clone(), items.join(&a[2].text));
        } else if sub.eq_keyword("SUBLIST") {
            if a.len() != 5 {
                return self.list_usage(inv, "list(SUBLIST <list> <begin> <length> <out>)");
            }
            let (Ok(begin), Ok(length)) = (a[2].text.parse::<i64>(), a[3].text.parse::<i64>())
            else {
                return self.list_usage(inv, "list(SUBLIST ...) requires integer bounds");
            };
            if begin < 0 || begin as usize > items.len() {
                return self.list_usage(inv, "list(SUBLIST ...) begin is out of range");
            }
            let begin = begin as usize;
            let end = if length < 0 {
                items.len()
            } else {
                (begin + length as usize).min(items.len())
            };
            self.var_set(a[4].text.clone(), join_list(&items[begin..end]));
        } else if sub.eq_keyword("FIND") {
            if a.len() != 4 {
                return self.list_usage(inv, "list(FIND <list> <value> <out>)");
            }
            let value = items
                .iter()
                .position(|i| i == &a[2].text)
                .map_or("-1".to_string(), |p| p.to_string());
            self.var_set(a[3].text.clone(), value);
        } else if sub.eq_keyword("REMOVE_ITEM") {
            let to_remove: Vec<&str> = a[2..].iter().map(|t| t.text.as_str()).collect();
            items.retain(|i| !to_remove.contains(&i.as_str()));
            self.var_set(list_var, join_list(&items));
        } else if sub.eq_keyword("REMOVE_AT") {
            let mut positions = Vec::new();
            for tok in &a[2..] {
                let Ok(index) = tok.text.parse::<i64>() else {
                    return self.list_usage(inv, "list(REMOVE_AT ...) requires integer indices");
                };
                let Some(pos) = resolve_index(items.len(), index) else {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        "list(REMOVE_AT ...) index out of range",
                        tok.text.clone(),
                    );
                    return Ok(());
                };
                positions.push(pos);
            }
            positions.sort_unstable();
            positions.dedup();
            for pos in positions.into_iter().rev() {
                items.remove(pos);
            }
            self.var_set(list_var, join_list(&items));
        } else if sub.eq_keyword("REMOVE_DUPLICATES") {
            let mut seen = Vec::new();
            items.retain(|i| {
                if seen.contains(i) {
                    false
                } else {
                    seen.push(i.clone());
                    true
                }
            });
            self.var_set(list_var, join_list(&items));
        } else if sub.eq_keyword("REVERSE") {
            items.reverse();
            self.var_set(list_var, join_list(&items));
        } else if sub.eq_keyword("SORT") {
            items.sort();
            self.var_set(list_var, join_list(&items));
        } else if sub.eq_keyword("POP_BACK") {
            let popped = items.pop();
            self.var_set(list_var, join_list(&items));
            if let (Some(out), Some(value)) = (a.get(2), popped) {
                self.var_set(out.text.clone(), value);
            }
        } else if sub.eq_keyword("POP_FRONT") {
            let popped = if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            };
            self.var_set(list_var, join_list(&items));
            if let (Some(out), Some(value)) = (a.get(2), popped) {
                self.var_set(out.text.clone(), value);
            }
        } else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "list() unknown subcommand",
                sub.text.clone(),
            );
        }
        Ok(())
    }

    fn list_usage(&mut self, inv: &Invocation, usage: &str) -> Result<(), Error> {
        self.input_error(
            &inv.name,
            inv.origin.clone(),
            "list() received invalid arguments",
            usage,
        );
        Ok(())
    }
}
