//! `cmake_path()` — pure path decomposition and editing
//!
//! Operates on a variable holding a path string. `EXTENSION`/`STEM`
//! default to the first-dot split of the filename; `LAST_ONLY` selects
//! the last dot. Generator expressions inside the stored path are
//! resolved eagerly before decomposition.

use cmeval_errors::Error;

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::paths;

/// First-dot extension: for `lib.so.1` this is `.so.1`; dotfiles like
/// `.bashrc` have no extension.
fn full_extension(filename: &str) -> &str {
    let mut chars = filename.char_indices().skip(1);
    match chars.find(|(_, c)| *c == '.') {
        Some((i, _)) => &filename[i..],
        None => "",
    }
}

impl Evaluator {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn cmd_cmake_path(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(sub) = inv.args.first() else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cmake_path() missing subcommand",
                "",
            );
            return Ok(());
        };
        let a = &inv.args;
        let Some(path_var) = a.get(1).map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "cmake_path() missing path variable",
                "",
            );
            return Ok(());
        };

        // Eager genex resolution on the stored path.
        let raw_path = self.var_get(&path_var);
        let path = self.genex_eval_eager(&raw_path, &inv.origin, &inv.name);

        if sub.eq_keyword("GET") {
            let Some(component) = a.get(2) else {
                return self.path_usage(inv, "cmake_path(GET <path-var> <COMPONENT> <out-var>)");
            };
            let last_only = a.get(3).is_some_and(|t| t.eq_keyword("LAST_ONLY"));
            let out_idx = if last_only { 4 } else { 3 };
            let Some(out_var) = a.get(out_idx).map(|t| t.text.clone()) else {
                return self.path_usage(inv, "cmake_path(GET <path-var> <COMPONENT> <out-var>)");
            };

            let filename = paths::filename(&path);
            let value = if component.eq_keyword("ROOT_NAME") {
                paths::root_name(&path).to_string()
            } else if component.eq_keyword("ROOT_DIRECTORY") {
                paths::root_directory(&path).to_string()
            } else if component.eq_keyword("ROOT_PATH") {
                paths::root_path(&path)
            } else if component.eq_keyword("FILENAME") {
                filename.to_string()
            } else if component.eq_keyword("EXTENSION") {
                if last_only {
                    paths::extension(&path).to_string()
                } else {
                    full_extension(filename).to_string()
                }
            } else if component.eq_keyword("STEM") {
                if last_only {
                    paths::stem(&path).to_string()
                } else {
                    let ext = full_extension(filename);
                    filename[..filename.len() - ext.len()].to_string()
                }
            } else if component.eq_keyword("RELATIVE_PART") {
                paths::relative_part(&path).to_string()
            } else if component.eq_keyword("PARENT_PATH") {
                paths::parent(&path).to_string()
            } else {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "cmake_path(GET ...) unknown component",
                    component.text.clone(),
                );
                return Ok(());
            };
            self.var_set(out_var, value);
            return Ok(());
        }

        // The editing forms share an optional OUTPUT_VARIABLE tail.
        let output_var = a
            .iter()
            .position(|t| t.eq_keyword("OUTPUT_VARIABLE"))
            .and_then(|i| a.get(i + 1))
            .map(|t| t.text.clone());
        let write_back = |eval: &mut Self, value: String| {
            let target = output_var.clone().unwrap_or_else(|| path_var.clone());
            eval.var_set(target, value);
        };

        if sub.eq_keyword("NORMAL_PATH") {
            write_back(self, paths::normalize(&path));
        } else if sub.eq_keyword("RELATIVE_PATH") {
            let base = a
                .iter()
                .position(|t| t.eq_keyword("BASE_DIRECTORY"))
                .and_then(|i| a.get(i + 1))
                .map_or_else(|| self.current_source_dir(), |t| t.text.clone());
            let value = paths::make_relative(&path, &base).unwrap_or_else(|| path.clone());
            write_back(self, value);
        } else if sub.eq_keyword("IS_ABSOLUTE") {
            let Some(out_var) = a.get(2).map(|t| t.text.clone()) else {
                return self.path_usage(inv, "cmake_path(IS_ABSOLUTE <path-var> <out-var>)");
            };
            let value = if paths::is_absolute(&path) { "TRUE" } else { "FALSE" };
            self.var_set(out_var, value.to_string());
        } else if sub.eq_keyword("APPEND") {
            let mut value = path;
            for tok in &a[2..] {
                if tok.eq_keyword("OUTPUT_VARIABLE") {
                    break;
                }
                value = paths::join(&value, &tok.text);
            }
            write_back(self, value);
        } else if sub.eq_keyword("REMOVE_FILENAME") {
            let filename = paths::filename(&path).to_string();
            let value = path[..path.len() - filename.len()].to_string();
            write_back(self, value);
        } else if sub.eq_keyword("REMOVE_EXTENSION") {
            let last_only = a.iter().any(|t| t.eq_keyword("LAST_ONLY"));
            let filename = paths::filename(&path);
            let ext_len = if last_only {
                paths::extension(&path).len()
            } else {
                full_extension(filename).len()
            };
            let value = path[..path.len() - ext_len].to_string();
            write_back(self, value);
        } else {
            self.unsupported_path(
                "cmake_path",
                inv,
                format!("cmake_path({}) is not implemented", sub.text.to_ascii_uppercase()),
            );
        }
        Ok(())
    }

    fn path_usage(&mut self, inv: &Invocation, usage: &str) -> Result<(), Error> {
        self.input_error(
            &inv.name,
            inv.origin.clone(),
            "cmake_path() received invalid arguments",
            usage,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::full_extension;

    #[test]
    fn first_dot_extension() {
        assert_eq!(full_extension("lib.so.1"), ".so.1");
        assert_eq!(full_extension("name.txt"), ".txt");
        assert_eq!(full_extension("noext"), "");
        assert_eq!(full_extension(".bashrc"), "");
    }
}
