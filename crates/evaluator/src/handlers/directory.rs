//! Directory-level compile and link state
//!
//! These commands accumulate de-duplicated tokens in internal global list
//! variables (replayed onto targets declared later) and emit the matching
//! `Global*` / `Directory*` events. `add_link_options` understands the
//! `SHELL:` and `LINKER:` prefixes with their nested comma/shell
//! splitting.

use cmeval_errors::Error;
use cmeval_events::EventData;

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::paths;

pub(crate) const GLOBAL_OPTS_VAR: &str = "CMEVAL_GLOBAL_COMPILE_OPTIONS";
pub(crate) const GLOBAL_DEFS_VAR: &str = "CMEVAL_GLOBAL_COMPILE_DEFINITIONS";
pub(crate) const GLOBAL_LINK_OPTS_VAR: &str = "CMEVAL_GLOBAL_LINK_OPTIONS";

/// `-D...` / `/D...` detection for `add_definitions`.
fn split_definition_flag(item: &str) -> Option<&str> {
    let b = item.as_bytes();
    if b.len() < 2 {
        return None;
    }
    let is_def = (b[0] == b'-' || b[0] == b'/') && (b[1] == b'D' || b[1] == b'd');
    if is_def {
        Some(&item[2..])
    } else {
        None
    }
}

/// Minimal shell-style word splitting for `SHELL:` payloads: whitespace
/// separates, single and double quotes group, backslash escapes inside
/// double quotes and bare words.
fn split_shell_like(input: &str) -> Vec<String> {
    let b = input.as_bytes();
    let mut words = Vec::new();
    let mut current = String::new();
    let mut touched = false;
    let mut quote: Option<u8> = None;
    let mut i = 0usize;
    while i < b.len() {
        let c = b[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
                touched = true;
                i += 1;
            } else if c == b'\\' && q == b'"' && i + 1 < b.len() {
                current.push(b[i + 1] as char);
                touched = true;
                i += 2;
            } else {
                current.push(c as char);
                touched = true;
                i += 1;
            }
            continue;
        }
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                if touched {
                    words.push(std::mem::take(&mut current));
                    touched = false;
                }
                i += 1;
            }
            b'"' | b'\'' => {
                quote = Some(c);
                touched = true;
                i += 1;
            }
            b'\\' if i + 1 < b.len() => {
                current.push(b[i + 1] as char);
                touched = true;
                i += 2;
            }
            _ => {
                current.push(c as char);
                touched = true;
                i += 1;
            }
        }
    }
    if touched {
        words.push(current);
    }
    words
}

fn split_comma_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn expand_compile_option_token(token: &str, out: &mut Vec<String>) {
    if token.is_empty() {
        return;
    }
    if let Some(payload) = strip_prefix_ci(token, "SHELL:") {
        out.extend(split_shell_like(payload));
        return;
    }
    out.push(token.to_string());
}

fn expand_link_option_token(token: &str, out: &mut Vec<String>) {
    if token.is_empty() {
        return;
    }
    if let Some(payload) = strip_prefix_ci(token, "SHELL:") {
        out.extend(split_shell_like(payload));
        return;
    }
    if let Some(payload) = strip_prefix_ci(token, "LINKER:") {
        let pieces = match strip_prefix_ci(payload, "SHELL:") {
            Some(shell_payload) => split_shell_like(shell_payload),
            None => split_comma_list(payload),
        };
        out.extend(pieces.into_iter().map(|p| format!("LINKER:{p}")));
        return;
    }
    out.push(token.to_string());
}

fn strip_prefix_ci<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&input[prefix.len()..])
    } else {
        None
    }
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if item.is_empty() || unique.contains(&item) {
            continue;
        }
        unique.push(item);
    }
    unique
}

impl Evaluator {
    /// Append to a semicolon-list variable, skipping duplicates. Returns
    /// whether the item was actually added.
    fn append_list_var_unique(&mut self, var: &str, item: &str) -> bool {
        let current = self.var_get(var);
        if current.is_empty() {
            self.var_set(var.to_string(), item.to_string());
            return true;
        }
        if current.split(';').any(|existing| existing == item) {
            return false;
        }
        self.var_set(var.to_string(), format!("{current};{item}"));
        true
    }

    pub(crate) fn cmd_add_compile_options(&mut self, inv: &Invocation) -> Result<(), Error> {
        let mut expanded = Vec::new();
        for tok in &inv.args {
            expand_compile_option_token(&tok.text, &mut expanded);
        }
        for item in dedupe(expanded) {
            if !self.append_list_var_unique(GLOBAL_OPTS_VAR, &item) {
                continue;
            }
            self.emit(inv.origin.clone(), EventData::GlobalCompileOptions { item });
        }
        Ok(())
    }

    pub(crate) fn cmd_add_definitions(&mut self, inv: &Invocation) -> Result<(), Error> {
        for tok in &inv.args {
            let item = tok.text.clone();
            if item.is_empty() {
                continue;
            }
            match split_definition_flag(&item) {
                Some(definition) if !definition.is_empty() => {
                    let definition = definition.to_string();
                    if !self.append_list_var_unique(GLOBAL_DEFS_VAR, &definition) {
                        continue;
                    }
                    self.emit(
                        inv.origin.clone(),
                        EventData::GlobalCompileDefinitions { item: definition },
                    );
                }
                _ => {
                    if !self.append_list_var_unique(GLOBAL_OPTS_VAR, &item) {
                        continue;
                    }
                    self.emit(inv.origin.clone(), EventData::GlobalCompileOptions { item });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn cmd_add_link_options(&mut self, inv: &Invocation) -> Result<(), Error> {
        let mut expanded = Vec::new();
        for tok in &inv.args {
            expand_link_option_token(&tok.text, &mut expanded);
        }
        for item in dedupe(expanded) {
            if !self.append_list_var_unique(GLOBAL_LINK_OPTS_VAR, &item) {
                continue;
            }
            self.emit(inv.origin.clone(), EventData::GlobalLinkOptions { item });
        }
        Ok(())
    }

    pub(crate) fn cmd_link_libraries(&mut self, inv: &Invocation) -> Result<(), Error> {
        for tok in &inv.args {
            if tok.text.is_empty() {
                continue;
            }
            self.emit(
                inv.origin.clone(),
                EventData::GlobalLinkLibraries {
                    item: tok.text.clone(),
                },
            );
        }
        Ok(())
    }

    pub(crate) fn cmd_include_directories(&mut self, inv: &Invocation) -> Result<(), Error> {
        let current_src = self.current_source_dir();
        let mut system = false;
        let mut before = false;
        for tok in &inv.args {
            if tok.eq_keyword("SYSTEM") {
                system = true;
                continue;
            }
            if tok.eq_keyword("BEFORE") {
                before = true;
                continue;
            }
            if tok.eq_keyword("AFTER") {
                before = false;
                continue;
            }
            if tok.text.is_empty() {
                continue;
            }
            let path = paths::resolve_for_argument(&tok.text, &current_src, true);
            self.emit(
                inv.origin.clone(),
                EventData::DirectoryIncludeDirectories {
                    path,
                    system,
                    before,
                },
            );
        }
        Ok(())
    }

    pub(crate) fn cmd_link_directories(&mut self, inv: &Invocation) -> Result<(), Error> {
        let current_src = self.current_source_dir();
        let mut before = false;
        for tok in &inv.args {
            if tok.eq_keyword("BEFORE") {
                before = true;
                continue;
            }
            if tok.eq_keyword("AFTER") {
                before = false;
                continue;
            }
            if tok.text.is_empty() {
                continue;
            }
            let path = paths::resolve_for_argument(&tok.text, &current_src, true);
            self.emit(
                inv.origin.clone(),
                EventData::DirectoryLinkDirectories { path, before },
            );
        }
        Ok(())
    }

    pub(crate) fn current_source_dir(&self) -> String {
        let dir = self.var_get("CMAKE_CURRENT_SOURCE_DIR");
        if dir.is_empty() {
            self.source_dir.clone()
        } else {
            dir
        }
    }

    pub(crate) fn current_binary_dir(&self) -> String {
        let dir = self.var_get("CMAKE_CURRENT_BINARY_DIR");
        if dir.is_empty() {
            self.binary_dir.clone()
        } else {
            dir
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_splitting() {
        assert_eq!(split_shell_like("-a -b"), vec!["-a", "-b"]);
        assert_eq!(split_shell_like("  -x   'a b'  "), vec!["-x", "a b"]);
        assert_eq!(split_shell_like(r#"-D"na me""#), vec!["-Dna me"]);
        assert!(split_shell_like("   ").is_empty());
    }

    #[test]
    fn definition_flags() {
        assert_eq!(split_definition_flag("-DFOO=1"), Some("FOO=1"));
        assert_eq!(split_definition_flag("/DBAR"), Some("BAR"));
        assert_eq!(split_definition_flag("-Wall"), None);
        assert_eq!(split_definition_flag("x"), None);
    }

    #[test]
    fn linker_expansion() {
        let mut out = Vec::new();
        expand_link_option_token("LINKER:-z,defs", &mut out);
        assert_eq!(out, vec!["LINKER:-z", "LINKER:defs"]);
        out.clear();
        expand_link_option_token("LINKER:SHELL:-z defs", &mut out);
        assert_eq!(out, vec!["LINKER:-z", "LINKER:defs"]);
        out.clear();
        expand_link_option_token("SHELL:-Wl,-s -static", &mut out);
        assert_eq!(out, vec!["-Wl,-s", "-static"]);
    }
}
