//! Argument resolver
//!
//! Turns a node's raw arguments into the expanded token list handlers
//! consume. Per argument:
//!
//! 1. Substitute, innermost first, every `${name}`, `$ENV{name}` and
//!    `$CACHE{name}`; missing variables become the empty string.
//!    Macro-bind frames are consulted before the variable environment.
//! 2. Unquoted arguments split on top-level semicolons outside `$<...>`
//!    generator expressions, dropping empty fragments. Quoted and bracket
//!    arguments always yield exactly one token.
//! 3. Remaining backslash escapes are decoded (`\;` survives splitting,
//!    `\$` suppresses expansion).
//!
//! Bracket arguments skip expansion entirely.

use cmeval_errors::Error;
use cmeval_parser::Arg;

use crate::context::Evaluator;

/// Bounded substitution count; self-referential input stops expanding
/// rather than spinning.
const MAX_SUBSTITUTIONS: usize = 4096;

/// One resolved argument token. `quoted` is only consulted by the
/// condition evaluator (quoted tokens are never auto-dereferenced).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub quoted: bool,
}

impl Token {
    #[must_use]
    pub fn new(text: impl Into<String>, quoted: bool) -> Self {
        Self {
            text: text.into(),
            quoted,
        }
    }

    #[must_use]
    pub fn eq_keyword(&self, keyword: &str) -> bool {
        self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Extract the texts of a token slice (test and handler helper).
#[must_use]
pub fn texts(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefKind {
    Var,
    Env,
    Cache,
}

struct VarRef {
    start: usize,
    end: usize,
    kind: RefKind,
    name_start: usize,
}

/// Find the innermost variable reference, honoring `\$` escapes.
fn find_innermost_ref(text: &str) -> Option<VarRef> {
    let b = text.as_bytes();
    let mut stack: Vec<(usize, RefKind, usize)> = Vec::new();
    let mut i = 0usize;
    while i < b.len() {
        match b[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'$' => {
                if text[i..].starts_with("${") {
                    stack.push((i, RefKind::Var, i + 2));
                    i += 2;
                    continue;
                }
                if text[i..].starts_with("$ENV{") {
                    stack.push((i, RefKind::Env, i + 5));
                    i += 5;
                    continue;
                }
                if text[i..].starts_with("$CACHE{") {
                    stack.push((i, RefKind::Cache, i + 7));
                    i += 7;
                    continue;
                }
            }
            b'}' => {
                if let Some((start, kind, name_start)) = stack.pop() {
                    return Some(VarRef {
                        start,
                        end: i + 1,
                        kind,
                        name_start,
                    });
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

impl Evaluator {
    /// Expand every variable reference in `input`.
    #[must_use]
    pub fn expand_references(&self, input: &str) -> String {
        let mut text = input.to_string();
        for _ in 0..MAX_SUBSTITUTIONS {
            let Some(var_ref) = find_innermost_ref(&text) else {
                break;
            };
            let name = text[var_ref.name_start..var_ref.end - 1].to_string();
            let value = match var_ref.kind {
                RefKind::Var => self
                    .macro_bind_get(&name)
                    .cloned()
                    .unwrap_or_else(|| self.var_get(&name)),
                RefKind::Env => self.env_get(&name).unwrap_or_default(),
                RefKind::Cache => self.cache_entries.get(&name).cloned().unwrap_or_default(),
            };
            text.replace_range(var_ref.start..var_ref.end, &value);
        }
        text
    }

    /// Resolve a raw argument list into tokens.
    ///
    /// # Errors
    ///
    /// Reserved for evaluator-fatal conditions; expansion itself cannot
    /// fail.
    pub(crate) fn resolve_args(&mut self, args: &[Arg]) -> Result<Vec<Token>, Error> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            if arg.bracket {
                out.push(Token::new(arg.text.clone(), true));
                continue;
            }
            let expanded = self.expand_references(&arg.text);
            if arg.quoted {
                out.push(Token::new(decode_escapes(&expanded), true));
            } else {
                for fragment in split_unquoted(&expanded) {
                    out.push(Token::new(fragment, false));
                }
            }
        }
        Ok(out)
    }
}

/// Split an expanded unquoted argument on top-level semicolons, skipping
/// `\;` and semicolons inside `$<...>`. Empty fragments are dropped and
/// escapes are decoded per fragment.
fn split_unquoted(input: &str) -> Vec<String> {
    let b = input.as_bytes();
    let mut fragments = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    let mut genex_depth = 0usize;
    let mut i = 0usize;
    while i < b.len() {
        match b[i] {
            b'\\' if i + 1 < b.len() => {
                current.push(b'\\');
                current.push(b[i + 1]);
                i += 2;
            }
            b'$' if i + 1 < b.len() && b[i + 1] == b'<' => {
                genex_depth += 1;
                current.extend_from_slice(b"$<");
                i += 2;
            }
            b'>' if genex_depth > 0 => {
                genex_depth -= 1;
                current.push(b'>');
                i += 1;
            }
            b';' if genex_depth == 0 => {
                if !current.is_empty() {
                    fragments.push(std::mem::take(&mut current));
                }
                i += 1;
            }
            c => {
                current.push(c);
                i += 1;
            }
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    fragments
        .into_iter()
        .map(|f| decode_escapes(&String::from_utf8_lossy(&f)))
        .collect()
}

/// Decode the backslash escapes the lexer and splitter leave in place.
fn decode_escapes(input: &str) -> String {
    let b = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(input.len());
    let mut i = 0usize;
    while i < b.len() {
        if b[i] == b'\\' && i + 1 < b.len() {
            match b[i + 1] {
                b'n' => out.push(b'\n'),
                b't' => out.push(b'\t'),
                b'r' => out.push(b'\r'),
                other => out.push(other),
            }
            i += 2;
        } else {
            out.push(b[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluatorOptions;
    use cmeval_parser::Arg;

    fn evaluator() -> Evaluator {
        Evaluator::new(EvaluatorOptions::new("/proj/src", "/proj/build")).unwrap()
    }

    fn resolve(eval: &mut Evaluator, args: &[Arg]) -> Vec<String> {
        eval.resolve_args(args)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn plain_token_idempotent() {
        let mut eval = evaluator();
        let tokens = resolve(&mut eval, &[Arg::unquoted("main.c", 1)]);
        assert_eq!(tokens, vec!["main.c"]);
    }

    #[test]
    fn simple_expansion() {
        let mut eval = evaluator();
        eval.var_set("NAME".into(), "app".into());
        let tokens = resolve(&mut eval, &[Arg::unquoted("${NAME}.c", 1)]);
        assert_eq!(tokens, vec!["app.c"]);
    }

    #[test]
    fn nested_expansion_innermost_first() {
        let mut eval = evaluator();
        eval.var_set("x".into(), "b".into());
        eval.var_set("b_seen".into(), "1".into());
        let tokens = resolve(&mut eval, &[Arg::unquoted("${${x}_seen}", 1)]);
        assert_eq!(tokens, vec!["1"]);
    }

    #[test]
    fn missing_variable_is_empty_and_dropped() {
        let mut eval = evaluator();
        let tokens = resolve(&mut eval, &[Arg::unquoted("${NOPE}", 1)]);
        assert!(tokens.is_empty());
        // Quoted keeps the empty token.
        let tokens = eval.resolve_args(&[Arg::quoted("${NOPE}", 1)]).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "");
    }

    #[test]
    fn unquoted_splits_on_semicolons() {
        let mut eval = evaluator();
        eval.var_set("L".into(), "a;b;c".into());
        let tokens = resolve(&mut eval, &[Arg::unquoted("${L}", 1)]);
        assert_eq!(tokens, vec!["a", "b", "c"]);
    }

    #[test]
    fn quoted_never_splits() {
        let mut eval = evaluator();
        eval.var_set("L".into(), "a;b".into());
        let tokens = eval.resolve_args(&[Arg::quoted("${L}", 1)]).unwrap();
        assert_eq!(tokens[0].text, "a;b");
        assert!(tokens[0].quoted);
    }

    #[test]
    fn genex_semicolons_do_not_split() {
        let mut eval = evaluator();
        let tokens = resolve(&mut eval, &[Arg::unquoted("$<$<CONFIG:Debug>:A;B>", 1)]);
        assert_eq!(tokens, vec!["$<$<CONFIG:Debug>:A;B>"]);
    }

    #[test]
    fn escaped_semicolon_does_not_split() {
        let mut eval = evaluator();
        let tokens = resolve(&mut eval, &[Arg::unquoted(r"a\;b", 1)]);
        assert_eq!(tokens, vec!["a;b"]);
    }

    #[test]
    fn escaped_dollar_suppresses_expansion() {
        let mut eval = evaluator();
        eval.var_set("X".into(), "v".into());
        let tokens = resolve(&mut eval, &[Arg::unquoted(r"\${X}", 1)]);
        assert_eq!(tokens, vec!["${X}"]);
    }

    #[test]
    fn env_and_cache_namespaces() {
        let mut eval = evaluator();
        eval.env_set("CMEVAL_RESOLVER_TEST", "from-env".into());
        eval.cache_entries.insert("OPT".into(), "from-cache".into());
        let tokens = resolve(
            &mut eval,
            &[
                Arg::unquoted("$ENV{CMEVAL_RESOLVER_TEST}", 1),
                Arg::unquoted("$CACHE{OPT}", 1),
            ],
        );
        assert_eq!(tokens, vec!["from-env", "from-cache"]);
    }

    #[test]
    fn macro_binds_take_precedence() {
        let mut eval = evaluator();
        eval.var_set("x".into(), "outer".into());
        eval.macro_frames.push(
            [("x".to_string(), "bound".to_string())]
                .into_iter()
                .collect(),
        );
        let tokens = resolve(&mut eval, &[Arg::unquoted("${x}", 1)]);
        assert_eq!(tokens, vec!["bound"]);
        eval.macro_frames.pop();
    }

    #[test]
    fn bracket_args_stay_literal() {
        let mut eval = evaluator();
        eval.var_set("X".into(), "v".into());
        let tokens = eval
            .resolve_args(&[Arg {
                text: "${X};a".into(),
                quoted: false,
                bracket: true,
                line: 1,
            }])
            .unwrap();
        assert_eq!(tokens[0].text, "${X};a");
    }

    #[test]
    fn self_reference_terminates() {
        let mut eval = evaluator();
        eval.var_set("A".into(), "${A}".into());
        // Must not hang; the bounded pass count stops it.
        let _ = resolve(&mut eval, &[Arg::unquoted("${A}", 1)]);
    }
}
