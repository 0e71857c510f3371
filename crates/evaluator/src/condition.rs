//! `if()` / `while()` condition evaluation
//!
//! Recursive-descent over the resolved token list with CMake precedence:
//! parentheses, unary predicates, binary comparisons, `NOT`, `AND`, `OR`.
//! Unquoted operands of comparisons auto-dereference when they name a
//! defined variable; quoted operands do not (CMP0054 NEW — the OLD
//! behavior dereferences quoted operands too).
//!
//! `MATCHES` delegates to the `regex` crate and binds `CMAKE_MATCH_0..9`
//! plus `CMAKE_MATCH_COUNT`. `IN_LIST` resolves generator expressions in
//! the list value eagerly before splitting.

use cmeval_events::Origin;
use cmeval_types::{is_cmake_false, split_list_genex_aware, CmakeVersion};

use crate::context::Evaluator;
use crate::paths;
use crate::resolver::Token;

/// Binary comparison operators recognized between two operands.
const BINARY_OPS: &[&str] = &[
    "STREQUAL",
    "STRLESS",
    "STRGREATER",
    "STRLESS_EQUAL",
    "STRGREATER_EQUAL",
    "EQUAL",
    "LESS",
    "GREATER",
    "LESS_EQUAL",
    "GREATER_EQUAL",
    "VERSION_EQUAL",
    "VERSION_LESS",
    "VERSION_GREATER",
    "VERSION_LESS_EQUAL",
    "VERSION_GREATER_EQUAL",
    "MATCHES",
    "IN_LIST",
    "PATH_EQUAL",
];

const UNARY_OPS: &[&str] = &["DEFINED", "EXISTS", "IS_DIRECTORY", "COMMAND", "TARGET", "POLICY"];

fn is_binary_op(tok: &Token) -> bool {
    !tok.quoted && BINARY_OPS.iter().any(|op| tok.eq_keyword(op))
}

fn is_unary_op(tok: &Token) -> bool {
    !tok.quoted && UNARY_OPS.iter().any(|op| tok.eq_keyword(op))
}

/// A true constant: `1`, `ON`, `YES`, `TRUE`, `Y`, or a non-zero number.
fn is_true_constant(value: &str) -> bool {
    let v = value.trim();
    if v.eq_ignore_ascii_case("ON")
        || v.eq_ignore_ascii_case("YES")
        || v.eq_ignore_ascii_case("TRUE")
        || v.eq_ignore_ascii_case("Y")
    {
        return true;
    }
    v.parse::<f64>().is_ok_and(|n| n != 0.0)
}

struct Parser<'a, 'e> {
    tokens: &'a [Token],
    pos: usize,
    origin: &'a Origin,
    eval: &'e mut Evaluator,
}

impl Evaluator {
    /// Evaluate a resolved condition token list.
    ///
    /// # Errors
    ///
    /// Returns a message describing the malformed expression; callers
    /// report it as an input error and treat the condition as false.
    pub(crate) fn eval_condition(
        &mut self,
        tokens: &[Token],
        origin: &Origin,
    ) -> Result<bool, String> {
        if tokens.is_empty() {
            return Err("condition is empty".to_string());
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            origin,
            eval: self,
        };
        let value = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(format!(
                "unexpected token '{}' in condition",
                parser.tokens[parser.pos].text
            ));
        }
        Ok(value)
    }

    /// Dereference rule for comparison operands.
    fn deref_operand(&self, tok: &Token) -> String {
        let quoted_derefs = self.policy_get_effective("CMP0054") == "OLD";
        if (!tok.quoted || quoted_derefs) && self.var_defined(&tok.text) {
            return self.var_get(&tok.text);
        }
        tok.text.clone()
    }

    /// Truthiness of a lone operand.
    fn operand_truth(&self, tok: &Token) -> bool {
        if is_true_constant(&tok.text) {
            return true;
        }
        if is_cmake_false(&tok.text) {
            return false;
        }
        let quoted_derefs = self.policy_get_effective("CMP0054") == "OLD";
        if !tok.quoted || quoted_derefs {
            if self.var_defined(&tok.text) {
                return !is_cmake_false(&self.var_get(&tok.text));
            }
            return false;
        }
        // A quoted non-constant string is not dereferenced and not true.
        false
    }
}

impl Parser<'_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_or(&mut self) -> Result<bool, String> {
        let mut value = self.parse_and()?;
        while self.peek().is_some_and(|t| !t.quoted && t.eq_keyword("OR")) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<bool, String> {
        let mut value = self.parse_not()?;
        while self.peek().is_some_and(|t| !t.quoted && t.eq_keyword("AND")) {
            self.pos += 1;
            let rhs = self.parse_not()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn parse_not(&mut self) -> Result<bool, String> {
        if self.peek().is_some_and(|t| !t.quoted && t.eq_keyword("NOT")) {
            self.pos += 1;
            return Ok(!self.parse_not()?);
        }
        self.parse_comparison()
    }

    /// One operand, optionally followed by a binary operator and a second
    /// operand.
    fn parse_comparison(&mut self) -> Result<bool, String> {
        let lhs = self.parse_operand()?;

        let Some(op_tok) = self.peek() else {
            return self.finish_single(lhs);
        };
        if !is_binary_op(op_tok) {
            return self.finish_single(lhs);
        }
        let op = op_tok.text.to_ascii_uppercase();
        self.pos += 1;

        let Some(rhs_tok) = self.bump().cloned() else {
            return Err(format!("{op} is missing its right operand"));
        };
        let Operand::Value(lhs_tok) = lhs else {
            return Err(format!("{op} cannot follow a grouped expression"));
        };

        self.apply_binary(&op, &lhs_tok, &rhs_tok)
    }

    fn finish_single(&mut self, operand: Operand) -> Result<bool, String> {
        match operand {
            Operand::Group(value) => Ok(value),
            Operand::Value(tok) => Ok(self.eval.operand_truth(&tok)),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        let Some(tok) = self.peek() else {
            return Err("condition ended where an operand was expected".to_string());
        };

        if !tok.quoted && tok.text == "(" {
            self.pos += 1;
            let inner = self.parse_or()?;
            match self.bump() {
                Some(t) if !t.quoted && t.text == ")" => Ok(Operand::Group(inner)),
                _ => Err("missing ')' in condition".to_string()),
            }
        } else if is_unary_op(tok) {
            let op = tok.text.to_ascii_uppercase();
            self.pos += 1;
            let Some(arg) = self.bump().cloned() else {
                return Err(format!("{op} is missing its operand"));
            };
            Ok(Operand::Group(self.apply_unary(&op, &arg)))
        } else {
            let tok = tok.clone();
            self.pos += 1;
            Ok(Operand::Value(tok))
        }
    }

    fn apply_unary(&mut self, op: &str, arg: &Token) -> bool {
        match op {
            "DEFINED" => self.eval.var_defined(&arg.text),
            "EXISTS" => self.fs_path(&arg.text).exists(),
            "IS_DIRECTORY" => self.fs_path(&arg.text).is_dir(),
            "COMMAND" => {
                self.eval.user_cmd_defined(&arg.text)
                    || crate::dispatch::capability_for(&arg.text).is_some()
            }
            "TARGET" => self.eval.target_known(&arg.text),
            "POLICY" => crate::policy::is_known_policy(&arg.text),
            _ => unreachable!("unary op list"),
        }
    }

    fn fs_path(&self, raw: &str) -> std::path::PathBuf {
        let resolved = if paths::is_absolute(raw) {
            raw.to_string()
        } else {
            paths::join(&self.eval.var_get("CMAKE_CURRENT_SOURCE_DIR"), raw)
        };
        std::path::PathBuf::from(resolved)
    }

    fn apply_binary(&mut self, op: &str, lhs: &Token, rhs: &Token) -> Result<bool, String> {
        let left = self.eval.deref_operand(lhs);
        let right = self.eval.deref_operand(rhs);

        let result = match op {
            "STREQUAL" => left == right,
            "STRLESS" => left < right,
            "STRGREATER" => left > right,
            "STRLESS_EQUAL" => left <= right,
            "STRGREATER_EQUAL" => left >= right,
            "EQUAL" | "LESS" | "GREATER" | "LESS_EQUAL" | "GREATER_EQUAL" => {
                let (Ok(l), Ok(r)) = (left.trim().parse::<i64>(), right.trim().parse::<i64>())
                else {
                    return Ok(false);
                };
                match op {
                    "EQUAL" => l == r,
                    "LESS" => l < r,
                    "GREATER" => l > r,
                    "LESS_EQUAL" => l <= r,
                    _ => l >= r,
                }
            }
            "VERSION_EQUAL" | "VERSION_LESS" | "VERSION_GREATER" | "VERSION_LESS_EQUAL"
            | "VERSION_GREATER_EQUAL" => {
                let l = CmakeVersion::parse_lenient(&left).unwrap_or(CmakeVersion::new(0, 0, 0, 0));
                let r =
                    CmakeVersion::parse_lenient(&right).unwrap_or(CmakeVersion::new(0, 0, 0, 0));
                match op {
                    "VERSION_EQUAL" => l == r,
                    "VERSION_LESS" => l < r,
                    "VERSION_GREATER" => l > r,
                    "VERSION_LESS_EQUAL" => l <= r,
                    _ => l >= r,
                }
            }
            "MATCHES" => {
                // The pattern is taken literally, never dereferenced.
                let pattern = &rhs.text;
                let re = regex::Regex::new(pattern)
                    .map_err(|e| format!("MATCHES pattern is invalid: {e}"))?;
                match re.captures(&left) {
                    Some(caps) => {
                        self.bind_match_groups(&caps);
                        true
                    }
                    None => {
                        self.clear_match_groups();
                        false
                    }
                }
            }
            "IN_LIST" => {
                // The right operand names a list variable; genex in the
                // list value resolves eagerly.
                let raw_list = self.eval.var_get(&rhs.text);
                let list_value = self
                    .eval
                    .genex_eval_eager(&raw_list, self.origin, &self.origin.command.clone());
                split_list_genex_aware(&list_value).iter().any(|item| item == &left)
            }
            "PATH_EQUAL" => paths::normalize(&left) == paths::normalize(&right),
            _ => unreachable!("binary op list"),
        };
        Ok(result)
    }

    fn bind_match_groups(&mut self, caps: &regex::Captures<'_>) {
        let count = caps.len().min(10);
        for i in 0..10 {
            let value = caps
                .get(i)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            self.eval.var_set(format!("CMAKE_MATCH_{i}"), value);
        }
        self.eval
            .var_set("CMAKE_MATCH_COUNT".to_string(), count.saturating_sub(1).to_string());
    }

    fn clear_match_groups(&mut self) {
        for i in 0..10 {
            self.eval.var_set(format!("CMAKE_MATCH_{i}"), String::new());
        }
        self.eval.var_set("CMAKE_MATCH_COUNT".to_string(), "0".to_string());
    }
}

enum Operand {
    /// A parenthesized group or unary-test result, already boolean.
    Group(bool),
    /// A plain token, pending truthiness or comparison.
    Value(Token),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluatorOptions;

    fn evaluator() -> Evaluator {
        Evaluator::new(EvaluatorOptions::new("/proj/src", "/proj/build")).unwrap()
    }

    fn origin() -> Origin {
        Origin::new("CMakeLists.txt", 1, "if")
    }

    fn cond(eval: &mut Evaluator, parts: &[&str]) -> bool {
        let tokens: Vec<Token> = parts.iter().map(|p| Token::new(*p, false)).collect();
        eval.eval_condition(&tokens, &origin()).unwrap()
    }

    #[test]
    fn constants() {
        let mut e = evaluator();
        assert!(cond(&mut e, &["ON"]));
        assert!(cond(&mut e, &["1"]));
        assert!(cond(&mut e, &["42"]));
        assert!(!cond(&mut e, &["OFF"]));
        assert!(!cond(&mut e, &["NOTFOUND"]));
        assert!(!cond(&mut e, &["ZLIB-NOTFOUND"]));
        assert!(!cond(&mut e, &["undefined_name"]));
    }

    #[test]
    fn variable_truthiness() {
        let mut e = evaluator();
        e.var_set("FLAG".into(), "ON".into());
        e.var_set("EMPTY".into(), String::new());
        assert!(cond(&mut e, &["FLAG"]));
        assert!(!cond(&mut e, &["EMPTY"]));
    }

    #[test]
    fn not_and_or_precedence() {
        let mut e = evaluator();
        // NOT 0 AND 0 OR 1 parses as ((NOT 0) AND 0) OR 1.
        assert!(cond(&mut e, &["NOT", "0", "AND", "0", "OR", "1"]));
        assert!(!cond(&mut e, &["1", "AND", "0"]));
        assert!(cond(&mut e, &["0", "OR", "1"]));
    }

    #[test]
    fn parens_group() {
        let mut e = evaluator();
        assert!(!cond(&mut e, &["1", "AND", "(", "0", "OR", "0", ")"]));
        assert!(cond(&mut e, &["NOT", "(", "0", "AND", "1", ")"]));
    }

    #[test]
    fn strequal_derefs_unquoted() {
        let mut e = evaluator();
        e.var_set("A".into(), "hello".into());
        assert!(cond(&mut e, &["A", "STREQUAL", "hello"]));

        let quoted_a = vec![
            Token::new("A", true),
            Token::new("STREQUAL", false),
            Token::new("hello", false),
        ];
        // CMP0054 OLD (the ungated default) dereferences quoted operands.
        assert!(e.eval_condition(&quoted_a, &origin()).unwrap());
        // NEW keeps quoted operands literal.
        e.policy_set("CMP0054", crate::policy::PolicyStatus::New);
        assert!(!e.eval_condition(&quoted_a, &origin()).unwrap());
    }

    #[test]
    fn numeric_comparisons() {
        let mut e = evaluator();
        assert!(cond(&mut e, &["2", "GREATER", "1"]));
        assert!(cond(&mut e, &["2", "LESS_EQUAL", "2"]));
        assert!(!cond(&mut e, &["abc", "EQUAL", "1"]));
    }

    #[test]
    fn version_comparisons() {
        let mut e = evaluator();
        assert!(cond(&mut e, &["3.16", "VERSION_LESS", "3.21"]));
        assert!(cond(&mut e, &["1.2.3", "VERSION_EQUAL", "1.2.3"]));
        assert!(cond(&mut e, &["1.10", "VERSION_GREATER", "1.9"]));
    }

    #[test]
    fn matches_binds_groups() {
        let mut e = evaluator();
        assert!(cond(&mut e, &["v1.2", "MATCHES", r"v([0-9]+)\.([0-9]+)"]));
        assert_eq!(e.var_get("CMAKE_MATCH_0"), "v1.2");
        assert_eq!(e.var_get("CMAKE_MATCH_1"), "1");
        assert_eq!(e.var_get("CMAKE_MATCH_2"), "2");
        assert_eq!(e.var_get("CMAKE_MATCH_COUNT"), "2");
    }

    #[test]
    fn in_list() {
        let mut e = evaluator();
        e.var_set("L".into(), "a;b;c".into());
        assert!(cond(&mut e, &["b", "IN_LIST", "L"]));
        assert!(!cond(&mut e, &["z", "IN_LIST", "L"]));
    }

    #[test]
    fn in_list_resolves_genex() {
        let mut e = evaluator();
        e.var_set("L".into(), "$<$<CONFIG:Debug>:dbg>;always".into());
        assert!(cond(&mut e, &["dbg", "IN_LIST", "L"]));
        assert!(cond(&mut e, &["always", "IN_LIST", "L"]));
    }

    #[test]
    fn path_equal() {
        let mut e = evaluator();
        assert!(cond(&mut e, &["/a//b/./c", "PATH_EQUAL", "/a/b/c"]));
    }

    #[test]
    fn defined_and_target_predicates() {
        let mut e = evaluator();
        e.var_set("X".into(), "1".into());
        assert!(cond(&mut e, &["DEFINED", "X"]));
        assert!(!cond(&mut e, &["DEFINED", "Y"]));
        e.target_register("app");
        assert!(cond(&mut e, &["TARGET", "app"]));
        assert!(cond(&mut e, &["COMMAND", "add_executable"]));
        assert!(!cond(&mut e, &["COMMAND", "no_such_thing"]));
        assert!(cond(&mut e, &["POLICY", "CMP0077"]));
    }

    #[test]
    fn malformed_conditions_error() {
        let mut e = evaluator();
        assert!(e.eval_condition(&[], &origin()).is_err());
        let tokens = vec![Token::new("A", false), Token::new("STREQUAL", false)];
        assert!(e.eval_condition(&tokens, &origin()).is_err());
        let tokens = vec![Token::new("(", false), Token::new("1", false)];
        assert!(e.eval_condition(&tokens, &origin()).is_err());
    }
}
