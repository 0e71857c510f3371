//! Generator-expression evaluator
//!
//! Resolves `$<op:args,...>` strings eagerly for the few commands that
//! need it; everywhere else the evaluator preserves genex text verbatim.
//! Pure function over a [`GenexContext`]: config name, a target-property
//! reader, and depth limits. The cycle guard tracks `(target, property)`
//! pairs so `TARGET_PROPERTY` chains cannot recurse forever.
//!
//! Operators handled explicitly: `CONFIG`, `BOOL`, `IF`, and
//! `TARGET_PROPERTY`. The generalized `<cond>:<value>` form treats the
//! operator slot as a boolean when it is itself a genex or literally
//! `0`/`1`. Anything else reports `Unsupported` with the raw expression
//! preserved.

use cmeval_types::is_cmake_false;

pub const MAX_GENEX_DEPTH: usize = 64;
pub const MAX_TARGET_PROPERTY_DEPTH: usize = 64;

/// Outcome classification of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenexStatus {
    Ok,
    Unsupported,
    Error,
    CycleGuardHit,
}

#[derive(Debug, Clone)]
pub struct GenexResult {
    pub status: GenexStatus,
    pub value: String,
    pub message: String,
}

impl GenexResult {
    fn ok(value: String) -> Self {
        Self {
            status: GenexStatus::Ok,
            value,
            message: String::new(),
        }
    }

    fn fail(status: GenexStatus, raw: &str, message: &str) -> Self {
        Self {
            status,
            value: raw.to_string(),
            message: message.to_string(),
        }
    }
}

/// Read callback for `$<TARGET_PROPERTY:tgt,prop>`.
pub trait TargetPropertyReader {
    fn read(&self, target: &str, property: &str) -> String;
}

pub struct GenexContext<'a> {
    pub config: &'a str,
    pub reader: &'a dyn TargetPropertyReader,
    pub max_depth: usize,
    pub max_target_property_depth: usize,
}

#[derive(Default)]
struct PropStack {
    entries: Vec<(String, String)>,
}

impl PropStack {
    fn contains(&self, target: &str, property: &str) -> bool {
        self.entries
            .iter()
            .any(|(t, p)| t == target && p.eq_ignore_ascii_case(property))
    }
}

fn contains_genex(input: &str) -> bool {
    input.as_bytes().windows(2).any(|w| w == b"$<")
}

/// Split on a delimiter at genex nesting depth zero, trimming fragments.
fn split_top_level(input: &str, delimiter: u8) -> Vec<&str> {
    let b = input.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i <= b.len() {
        let at_end = i == b.len();
        if !at_end {
            if b[i] == b'$' && i + 1 < b.len() && b[i + 1] == b'<' {
                depth += 1;
                i += 2;
                continue;
            }
            if b[i] == b'>' && depth > 0 {
                depth -= 1;
                i += 1;
                continue;
            }
            if !(b[i] == delimiter && depth == 0) {
                i += 1;
                continue;
            }
        }
        parts.push(input[start..i].trim());
        start = i + 1;
        i += 1;
    }
    parts
}

/// First `:` at depth zero splits operator from arguments.
fn find_top_level_colon(body: &str) -> Option<usize> {
    let b = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0usize;
    while i < b.len() {
        if b[i] == b'$' && i + 1 < b.len() && b[i + 1] == b'<' {
            depth += 1;
            i += 2;
            continue;
        }
        if b[i] == b'>' && depth > 0 {
            depth -= 1;
        } else if b[i] == b':' && depth == 0 {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Given `$<` at `start`, find the matching `>`.
fn find_matching_end(input: &str, start: usize) -> Option<usize> {
    let b = input.as_bytes();
    let mut depth = 1usize;
    let mut i = start + 2;
    while i < b.len() {
        if b[i] == b'$' && i + 1 < b.len() && b[i + 1] == b'<' {
            depth += 1;
            i += 2;
            continue;
        }
        if b[i] == b'>' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Evaluate every `$<...>` occurrence in `input`.
pub fn evaluate(ctx: &GenexContext<'_>, input: &str) -> GenexResult {
    let mut stack = PropStack::default();
    eval_inner(ctx, input, 0, &mut stack)
}

fn eval_inner(
    ctx: &GenexContext<'_>,
    input: &str,
    depth: usize,
    stack: &mut PropStack,
) -> GenexResult {
    if depth > ctx.max_depth {
        return GenexResult::fail(
            GenexStatus::Error,
            input,
            "Generator expression max depth exceeded",
        );
    }
    if input.is_empty() || !contains_genex(input) {
        return GenexResult::ok(input.to_string());
    }

    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    let b = input.as_bytes();
    while cursor < b.len() {
        let open = match input[cursor..].find("$<") {
            Some(rel) => cursor + rel,
            None => {
                out.push_str(&input[cursor..]);
                break;
            }
        };
        out.push_str(&input[cursor..open]);

        let Some(close) = find_matching_end(input, open) else {
            return GenexResult::fail(GenexStatus::Error, input, "Unclosed generator expression");
        };
        let body = &input[open + 2..close];
        let raw_expr = &input[open..=close];
        let part = eval_body(ctx, body, raw_expr, depth, stack);
        if part.status != GenexStatus::Ok {
            return GenexResult {
                status: part.status,
                value: input.to_string(),
                message: part.message,
            };
        }
        out.push_str(&part.value);
        cursor = close + 1;
    }
    GenexResult::ok(out)
}

#[allow(clippy::too_many_lines)]
fn eval_body(
    ctx: &GenexContext<'_>,
    body: &str,
    raw_expr: &str,
    depth: usize,
    stack: &mut PropStack,
) -> GenexResult {
    let (op, args_expr) = match find_top_level_colon(body) {
        Some(colon) => (body[..colon].trim(), &body[colon + 1..]),
        None => (body.trim(), ""),
    };

    if op.eq_ignore_ascii_case("CONFIG") {
        if args_expr.is_empty() {
            return GenexResult::ok(ctx.config.to_string());
        }
        for arg in split_top_level(args_expr, b',') {
            let arg_eval = eval_inner(ctx, arg, depth + 1, stack);
            if arg_eval.status != GenexStatus::Ok {
                return GenexResult {
                    status: arg_eval.status,
                    value: raw_expr.to_string(),
                    message: arg_eval.message,
                };
            }
            // Each argument may itself be a semicolon list of configs.
            let matched = arg_eval
                .value
                .split(';')
                .map(str::trim)
                .any(|candidate| !candidate.is_empty() && candidate.eq_ignore_ascii_case(ctx.config));
            if matched {
                return GenexResult::ok("1".to_string());
            }
        }
        return GenexResult::ok("0".to_string());
    }

    if op.eq_ignore_ascii_case("BOOL") {
        let arg_eval = eval_inner(ctx, args_expr, depth + 1, stack);
        if arg_eval.status != GenexStatus::Ok {
            return GenexResult {
                status: arg_eval.status,
                value: raw_expr.to_string(),
                message: arg_eval.message,
            };
        }
        let value = if is_cmake_false(&arg_eval.value) { "0" } else { "1" };
        return GenexResult::ok(value.to_string());
    }

    if op.eq_ignore_ascii_case("IF") {
        let args = split_top_level(args_expr, b',');
        if args.len() != 3 {
            return GenexResult::fail(GenexStatus::Error, raw_expr, "IF expects 3 arguments");
        }
        let cond_eval = eval_inner(ctx, args[0], depth + 1, stack);
        if cond_eval.status != GenexStatus::Ok {
            return GenexResult {
                status: cond_eval.status,
                value: raw_expr.to_string(),
                message: cond_eval.message,
            };
        }
        let branch = if is_cmake_false(&cond_eval.value) { args[2] } else { args[1] };
        let branch_eval = eval_inner(ctx, branch, depth + 1, stack);
        if branch_eval.status != GenexStatus::Ok {
            return GenexResult {
                status: branch_eval.status,
                value: raw_expr.to_string(),
                message: branch_eval.message,
            };
        }
        return GenexResult::ok(branch_eval.value);
    }

    if op.eq_ignore_ascii_case("TARGET_PROPERTY") {
        let args = split_top_level(args_expr, b',');
        if args.len() != 2 {
            return GenexResult::fail(
                GenexStatus::Error,
                raw_expr,
                "TARGET_PROPERTY expects target and property",
            );
        }
        let target_eval = eval_inner(ctx, args[0], depth + 1, stack);
        if target_eval.status != GenexStatus::Ok {
            return GenexResult {
                status: target_eval.status,
                value: raw_expr.to_string(),
                message: target_eval.message,
            };
        }
        let prop_eval = eval_inner(ctx, args[1], depth + 1, stack);
        if prop_eval.status != GenexStatus::Ok {
            return GenexResult {
                status: prop_eval.status,
                value: raw_expr.to_string(),
                message: prop_eval.message,
            };
        }
        let target = target_eval.value.trim().to_string();
        let property = prop_eval.value.trim().to_string();
        if target.is_empty() || property.is_empty() {
            return GenexResult::ok(String::new());
        }
        if stack.entries.len() >= ctx.max_target_property_depth {
            return GenexResult::fail(
                GenexStatus::CycleGuardHit,
                raw_expr,
                "TARGET_PROPERTY depth guard reached",
            );
        }
        if stack.contains(&target, &property) {
            return GenexResult::fail(
                GenexStatus::CycleGuardHit,
                raw_expr,
                "TARGET_PROPERTY cycle detected",
            );
        }
        stack.entries.push((target.clone(), property.clone()));
        let raw_value = ctx.reader.read(&target, &property);
        let nested = eval_inner(ctx, &raw_value, depth + 1, stack);
        stack.entries.pop();
        if nested.status != GenexStatus::Ok {
            return GenexResult {
                status: nested.status,
                value: raw_expr.to_string(),
                message: nested.message,
            };
        }
        return GenexResult::ok(nested.value);
    }

    // `$<$<...>>`: a bare nested expression used as the whole body.
    if args_expr.is_empty() && op.starts_with("$<") && op.ends_with('>') {
        let nested = eval_inner(ctx, op, depth + 1, stack);
        if nested.status != GenexStatus::Ok {
            return GenexResult {
                status: nested.status,
                value: raw_expr.to_string(),
                message: nested.message,
            };
        }
        return GenexResult::ok(nested.value);
    }

    // Generalized `<cond>:<value>` where the operator slot is a boolean.
    if !args_expr.is_empty() && (contains_genex(op) || op == "0" || op == "1") {
        let cond_eval = eval_inner(ctx, op, depth + 1, stack);
        if cond_eval.status != GenexStatus::Ok {
            return GenexResult {
                status: cond_eval.status,
                value: raw_expr.to_string(),
                message: cond_eval.message,
            };
        }
        if is_cmake_false(&cond_eval.value) {
            return GenexResult::ok(String::new());
        }
        let value_eval = eval_inner(ctx, args_expr, depth + 1, stack);
        if value_eval.status != GenexStatus::Ok {
            return GenexResult {
                status: value_eval.status,
                value: raw_expr.to_string(),
                message: value_eval.message,
            };
        }
        return GenexResult::ok(value_eval.value);
    }

    GenexResult::fail(
        GenexStatus::Unsupported,
        raw_expr,
        "Unsupported generator expression operator",
    )
}

impl crate::context::Evaluator {
    /// Eager resolution for commands whose semantics require it. `Ok`
    /// substitutes the resolved value; a tripped cycle guard reports an
    /// error and preserves the input; everything else (unsupported
    /// operator, malformed expression) preserves the input verbatim.
    pub(crate) fn genex_eval_eager(
        &mut self,
        input: &str,
        origin: &cmeval_events::Origin,
        command: &str,
    ) -> String {
        let result = self.genex_eval(input);
        match result.status {
            GenexStatus::Ok => result.value,
            GenexStatus::CycleGuardHit => {
                self.emit_diag(
                    cmeval_events::DiagSeverity::Error,
                    "genex",
                    command,
                    origin.clone(),
                    format!("generator expression cycle guard hit: {}", result.message),
                    "Break the TARGET_PROPERTY reference cycle",
                    cmeval_events::DiagClass::InputError,
                    cmeval_events::DiagCode::BadArguments,
                );
                input.to_string()
            }
            GenexStatus::Unsupported | GenexStatus::Error => input.to_string(),
        }
    }

    /// Evaluate a genex string against the evaluator's config name and
    /// the target-property shadow built from `TargetPropSet` emissions.
    #[must_use]
    pub fn genex_eval(&self, input: &str) -> GenexResult {
        struct Shadow<'a>(&'a std::collections::HashMap<(String, String), String>);
        impl TargetPropertyReader for Shadow<'_> {
            fn read(&self, target: &str, property: &str) -> String {
                self.0
                    .get(&(target.to_string(), property.to_ascii_uppercase()))
                    .cloned()
                    .unwrap_or_default()
            }
        }
        let reader = Shadow(&self.target_properties);
        let ctx = GenexContext {
            config: &self.config.eval.config_name,
            reader: &reader,
            max_depth: self.config.limits.max_genex_depth,
            max_target_property_depth: self.config.limits.max_target_property_depth,
        };
        evaluate(&ctx, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapReader(HashMap<(String, String), String>);

    impl TargetPropertyReader for MapReader {
        fn read(&self, target: &str, property: &str) -> String {
            self.0
                .get(&(target.to_string(), property.to_ascii_uppercase()))
                .cloned()
                .unwrap_or_default()
        }
    }

    fn ctx<'a>(reader: &'a MapReader) -> GenexContext<'a> {
        GenexContext {
            config: "Debug",
            reader,
            max_depth: MAX_GENEX_DEPTH,
            max_target_property_depth: 4,
        }
    }

    fn props(entries: &[(&str, &str, &str)]) -> MapReader {
        MapReader(
            entries
                .iter()
                .map(|(t, p, v)| (((*t).to_string(), (*p).to_string()), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn plain_text_passes_through() {
        let reader = props(&[]);
        let r = evaluate(&ctx(&reader), "no genex here");
        assert_eq!(r.status, GenexStatus::Ok);
        assert_eq!(r.value, "no genex here");
    }

    #[test]
    fn config_membership() {
        let reader = props(&[]);
        assert_eq!(evaluate(&ctx(&reader), "$<CONFIG:Debug>").value, "1");
        assert_eq!(evaluate(&ctx(&reader), "$<CONFIG:Release>").value, "0");
        assert_eq!(evaluate(&ctx(&reader), "$<CONFIG:Release,debug>").value, "1");
        assert_eq!(evaluate(&ctx(&reader), "$<CONFIG>").value, "Debug");
    }

    #[test]
    fn bool_and_if() {
        let reader = props(&[]);
        assert_eq!(evaluate(&ctx(&reader), "$<BOOL:ON>").value, "1");
        assert_eq!(evaluate(&ctx(&reader), "$<BOOL:lib-NOTFOUND>").value, "0");
        assert_eq!(evaluate(&ctx(&reader), "$<IF:1,yes,no>").value, "yes");
        assert_eq!(evaluate(&ctx(&reader), "$<IF:0,yes,no>").value, "no");
        let r = evaluate(&ctx(&reader), "$<IF:1,yes>");
        assert_eq!(r.status, GenexStatus::Error);
    }

    #[test]
    fn conditional_value_form() {
        let reader = props(&[]);
        assert_eq!(
            evaluate(&ctx(&reader), "$<$<CONFIG:Debug>:-g;-O0>").value,
            "-g;-O0"
        );
        assert_eq!(evaluate(&ctx(&reader), "$<$<CONFIG:Release>:-O3>").value, "");
        assert_eq!(evaluate(&ctx(&reader), "$<1:x>").value, "x");
        assert_eq!(evaluate(&ctx(&reader), "$<0:x>").value, "");
    }

    #[test]
    fn target_property_reads() {
        let reader = props(&[("app", "OUTPUT_NAME", "renamed")]);
        assert_eq!(
            evaluate(&ctx(&reader), "$<TARGET_PROPERTY:app,OUTPUT_NAME>").value,
            "renamed"
        );
        // Missing property is empty, not an error.
        assert_eq!(
            evaluate(&ctx(&reader), "$<TARGET_PROPERTY:app,MISSING>").value,
            ""
        );
    }

    #[test]
    fn target_property_cycle_guard() {
        let reader = props(&[
            ("a", "P", "$<TARGET_PROPERTY:b,P>"),
            ("b", "P", "$<TARGET_PROPERTY:a,P>"),
        ]);
        let r = evaluate(&ctx(&reader), "$<TARGET_PROPERTY:a,P>");
        assert_eq!(r.status, GenexStatus::CycleGuardHit);
    }

    #[test]
    fn target_property_depth_guard() {
        let reader = props(&[
            ("t", "P0", "$<TARGET_PROPERTY:t,P1>"),
            ("t", "P1", "$<TARGET_PROPERTY:t,P2>"),
            ("t", "P2", "$<TARGET_PROPERTY:t,P3>"),
            ("t", "P3", "$<TARGET_PROPERTY:t,P4>"),
            ("t", "P4", "$<TARGET_PROPERTY:t,P5>"),
            ("t", "P5", "done"),
        ]);
        let r = evaluate(&ctx(&reader), "$<TARGET_PROPERTY:t,P0>");
        assert_eq!(r.status, GenexStatus::CycleGuardHit);
    }

    #[test]
    fn unsupported_operator_keeps_raw() {
        let reader = props(&[]);
        let r = evaluate(&ctx(&reader), "$<TARGET_FILE:app>");
        assert_eq!(r.status, GenexStatus::Unsupported);
        assert_eq!(r.value, "$<TARGET_FILE:app>");
    }

    #[test]
    fn unclosed_is_error() {
        let reader = props(&[]);
        let r = evaluate(&ctx(&reader), "$<CONFIG:Debug");
        assert_eq!(r.status, GenexStatus::Error);
    }

    #[test]
    fn mixed_text_and_genex() {
        let reader = props(&[]);
        let r = evaluate(&ctx(&reader), "pre-$<CONFIG>-post");
        assert_eq!(r.value, "pre-Debug-post");
    }
}
