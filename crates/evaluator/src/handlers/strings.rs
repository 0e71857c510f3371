//! `string()` sub-operations

use cmeval_errors::Error;
use chrono::Utc;

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::resolver::Token;

/// CMake regex-replace references are `\1`..`\9` and `\0`; the regex
/// crate wants `${n}`.
fn convert_replace_refs(replace: &str) -> String {
    let b = replace.as_bytes();
    let mut out = String::with_capacity(replace.len());
    let mut i = 0usize;
    while i < b.len() {
        if b[i] == b'\\' && i + 1 < b.len() && b[i + 1].is_ascii_digit() {
            out.push_str("${");
            out.push(b[i + 1] as char);
            out.push('}');
            i += 2;
        } else if b[i] == b'$' {
            // Literal dollar must not look like a capture reference.
            out.push_str("$$");
            i += 1;
        } else {
            out.push(b[i] as char);
            i += 1;
        }
    }
    out
}

fn concat_texts(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

impl Evaluator {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn cmd_string(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(sub) = inv.args.first() else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "string() missing subcommand",
                "",
            );
            return Ok(());
        };
        let a = &inv.args;

        if sub.eq_keyword("TOUPPER") || sub.eq_keyword("TOLOWER") {
            if a.len() != 3 {
                return self.string_usage(inv, "string(TOUPPER|TOLOWER <string> <out>)");
            }
            let value = if sub.eq_keyword("TOUPPER") {
                a[1].text.to_ascii_uppercase()
            } else {
                a[1].text.to_ascii_lowercase()
            };
            self.var_set(a[2].text.clone(), value);
        } else if sub.eq_keyword("LENGTH") {
            if a.len() != 3 {
                return self.string_usage(inv, "string(LENGTH <string> <out>)");
            }
            self.var_set(a[2].text.clone(), a[1].text.len().to_string());
        } else if sub.eq_keyword("SUBSTRING") {
            if a.len() != 5 {
                return self.string_usage(inv, "string(SUBSTRING <string> <begin> <length> <out>)");
            }
            let input = &a[1].text;
            let (Ok(begin), Ok(length)) = (a[2].text.parse::<i64>(), a[3].text.parse::<i64>())
            else {
                return self.string_usage(inv, "string(SUBSTRING ...) requires integer bounds");
            };
            if begin < 0 || begin as usize > input.len() {
                return self.string_usage(inv, "string(SUBSTRING ...) begin is out of range");
            }
            let begin = begin as usize;
            let end = if length < 0 {
                input.len()
            } else {
                (begin + length as usize).min(input.len())
            };
            let Some(slice) = input.get(begin..end) else {
                return self.string_usage(inv, "string(SUBSTRING ...) splits a multi-byte character");
            };
            self.var_set(a[4].text.clone(), slice.to_string());
        } else if sub.eq_keyword("REPLACE") {
            if a.len() < 4 {
                return self.string_usage(
                    inv,
                    "string(REPLACE <match> <replace> <out> <input>...)",
                );
            }
            let input = concat_texts(&a[4..]);
            let value = input.replace(&a[1].text, &a[2].text);
            self.var_set(a[3].text.clone(), value);
        } else if sub.eq_keyword("APPEND") {
            if a.len() < 2 {
                return self.string_usage(inv, "string(APPEND <var> <input>...)");
            }
            let mut value = self.var_get(&a[1].text);
            value.push_str(&concat_texts(&a[2..]));
            self.var_set(a[1].text.clone(), value);
        } else if sub.eq_keyword("PREPEND") {
            if a.len() < 2 {
                return self.string_usage(inv, "string(PREPEND <var> <input>...)");
            }
            let mut value = concat_texts(&a[2..]);
            value.push_str(&self.var_get(&a[1].text));
            self.var_set(a[1].text.clone(), value);
        } else if sub.eq_keyword("CONCAT") {
            if a.len() < 2 {
                return self.string_usage(inv, "string(CONCAT <out> <input>...)");
            }
            let value = concat_texts(&a[2..]);
            self.var_set(a[1].text.clone(), value);
        } else if sub.eq_keyword("JOIN") {
            if a.len() < 3 {
                return self.string_usage(inv, "string(JOIN <glue> <out> <input>...)");
            }
            let glue = a[1].text.clone();
            let value = a[3..]
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(&glue);
            self.var_set(a[2].text.clone(), value);
        } else if sub.eq_keyword("STRIP") {
            if a.len() != 3 {
                return self.string_usage(inv, "string(STRIP <string> <out>)");
            }
            self.var_set(a[2].text.clone(), a[1].text.trim().to_string());
        } else if sub.eq_keyword("REPEAT") {
            if a.len() != 4 {
                return self.string_usage(inv, "string(REPEAT <string> <count> <out>)");
            }
            let Ok(count) = a[2].text.parse::<usize>() else {
                return self.string_usage(inv, "string(REPEAT ...) requires a non-negative count");
            };
            self.var_set(a[3].text.clone(), a[1].text.repeat(count));
        } else if sub.eq_keyword("FIND") {
            if !(a.len() == 4 || (a.len() == 5 && a[4].eq_keyword("REVERSE"))) {
                return self.string_usage(inv, "string(FIND <string> <substring> <out> [REVERSE])");
            }
            let haystack = &a[1].text;
            let needle = &a[2].text;
            let found = if a.len() == 5 {
                haystack.rfind(needle.as_str())
            } else {
                haystack.find(needle.as_str())
            };
            let value = found.map_or("-1".to_string(), |pos| pos.to_string());
            self.var_set(a[3].text.clone(), value);
        } else if sub.eq_keyword("COMPARE") {
            if a.len() != 5 {
                return self.string_usage(inv, "string(COMPARE <op> <string1> <string2> <out>)");
            }
            let op = &a[1];
            let (s1, s2) = (&a[2].text, &a[3].text);
            let result = if op.eq_keyword("EQUAL") {
                s1 == s2
            } else if op.eq_keyword("NOTEQUAL") {
                s1 != s2
            } else if op.eq_keyword("LESS") {
                s1 < s2
            } else if op.eq_keyword("GREATER") {
                s1 > s2
            } else if op.eq_keyword("LESS_EQUAL") {
                s1 <= s2
            } else if op.eq_keyword("GREATER_EQUAL") {
                s1 >= s2
            } else {
                return self.string_usage(inv, "string(COMPARE ...) unknown comparison");
            };
            self.var_set(a[4].text.clone(), if result { "1" } else { "0" }.to_string());
        } else if sub.eq_keyword("REGEX") {
            return self.string_regex(inv);
        } else if sub.eq_keyword("TIMESTAMP") {
            if a.len() < 2 {
                return self.string_usage(inv, "string(TIMESTAMP <out> [<format>] [UTC])");
            }
            let format = a
                .get(2)
                .filter(|t| !t.eq_keyword("UTC"))
                .map_or("%Y-%m-%dT%H:%M:%S", |t| t.text.as_str());
            let value = Utc::now().format(format).to_string();
            self.var_set(a[1].text.clone(), value);
        } else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "string() unknown subcommand",
                sub.text.clone(),
            );
        }
        Ok(())
    }

    fn string_usage(&mut self, inv: &Invocation, usage: &str) -> Result<(), Error> {
        self.input_error(
            &inv.name,
            inv.origin.clone(),
            "string() received invalid arguments",
            usage,
        );
        Ok(())
    }

    fn string_regex(&mut self, inv: &Invocation) -> Result<(), Error> {
        let a = &inv.args;
        let Some(mode) = a.get(1) else {
            return self.string_usage(inv, "string(REGEX MATCH|MATCHALL|REPLACE ...)");
        };

        if mode.eq_keyword("MATCH") || mode.eq_keyword("MATCHALL") {
            if a.len() < 4 {
                return self.string_usage(inv, "string(REGEX MATCH <pattern> <out> <input>...)");
            }
            let pattern = &a[2].text;
            let out_var = a[3].text.clone();
            let input = concat_texts(&a[4..]);
            let re = match regex::Regex::new(pattern) {
                Ok(re) => re,
                Err(e) => {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        format!("string(REGEX ...) pattern is invalid: {e}"),
                        pattern.clone(),
                    );
                    return Ok(());
                }
            };
            let value = if mode.eq_keyword("MATCH") {
                match re.captures(&input) {
                    Some(caps) => {
                        self.string_bind_match_groups(&caps);
                        caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default()
                    }
                    None => String::new(),
                }
            } else {
                re.find_iter(&input)
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(";")
            };
            self.var_set(out_var, value);
            return Ok(());
        }

        if mode.eq_keyword("REPLACE") {
            if a.len() < 5 {
                return self.string_usage(
                    inv,
                    "string(REGEX REPLACE <pattern> <replace> <out> <input>...)",
                );
            }
            let pattern = &a[2].text;
            let replace = convert_replace_refs(&a[3].text);
            let out_var = a[4].text.clone();
            let input = concat_texts(&a[5..]);
            let re = match regex::Regex::new(pattern) {
                Ok(re) => re,
                Err(e) => {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        format!("string(REGEX REPLACE) pattern is invalid: {e}"),
                        pattern.clone(),
                    );
                    return Ok(());
                }
            };
            let value = re.replace_all(&input, replace.as_str()).into_owned();
            self.var_set(out_var, value);
            return Ok(());
        }

        self.string_usage(inv, "string(REGEX MATCH|MATCHALL|REPLACE ...)")
    }

    fn string_bind_match_groups(&mut self, caps: &regex::Captures<'_>) {
        for i in 0..10 {
            let value = caps
                .get(i)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            self.var_set(format!("CMAKE_MATCH_{i}"), value);
        }
    }
}
