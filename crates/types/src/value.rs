//! CMake string-value conventions
//!
//! All evaluator values are strings. A semicolon-separated string is a
//! list, but semicolons inside a generator expression `$<...>` do not
//! split. The false-like set is the one the language defines: empty, `0`,
//! `OFF`, `NO`, `FALSE`, `N`, `IGNORE`, `NOTFOUND` and anything ending in
//! `-NOTFOUND`, all case-insensitive.

/// Case-insensitive ASCII comparison used for keywords and command names.
#[must_use]
pub fn eq_ignore_ascii_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// True when the value is one of the CMake false spellings.
#[must_use]
pub fn is_cmake_false(value: &str) -> bool {
    let v = value.trim();
    if v.is_empty() {
        return true;
    }
    if v == "0"
        || v.eq_ignore_ascii_case("OFF")
        || v.eq_ignore_ascii_case("NO")
        || v.eq_ignore_ascii_case("FALSE")
        || v.eq_ignore_ascii_case("N")
        || v.eq_ignore_ascii_case("IGNORE")
        || v.eq_ignore_ascii_case("NOTFOUND")
    {
        return true;
    }
    let suffix_len = "-NOTFOUND".len();
    if v.len() >= suffix_len {
        // get() avoids slicing through a multi-byte character.
        if let Some(tail) = v.get(v.len() - suffix_len..) {
            if tail.eq_ignore_ascii_case("-NOTFOUND") {
                return true;
            }
        }
    }
    false
}

/// Negation of [`is_cmake_false`].
#[must_use]
pub fn is_cmake_true(value: &str) -> bool {
    !is_cmake_false(value)
}

/// Split a semicolon list while treating `$<...>` bodies as opaque.
///
/// Empty fragments are dropped, matching how the evaluator flattens
/// unquoted arguments.
#[must_use]
pub fn split_list_genex_aware(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    if input.is_empty() {
        return out;
    }
    let bytes = input.as_bytes();
    let mut genex_depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'<' {
            genex_depth += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'>' && genex_depth > 0 {
            genex_depth -= 1;
            i += 1;
            continue;
        }
        if bytes[i] == b';' && genex_depth == 0 {
            if i > start {
                out.push(input[start..i].to_string());
            }
            start = i + 1;
        }
        i += 1;
    }
    if start < bytes.len() {
        out.push(input[start..].to_string());
    }
    out
}

/// Join items back into a semicolon list.
#[must_use]
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(item.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn false_spellings() {
        for v in ["", "0", "off", "No", "FALSE", "n", "ignore", "NOTFOUND", "ZLIB-NOTFOUND"] {
            assert!(is_cmake_false(v), "{v:?} should be false");
        }
        for v in ["1", "ON", "yes", "true", "Y", "something"] {
            assert!(is_cmake_true(v), "{v:?} should be true");
        }
    }

    #[test]
    fn split_respects_genex() {
        assert_eq!(split_list_genex_aware("a;b;c"), vec!["a", "b", "c"]);
        assert_eq!(
            split_list_genex_aware("$<$<CONFIG:Debug>:A;B>;c"),
            vec!["$<$<CONFIG:Debug>:A;B>", "c"]
        );
        assert_eq!(split_list_genex_aware("a;;b"), vec!["a", "b"]);
        assert!(split_list_genex_aware("").is_empty());
    }

    #[test]
    fn join_round_trip() {
        let items = vec!["a", "b", "c"];
        assert_eq!(join_list(&items), "a;b;c");
        assert_eq!(split_list_genex_aware(&join_list(&items)), items);
    }
}
