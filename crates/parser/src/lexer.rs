//! Lexer: source text to raw command invocations
//!
//! Produces flat `RawCommand` records; block pairing happens in
//! [`crate::parser`]. Escape sequences in quoted arguments are decoded
//! here (including `\<newline>` continuations); unquoted arguments keep
//! their backslash sequences so the evaluator's argument resolver can
//! honor `\;` when it splits lists.

use cmeval_errors::ParseError;

use crate::ast::Arg;

/// One command invocation as written: `name(args...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    pub name: String,
    pub line: usize,
    pub args: Vec<Arg>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    file: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str, file: &'a str) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            file,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    /// At `[`; if this opens a bracket (`[=*[`) return the `=` count.
    fn bracket_open_len(&self) -> Option<usize> {
        debug_assert_eq!(self.peek(), Some(b'['));
        let mut eq = 0usize;
        loop {
            match self.peek_at(1 + eq) {
                Some(b'=') => eq += 1,
                Some(b'[') => return Some(eq),
                _ => return None,
            }
        }
    }

    /// Consume a bracket body after its `[=*[` opener, returning the
    /// content. `eq` is the `=` count from [`Self::bracket_open_len`].
    fn consume_bracket(&mut self, eq: usize) -> Result<String, ParseError> {
        let open_line = self.line;
        // Skip "[", the equals signs, and the second "[".
        for _ in 0..(eq + 2) {
            self.bump();
        }
        // A newline immediately after the opener is dropped.
        if self.peek() == Some(b'\n') {
            self.bump();
        }
        let start = self.pos;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b']' {
                let mut matched = true;
                for i in 0..eq {
                    if self.bytes.get(self.pos + 1 + i) != Some(&b'=') {
                        matched = false;
                        break;
                    }
                }
                if matched && self.bytes.get(self.pos + 1 + eq) == Some(&b']') {
                    let content = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
                    for _ in 0..(eq + 2) {
                        self.bump();
                    }
                    return Ok(content);
                }
            }
            self.bump();
        }
        Err(ParseError::UnterminatedBracket {
            file: self.file.to_string(),
            line: open_line,
        })
    }

    fn consume_quoted(&mut self) -> Result<String, ParseError> {
        let open_line = self.line;
        self.bump(); // opening quote
        let mut out: Vec<u8> = Vec::new();
        loop {
            let Some(b) = self.bump() else {
                return Err(ParseError::UnterminatedQuote {
                    file: self.file.to_string(),
                    line: open_line,
                });
            };
            match b {
                b'"' => return Ok(String::from_utf8_lossy(&out).into_owned()),
                b'\\' => match self.bump() {
                    Some(b'n') => out.push(b'\n'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b'\\') => out.push(b'\\'),
                    Some(b'"') => out.push(b'"'),
                    Some(b';') => out.push(b';'),
                    // Line continuation: backslash-newline disappears.
                    Some(b'\n') => {}
                    Some(other) => {
                        out.push(b'\\');
                        out.push(other);
                    }
                    None => {
                        return Err(ParseError::UnterminatedQuote {
                            file: self.file.to_string(),
                            line: open_line,
                        })
                    }
                },
                _ => out.push(b),
            }
        }
    }

    fn consume_unquoted(&mut self) -> String {
        let mut out: Vec<u8> = Vec::new();
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')' | b'"' | b'#' => break,
                b'\\' => {
                    // Keep the escape sequence raw; the resolver decodes it
                    // after list splitting.
                    out.push(b'\\');
                    self.bump();
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                }
                _ => {
                    out.push(b);
                    self.bump();
                }
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Lex a whole source file into raw command invocations.
pub fn lex(source: &str, file: &str) -> Result<Vec<RawCommand>, ParseError> {
    let mut cur = Cursor::new(source, file);
    let mut commands = Vec::new();

    loop {
        // Skip whitespace and comments between commands.
        loop {
            match cur.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    cur.bump();
                }
                Some(b'#') => {
                    cur.bump();
                    if cur.peek() == Some(b'[') {
                        if let Some(eq) = cur.bracket_open_len() {
                            cur.consume_bracket(eq)?;
                            continue;
                        }
                    }
                    cur.skip_line_comment();
                }
                _ => break,
            }
        }
        let Some(b) = cur.peek() else { break };

        if !is_ident_start(b) {
            return Err(ParseError::InvalidCommandName {
                name: (b as char).to_string(),
                file: file.to_string(),
                line: cur.line,
            });
        }

        let cmd_line = cur.line;
        let mut name = String::new();
        while let Some(b) = cur.peek() {
            if !is_ident_continue(b) {
                break;
            }
            name.push(b as char);
            cur.bump();
        }

        // Horizontal space between the name and the opening paren.
        while matches!(cur.peek(), Some(b' ' | b'\t')) {
            cur.bump();
        }
        if cur.peek() != Some(b'(') {
            return Err(ParseError::MissingOpenParen {
                command: name,
                file: file.to_string(),
                line: cur.line,
            });
        }
        cur.bump();

        let args = lex_args(&mut cur, &name, cmd_line)?;
        commands.push(RawCommand {
            name,
            line: cmd_line,
            args,
        });
    }

    Ok(commands)
}

/// Lex the argument list of one command, up to its matching close paren.
/// Nested parens become individual unquoted `(` / `)` tokens so that
/// `if()` grouping survives.
fn lex_args(cur: &mut Cursor<'_>, command: &str, cmd_line: usize) -> Result<Vec<Arg>, ParseError> {
    let mut args = Vec::new();
    let mut depth = 1usize;

    loop {
        match cur.peek() {
            None => {
                return Err(ParseError::UnbalancedParens {
                    command: command.to_string(),
                    file: cur.file.to_string(),
                    line: cmd_line,
                });
            }
            Some(b' ' | b'\t' | b'\r' | b'\n') => {
                cur.bump();
            }
            Some(b'#') => {
                cur.bump();
                if cur.peek() == Some(b'[') {
                    if let Some(eq) = cur.bracket_open_len() {
                        cur.consume_bracket(eq)?;
                        continue;
                    }
                }
                cur.skip_line_comment();
            }
            Some(b'(') => {
                depth += 1;
                args.push(Arg::unquoted("(", cur.line));
                cur.bump();
            }
            Some(b')') => {
                depth -= 1;
                if depth == 0 {
                    cur.bump();
                    return Ok(args);
                }
                args.push(Arg::unquoted(")", cur.line));
                cur.bump();
            }
            Some(b'"') => {
                let line = cur.line;
                let text = cur.consume_quoted()?;
                args.push(Arg::quoted(text, line));
            }
            Some(b'[') => {
                if let Some(eq) = cur.bracket_open_len() {
                    let line = cur.line;
                    let text = cur.consume_bracket(eq)?;
                    args.push(Arg {
                        text,
                        quoted: false,
                        bracket: true,
                        line,
                    });
                } else {
                    let line = cur.line;
                    let text = cur.consume_unquoted();
                    args.push(Arg::unquoted(text, line));
                }
            }
            Some(_) => {
                let line = cur.line;
                let text = cur.consume_unquoted();
                if !text.is_empty() {
                    args.push(Arg::unquoted(text, line));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_command() {
        let cmds = lex("set(A b)\n", "t.cmake").unwrap();
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].name, "set");
        assert_eq!(cmds[0].line, 1);
        assert_eq!(cmds[0].args.len(), 2);
        assert_eq!(cmds[0].args[0].text, "A");
        assert!(!cmds[0].args[0].quoted);
    }

    #[test]
    fn quoted_escapes() {
        let cmds = lex(r#"set(A "b;c\n\"d\"")"#, "t.cmake").unwrap();
        assert_eq!(cmds[0].args[1].text, "b;c\n\"d\"");
        assert!(cmds[0].args[1].quoted);
    }

    #[test]
    fn comments_and_lines() {
        let src = "# leading comment\nset(A 1) # trailing\n\nset(B 2)\n";
        let cmds = lex(src, "t.cmake").unwrap();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].line, 2);
        assert_eq!(cmds[1].line, 4);
    }

    #[test]
    fn bracket_comment_and_argument() {
        let src = "#[[ multi\nline comment ]]\nfile(WRITE out.txt [=[raw ${not_expanded}]=])\n";
        let cmds = lex(src, "t.cmake").unwrap();
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].line, 3);
        let arg = &cmds[0].args[1];
        assert!(arg.bracket);
        assert_eq!(arg.text, "raw ${not_expanded}");
    }

    #[test]
    fn nested_parens_become_tokens() {
        let cmds = lex("if((A AND B) OR C)\n", "t.cmake").unwrap();
        let texts: Vec<_> = cmds[0].args.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["(", "A", "AND", "B", ")", "OR", "C"]);
    }

    #[test]
    fn unterminated_quote_errors() {
        assert!(matches!(
            lex("set(A \"oops)\n", "t.cmake"),
            Err(ParseError::UnterminatedQuote { .. })
        ));
    }

    #[test]
    fn missing_paren_errors() {
        assert!(matches!(
            lex("set A 1\n", "t.cmake"),
            Err(ParseError::MissingOpenParen { .. })
        ));
    }

    #[test]
    fn unquoted_keeps_escaped_semicolon_raw() {
        let cmds = lex(r"set(A b\;c)", "t.cmake").unwrap();
        assert_eq!(cmds[0].args[1].text, r"b\;c");
    }
}
