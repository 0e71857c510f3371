//! `math(EXPR ...)` — 64-bit signed integer expressions
//!
//! Grammar (loosest to tightest): `|`, `^`, `&`, `<<`/`>>`, `+`/`-`,
//! `*`/`/`/`%`, unary `-`/`+`/`~`, parentheses. Division or modulo by
//! zero and malformed input are input errors.

use cmeval_errors::Error;

use crate::context::Evaluator;
use crate::dispatch::Invocation;

struct ExprParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.bytes[self.pos..].starts_with(token.as_bytes()) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn parse(&mut self) -> Result<i64, String> {
        let value = self.parse_or()?;
        self.skip_ws();
        if self.pos != self.bytes.len() {
            return Err(format!(
                "unexpected trailing input at offset {}",
                self.pos
            ));
        }
        Ok(value)
    }

    fn parse_or(&mut self) -> Result<i64, String> {
        let mut value = self.parse_xor()?;
        loop {
            self.skip_ws();
            // "|" but not "||" (no logical operators in math()).
            if self.peek() == Some(b'|') {
                self.pos += 1;
                value |= self.parse_xor()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_xor(&mut self) -> Result<i64, String> {
        let mut value = self.parse_and()?;
        while self.peek() == Some(b'^') {
            self.pos += 1;
            value ^= self.parse_and()?;
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<i64, String> {
        let mut value = self.parse_shift()?;
        while self.peek() == Some(b'&') {
            self.pos += 1;
            value &= self.parse_shift()?;
        }
        Ok(value)
    }

    fn parse_shift(&mut self) -> Result<i64, String> {
        let mut value = self.parse_additive()?;
        loop {
            if self.eat("<<") {
                let rhs = self.parse_additive()?;
                let amount = u32::try_from(rhs).map_err(|_| "invalid shift amount".to_string())?;
                value = value.checked_shl(amount).ok_or("shift overflow")?;
            } else if self.eat(">>") {
                let rhs = self.parse_additive()?;
                let amount = u32::try_from(rhs).map_err(|_| "invalid shift amount".to_string())?;
                value = value.checked_shr(amount).ok_or("shift overflow")?;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_additive(&mut self) -> Result<i64, String> {
        let mut value = self.parse_multiplicative()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value = value
                        .checked_add(self.parse_multiplicative()?)
                        .ok_or("integer overflow")?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value = value
                        .checked_sub(self.parse_multiplicative()?)
                        .ok_or("integer overflow")?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_multiplicative(&mut self) -> Result<i64, String> {
        let mut value = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value = value
                        .checked_mul(self.parse_unary()?)
                        .ok_or("integer overflow")?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    value = value.checked_div(rhs).ok_or("division by zero")?;
                }
                Some(b'%') => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    value = value.checked_rem(rhs).ok_or("modulo by zero")?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<i64, String> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(self.parse_unary()?.checked_neg().ok_or("integer overflow")?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.parse_unary()
            }
            Some(b'~') => {
                self.pos += 1;
                Ok(!self.parse_unary()?)
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<i64, String> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let value = self.parse_or()?;
                if self.peek() == Some(b')') {
                    self.pos += 1;
                    Ok(value)
                } else {
                    Err("missing ')'".to_string())
                }
            }
            Some(c) if c.is_ascii_digit() => {
                // Hexadecimal literals with 0x prefix are accepted.
                let start = self.pos;
                if self.eat("0x") || self.eat("0X") {
                    let hex_start = self.pos;
                    while self
                        .bytes
                        .get(self.pos)
                        .is_some_and(u8::is_ascii_hexdigit)
                    {
                        self.pos += 1;
                    }
                    let text = std::str::from_utf8(&self.bytes[hex_start..self.pos])
                        .map_err(|_| "invalid literal".to_string())?;
                    return i64::from_str_radix(text, 16).map_err(|e| e.to_string());
                }
                while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
                    self.pos += 1;
                }
                let text = std::str::from_utf8(&self.bytes[start..self.pos])
                    .map_err(|_| "invalid literal".to_string())?;
                text.parse::<i64>().map_err(|e| e.to_string())
            }
            Some(c) => Err(format!("unexpected character '{}'", c as char)),
            None => Err("expression ended unexpectedly".to_string()),
        }
    }
}

impl Evaluator {
    pub(crate) fn cmd_math(&mut self, inv: &Invocation) -> Result<(), Error> {
        if inv.args.len() < 3 || !inv.args[0].eq_keyword("EXPR") {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "math() requires the EXPR signature",
                "Usage: math(EXPR <out> \"<expression>\" [OUTPUT_FORMAT DECIMAL|HEXADECIMAL])",
            );
            return Ok(());
        }
        let out_var = inv.args[1].text.clone();
        let expression = &inv.args[2].text;

        let mut hexadecimal = false;
        if let Some(fmt_tok) = inv.args.get(3) {
            if !fmt_tok.eq_keyword("OUTPUT_FORMAT") {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "math() received an unexpected argument",
                    fmt_tok.text.clone(),
                );
                return Ok(());
            }
            match inv.args.get(4) {
                Some(t) if t.eq_keyword("HEXADECIMAL") => hexadecimal = true,
                Some(t) if t.eq_keyword("DECIMAL") => {}
                _ => {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        "math(OUTPUT_FORMAT ...) requires DECIMAL or HEXADECIMAL",
                        "",
                    );
                    return Ok(());
                }
            }
        }

        match ExprParser::new(expression).parse() {
            Ok(value) => {
                let text = if hexadecimal {
                    format!("0x{value:x}")
                } else {
                    value.to_string()
                };
                self.var_set(out_var, text);
            }
            Err(message) => {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    format!("math() could not evaluate the expression: {message}"),
                    expression.clone(),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> Result<i64, String> {
        ExprParser::new(expr).parse()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), 7);
        assert_eq!(eval("(1 + 2) * 3").unwrap(), 9);
        assert_eq!(eval("10 / 3").unwrap(), 3);
        assert_eq!(eval("10 % 3").unwrap(), 1);
        assert_eq!(eval("-4 + 2").unwrap(), -2);
    }

    #[test]
    fn bitwise() {
        assert_eq!(eval("1 << 4").unwrap(), 16);
        assert_eq!(eval("255 >> 4").unwrap(), 15);
        assert_eq!(eval("12 & 10").unwrap(), 8);
        assert_eq!(eval("12 | 3").unwrap(), 15);
        assert_eq!(eval("12 ^ 10").unwrap(), 6);
        assert_eq!(eval("~0").unwrap(), -1);
    }

    #[test]
    fn hex_literals() {
        assert_eq!(eval("0xFF").unwrap(), 255);
        assert_eq!(eval("0x10 + 1").unwrap(), 17);
    }

    #[test]
    fn errors() {
        assert!(eval("1 / 0").is_err());
        assert!(eval("1 +").is_err());
        assert!(eval("(1").is_err());
        assert!(eval("abc").is_err());
    }
}
