//! Qualifier expressions: `pageName = 'Main' AND NOT (user.role like 'adm*')`.
//!
//! ```text
//! or      := and (OR and)*
//! and     := not (AND not)*
//! not     := NOT not | primary
//! primary := '(' or ')' | *true* | *false* | keypath op operand
//! ```
//!
//! Keywords are case-insensitive. Chains of the same conjunction flatten, so
//! `a AND b AND c` is one compound with three members.

use std::sync::Arc;

use serde_json::Value;

use crate::core::qualifier::{
    BooleanQualifier, CompoundQualifier, KeyComparisonQualifier, KeyValueQualifier, NotQualifier,
    Operator, Qualifier,
};
use crate::parser::ParseError;

/// Parse a qualifier expression.
pub fn parse_qualifier(text: &str) -> Result<Arc<dyn Qualifier>, ParseError> {
    let mut parser = QualifierParser { text, pos: 0 };
    let qualifier = parser.parse_or()?;
    parser.skip_whitespace();
    if parser.pos < text.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(qualifier)
}

enum Operand {
    Literal(Value),
    KeyPath(String),
}

struct QualifierParser<'a> {
    text: &'a str,
    pos: usize,
}

impl QualifierParser<'_> {
    fn error(&self, message: &str) -> ParseError {
        ParseError::Qualifier {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    /// Consume `keyword` if it appears next as a whole word.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        let Some(head) = rest.get(..keyword.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(keyword) {
            return false;
        }
        let boundary = rest[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !is_key_char(c));
        if boundary {
            self.pos += keyword.len();
        }
        boundary
    }

    fn parse_or(&mut self) -> Result<Arc<dyn Qualifier>, ParseError> {
        let first = self.parse_and()?;
        let mut members = vec![first];
        while self.eat_keyword("OR") {
            members.push(self.parse_and()?);
        }
        Ok(combine(members, CompoundQualifier::or))
    }

    fn parse_and(&mut self) -> Result<Arc<dyn Qualifier>, ParseError> {
        let first = self.parse_not()?;
        let mut members = vec![first];
        while self.eat_keyword("AND") {
            members.push(self.parse_not()?);
        }
        Ok(combine(members, CompoundQualifier::and))
    }

    fn parse_not(&mut self) -> Result<Arc<dyn Qualifier>, ParseError> {
        if self.eat_keyword("NOT") {
            let inner = self.parse_not()?;
            return Ok(Arc::new(NotQualifier(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Arc<dyn Qualifier>, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.skip_whitespace();
            if self.peek() != Some(')') {
                return Err(self.error("expected ')'"));
            }
            self.pos += 1;
            return Ok(inner);
        }
        if self.rest().starts_with("*true*") {
            self.pos += "*true*".len();
            return Ok(Arc::new(BooleanQualifier::TRUE));
        }
        if self.rest().starts_with("*false*") {
            self.pos += "*false*".len();
            return Ok(Arc::new(BooleanQualifier::FALSE));
        }

        let key_path = self.parse_key_path()?;
        let op = self.parse_operator()?;
        let qualifier: Arc<dyn Qualifier> = match self.parse_operand()? {
            Operand::Literal(value) => Arc::new(KeyValueQualifier::new(key_path, op, value)),
            Operand::KeyPath(right) => Arc::new(KeyComparisonQualifier::new(key_path, op, right)),
        };
        Ok(qualifier)
    }

    fn parse_key_path(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let len: usize = self
            .rest()
            .chars()
            .take_while(|c| is_key_char(*c))
            .map(char::len_utf8)
            .sum();
        if len == 0 {
            return Err(self.error("expected key path"));
        }
        let key = &self.rest()[..len];
        if key.starts_with('.') || key.ends_with('.') || key.contains("..") {
            return Err(self.error("malformed key path"));
        }
        let key = key.to_string();
        self.pos += len;
        Ok(key)
    }

    fn parse_operator(&mut self) -> Result<Operator, ParseError> {
        self.skip_whitespace();
        let symbolic: usize = self
            .rest()
            .chars()
            .take_while(|c| "=!<>".contains(*c))
            .take(2)
            .map(char::len_utf8)
            .sum();
        let len = if symbolic > 0 {
            symbolic
        } else {
            self.rest()
                .chars()
                .take_while(|c| c.is_ascii_alphabetic() || *c == ':')
                .map(char::len_utf8)
                .sum()
        };
        let token = &self.rest()[..len];
        match Operator::from_token(token) {
            Some(op) => {
                self.pos += len;
                Ok(op)
            }
            None => Err(self.error("expected comparison operator")),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => self.parse_quoted(quote).map(|s| Operand::Literal(Value::String(s))),
            Some(c) if c.is_ascii_digit() || c == '-' => self.parse_number().map(Operand::Literal),
            Some(_) => {
                let word = self.parse_key_path()?;
                let literal = match word.as_str() {
                    "true" | "YES" => Value::Bool(true),
                    "false" | "NO" => Value::Bool(false),
                    "null" | "nil" => Value::Null,
                    _ => return Ok(Operand::KeyPath(word)),
                };
                Ok(Operand::Literal(literal))
            }
            None => Err(self.error("expected value")),
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += quote.len_utf8();
        let mut out = String::new();
        let mut escaped = false;
        for (offset, c) in self.rest().char_indices() {
            if escaped {
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                self.pos += offset + c.len_utf8();
                return Ok(out);
            } else {
                out.push(c);
            }
        }
        self.pos = start;
        Err(self.error("unterminated string"))
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let len: usize = self
            .rest()
            .char_indices()
            .take_while(|(idx, c)| c.is_ascii_digit() || *c == '.' || (*idx == 0 && *c == '-'))
            .map(|(_, c)| c.len_utf8())
            .sum();
        let token = &self.rest()[..len];
        let value = if let Ok(int) = token.parse::<i64>() {
            Value::from(int)
        } else if let Some(number) = token
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            Value::Number(number)
        } else {
            return Err(self.error("invalid number"));
        };
        self.pos += len;
        Ok(value)
    }
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '$')
}

fn combine(
    mut members: Vec<Arc<dyn Qualifier>>,
    build: fn(Vec<Arc<dyn Qualifier>>) -> CompoundQualifier,
) -> Arc<dyn Qualifier> {
    if members.len() == 1 {
        if let Some(single) = members.pop() {
            return single;
        }
    }
    Arc::new(build(members))
}
