//! Old-style property-list literals (`{ a = 1; }`, `( x, y )`).

use serde_json::{Map, Value};

use crate::parser::ParseError;

/// Parse a complete property-list literal.
pub fn parse_property_list(text: &str) -> Result<Value, ParseError> {
    let mut parser = PlistParser {
        chars: text.char_indices().collect(),
        pos: 0,
        len: text.len(),
    };
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

/// Render a value in property-list syntax. Strings are always quoted.
pub fn format_property_list(value: &Value) -> String {
    match value {
        Value::Null => "\"\"".to_string(),
        Value::Bool(b) => (if *b { "YES" } else { "NO" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(format_property_list).collect();
            format!("( {} )", parts.join(", "))
        }
        Value::Object(map) => {
            let mut out = String::from("{ ");
            for (key, value) in map {
                out.push_str(&quote(key));
                out.push_str(" = ");
                out.push_str(&format_property_list(value));
                out.push_str("; ");
            }
            out.push('}');
            out
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

struct PlistParser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

impl PlistParser {
    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.len, |(idx, _)| *idx)
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::PropertyList {
            offset: self.offset(),
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('/') if self.chars.get(self.pos + 1).map(|(_, c)| *c) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some('/') if self.chars.get(self.pos + 1).map(|(_, c)| *c) == Some('*') => {
                    self.pos += 2;
                    while self.pos < self.chars.len() {
                        if self.peek() == Some('*')
                            && self.chars.get(self.pos + 1).map(|(_, c)| *c) == Some('/')
                        {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.parse_dictionary(),
            Some('(') => self.parse_array(),
            Some('"') | Some('\'') => self.parse_quoted().map(Value::String),
            Some(_) => self.parse_word().map(|word| word_value(&word)),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_dictionary(&mut self) -> Result<Value, ParseError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.peek() {
                Some('"') | Some('\'') => self.parse_quoted()?,
                Some(_) => self.parse_word()?,
                None => return Err(self.error("unterminated dictionary")),
            };
            self.expect('=')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(';') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.error("expected ';' or '}' in dictionary")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        self.expect('(')?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {}
                _ => return Err(self.error("expected ',' or ')' in array")),
            }
        }
    }

    fn parse_quoted(&mut self) -> Result<String, ParseError> {
        let Some(open) = self.peek() else {
            return Err(self.error("expected string"));
        };
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == open {
                return Ok(out);
            }
            if c == '\\' {
                let Some(next) = self.peek() else {
                    break;
                };
                self.pos += 1;
                out.push(match next {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
                continue;
            }
            out.push(c);
        }
        Err(self.error("unterminated string"))
    }

    fn parse_word(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || "{}()=;,\"'".contains(c) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected value"));
        }
        Ok(self.chars[start..self.pos].iter().map(|(_, c)| *c).collect())
    }
}

/// Bare words become numbers when they look like one, strings otherwise.
fn word_value(word: &str) -> Value {
    if let Ok(int) = word.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = word.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    Value::String(word.to_string())
}
