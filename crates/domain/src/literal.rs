//! Decoder for the structured literals devices embed in message payloads.
//!
//! Device firmware serialises `values` with Python literal syntax
//! (`{'values':[{'name':'SHT25', 'type':'float', 'value':21.5}]}`): single
//! or double quoted strings, `True`/`False`/`None`, tuples. JSON is a subset
//! of what this accepts, so well-formed JSON payloads decode too.

use serde_json::{Map, Number, Value};

/// Deepest container nesting accepted, matching `serde_json`'s recursion limit.
const MAX_DEPTH: usize = 128;

/// Why a literal could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} at byte {position}")]
pub struct LiteralError {
    pub position: usize,
    pub reason: &'static str,
}

/// Decode a complete literal into a JSON value.
///
/// # Errors
///
/// Returns [`LiteralError`] on any syntax error or trailing input.
pub fn parse(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        input,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &'static str) -> LiteralError {
        LiteralError {
            position: self.pos,
            reason,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.nested(Self::dict),
            Some(b'[') => self.nested(|parser| parser.sequence(b']').map(Value::Array)),
            Some(b'(') => self.nested(|parser| parser.sequence(b')').map(Value::Array)),
            Some(quote @ (b'\'' | b'"')) => self.string(quote).map(Value::String),
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => self.number(),
            Some(b) if b.is_ascii_alphabetic() => self.keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        container: impl FnOnce(&mut Self) -> Result<Value, LiteralError>,
    ) -> Result<Value, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let value = container(self);
        self.depth -= 1;
        value
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        self.pos += 1;
        let mut map = Map::new();
        loop {
            if self.eat(b'}') {
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(text) => text,
                other => other.to_string(),
            };
            if !self.eat(b':') {
                return Err(self.error("expected ':' after dict key"));
            }
            let value = self.value()?;
            map.insert(key, value);
            if !self.eat(b',') {
                if self.eat(b'}') {
                    return Ok(Value::Object(map));
                }
                return Err(self.error("expected ',' or '}' in dict"));
            }
        }
    }

    fn sequence(&mut self, close: u8) -> Result<Vec<Value>, LiteralError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value()?);
            if !self.eat(b',') {
                if self.eat(close) {
                    return Ok(items);
                }
                return Err(self.error("expected ',' or closing bracket"));
            }
        }
    }

    fn string(&mut self, quote: u8) -> Result<String, LiteralError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            let start = self.pos;
            while self
                .peek()
                .is_some_and(|b| b != quote && b != b'\\')
            {
                self.pos += 1;
            }
            out.push_str(&self.input[start..self.pos]);
            match self.peek() {
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.escape(&mut out)?;
                }
                _ => return Err(self.error("unterminated string")),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let Some(b) = self.peek() else {
            return Err(self.error("unterminated escape"));
        };
        self.pos += 1;
        match b {
            b'n' => out.push('\n'),
            b't' => out.push('\t'),
            b'r' => out.push('\r'),
            b'0' => out.push('\0'),
            b'\\' | b'\'' | b'"' | b'/' => out.push(char::from(b)),
            b'x' => out.push(self.hex_char(2)?),
            b'u' => out.push(self.hex_char(4)?),
            _ => {
                out.push('\\');
                out.push(char::from(b));
            }
        }
        Ok(())
    }

    fn hex_char(&mut self, width: usize) -> Result<char, LiteralError> {
        let digits = self
            .input
            .get(self.pos..self.pos + width)
            .ok_or_else(|| self.error("truncated hex escape"))?;
        let code =
            u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += width;
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => {}
                b'.' | b'e' | b'E' => is_float = true,
                b'-' | b'+' if matches!(self.bytes[self.pos - 1], b'e' | b'E') => {}
                _ => break,
            }
            self.pos += 1;
        }
        let text = self.input[start..self.pos].trim_start_matches('+');
        if !is_float {
            if let Ok(int) = text.parse::<i64>() {
                return Ok(Value::Number(int.into()));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                position: start,
                reason: "invalid number",
            })
    }

    fn keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        match &self.input[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(LiteralError {
                position: start,
                reason: "unknown identifier",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_decode_single_quoted_python_dict() {
        let value =
            parse("{'values':[{'name':'SHT25', 'type':'float', 'value':21.5}]}").unwrap();
        assert_eq!(
            value,
            json!({"values": [{"name": "SHT25", "type": "float", "value": 21.5}]})
        );
    }

    #[test]
    fn should_decode_plain_json() {
        let value = parse(r#"{"a": [1, -2, 3.5e1], "b": null, "c": true}"#).unwrap();
        assert_eq!(value, json!({"a": [1, -2, 35.0], "b": null, "c": true}));
    }

    #[test]
    fn should_decode_python_keywords_and_tuples() {
        let value = parse("(True, False, None)").unwrap();
        assert_eq!(value, json!([true, false, null]));
    }

    #[test]
    fn should_accept_trailing_commas() {
        assert_eq!(parse("[1, 2,]").unwrap(), json!([1, 2]));
        assert_eq!(parse("{'a': 1,}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn should_decode_escapes() {
        assert_eq!(parse(r"'it\'s\n'").unwrap(), json!("it's\n"));
        assert_eq!(parse(r#""é""#).unwrap(), json!("\u{e9}"));
    }

    #[test]
    fn should_stringify_non_string_keys() {
        assert_eq!(parse("{1: 'a'}").unwrap(), json!({"1": "a"}));
    }

    #[test]
    fn should_reject_nested_unescaped_quotes() {
        let raw = "{'values':[{'name':'LEDPanel-Top', 'type':'str', 'value':'{'400-449': 0.0}'}]}";
        assert!(parse(raw).is_err());
    }

    #[test]
    fn should_reject_trailing_garbage() {
        let err = parse("{} x").unwrap_err();
        assert_eq!(err.reason, "unexpected trailing input");
    }

    #[test]
    fn should_reject_deeply_nested_containers() {
        let raw = format!("{}{}", "[".repeat(10_000), "]".repeat(10_000));
        let err = parse(&raw).unwrap_err();
        assert_eq!(err.reason, "nesting too deep");
        assert_eq!(err.position, MAX_DEPTH);

        let dicts = "{'a':".repeat(10_000);
        assert_eq!(parse(&dicts).unwrap_err().reason, "nesting too deep");
    }

    #[test]
    fn should_accept_nesting_up_to_the_limit() {
        let raw = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse(&raw).is_ok());
    }

    #[test]
    fn should_reject_unknown_identifier() {
        assert!(parse("nan").is_err());
    }
}
