//! Session information: per-participant bad-channel lists.
//!
//! The session file is a literal mapping written by hand during recording:
//!
//! ```text
//! {
//!     "Group1": {"bad_channels": ["T7"]},
//!     'Group5': {'bad_channels': []},   # nothing noted
//! }
//! ```
//!
//! It is read with a small literal parser that accepts dicts, lists/tuples,
//! quoted strings, numbers, `True`/`False`/`None`, `#` comments and trailing
//! commas, and rejects everything else.  The parsed tree is a
//! [`serde_json::Value`] which is then deserialized into [`SessionInfo`], so
//! the schema is checked by `serde`.  Nothing in the file is ever executed.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to read session info {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error at line {line}, column {col}: {msg}")]
    Syntax { line: usize, col: usize, msg: String },

    #[error("session info does not match the expected schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("participant {0:?} not found in session info")]
    MissingParticipant(String),
}

/// Recording notes for one participant.
///
/// Only `bad_channels` is required; other keys in the record are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ParticipantSession {
    pub bad_channels: Vec<String>,
}

/// All participants' session notes, keyed by participant id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SessionInfo {
    participants: BTreeMap<String, ParticipantSession>,
}

impl SessionInfo {
    /// Read and parse a session file.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let text = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse the text of a session file.
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let value = parse_literal(text)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn get(&self, participant: &str) -> Result<&ParticipantSession, SessionError> {
        self.participants
            .get(participant)
            .ok_or_else(|| SessionError::MissingParticipant(participant.to_string()))
    }

    /// Bad channels noted for `participant`.
    pub fn bad_channels(&self, participant: &str) -> Result<&[String], SessionError> {
        Ok(&self.get(participant)?.bad_channels)
    }

    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.participants.keys().map(String::as_str)
    }
}

// ── Literal parser ────────────────────────────────────────────────────────

/// Deepest bracket nesting accepted; a session file needs three levels.
const MAX_DEPTH: usize = 64;

/// Parse a literal expression into a JSON value.
pub fn parse_literal(text: &str) -> Result<Value, SessionError> {
    let mut p = Parser { chars: text.chars().collect(), pos: 0, depth: 0 };
    let value = p.value()?;
    p.skip_ws();
    if p.pos < p.chars.len() {
        return Err(p.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn error(&self, msg: impl Into<String>) -> SessionError {
        let consumed = &self.chars[..self.pos.min(self.chars.len())];
        let line = consumed.iter().filter(|&&c| c == '\n').count() + 1;
        let col = consumed.iter().rev().take_while(|&&c| c != '\n').count() + 1;
        SessionError::Syntax { line, col, msg: msg.into() }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<(), SessionError> {
        self.skip_ws();
        if self.peek() == Some(want) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{want}'")))
        }
    }

    fn value(&mut self) -> Result<Value, SessionError> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.nested(Self::dict),
            Some('[') => self.nested(|p| p.sequence('[', ']')),
            Some('(') => self.nested(|p| p.sequence('(', ')')),
            Some('"') | Some('\'') => Ok(Value::String(self.string()?)),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Value, SessionError>,
    ) -> Result<Value, SessionError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn dict(&mut self) -> Result<Value, SessionError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.peek() {
                Some('"') | Some('\'') => self.string()?,
                _ => return Err(self.error("dictionary keys must be strings")),
            };
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Value, SessionError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => return Err(self.error(format!("expected ',' or '{close}'"))),
            }
        }
    }

    fn string(&mut self) -> Result<String, SessionError> {
        let quote = self.peek().ok_or_else(|| self.error("expected string"))?;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let c = self.peek().ok_or_else(|| self.error("unterminated string"))?;
            self.pos += 1;
            match c {
                '\n' => return Err(self.error("newline in string literal")),
                '\\' => {
                    let esc = self.peek().ok_or_else(|| self.error("unterminated escape"))?;
                    self.pos += 1;
                    out.push(match esc {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        '\\' | '\'' | '"' => esc,
                        other => return Err(self.error(format!("unsupported escape \\{other}"))),
                    });
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Value, SessionError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let token: String = self.chars[start..self.pos].iter().filter(|&&c| c != '_').collect();
        if let Ok(i) = token.parse::<i64>() {
            return Ok(Value::Number(i.into()));
        }
        token
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error(format!("invalid number {token:?}")))
    }

    fn keyword(&mut self) -> Result<Value, SessionError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error(format!("names are not allowed in session info: {word:?}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_quotes_comments_and_trailing_commas() {
        let text = r#"
            {
                "Group1": {"bad_channels": ["T7", 'P8']},  # noisy temporal
                'Group5': {'bad_channels': [], "note": "fine"},
            }
        "#;
        let info = SessionInfo::parse(text).unwrap();
        assert_eq!(info.bad_channels("Group1").unwrap(), ["T7", "P8"]);
        assert!(info.bad_channels("Group5").unwrap().is_empty());
        assert_eq!(info.participants().collect::<Vec<_>>(), ["Group1", "Group5"]);
    }

    #[test]
    fn missing_participant_is_an_error() {
        let info = SessionInfo::parse(r#"{"Group1": {"bad_channels": []}}"#).unwrap();
        assert!(matches!(
            info.bad_channels("Group6"),
            Err(SessionError::MissingParticipant(p)) if p == "Group6"
        ));
    }

    #[test]
    fn code_is_rejected() {
        let err = SessionInfo::parse("__import__('os').system('true')").unwrap_err();
        assert!(matches!(err, SessionError::Syntax { line: 1, col: 1, .. }), "{err}");
    }

    #[test]
    fn schema_violation_is_reported() {
        let err = SessionInfo::parse(r#"{"Group1": {"bads": ["T7"]}}"#).unwrap_err();
        assert!(matches!(err, SessionError::Schema(_)), "{err}");
    }

    #[test]
    fn syntax_error_position() {
        let err = parse_literal("{\n  'a': [1, 2\n}").unwrap_err();
        match err {
            SessionError::Syntax { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        for open in ["[", "(", "{'a': "] {
            let text = open.repeat(100_000);
            let err = parse_literal(&text).unwrap_err();
            match err {
                SessionError::Syntax { msg, .. } => assert!(msg.contains("nesting"), "{msg}"),
                other => panic!("unexpected error {other}"),
            }
        }
        let ok = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&ok).is_ok());
    }

    #[test]
    fn literal_scalars() {
        let v = parse_literal("(1, -2.5, True, None, 'x\\'y')").unwrap();
        assert_eq!(v, serde_json::json!([1, -2.5, true, null, "x'y"]));
    }
}
