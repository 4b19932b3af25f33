//! Named field sets and their canonical text form.
//!
//! A [`Structure`] is a name plus an ordered list of typed fields. It is the
//! wire representation of caps entries and event payloads:
//!
//! ```text
//! video/x-raw, format=(string)I420, width=(int)320, framerate=(fraction)30/1
//! ```
//!
//! # Example
//!
//! ```
//! use gdp_protocol::types::{Structure, Value};
//!
//! let s = Structure::new("test/x-data")
//!     .field("width", Value::Int(320))
//!     .field("label", Value::String("two words".into()));
//! let text = s.to_string();
//! assert_eq!(text, r#"test/x-data, width=(int)320, label=(string)"two words""#);
//!
//! let parsed: Structure = text.parse().unwrap();
//! assert_eq!(parsed, s);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{GdpError, Result};

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    UInt(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Boolean(bool),
    String(String),
    Fraction(i32, i32),
}

impl Value {
    /// Canonical type name used in the text form.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Int64(_) => "int64",
            Value::UInt64(_) => "uint64",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Fraction(..) => "fraction",
        }
    }

    /// Integer view of any integral value.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v as i64),
            Value::UInt(v) => Some(v as i64),
            Value::Int64(v) => Some(v),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Unsigned view of any non-negative integral value.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(v) => u64::try_from(v).ok(),
            Value::UInt(v) => Some(v as u64),
            Value::Int64(v) => u64::try_from(v).ok(),
            Value::UInt64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    fn parse_typed(type_name: &str, raw: &str, quoted: bool) -> Option<Value> {
        if quoted {
            return match type_name {
                "string" | "s" | "str" => Some(Value::String(raw.to_string())),
                _ => None,
            };
        }
        match type_name {
            "int" | "i" => raw.parse().ok().map(Value::Int),
            "uint" | "u" => raw.parse().ok().map(Value::UInt),
            "int64" => raw.parse().ok().map(Value::Int64),
            "uint64" => raw.parse().ok().map(Value::UInt64),
            "double" | "d" | "float" | "f" => raw.parse().ok().map(Value::Double),
            "boolean" | "bool" | "b" => parse_bool(raw).map(Value::Boolean),
            "string" | "str" | "s" => Some(Value::String(raw.to_string())),
            "fraction" => parse_fraction(raw),
            _ => None,
        }
    }

    fn infer(raw: &str) -> Value {
        if let Ok(v) = raw.parse::<i32>() {
            return Value::Int(v);
        }
        if let Ok(v) = raw.parse::<i64>() {
            return Value::Int64(v);
        }
        if raw.contains('/') {
            if let Some(f) = parse_fraction(raw) {
                return f;
            }
        }
        if raw.contains(['.', 'e', 'E']) {
            if let Ok(v) = raw.parse::<f64>() {
                return Value::Double(v);
            }
        }
        match raw {
            "true" | "false" => Value::Boolean(raw == "true"),
            _ => Value::String(raw.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v:?}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Fraction(n, d) => write!(f, "{n}/{d}"),
            Value::String(s) if is_simple(s) => f.write_str(s),
            Value::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "t" | "1" => Some(true),
        "false" | "no" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn parse_fraction(raw: &str) -> Option<Value> {
    match raw.split_once('/') {
        Some((n, d)) => {
            let d: i32 = d.parse().ok()?;
            if d == 0 {
                return None;
            }
            Some(Value::Fraction(n.parse().ok()?, d))
        }
        None => raw.parse().ok().map(|n| Value::Fraction(n, 1)),
    }
}

#[inline]
fn is_simple_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '/' | ':' | '.')
}

fn is_simple(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_simple_char)
}

fn is_valid_name(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) && s.chars().all(is_simple_char)
}

/// A named, ordered set of typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Structure {
    /// Create an empty structure.
    ///
    /// Structure and field names must start with a letter and contain only
    /// `[A-Za-z0-9_-+/:.]`; see [`validate`](Self::validate).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style `set`.
    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing an existing one in place.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check that every name survives the text form.
    ///
    /// The encoders call this before emitting a packet, so a bad name is
    /// reported to the sender instead of failing the reader.
    pub fn validate(&self) -> Result<()> {
        match std::iter::once(self.name.as_str())
            .chain(self.fields.iter().map(|(n, _)| n.as_str()))
            .find(|name| !is_valid_name(name))
        {
            Some(name) => Err(GdpError::InvalidName(name.to_string())),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (name, value) in &self.fields {
            write!(f, ", {}=({}){}", name, value.type_name(), value)?;
        }
        Ok(())
    }
}

impl FromStr for Structure {
    type Err = GdpError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        let structure = parser.structure()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(GdpError::parse(parser.pos, "trailing characters"));
        }
        Ok(structure)
    }
}

/// Cursor over structure text. Shared with the caps parser.
pub(crate) struct Parser<'a> {
    input: &'a str,
    pub(crate) pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(GdpError::parse(
                self.pos - c.len_utf8(),
                format!("expected '{want}', found '{c}'"),
            )),
            None => Err(GdpError::parse(self.pos, format!("expected '{want}'"))),
        }
    }

    fn take_simple(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_simple_char) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn name(&mut self, what: &str) -> Result<&'a str> {
        let start = self.pos;
        let name = self.take_simple();
        if !is_valid_name(name) {
            return Err(GdpError::parse(start, format!("invalid {what} name")));
        }
        Ok(name)
    }

    fn quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(GdpError::parse(start, "unterminated string"))
    }

    fn value(&mut self) -> Result<Value> {
        let mut type_name = None;
        if self.peek() == Some('(') {
            self.bump();
            self.skip_ws();
            type_name = Some(self.take_simple());
            self.skip_ws();
            self.expect(')')?;
            self.skip_ws();
        }

        let start = self.pos;
        let (raw, quoted) = if self.peek() == Some('"') {
            (self.quoted()?, true)
        } else {
            let raw = self.take_simple();
            if raw.is_empty() {
                return Err(GdpError::parse(start, "missing value"));
            }
            (raw.to_string(), false)
        };

        match type_name {
            Some(t) => Value::parse_typed(t, &raw, quoted)
                .ok_or_else(|| GdpError::parse(start, format!("invalid ({t}) value '{raw}'"))),
            None if quoted => Ok(Value::String(raw)),
            None => Ok(Value::infer(&raw)),
        }
    }

    /// Parse one structure, consuming a terminating `;` if present.
    pub(crate) fn structure(&mut self) -> Result<Structure> {
        self.skip_ws();
        let mut structure = Structure::new(self.name("structure")?);
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Ok(structure),
                Some(';') => {
                    self.bump();
                    return Ok(structure);
                }
                Some(',') => {
                    self.bump();
                }
                Some(c) => {
                    return Err(GdpError::parse(
                        self.pos,
                        format!("expected ',' or ';', found '{c}'"),
                    ))
                }
            }
            self.skip_ws();
            let field = self.name("field")?;
            self.skip_ws();
            self.expect('=')?;
            self.skip_ws();
            let value = self.value()?;
            structure.set(field, value);
        }
    }
}
