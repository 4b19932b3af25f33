//! Stream description ("caps").
//!
//! Text form is `ANY`, `EMPTY`, or structures joined by `"; "`:
//!
//! ```
//! use gdp_protocol::types::{Caps, Structure, Value};
//!
//! let caps = Caps::from_structure(
//!     Structure::new("audio/x-raw").field("rate", Value::Int(48000)),
//! );
//! assert_eq!(caps.to_string(), "audio/x-raw, rate=(int)48000");
//! assert_eq!("ANY".parse::<Caps>().unwrap(), Caps::new_any());
//! ```

use std::fmt;
use std::str::FromStr;

use super::structure::{Parser, Structure};
use crate::error::{GdpError, Result};

/// Description of the media carried by subsequent frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Caps {
    any: bool,
    structures: Vec<Structure>,
}

impl Caps {
    /// Caps compatible with anything.
    pub fn new_any() -> Self {
        Self {
            any: true,
            structures: Vec::new(),
        }
    }

    /// Caps describing nothing; also what an empty caps payload decodes to.
    pub fn new_empty() -> Self {
        Self {
            any: false,
            structures: Vec::new(),
        }
    }

    pub fn from_structure(structure: Structure) -> Self {
        Self {
            any: false,
            structures: vec![structure],
        }
    }

    /// Append a structure. Has no effect on `ANY` caps.
    pub fn push(&mut self, structure: Structure) {
        if !self.any {
            self.structures.push(structure);
        }
    }

    pub fn is_any(&self) -> bool {
        self.any
    }

    pub fn is_empty(&self) -> bool {
        !self.any && self.structures.is_empty()
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn structure(&self, index: usize) -> Option<&Structure> {
        self.structures.get(index)
    }

    /// Check that the text form parses back to these caps.
    pub fn validate(&self) -> Result<()> {
        for s in &self.structures {
            s.validate()?;
            if s.is_empty() && KEYWORDS.contains(&s.name()) {
                return Err(GdpError::InvalidName(s.name().to_string()));
            }
        }
        Ok(())
    }
}

/// Bare words with a meaning of their own in the text form.
const KEYWORDS: [&str; 3] = ["ANY", "EMPTY", "NONE"];

impl From<Structure> for Caps {
    fn from(structure: Structure) -> Self {
        Caps::from_structure(structure)
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.any {
            return f.write_str("ANY");
        }
        if self.structures.is_empty() {
            return f.write_str("EMPTY");
        }
        for (i, s) in self.structures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{s}")?;
        }
        Ok(())
    }
}

impl FromStr for Caps {
    type Err = GdpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "EMPTY" | "NONE" => return Ok(Caps::new_empty()),
            "ANY" => return Ok(Caps::new_any()),
            _ => {}
        }

        let mut caps = Caps::new_empty();
        let mut parser = Parser::new(s);
        loop {
            caps.structures.push(parser.structure()?);
            parser.skip_ws();
            if parser.at_end() {
                return Ok(caps);
            }
        }
    }
}
