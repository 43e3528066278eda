//! Field paths into schema-less records
//!
//! A template addresses record fields with dotted/bracket paths such as
//! `site[0].alerts`, `vulnerability.identifiers[2].value` or
//! `meta["scanner.name"]`. Paths are parsed once into segments and then
//! evaluated against `serde_json::Value` trees. Evaluation never fails:
//! a missing intermediate segment simply yields `None`.
//!
//! The empty path addresses the record itself.

use serde_json::Value;
use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};
use thiserror::Error;

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key (also accepted as an index on arrays when numeric)
    Key(String),
    /// Array index written as `[n]` (also accepted as a key on objects)
    Index(usize),
}

/// Path parse errors; positions are byte offsets into the raw path
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path segment at offset {0}")]
    EmptySegment(usize),

    #[error("unterminated '[' opened at offset {0}")]
    UnterminatedBracket(usize),

    #[error("unterminated quote in bracket opened at offset {0}")]
    UnterminatedQuote(usize),

    #[error("unexpected '{0}' at offset {1}")]
    UnexpectedChar(char, usize),
}

/// Parsed field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Path addressing the whole record
    pub fn root() -> Self {
        Self {
            raw: String::new(),
            segments: Vec::new(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        let mut chars = raw.char_indices().peekable();
        let mut key = String::new();
        let mut after_bracket = false;

        while let Some((pos, c)) = chars.next() {
            match c {
                '.' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    } else if !after_bracket {
                        return Err(PathError::EmptySegment(pos));
                    }
                    if chars.peek().is_none() {
                        return Err(PathError::EmptySegment(pos + 1));
                    }
                    after_bracket = false;
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    segments.push(parse_bracket(pos, &mut chars)?);
                    after_bracket = true;
                }
                ']' => return Err(PathError::UnexpectedChar(c, pos)),
                _ => {
                    if after_bracket {
                        return Err(PathError::UnexpectedChar(c, pos));
                    }
                    key.push(c);
                }
            }
        }

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve the path against a record
    pub fn get<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(record, |current, segment| step(current, segment))
    }

    /// Resolve the path for in-place modification
    pub fn get_mut<'a>(&self, record: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = record;
        for segment in &self.segments {
            current = step_mut(current, segment)?;
        }
        Some(current)
    }
}

/// Resolve `path` on `record`; a path that does not parse resolves to nothing
pub fn get<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    FieldPath::parse(path).ok()?.get(record)
}

fn parse_bracket(open: usize, chars: &mut Peekable<CharIndices<'_>>) -> Result<Segment, PathError> {
    let quote = match chars.peek() {
        Some(&(_, q)) if q == '\'' || q == '"' => {
            chars.next();
            Some(q)
        }
        _ => None,
    };

    let mut inner = String::new();

    if let Some(q) = quote {
        loop {
            match chars.next() {
                Some((_, '\\')) => match chars.next() {
                    Some((_, escaped)) => inner.push(escaped),
                    None => return Err(PathError::UnterminatedQuote(open)),
                },
                Some((_, c)) if c == q => break,
                Some((_, c)) => inner.push(c),
                None => return Err(PathError::UnterminatedQuote(open)),
            }
        }
        return match chars.next() {
            Some((_, ']')) => Ok(Segment::Key(inner)),
            Some((pos, c)) => Err(PathError::UnexpectedChar(c, pos)),
            None => Err(PathError::UnterminatedBracket(open)),
        };
    }

    loop {
        match chars.next() {
            Some((_, ']')) => break,
            Some((pos, '[')) => return Err(PathError::UnexpectedChar('[', pos)),
            Some((_, c)) => inner.push(c),
            None => return Err(PathError::UnterminatedBracket(open)),
        }
    }

    let inner = inner.trim();
    if inner.is_empty() {
        return Err(PathError::EmptySegment(open + 1));
    }

    Ok(match inner.parse::<usize>() {
        Ok(index) => Segment::Index(index),
        Err(_) => Segment::Key(inner.to_string()),
    })
}

fn step<'a>(current: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (current, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        (Value::Array(items), Segment::Key(key)) => items.get(key.parse::<usize>().ok()?),
        _ => None,
    }
}

fn step_mut<'a>(current: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (current, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get_mut(key),
        (Value::Object(map), Segment::Index(index)) => map.get_mut(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get_mut(*index),
        (Value::Array(items), Segment::Key(key)) => items.get_mut(key.parse::<usize>().ok()?),
        _ => None,
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
