use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::codebook::Codebook;
use super::pattern::{glob_match, has_wildcards};
use super::unit::Unit;
use crate::error::{Error, Result};

pub const CODE_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// CodeField – the nine fixed-width parts of a channel code
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeField {
    TestObject,
    Position,
    MainLocation,
    FineLocation1,
    FineLocation2,
    FineLocation3,
    PhysicalDimension,
    Direction,
    FilterClass,
}

impl CodeField {
    pub const ALL: [CodeField; 9] = [
        CodeField::TestObject,
        CodeField::Position,
        CodeField::MainLocation,
        CodeField::FineLocation1,
        CodeField::FineLocation2,
        CodeField::FineLocation3,
        CodeField::PhysicalDimension,
        CodeField::Direction,
        CodeField::FilterClass,
    ];

    /// Byte range of the field inside the 16-character code.
    pub fn range(self) -> std::ops::Range<usize> {
        match self {
            CodeField::TestObject => 0..1,
            CodeField::Position => 1..2,
            CodeField::MainLocation => 2..6,
            CodeField::FineLocation1 => 6..8,
            CodeField::FineLocation2 => 8..10,
            CodeField::FineLocation3 => 10..12,
            CodeField::PhysicalDimension => 12..14,
            CodeField::Direction => 14..15,
            CodeField::FilterClass => 15..16,
        }
    }

    /// Key used by the codebook.
    pub fn key(self) -> &'static str {
        match self {
            CodeField::TestObject => "test_object",
            CodeField::Position => "position",
            CodeField::MainLocation => "main_location",
            CodeField::FineLocation1 => "fine_location_1",
            CodeField::FineLocation2 => "fine_location_2",
            CodeField::FineLocation3 => "fine_location_3",
            CodeField::PhysicalDimension => "physical_dimension",
            CodeField::Direction => "direction",
            CodeField::FilterClass => "filter_class",
        }
    }
}

/// Physical dimension transitions applied by integration, in priority order.
const INTEGRATION: &[(&str, &str)] = &[("AC", "VE"), ("VE", "DS"), ("AA", "AV"), ("AV", "AN")];

/// Physical dimension transitions applied by differentiation, in priority order.
const DIFFERENTIATION: &[(&str, &str)] = &[
    ("DS", "VE"),
    ("DC", "VE"),
    ("VE", "AC"),
    ("AV", "AA"),
    ("AN", "AV"),
];

// ---------------------------------------------------------------------------
// Code – immutable 16-character channel identifier
// ---------------------------------------------------------------------------

/// ISO-MME channel code, e.g. `11HEAD0000H3ACXA`.
///
/// Always exactly 16 ASCII characters, each alphanumeric or the `?` wildcard.
/// Codes are values: every mutation returns a new `Code`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    pub fn new(text: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidCode {
            code: text.to_string(),
            reason: reason.to_string(),
        };
        if text.chars().count() != CODE_LENGTH {
            return Err(invalid("length must be 16 characters"));
        }
        if !text.chars().all(|c| c.is_ascii_alphanumeric() || c == '?') {
            return Err(invalid("only alphanumeric characters and '?' are allowed"));
        }
        Ok(Code(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn field(&self, field: CodeField) -> &str {
        &self.0[field.range()]
    }

    pub fn test_object(&self) -> &str {
        self.field(CodeField::TestObject)
    }

    pub fn position(&self) -> &str {
        self.field(CodeField::Position)
    }

    pub fn main_location(&self) -> &str {
        self.field(CodeField::MainLocation)
    }

    pub fn fine_location_1(&self) -> &str {
        self.field(CodeField::FineLocation1)
    }

    pub fn fine_location_2(&self) -> &str {
        self.field(CodeField::FineLocation2)
    }

    pub fn fine_location_3(&self) -> &str {
        self.field(CodeField::FineLocation3)
    }

    pub fn physical_dimension(&self) -> &str {
        self.field(CodeField::PhysicalDimension)
    }

    pub fn direction(&self) -> &str {
        self.field(CodeField::Direction)
    }

    pub fn filter_class(&self) -> &str {
        self.field(CodeField::FilterClass)
    }

    /// New code with the given fields replaced; all other fields are kept.
    pub fn set(&self, fields: &[(CodeField, &str)]) -> Result<Code> {
        let mut text = self.0.clone();
        for &(field, value) in fields {
            let range = field.range();
            if value.len() != range.len() || !value.is_ascii() {
                return Err(Error::InvalidField {
                    field: field.key(),
                    value: value.to_string(),
                    expected: range.len(),
                });
            }
            text.replace_range(range, value);
        }
        Code::new(&text)
    }

    /// Shorthand for replacing a single field.
    pub fn with(&self, field: CodeField, value: &str) -> Result<Code> {
        self.set(&[(field, value)])
    }

    /// Glob match against `pattern` (`?`, `*`, `[...]`).
    ///
    /// For a plain 16-character pattern the comparison is position-wise and a
    /// `?` on either side matches, so a wildcard code matches the codes it
    /// stands for.
    pub fn matches(&self, pattern: &str) -> bool {
        if pattern.len() == CODE_LENGTH && !pattern.contains(['*', '[']) {
            return self
                .0
                .bytes()
                .zip(pattern.bytes())
                .all(|(a, b)| a == b || a == b'?' || b == b'?');
        }
        glob_match(&self.0, pattern)
    }

    pub fn has_wildcards(&self) -> bool {
        has_wildcards(&self.0)
    }

    pub fn integrate(&self) -> Result<Code> {
        self.transform_dimension(INTEGRATION, "integrate")
    }

    pub fn differentiate(&self) -> Result<Code> {
        self.transform_dimension(DIFFERENTIATION, "differentiate")
    }

    fn transform_dimension(&self, table: &[(&str, &str)], operation: &'static str) -> Result<Code> {
        let current = self.physical_dimension();
        table
            .iter()
            .find(|(from, _)| *from == current)
            .ok_or_else(|| Error::DerivationNotPossible {
                code: self.0.clone(),
                operation,
            })
            .and_then(|(_, to)| self.with(CodeField::PhysicalDimension, to))
    }

    /// Replace every `?` of this code by the character at the same position in `concrete`.
    pub fn resolve_wildcards(&self, concrete: &Code) -> Code {
        Code(
            self.0
                .chars()
                .zip(concrete.0.chars())
                .map(|(own, other)| if own == '?' { other } else { own })
                .collect(),
        )
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_in(Codebook::global())
    }

    pub fn is_valid_in(&self, codebook: &Codebook) -> bool {
        CodeField::ALL
            .iter()
            .all(|&field| codebook.admits(field.key(), self.field(field)))
    }

    /// Codebook description of each field, keyed by the field's display name.
    pub fn get_info(&self) -> Vec<(String, String)> {
        let codebook = Codebook::global();
        CodeField::ALL
            .iter()
            .filter_map(|&field| {
                let element = codebook.element(field.key())?;
                let entry = codebook.lookup(field.key(), self.field(field))?;
                Some((element.name.clone(), entry.description.clone()))
            })
            .collect()
    }

    /// Default unit of the physical dimension, if the codebook defines one.
    pub fn default_unit(&self) -> Option<Unit> {
        Codebook::global()
            .lookup(CodeField::PhysicalDimension.key(), self.physical_dimension())
            .and_then(|entry| entry.default_unit.as_deref())
            .and_then(|symbol| Unit::parse(symbol).ok())
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Code {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Code::new(s)
    }
}

impl TryFrom<String> for Code {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Code::new(&value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
