//! Session key codec
//!
//! Keys are short numeric identifiers handed out by the key server. A
//! complete key has exactly nine ASCII digits; for display the digits are
//! grouped in threes (`123 456 789`). Grouping also applies to keys that are
//! still being typed, so `1234` is shown as `123 4`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// Number of digits in a complete key
pub const KEY_LENGTH: usize = 9;

/// Digits per display group
const GROUP_SIZE: usize = 3;

/// Check whether `raw` is a complete key
pub fn validate(raw: &str) -> bool {
    raw.len() == KEY_LENGTH && raw.bytes().all(|b| b.is_ascii_digit())
}

/// Insert a space after every third character, without a trailing space
pub fn format(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / GROUP_SIZE);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && i % GROUP_SIZE == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Strip every space inserted by [`format`]
pub fn deformat(formatted: &str) -> String {
    formatted.chars().filter(|c| *c != ' ').collect()
}

/// A validated, complete session key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

impl SessionKey {
    /// Parse a key, accepting the grouped display form as well
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        let raw = deformat(text.trim());
        if let Some(c) = raw.chars().find(|c| !c.is_ascii_digit()) {
            return Err(KeyError::NonDigit(c));
        }
        if raw.len() != KEY_LENGTH {
            return Err(KeyError::WrongLength(raw.len()));
        }
        Ok(Self(raw))
    }

    /// Raw digits
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Grouped display form
    pub fn display(&self) -> String {
        format(&self.0)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}
