//! Cultures used when converting request values.
//!
//! Query-string and route-data values are parsed with the invariant culture so
//! that URLs read the same everywhere. Form posts are parsed with the request
//! culture, so `1.234,5` posted from a German locale binds as `1234.5`.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer};

/// Number formatting rules for one culture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Culture {
    name: String,
    decimal_separator: char,
    group_separator: char,
}

static KNOWN_CULTURES: Lazy<HashMap<&'static str, (char, char)>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for name in ["en-US", "en-GB", "en-AU", "en-CA", "ja-JP", "zh-CN", "ko-KR", "he-IL"] {
        map.insert(name, ('.', ','));
    }
    for name in [
        "de-DE", "de-AT", "es-ES", "it-IT", "pt-BR", "nl-NL", "tr-TR", "da-DK", "id-ID",
    ] {
        map.insert(name, (',', '.'));
    }
    for name in ["fr-FR", "ru-RU", "sv-SE", "pl-PL", "cs-CZ", "fi-FI", "nb-NO", "uk-UA"] {
        map.insert(name, (',', '\u{a0}'));
    }
    map.insert("de-CH", ('.', '\''));
    map
});

impl Culture {
    /// Create a culture with explicit separators.
    pub fn new(name: impl Into<String>, decimal_separator: char, group_separator: char) -> Self {
        Self {
            name: name.into(),
            decimal_separator,
            group_separator,
        }
    }

    /// The invariant culture (`.` decimal separator, `,` group separator).
    pub fn invariant() -> Self {
        Self::new("", '.', ',')
    }

    /// Look up a culture by its `language-REGION` name (case-insensitive).
    ///
    /// The empty string and `"invariant"` return the invariant culture.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.is_empty() || name.eq_ignore_ascii_case("invariant") {
            return Some(Self::invariant());
        }
        KNOWN_CULTURES
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(known, (dec, group))| Self::new(*known, *dec, *group))
    }

    /// The culture name; empty for the invariant culture.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true for the invariant culture.
    pub fn is_invariant(&self) -> bool {
        self.name.is_empty()
    }

    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    pub fn group_separator(&self) -> char {
        self.group_separator
    }

    /// Parse an integer. Group separators are not accepted.
    pub fn parse_integer(&self, input: &str) -> Option<i128> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if digits.is_empty() || digits.starts_with('+') {
            return None;
        }
        digits.parse::<i128>().ok()
    }

    /// Parse a floating point number using this culture's separators.
    pub fn parse_float(&self, input: &str) -> Option<f64> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut normalized = String::with_capacity(trimmed.len());
        for c in trimmed.chars() {
            if self.is_group_char(c) {
                continue;
            }
            if c == self.decimal_separator {
                normalized.push('.');
            } else if c.is_ascii_digit() || matches!(c, '+' | '-' | 'e' | 'E') {
                normalized.push(c);
            } else {
                return None;
            }
        }

        normalized.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    fn is_group_char(&self, c: char) -> bool {
        if c == self.decimal_separator {
            return false;
        }
        if self.group_separator.is_whitespace() {
            c.is_whitespace()
        } else {
            c == self.group_separator
        }
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invariant() {
            write!(f, "invariant")
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl<'de> Deserialize<'de> for Culture {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Culture::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown culture '{}'", name)))
    }
}
