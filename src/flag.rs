//! Boolean-ish flag normalization
//!
//! Settings coming from environment-style sources spell booleans in many
//! ways. All of them are normalized here, in one place.

use serde::{de, Deserialize, Deserializer};

/// Spellings accepted as true (compared case-insensitively, trimmed)
pub const TRUTHY: &[&str] = &["true", "yes", "on", "1", "y", "t"];

/// Spellings accepted as false (compared case-insensitively, trimmed)
pub const FALSY: &[&str] = &["false", "no", "off", "0", "n", "f", ""];

/// Parse a textual flag. Returns `None` for values that are not boolean-ish.
pub fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim().to_ascii_lowercase();
    if TRUTHY.contains(&value.as_str()) {
        Some(true)
    } else if FALSY.contains(&value.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// A flag as it may appear in a settings file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Deserialize a boolean-ish setting (for `#[serde(deserialize_with)]`)
pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match RawFlag::deserialize(deserializer)? {
        RawFlag::Bool(b) => Ok(b),
        RawFlag::Int(i) => Ok(i != 0),
        RawFlag::Text(s) => parse_flag(&s)
            .ok_or_else(|| de::Error::custom(format!("{:?} is not a boolean-ish value", s))),
    }
}
