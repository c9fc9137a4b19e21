//! Typed tag values and raw-input normalization
//!
//! Every raw string a user submits is turned into a [`TagValue`] exactly once,
//! through [`TagValue::normalize`]. Nothing downstream re-interprets text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole input must be ASCII digits
static INTEGER_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[0-9]+$"));

/// Text representation of a removed tag in summaries
pub const ABSENT_REPR: &str = "removed";

/// Value of a single tag set by a single user
///
/// Serialized untagged: booleans, integers and strings map to the matching
/// JSON scalar and `Absent` maps to `null`, so a persisted tag map reads as
/// `{"damage": true, "floors": 2, "notes": "leaning pole", "flooded": null}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Boolean(bool),
    Integer(i64),
    /// Free-form text; never compared for consensus
    Text(String),
    /// Tombstone written by a removal
    Absent,
}

/// Which literals are read as booleans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanLiterals {
    /// "true" and "false", any case
    #[default]
    TrueAndFalse,
    /// Only "true", any case; "false" stays text.
    ///
    /// Matches data collected by the earlier tagging tool, whose literal check
    /// never recognised "false".
    TrueOnly,
}

impl TagValue {
    /// Normalize raw user input
    ///
    /// 1. "true" / "false" (case-insensitive) → `Boolean`
    /// 2. one or more ASCII digits and nothing else → `Integer`
    /// 3. anything else → `Text`, unchanged
    ///
    /// Digit strings too large for `i64` stay `Text`. Never fails.
    pub fn normalize(raw: &str) -> Self {
        Self::normalize_with(raw, BooleanLiterals::TrueAndFalse)
    }

    /// Normalize raw user input with an explicit boolean literal set
    pub fn normalize_with(raw: &str, literals: BooleanLiterals) -> Self {
        if raw.eq_ignore_ascii_case("true") {
            return TagValue::Boolean(true);
        }

        if literals == BooleanLiterals::TrueAndFalse && raw.eq_ignore_ascii_case("false") {
            return TagValue::Boolean(false);
        }

        if is_integer_literal(raw) {
            if let Ok(n) = raw.parse::<i64>() {
                return TagValue::Integer(n);
            }
        }

        TagValue::Text(raw.to_string())
    }

    /// Whether this value is free text (excluded from consensus)
    pub fn is_text(&self) -> bool {
        matches!(self, TagValue::Text(_))
    }

    /// Whether this value is a removal tombstone
    pub fn is_absent(&self) -> bool {
        matches!(self, TagValue::Absent)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TagValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            TagValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the variant, for logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            TagValue::Boolean(_) => "boolean",
            TagValue::Integer(_) => "integer",
            TagValue::Text(_) => "text",
            TagValue::Absent => "absent",
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Boolean(b) => write!(f, "{}", b),
            TagValue::Integer(n) => write!(f, "{}", n),
            TagValue::Text(s) => f.write_str(s),
            TagValue::Absent => f.write_str(ABSENT_REPR),
        }
    }
}

fn is_integer_literal(raw: &str) -> bool {
    match INTEGER_PATTERN.as_ref() {
        Ok(re) => re.is_match(raw),
        Err(_) => false,
    }
}
