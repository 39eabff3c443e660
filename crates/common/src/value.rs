//! Value normalization for ordering comparisons
//!
//! Rendered cell text arrives as raw strings (`"1,234"`, `"  Hello "`, `""`).
//! Before two values can be ordered they are normalized into either a finite
//! number or a lowercased, trimmed text value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// European grouped form: `1.234.567` or `1.234,5`
static PERIOD_GROUPED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d{1,3}(\.\d{3}){2,}(,\d+)?$|^[+-]?\d{1,3}(\.\d{3})+,\d+$")
        .expect("period grouping pattern is valid")
});

/// A raw token converted to a comparable form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NormalizedValue {
    /// Finite numeric value
    Number(f64),
    /// Trimmed, lowercased text
    Text(String),
}

/// Caller-supplied type hint for a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Numeric when the token parses as a number, text otherwise
    #[default]
    Auto,
    /// Parse as a number, falling back to text when that fails
    Number,
    /// Always text, even for numeric-looking codes such as `007`
    Text,
}

impl NormalizedValue {
    pub fn is_number(&self) -> bool {
        matches!(self, NormalizedValue::Number(_))
    }

    /// True for text values that are empty after trimming
    pub fn is_blank(&self) -> bool {
        matches!(self, NormalizedValue::Text(t) if t.is_empty())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            NormalizedValue::Number(n) => Some(*n),
            NormalizedValue::Text(_) => None,
        }
    }

    /// Textual form used by mixed comparisons
    pub fn as_text(&self) -> String {
        match self {
            NormalizedValue::Number(n) => n.to_string(),
            NormalizedValue::Text(t) => t.clone(),
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedValue::Number(n) => write!(f, "{}", n),
            NormalizedValue::Text(t) => write!(f, "{}", t),
        }
    }
}

/// Normalize a raw token, guessing its kind
///
/// Never fails: anything that does not parse as a finite number becomes
/// lowercased text, and empty input becomes `Text("")`.
pub fn normalize(raw: &str) -> NormalizedValue {
    normalize_as(raw, FieldKind::Auto)
}

/// Normalize a raw token using a caller-supplied type hint
pub fn normalize_as(raw: &str, kind: FieldKind) -> NormalizedValue {
    let trimmed = raw.trim();

    if kind != FieldKind::Text {
        if let Some(n) = parse_number(trimmed) {
            return NormalizedValue::Number(n);
        }
    }

    NormalizedValue::Text(trimmed.to_lowercase())
}

/// Parse a trimmed token as a finite number, stripping grouping separators
pub fn parse_number(trimmed: &str) -> Option<f64> {
    if trimmed.is_empty() {
        return None;
    }

    let cleaned = if PERIOD_GROUPED.is_match(trimmed) {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.replace(',', "")
    };

    // Rust accepts "inf" and "nan" spellings; only plain numerals count
    if !cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}
