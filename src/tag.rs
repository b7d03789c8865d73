//! Observe tags used for filtered delivery.
//!
//! A tag is either text or a number. Tags compare by their string key, so the
//! number `1` and the text `"1"` are the same tag.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A filter tag declared by a subscriber or requested by a trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObserveTag {
    /// Integer tag.
    Int(i64),
    /// Floating point tag.
    Float(f64),
    /// Text tag.
    Text(String),
}

impl ObserveTag {
    /// The string key this tag compares by.
    ///
    /// Integral floats render without a fractional part (`2.0` keys as `"2"`).
    #[must_use]
    pub fn key(&self) -> Cow<'_, str> {
        match self {
            Self::Int(v) => Cow::Owned(v.to_string()),
            Self::Float(v) => Cow::Owned(float_key(*v)),
            Self::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

fn float_key(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    if v.fract() == 0.0 && v.abs() < 1e21 {
        return format!("{v:.0}");
    }
    v.to_string()
}

impl PartialEq for ObserveTag {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ObserveTag {}

impl Hash for ObserveTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for ObserveTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<&str> for ObserveTag {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ObserveTag {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i32> for ObserveTag {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for ObserveTag {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for ObserveTag {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for ObserveTag {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Self::Int(i),
            // Out of i64 range: same key text, kept verbatim.
            Err(_) => Self::Text(v.to_string()),
        }
    }
}

impl From<usize> for ObserveTag {
    fn from(v: usize) -> Self {
        Self::from(v as u64)
    }
}

impl From<f64> for ObserveTag {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for ObserveTag {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}
