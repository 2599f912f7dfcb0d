//! Volume encodings used by the price feed.
//!
//! The feed writes volumes either as plain numbers (`"500"`, `"12,500"`) or
//! with a unit suffix (`"1.2K"`, `"3M"`, `"0.8B"`). Both forms are parsed into
//! a [`VolumeToken`] first and resolved through a single function.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit suffix multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeUnit {
    Thousand,
    Million,
    Billion,
}

impl VolumeUnit {
    pub fn factor(&self) -> f64 {
        match self {
            VolumeUnit::Thousand => 1e3,
            VolumeUnit::Million => 1e6,
            VolumeUnit::Billion => 1e9,
        }
    }

    pub fn suffix(&self) -> char {
        match self {
            VolumeUnit::Thousand => 'K',
            VolumeUnit::Million => 'M',
            VolumeUnit::Billion => 'B',
        }
    }

    pub fn from_suffix(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'K' => Some(VolumeUnit::Thousand),
            'M' => Some(VolumeUnit::Million),
            'B' => Some(VolumeUnit::Billion),
            _ => None,
        }
    }

    /// Largest first, for formatting
    const DESCENDING: [VolumeUnit; 3] = [VolumeUnit::Billion, VolumeUnit::Million, VolumeUnit::Thousand];
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// A volume cell after tokenisation, before scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeToken {
    Suffixed(f64, VolumeUnit),
    Plain(f64),
}

impl VolumeToken {
    /// Tokenise a textual volume. Thousands separators are ignored.
    ///
    /// Returns a human readable reason on failure; the caller attaches the
    /// row and field.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return Err("empty volume".to_string());
        }

        let last = cleaned.chars().last().ok_or_else(|| "empty volume".to_string())?;
        if last.is_ascii_alphabetic() {
            let unit = VolumeUnit::from_suffix(last)
                .ok_or_else(|| format!("unknown unit suffix '{}'", last))?;
            let prefix = &cleaned[..cleaned.len() - last.len_utf8()];
            let value = parse_number(prefix)?;
            Ok(VolumeToken::Suffixed(value, unit))
        } else {
            Ok(VolumeToken::Plain(parse_number(&cleaned)?))
        }
    }

    /// Scale the token to an absolute volume
    pub fn resolve(&self) -> f64 {
        match *self {
            VolumeToken::Suffixed(value, unit) => value * unit.factor(),
            VolumeToken::Plain(value) => value,
        }
    }
}

fn parse_number(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not finite", s));
    }
    if value < 0.0 {
        return Err("volume cannot be negative".to_string());
    }
    Ok(value)
}

/// Render a volume with the largest unit that keeps the prefix >= 1.
///
/// Parsing the result with [`VolumeToken::parse`] gives back the same value
/// (up to float rounding of the division).
pub fn format_volume(value: f64) -> String {
    for unit in VolumeUnit::DESCENDING {
        if value.abs() >= unit.factor() {
            return format!("{}{}", value / unit.factor(), unit.suffix());
        }
    }
    format!("{}", value)
}
