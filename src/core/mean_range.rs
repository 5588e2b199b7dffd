//! Parsers for the `123 +/- 4.5` statistic fields found in summary reports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MeanRangeError {
    #[error("Summary.htm file format changed: unexpected value {0:?}")]
    FormatChanged(String),
}

/// What an `unknown` cell decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownValue {
    /// Older reports stored zero
    Zero,
    /// Current reports store NaN
    #[default]
    NaN,
}

/// A mean with its standard deviation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeanRange {
    pub mean: f64,
    pub deviation: f64,
}

impl MeanRange {
    #[must_use]
    pub fn new(mean: f64, deviation: f64) -> Self {
        Self { mean, deviation }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }
}

/// NaN compares equal to NaN so parsed reports survive a round trip
impl PartialEq for MeanRange {
    fn eq(&self, other: &Self) -> bool {
        float_eq(self.mean, other.mean) && float_eq(self.deviation, other.deviation)
    }
}

/// A summary statistic: either a mean/deviation pair or a bare number
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Range(MeanRange),
    Single(f64),
}

impl SummaryValue {
    #[must_use]
    pub fn mean(&self) -> f64 {
        match self {
            Self::Range(r) => r.mean,
            Self::Single(v) => *v,
        }
    }

    #[must_use]
    pub fn deviation(&self) -> Option<f64> {
        match self {
            Self::Range(r) => Some(r.deviation),
            Self::Single(_) => None,
        }
    }
}

/// `mean +/- deviation` or the bare number, as printed in `Summary.htm`
impl std::fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Range(r) => write!(f, "{} +/- {}", format_number(r.mean), format_number(r.deviation)),
            Self::Single(v) => f.write_str(&format_number(*v)),
        }
    }
}

impl From<MeanRange> for SummaryValue {
    fn from(r: MeanRange) -> Self {
        Self::Range(r)
    }
}

/// Compare floats with a relative tolerance, treating NaN as equal to NaN
#[must_use]
pub fn float_eq(a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= scale * 1e-9
}

/// Parse an integer, falling back to floating point.
///
/// Returns `None` when the text is neither.
#[must_use]
pub fn to_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        #[allow(clippy::cast_precision_loss)]
        return Some(i as f64);
    }
    text.parse::<f64>().ok()
}

/// Parse a `mean +/- deviation` cell, mapping `unknown` to NaN.
///
/// # Errors
///
/// Returns `MeanRangeError::FormatChanged` for any shape other than
/// `unknown`, `+/-`, a single number, or `<number> +/- <number>`.
pub fn parse_mean_range(text: &str) -> Result<SummaryValue, MeanRangeError> {
    parse_mean_range_with(text, UnknownValue::NaN)
}

/// Parse a `mean +/- deviation` cell with an explicit `unknown` policy.
///
/// # Errors
///
/// See [`parse_mean_range`].
pub fn parse_mean_range_with(
    text: &str,
    unknown: UnknownValue,
) -> Result<SummaryValue, MeanRangeError> {
    let changed = || MeanRangeError::FormatChanged(text.to_string());
    let trimmed = text.trim();

    if trimmed == "unknown" {
        return Ok(SummaryValue::Range(match unknown {
            UnknownValue::Zero => MeanRange::new(0.0, 0.0),
            UnknownValue::NaN => MeanRange::unknown(),
        }));
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    match fields.as_slice() {
        ["+/-"] => Ok(SummaryValue::Range(MeanRange::unknown())),
        [single] => to_number(single).map(SummaryValue::Single).ok_or_else(changed),
        [mean, "+/-", deviation] => {
            let mean = to_number(mean).ok_or_else(changed)?;
            let deviation = to_number(deviation).ok_or_else(changed)?;
            Ok(SummaryValue::Range(MeanRange::new(mean, deviation)))
        }
        _ => Err(changed()),
    }
}

/// Format a float the way it was most likely written: integers without a
/// fractional part, NaN as `NaN`.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value}")
    }
}
