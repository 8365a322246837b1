//! Weight units and the single conversion helper shared by every calculation.
//!
//! Values are always stored in the unit they were entered in. Conversion
//! happens at aggregation time through [`convert`] and rounding only happens
//! when a value is formatted for display.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kilograms in one pound.
pub const KG_PER_LB: f64 = 0.453_592;
/// Pounds in one kilogram.
pub const LBS_PER_KG: f64 = 2.204_62;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    /// Multiplier that converts a value in `self` into `target`.
    pub fn factor_to(self, target: WeightUnit) -> f64 {
        match (self, target) {
            (WeightUnit::Kg, WeightUnit::Lbs) => LBS_PER_KG,
            (WeightUnit::Lbs, WeightUnit::Kg) => KG_PER_LB,
            _ => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" | "kgs" => Ok(WeightUnit::Kg),
            "lb" | "lbs" => Ok(WeightUnit::Lbs),
            other => Err(format!("unknown weight unit: {other}")),
        }
    }
}

/// Convert `value` recorded in `from` into `to`.
pub fn convert(value: f64, from: WeightUnit, to: WeightUnit) -> f64 {
    value * from.factor_to(to)
}

/// Normalize a value to kilograms.
pub fn to_kg(value: f64, unit: WeightUnit) -> f64 {
    convert(value, unit, WeightUnit::Kg)
}

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").expect("valid number regex")
});

/// Parse the numeric prefix of a user entered weight.
///
/// Trailing text is ignored (`"82.5kg"` parses as `82.5`). Returns `None`
/// for empty input, input without a numeric prefix and non-finite values.
pub fn parse_weight(raw: &str) -> Option<f64> {
    let caps = LEADING_NUMBER.captures(raw)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a stored weight string and normalize it to kilograms.
pub fn parse_weight_kg(raw: &str, unit: WeightUnit) -> Option<f64> {
    parse_weight(raw).map(|w| to_kg(w, unit))
}

/// Format a weight for display in `display` with one decimal.
pub fn format_weight(value: f64, original: WeightUnit, display: WeightUnit) -> String {
    format!("{:.1}", convert(value, original, display))
}
