//! # Weight Units and Rounding
//!
//! Conversion between the units a CAS scale can report, and the "round 05 up"
//! quantisation used when presenting a weight with a fixed number of decimals.

use crate::constants::{CAS_UNIT_GRAMS, CAS_UNIT_KILOGRAMS, CAS_UNIT_POUNDS};
use crate::error::{ProtocolViolation, ScaleError};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A weight unit reported by the scale or requested by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum WeightUnit {
    Grams,
    Kilograms,
    Pounds,
}

impl WeightUnit {
    /// Conversion factor relative to grams.
    pub fn factor(self) -> Decimal {
        match self {
            WeightUnit::Grams => Decimal::ONE,
            WeightUnit::Kilograms => Decimal::from(1000),
            // 453.595
            WeightUnit::Pounds => Decimal::new(453_595, 3),
        }
    }

    /// Short label used on the console and in configuration.
    pub fn symbol(self) -> &'static str {
        match self {
            WeightUnit::Grams => "gr",
            WeightUnit::Kilograms => "kg",
            WeightUnit::Pounds => "lb",
        }
    }

    /// Decodes the 2-byte unit field of a response frame.
    pub fn from_code(code: [u8; 2]) -> Result<Self, ProtocolViolation> {
        match code {
            CAS_UNIT_GRAMS => Ok(WeightUnit::Grams),
            CAS_UNIT_KILOGRAMS => Ok(WeightUnit::Kilograms),
            CAS_UNIT_POUNDS => Ok(WeightUnit::Pounds),
            other => Err(ProtocolViolation::UnknownUnitCode(other)),
        }
    }

    /// The 2-byte code the scale sends for this unit.
    pub fn code(self) -> [u8; 2] {
        match self {
            WeightUnit::Grams => CAS_UNIT_GRAMS,
            WeightUnit::Kilograms => CAS_UNIT_KILOGRAMS,
            WeightUnit::Pounds => CAS_UNIT_POUNDS,
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for WeightUnit {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gr" | "g" | "grams" => Ok(WeightUnit::Grams),
            "kg" | "kilograms" => Ok(WeightUnit::Kilograms),
            "lb" | "lbs" | "pounds" => Ok(WeightUnit::Pounds),
            _ => Err(ScaleError::UnknownUnit(s.to_string())),
        }
    }
}

impl TryFrom<String> for WeightUnit {
    type Error = ScaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Converts `weight` expressed in `from` into `to`, without rounding.
pub fn convert(weight: Decimal, from: WeightUnit, to: WeightUnit) -> Decimal {
    if from == to {
        return weight;
    }
    weight * from.factor() / to.factor()
}

/// Most fractional digits a weight can be quantised to.
pub const MAX_DECIMAL_PLACES: u32 = 28;

/// Quantises `value` to `decimal_places` with the "round 05 up" rule.
///
/// The value is truncated toward zero; if anything was discarded and the last
/// kept digit is 0 or 5, the result is instead rounded away from zero. Exact
/// values are only rescaled. `decimal_places` above [`MAX_DECIMAL_PLACES`] is
/// treated as [`MAX_DECIMAL_PLACES`].
pub fn round_05_up(value: Decimal, decimal_places: u32) -> Decimal {
    let decimal_places = decimal_places.min(MAX_DECIMAL_PLACES);
    let mut truncated = value.round_dp_with_strategy(decimal_places, RoundingStrategy::ToZero);
    let inexact = truncated != value;
    truncated.rescale(decimal_places);

    if inexact && matches!((truncated.mantissa() % 10).abs(), 0 | 5) {
        let mut away = value.round_dp_with_strategy(decimal_places, RoundingStrategy::AwayFromZero);
        away.rescale(decimal_places);
        return away;
    }
    truncated
}
