//! Fixed-point kilogram display of carbon mass.
//!
//! The ledger stores grams as integers. Reports show kilograms with exactly
//! 3 decimal places, which `rust_decimal` represents without rounding.

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

/// Carbon mass in kilograms with exactly 3 decimal places.
///
/// # Examples
///
/// ```
/// use carbon_ledger::CarbonKg;
///
/// assert_eq!(CarbonKg::from_grams(7000).to_string(), "7.000");
/// assert_eq!(CarbonKg::from_grams(1).to_string(), "0.001");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CarbonKg(Decimal);

impl CarbonKg {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 3;

    /// Converts an integer gram count into kilograms.
    pub fn from_grams(grams: u64) -> Self {
        CarbonKg(Decimal::from_i128_with_scale(i128::from(grams), Self::SCALE))
    }
}

impl fmt::Display for CarbonKg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl Serialize for CarbonKg {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
