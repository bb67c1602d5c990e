//! Boundary formatting. Percentages and money cross the wire as fixed-precision
//! decimal strings, dates as ISO-8601 month starts.

use crate::metrics::timeseries;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serializer};

pub const PERCENT_DECIMALS: usize = 1;
pub const MONEY_DECIMALS: usize = 2;

/// Round half away from zero at `decimals` places and render with exactly
/// that many digits. Negative zero renders as zero.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let factor = 10f64.powi(decimals as i32);
    let mut rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{rounded:.decimals$}")
}

#[inline]
pub fn percent(value: f64) -> String {
    format_fixed(value, PERCENT_DECIMALS)
}

#[inline]
pub fn money(value: f64) -> String {
    format_fixed(value, MONEY_DECIMALS)
}

pub mod month {
    use super::*;

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&timeseries::to_iso(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        timeseries::parse_month(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid month: {raw}")))
    }
}

pub mod money_str {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&money(*value))
    }
}

pub mod percent_str {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&percent(*value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_precision() {
        assert_eq!(format_fixed(36.3052, 1), "36.3");
        assert_eq!(format_fixed(12.25, 1), "12.3");
        assert_eq!(format_fixed(45.0, 1), "45.0");
        assert_eq!(format_fixed(2.75, 2), "2.75");
        assert_eq!(format_fixed(0.825, 2), "0.83");
        assert_eq!(format_fixed(104.5, 2), "104.50");
    }

    #[test]
    fn test_negative_values_and_zero() {
        assert_eq!(percent(-10.0), "-10.0");
        assert_eq!(percent(-0.04), "0.0");
        assert_eq!(money(0.0), "0.00");
    }
}
