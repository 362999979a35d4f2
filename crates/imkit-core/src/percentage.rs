//! Percentage values.
//!
//! [`Percentage`] wraps an `f64` expressed in percent (`50.0` is one half).
//! Most constructors accept any finite value; [`Percentage::ratio`] is the
//! checked form for places that need a share of a whole, such as limiting
//! memory to a share of system RAM.

use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// A value in percent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Percentage(f64);

impl Percentage {
    /// Wraps a percent value without range checks.
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Wraps a percent value that must be a share of a whole: finite and
    /// within `[0, 100]`.
    pub fn ratio(value: f64) -> Result<Self> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(CoreError::invalid_argument(
                "percentage",
                format!("{value} is outside the range 0..=100"),
            ));
        }
        Ok(Self(value))
    }

    /// Builds a percentage from a fraction (`0.25` -> `25%`).
    #[inline]
    pub fn from_fraction(fraction: f64) -> Self {
        Self(fraction * 100.0)
    }

    /// The value in percent.
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// The value as a fraction (`25%` -> `0.25`).
    #[inline]
    pub fn to_fraction(self) -> f64 {
        self.0 / 100.0
    }

    /// Applies the percentage to an integer quantity, truncating.
    pub fn of(self, total: u64) -> u64 {
        (total as f64 * self.to_fraction()) as u64
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for Percentage {
    type Err = CoreError;

    /// Accepts `"50"`, `"50%"` and `"12.5 %"`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        number
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self)
            .ok_or_else(|| CoreError::parse("percentage", s))
    }
}

impl From<f64> for Percentage {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ratio_bounds() {
        assert!(Percentage::ratio(0.0).is_ok());
        assert!(Percentage::ratio(100.0).is_ok());
        assert!(Percentage::ratio(-0.5).is_err());
        assert!(Percentage::ratio(100.5).is_err());
        assert!(Percentage::ratio(f64::NAN).is_err());
        assert!(Percentage::ratio(f64::INFINITY).is_err());
    }

    #[test]
    fn test_fraction_round_trip() {
        let p = Percentage::from_fraction(0.25);
        assert_relative_eq!(p.value(), 25.0);
        assert_relative_eq!(p.to_fraction(), 0.25);
    }

    #[test]
    fn test_of() {
        assert_eq!(Percentage::new(50.0).of(1000), 500);
        assert_eq!(Percentage::new(33.3).of(10), 3);
        assert_eq!(Percentage::new(0.0).of(u64::MAX), 0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("50".parse::<Percentage>().map(Percentage::value), Ok(50.0));
        assert_eq!("12.5 %".parse::<Percentage>().map(Percentage::value), Ok(12.5));
        assert!("half".parse::<Percentage>().is_err());
        assert!("inf%".parse::<Percentage>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Percentage::new(50.0).to_string(), "50%");
        assert_eq!(Percentage::new(12.5).to_string(), "12.5%");
    }
}
