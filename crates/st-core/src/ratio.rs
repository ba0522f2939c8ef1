//! Fixed-point time usage ratios.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};

/// Divides `numerator` by `denominator`, rounding half to even.
///
/// `denominator` must be non-zero.
pub(crate) const fn round_half_even(numerator: i64, denominator: i64) -> i64 {
    let (numerator, denominator) = if denominator < 0 {
        (-numerator, -denominator)
    } else {
        (numerator, denominator)
    };
    let quotient = numerator.div_euclid(denominator);
    let twice_remainder = 2 * numerator.rem_euclid(denominator);
    if twice_remainder < denominator {
        quotient
    } else if twice_remainder > denominator || quotient % 2 != 0 {
        quotient + 1
    } else {
        quotient
    }
}

/// A ratio with four decimal places, held as a count of ten-thousandths.
///
/// `Ratio::of(1, 3)` is `0.3333`; a zero denominator yields `0` rather than an
/// error. Nothing here clamps the value: a ratio above one is representable,
/// and the store rejects it for the rows that must stay within \[0, 1\].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ratio(i64);

impl Ratio {
    /// Ten-thousandths per unit.
    pub const SCALE: i64 = 10_000;

    /// 0.0000
    pub const ZERO: Self = Self(0);

    /// Computes `numerator / denominator`, quantized half-to-even.
    pub const fn of(numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self::ZERO;
        }
        Self(round_half_even(numerator * Self::SCALE, denominator))
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Percentage rounded half-to-even to `decimals` places (at most 2).
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(self, decimals: u32) -> f64 {
        let decimals = decimals.min(2);
        let divisor = 10_i64.pow(2 - decimals);
        let scaled = round_half_even(self.0, divisor);
        scaled as f64 / 10_i64.pow(decimals) as f64
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let scale = Self::SCALE.unsigned_abs();
        write!(f, "{sign}{}.{:04}", magnitude / scale, magnitude % scale)
    }
}

impl Serialize for Ratio {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_f64().serialize(serializer)
    }
}

impl ToSql for Ratio {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Ratio {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_half_even_ties() {
        assert_eq!(round_half_even(1, 2), 0);
        assert_eq!(round_half_even(3, 2), 2);
        assert_eq!(round_half_even(5, 2), 2);
        assert_eq!(round_half_even(7, 3), 2);
        assert_eq!(round_half_even(8, 3), 3);
        assert_eq!(round_half_even(-1, 2), 0);
        assert_eq!(round_half_even(-3, 2), -2);
    }

    #[test]
    fn ratio_of_quantizes_to_four_places() {
        assert_eq!(Ratio::of(1, 3).0, 3333);
        assert_eq!(Ratio::of(2, 3).0, 6667);
        assert_eq!(Ratio::of(3600, 21600).0, 1667);
        assert_eq!(Ratio::of(7200, 7200), Ratio(Ratio::SCALE));
    }

    #[test]
    fn ratio_of_zero_denominator_is_zero() {
        assert_eq!(Ratio::of(0, 0), Ratio::ZERO);
        assert_eq!(Ratio::of(5400, 0), Ratio::ZERO);
    }

    #[test]
    fn ratio_of_half_tie_goes_to_even() {
        // 1 / 20000 = 0.00005 -> 0.0000, 3 / 20000 = 0.00015 -> 0.0002
        assert_eq!(Ratio::of(1, 20_000).0, 0);
        assert_eq!(Ratio::of(3, 20_000).0, 2);
    }

    #[test]
    fn ratio_display() {
        assert_eq!(Ratio::of(1, 3).to_string(), "0.3333");
        assert_eq!(Ratio(Ratio::SCALE).to_string(), "1.0000");
        assert_eq!(Ratio::ZERO.to_string(), "0.0000");
        assert_eq!(Ratio::of(-1, 400).to_string(), "-0.0025");
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "exact equality intended for quantized values"
    )]
    fn ratio_percent() {
        let ratio = Ratio::of(1, 3);
        assert_eq!(ratio.percent(2), 33.33);
        assert_eq!(ratio.percent(1), 33.3);
        assert_eq!(Ratio(Ratio::SCALE).percent(1), 100.0);
    }

    #[test]
    fn ratio_serializes_as_number() {
        let json = serde_json::to_string(&Ratio::of(1, 4)).unwrap();
        assert_eq!(json, "0.25");
    }
}
