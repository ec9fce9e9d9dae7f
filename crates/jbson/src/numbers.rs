//! Arbitrary-precision decimal numbers.
//!
//! JSON numbers with a fraction or exponent are carried through the event
//! stream as a [`Decimal`]: an unscaled [`BigInt`] plus a decimal scale, so
//! no textual precision is lost between a parser and a generator.

use core::fmt;
use core::str::FromStr;

use num_bigint::BigInt;

/// An exact decimal value `unscaled × 10^(−scale)`.
///
/// `Decimal { unscaled: 314, scale: 2 }` is `3.14`. Equality is
/// representational: `1.0` and `1.00` compare unequal, matching the
/// round-trip guarantees of the event stream (value preserved, literal
/// formatting not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    unscaled: BigInt,
    scale: i64,
}

/// Error produced when a string is not a valid decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal literal")]
pub struct ParseDecimalError;

impl Decimal {
    /// Creates a decimal from its unscaled value and scale.
    #[must_use]
    pub fn new(unscaled: BigInt, scale: i64) -> Self {
        Decimal { unscaled, scale }
    }

    /// The unscaled value.
    #[must_use]
    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    /// The decimal scale; negative scales denote trailing zeros.
    #[must_use]
    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Returns `true` when the value has no fractional digits.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        self.scale <= 0
    }

    /// Exact integer value, when the decimal has no fractional digits.
    #[must_use]
    pub fn to_bigint(&self) -> Option<BigInt> {
        if !self.is_integral() {
            return None;
        }
        let zeros = u32::try_from(-self.scale).ok()?;
        Some(&self.unscaled * BigInt::from(10u32).pow(zeros))
    }

    /// Nearest `f64`, by way of the decimal literal.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse::<f64>().unwrap_or(f64::NAN)
    }

    /// Converts a finite `f64` into the decimal its shortest representation
    /// denotes. Returns `None` for NaN and infinities.
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        // `{}` prints the shortest string that parses back to `value`.
        format!("{value}").parse().ok()
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Parses a JSON number literal such as `-12.30e-4`.
    fn from_str(literal: &str) -> Result<Self, ParseDecimalError> {
        let bytes = literal.as_bytes();
        let (negative, rest) = match bytes.first() {
            Some(b'-') => (true, &bytes[1..]),
            _ => (false, bytes),
        };

        let mut digits = Vec::with_capacity(rest.len());
        let mut scale: i64 = 0;
        let mut seen_point = false;
        let mut i = 0;
        while i < rest.len() {
            match rest[i] {
                b'0'..=b'9' => {
                    digits.push(rest[i]);
                    if seen_point {
                        scale += 1;
                    }
                }
                b'.' if !seen_point => seen_point = true,
                b'e' | b'E' => break,
                _ => return Err(ParseDecimalError),
            }
            i += 1;
        }
        if digits.is_empty() {
            return Err(ParseDecimalError);
        }
        if i < rest.len() {
            // Exponent part: `e` already seen.
            let exp: i64 = core::str::from_utf8(&rest[i + 1..])
                .map_err(|_| ParseDecimalError)?
                .parse()
                .map_err(|_| ParseDecimalError)?;
            scale = scale.checked_sub(exp).ok_or(ParseDecimalError)?;
        }

        let mut unscaled = core::str::from_utf8(&digits)
            .map_err(|_| ParseDecimalError)?
            .parse::<BigInt>()
            .map_err(|_| ParseDecimalError)?;
        if negative {
            unscaled = -unscaled;
        }
        Ok(Decimal { unscaled, scale })
    }
}

impl fmt::Display for Decimal {
    /// Writes the value in plain decimal notation (no exponent).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut digits = self.unscaled.magnitude().to_string();
        let negative = self.unscaled.sign() == num_bigint::Sign::Minus;
        if negative {
            f.write_str("-")?;
        }
        if self.scale <= 0 {
            f.write_str(&digits)?;
            for _ in 0..-self.scale {
                f.write_str("0")?;
            }
            return Ok(());
        }
        let scale = usize::try_from(self.scale).map_err(|_| fmt::Error)?;
        if digits.len() <= scale {
            // All digits are fractional: 0.00ddd
            f.write_str("0.")?;
            for _ in 0..scale - digits.len() {
                f.write_str("0")?;
            }
            f.write_str(&digits)
        } else {
            let point = digits.len() - scale;
            digits.insert(point, '.');
            f.write_str(&digits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(dec("3.14").to_string(), "3.14");
        assert_eq!(dec("-12.30").to_string(), "-12.30");
        assert_eq!(dec("0.5").to_string(), "0.5");
        assert_eq!(dec("1e2").to_string(), "100");
        assert_eq!(dec("1.5e-3").to_string(), "0.0015");
        assert_eq!(dec("12.34e2").to_string(), "1234");
    }

    #[test]
    fn scale_and_integral() {
        assert_eq!(dec("3.14").scale(), 2);
        assert_eq!(dec("1e2").scale(), -2);
        assert!(dec("1e2").is_integral());
        assert!(!dec("3.14").is_integral());
    }

    #[test]
    fn integral_conversion() {
        assert_eq!(dec("1e2").to_bigint().unwrap(), BigInt::from(100));
        assert_eq!(dec("-42").to_bigint().unwrap(), BigInt::from(-42));
        assert!(dec("3.14").to_bigint().is_none());
    }

    #[test]
    fn representational_equality() {
        assert_eq!(dec("3.14"), dec("3.14"));
        assert_ne!(dec("1.0"), dec("1.00"));
    }

    #[test]
    fn f64_round_trip() {
        assert_eq!(Decimal::from_f64(3.14).unwrap(), dec("3.14"));
        assert_eq!(dec("3.14").to_f64(), 3.14);
        assert!(Decimal::from_f64(f64::NAN).is_none());
        assert!(Decimal::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Decimal>().is_err());
        assert!("-".parse::<Decimal>().is_err());
        assert!("1.2.3".parse::<Decimal>().is_err());
        assert!("1e".parse::<Decimal>().is_err());
    }
}
