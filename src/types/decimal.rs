//! Exact decimal numbers.
//!
//! Values keep every digit they were given plus their scale, so `1.50` and
//! `1.5` are different values and nothing is ever rounded. Arithmetic is not
//! provided; the type only carries numbers between the wire and the caller.

use std::fmt;
use std::str::FromStr;

use crate::error::{WireError, WireResult};

/// Largest exponent accepted in scientific input such as `1E+30`.
const MAX_EXPONENT: i64 = 4096;

/// Arbitrary precision decimal stored as unscaled digits and a scale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    /// Unscaled digits without leading zeros; `"0"` for zero.
    digits: String,
    scale: u32,
}

impl Decimal {
    /// Build from an unscaled integer and a scale: `(12345, 2)` is `123.45`.
    pub fn from_parts(unscaled: i128, scale: u32) -> Self {
        Self {
            negative: unscaled < 0,
            digits: unscaled.unsigned_abs().to_string(),
            scale,
        }
    }

    /// Digits after the decimal point.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Number of significant digits in the unscaled value.
    pub fn precision(&self) -> u32 {
        self.digits.len() as u32
    }

    /// Lossy conversion for callers that want a float.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// The integer part, if it fits in an `i64`.
    pub fn trunc_i64(&self) -> Option<i64> {
        let int_len = self.digits.len().saturating_sub(self.scale as usize);
        let int_digits = if int_len == 0 { "0" } else { &self.digits[..int_len] };
        let value: i128 = int_digits.parse().ok()?;
        i64::try_from(if self.negative { -value } else { value }).ok()
    }

    /// Whether the value has no fractional digits other than zeros.
    pub fn is_integral(&self) -> bool {
        let int_len = self.digits.len().saturating_sub(self.scale as usize);
        self.digits[int_len..].bytes().all(|b| b == b'0')
    }
}

impl FromStr for Decimal {
    type Err = WireError;

    /// Parse plain (`-12.340`) or scientific (`1.5E+3`) notation.
    fn from_str(s: &str) -> WireResult<Self> {
        let invalid = |reason: &str| WireError::coercion(s, "DECIMAL", reason);

        let text = s.trim();
        let (negative, body) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = body[pos + 1..]
                    .parse()
                    .map_err(|_| invalid("invalid exponent"))?;
                if exp.abs() > MAX_EXPONENT {
                    return Err(invalid("exponent out of range"));
                }
                (&body[..pos], exp)
            }
            None => (body, 0),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid("not a number"));
        }

        let mut digits = format!("{int_part}{frac_part}");
        let mut scale = frac_part.len() as i64 - exponent;
        if scale < 0 {
            digits.extend(std::iter::repeat_n('0', (-scale) as usize));
            scale = 0;
        }

        let trimmed = digits.trim_start_matches('0');
        let digits = if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        };
        let negative = negative && digits != "0";

        Ok(Self {
            negative,
            digits,
            scale: scale as u32,
        })
    }
}

impl fmt::Display for Decimal {
    /// Plain notation, never scientific.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&self.digits);
        }
        if self.digits.len() > scale {
            let (int, frac) = self.digits.split_at(self.digits.len() - scale);
            write!(f, "{int}.{frac}")
        } else {
            write!(f, "0.{:0>width$}", self.digits, width = scale)
        }
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::from_parts(value as i128, 0)
    }
}

impl From<i32> for Decimal {
    fn from(value: i32) -> Self {
        Self::from_parts(value as i128, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_plain_round_trip_keeps_scale() {
        for s in ["0", "1.50", "-12.340", "0.001", "123456789012345678901234567890.123456789"] {
            assert_eq!(dec(s).to_string(), s);
        }
    }

    #[test]
    fn test_scale_and_precision() {
        let d = dec("123.4500");
        assert_eq!(d.scale(), 4);
        assert_eq!(d.precision(), 7);
    }

    #[test]
    fn test_scientific_to_plain() {
        assert_eq!(dec("1.5E+3").to_string(), "1500");
        assert_eq!(dec("1.5e-3").to_string(), "0.0015");
        assert_eq!(dec("-2E2").to_string(), "-200");
    }

    #[test]
    fn test_normalizes_leading_zeros_and_negative_zero() {
        assert_eq!(dec("007.10").to_string(), "7.10");
        assert_eq!(dec("-0.00").to_string(), "0.00");
        assert_eq!(dec(".5").to_string(), "0.5");
    }

    #[test]
    fn test_exact_equality() {
        assert_ne!(dec("1.5"), dec("1.50"));
        assert_eq!(dec("+1.50"), dec("1.50"));
    }

    #[test]
    fn test_rejects_garbage() {
        for s in ["", "-", ".", "1.2.3", "abc", "1e", "1e99999", "12a"] {
            assert!(s.parse::<Decimal>().is_err(), "{s}");
        }
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(Decimal::from_parts(12345, 2).to_string(), "123.45");
        assert_eq!(Decimal::from_parts(-5, 3).to_string(), "-0.005");
    }

    #[test]
    fn test_trunc_and_integral() {
        assert_eq!(dec("-42.99").trunc_i64(), Some(-42));
        assert_eq!(dec("0.5").trunc_i64(), Some(0));
        assert_eq!(dec("-9223372036854775808").trunc_i64(), Some(i64::MIN));
        assert_eq!(dec("9223372036854775808").trunc_i64(), None);
        assert!(dec("3.000").is_integral());
        assert!(!dec("3.001").is_integral());
    }
}
