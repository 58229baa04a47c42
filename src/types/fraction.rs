// Fraction - Exact non-negative rational used for governance ratios
// Comparisons never round: threshold boundaries must resolve identically on every replica.

use num_rational::Ratio;
use num_traits::{One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum number of decimal places accepted when parsing and printed when formatting
pub const MAX_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fraction(Ratio<u128>);

impl Fraction {
    /// `numer / denom`, `None` when `denom` is zero
    pub fn new(numer: u128, denom: u128) -> Option<Self> {
        if denom == 0 {
            return None;
        }
        Some(Fraction(Ratio::new(numer, denom)))
    }

    /// `value * 10^-prec`, e.g. `from_prec(834, 3)` is 0.834
    pub fn from_prec(value: u128, prec: u32) -> Self {
        Fraction(Ratio::new(value, 10u128.pow(prec)))
    }

    pub fn zero() -> Self {
        Fraction(Ratio::zero())
    }

    pub fn one() -> Self {
        Fraction(Ratio::one())
    }

    pub fn numer(&self) -> u128 {
        *self.0.numer()
    }

    pub fn denom(&self) -> u128 {
        *self.0.denom()
    }

    /// Strictly inside (0, 1)
    pub fn is_open_unit(&self) -> bool {
        *self > Self::zero() && *self < Self::one()
    }

    /// True when the value has a terminating expansion of at most `MAX_DECIMALS` places
    pub fn is_decimal(&self) -> bool {
        10u128.pow(MAX_DECIMALS) % self.denom() == 0
    }

    /// Lossless text form: the decimal when it terminates within `MAX_DECIMALS`, else `n/d`
    pub fn to_exact_string(&self) -> String {
        if self.is_decimal() {
            self.to_string()
        } else {
            format!("{}/{}", self.numer(), self.denom())
        }
    }

    /// `floor(amount * self)` without intermediate overflow for fractions below one
    pub fn mul_floor(&self, amount: u128) -> u128 {
        let (n, d) = (self.numer(), self.denom());
        let whole = (amount / d).saturating_mul(n);
        let rest = (amount % d).saturating_mul(n) / d;
        whole.saturating_add(rest)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (n, d) = (self.numer(), self.denom());
        let int = n / d;
        let mut rem = n % d;
        if rem == 0 {
            return write!(f, "{}", int);
        }

        let mut digits = String::new();
        for _ in 0..MAX_DECIMALS {
            if rem == 0 {
                break;
            }
            // rem < d, so rem * 10 only overflows for denominators near u128::MAX
            let scaled = rem.checked_mul(10).unwrap_or(u128::MAX);
            digits.push(char::from(b'0' + (scaled / d) as u8));
            rem = scaled % d;
        }
        let digits = digits.trim_end_matches('0');
        if digits.is_empty() {
            write!(f, "{}", int)
        } else {
            write!(f, "{}.{}", int, digits)
        }
    }
}

impl FromStr for Fraction {
    type Err = FractionParseError;

    /// Accepts decimals (`0.334`, `.5`, `1`) and exact ratios (`1/3`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((numer, denom)) = s.split_once('/') {
            return parse_ratio(s, numer.trim(), denom.trim());
        }
        let (int, frac) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int.is_empty() && frac.is_empty() {
            return Err(FractionParseError::Empty);
        }
        if !int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(FractionParseError::InvalidDigit(s.to_string()));
        }
        if frac.len() as u32 > MAX_DECIMALS {
            return Err(FractionParseError::TooPrecise(s.to_string()));
        }

        let int: u128 = if int.is_empty() {
            0
        } else {
            int.parse()
                .map_err(|_| FractionParseError::Overflow(s.to_string()))?
        };
        let frac_value: u128 = if frac.is_empty() {
            0
        } else {
            frac.parse()
                .map_err(|_| FractionParseError::Overflow(s.to_string()))?
        };
        let scale = 10u128.pow(frac.len() as u32);
        let numer = int
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| FractionParseError::Overflow(s.to_string()))?;

        Ok(Fraction(Ratio::new(numer, scale)))
    }
}

fn parse_ratio(s: &str, numer: &str, denom: &str) -> Result<Fraction, FractionParseError> {
    let digits = |part: &str| -> Result<u128, FractionParseError> {
        if part.is_empty() {
            return Err(FractionParseError::Empty);
        }
        if !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(FractionParseError::InvalidDigit(s.to_string()));
        }
        part.parse()
            .map_err(|_| FractionParseError::Overflow(s.to_string()))
    };
    let numer = digits(numer)?;
    let denom = digits(denom)?;
    Fraction::new(numer, denom).ok_or_else(|| FractionParseError::ZeroDenominator(s.to_string()))
}

impl Serialize for Fraction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_exact_string())
    }
}

impl<'de> Deserialize<'de> for Fraction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FractionParseError {
    #[error("Empty decimal")]
    Empty,

    #[error("Invalid digit in '{0}'")]
    InvalidDigit(String),

    #[error("More than 18 decimal places in '{0}'")]
    TooPrecise(String),

    #[error("Decimal '{0}' overflows")]
    Overflow(String),

    #[error("Zero denominator in '{0}'")]
    ZeroDenominator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let f: Fraction = "0.834".parse().unwrap();
        assert_eq!(f, Fraction::from_prec(834, 3));
        assert_eq!(f.to_string(), "0.834");

        assert_eq!("1".parse::<Fraction>().unwrap(), Fraction::one());
        assert_eq!(".5".parse::<Fraction>().unwrap(), Fraction::new(1, 2).unwrap());
        assert_eq!(Fraction::from_prec(8572, 4).to_string(), "0.8572");
        assert_eq!(Fraction::zero().to_string(), "0");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<Fraction>(), Err(FractionParseError::Empty));
        assert!(matches!("-0.5".parse::<Fraction>(), Err(FractionParseError::InvalidDigit(_))));
        assert!(matches!(
            "0.1234567890123456789".parse::<Fraction>(),
            Err(FractionParseError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_repeating_display_truncates() {
        let third = Fraction::new(1, 3).unwrap();
        assert_eq!(third.to_string(), "0.333333333333333333");
    }

    #[test]
    fn test_exact_string_keeps_repeating_values() {
        let third = Fraction::new(1, 3).unwrap();
        assert!(!third.is_decimal());
        assert_eq!(third.to_exact_string(), "1/3");
        assert_eq!("1/3".parse::<Fraction>().unwrap(), third);
        assert_eq!(" 2 / 6 ".parse::<Fraction>().unwrap(), third);

        let half = Fraction::from_prec(5, 1);
        assert!(half.is_decimal());
        assert_eq!(half.to_exact_string(), "0.5");
        assert!(Fraction::from_prec(1, 18).is_decimal());
    }

    #[test]
    fn test_ratio_parse_errors() {
        assert_eq!(
            "1/0".parse::<Fraction>(),
            Err(FractionParseError::ZeroDenominator("1/0".to_string()))
        );
        assert_eq!("/3".parse::<Fraction>(), Err(FractionParseError::Empty));
        assert!(matches!("1/-3".parse::<Fraction>(), Err(FractionParseError::InvalidDigit(_))));
    }

    #[test]
    fn test_serde_is_lossless() {
        let third = Fraction::new(1, 3).unwrap();
        let json = serde_json::to_string(&third).unwrap();
        assert_eq!(json, r#""1/3""#);
        assert_eq!(serde_json::from_str::<Fraction>(&json).unwrap(), third);

        let veto = Fraction::from_prec(334, 3);
        assert_eq!(serde_json::to_string(&veto).unwrap(), r#""0.334""#);
    }

    #[test]
    fn test_open_unit() {
        assert!(!Fraction::zero().is_open_unit());
        assert!(!Fraction::one().is_open_unit());
        assert!(Fraction::from_prec(5, 1).is_open_unit());
        assert!(Fraction::from_prec(9, 4).is_open_unit());
    }

    #[test]
    fn test_mul_floor() {
        let penalty = Fraction::from_prec(9, 4);
        assert_eq!(penalty.mul_floor(10_000), 9);
        assert_eq!(penalty.mul_floor(1_111), 0);
        assert_eq!(penalty.mul_floor(u128::MAX / 2), (u128::MAX / 2) / 10_000 * 9 + ((u128::MAX / 2) % 10_000) * 9 / 10_000);
    }

    #[test]
    fn test_exact_comparison() {
        let half = Fraction::new(500, 1000).unwrap();
        assert_eq!(half, Fraction::from_prec(5, 1));
        assert!(Fraction::new(501, 1000).unwrap() > half);
    }
}
