use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "PKR";
pub const DEFAULT_CURRENCY_CODE_LOWER: &str = "pkr";

//--------------------------------------       Money       -----------------------------------------------------------
/// An amount of currency in minor units (cents / paisa). All monetary arithmetic in the storefront is integer
/// arithmetic over this type; fractional major units never leave the parsing boundary.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(pub String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let major = self.0 / 100;
        let minor = (self.0 % 100).abs();
        write!(f, "{major}.{minor:02}")
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    /// Parses a decimal amount in major units ("5000", "5000.01") into minor units.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let negative = s.starts_with('-');
        let unsigned = s.trim_start_matches('-');
        let (major, minor) = match unsigned.split_once('.') {
            Some((m, f)) => (m, f),
            None => (unsigned, ""),
        };
        let major = major.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        let minor = match minor.len() {
            0 => 0,
            1 => 10 * minor.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?,
            2 => minor.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?,
            _ => return Err(MoneyConversionError(format!("{s}: more than 2 decimal places"))),
        };
        let cents = major * 100 + minor;
        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// An amount given in whole major units (rupees, dollars).
    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Formats the amount the way gateways expect it: "5000.00".
    pub fn to_decimal_string(&self) -> String {
        format!("{self}")
    }
}

#[cfg(test)]
mod test {
    use super::Money;

    #[test]
    fn money_arithmetic() {
        let subtotal = Money::from_major(4800);
        let shipping = Money::from_major(200);
        assert_eq!(subtotal + shipping, Money::from_major(5000));
        assert_eq!(Money::from_major(5000) - shipping, subtotal);
        assert_eq!(Money::from_cents(250) * 4, Money::from_major(10));
    }

    #[test]
    fn parse_decimal_amounts() {
        assert_eq!("5000".parse::<Money>().unwrap(), Money::from_major(5000));
        assert_eq!("5000.01".parse::<Money>().unwrap(), Money::from_cents(500_001));
        assert_eq!("0.5".parse::<Money>().unwrap(), Money::from_cents(50));
        assert_eq!("-12.34".parse::<Money>().unwrap(), Money::from_cents(-1234));
        assert!("12.345".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn decimal_formatting() {
        assert_eq!(Money::from_major(5000).to_decimal_string(), "5000.00");
        assert_eq!(Money::from_cents(500_001).to_decimal_string(), "5000.01");
        assert_eq!(Money::from_cents(7).to_decimal_string(), "0.07");
    }

    #[test]
    fn sums() {
        let total: Money = [Money::from_major(1), Money::from_major(2), Money::from_cents(50)].into_iter().sum();
        assert_eq!(total, Money::from_cents(350));
    }
}
