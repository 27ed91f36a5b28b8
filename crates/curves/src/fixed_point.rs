//! Unsigned fixed point arithmetic with exactly 18 decimals, the unit in
//! which all quantities cross the pricing boundary.

use {
    crate::error::Error,
    ethereum_types::U256,
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::{
        fmt::{self, Display, Formatter},
        str::FromStr,
        sync::LazyLock,
    },
};

static ONE_18: LazyLock<U256> = LazyLock::new(|| U256::exp10(18));

/// An unsigned fixed point number with 18 decimals of precision, stored as
/// its integer "wei" representation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Bfp(U256);

impl Bfp {
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn one() -> Self {
        Self(*ONE_18)
    }

    /// `10^exp` as a fixed point number.
    pub fn exp10(exp: usize) -> Self {
        Self(U256::exp10(exp + 18))
    }

    pub fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    pub fn as_uint256(self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(self, other: Self) -> Result<Self, Error> {
        self.0.checked_add(other.0).map(Self).ok_or(Error::Overflow)
    }

    pub fn sub(self, other: Self) -> Result<Self, Error> {
        self.0.checked_sub(other.0).map(Self).ok_or(Error::Overflow)
    }

    /// Multiplication rounding towards zero.
    pub fn mul_down(self, other: Self) -> Result<Self, Error> {
        let product = self.0.checked_mul(other.0).ok_or(Error::Overflow)?;
        Ok(Self(product / *ONE_18))
    }

    /// Multiplication rounding away from zero.
    pub fn mul_up(self, other: Self) -> Result<Self, Error> {
        let product = self.0.checked_mul(other.0).ok_or(Error::Overflow)?;
        if product.is_zero() {
            return Ok(Self::zero());
        }
        Ok(Self((product - 1) / *ONE_18 + 1))
    }

    /// Division rounding towards zero.
    pub fn div_down(self, other: Self) -> Result<Self, Error> {
        if other.0.is_zero() {
            return Err(Error::ZeroDivision);
        }
        let inflated = self.0.checked_mul(*ONE_18).ok_or(Error::Overflow)?;
        Ok(Self(inflated / other.0))
    }

    /// Division rounding away from zero.
    pub fn div_up(self, other: Self) -> Result<Self, Error> {
        if other.0.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.0.is_zero() {
            return Ok(Self::zero());
        }
        let inflated = self.0.checked_mul(*ONE_18).ok_or(Error::Overflow)?;
        Ok(Self((inflated - 1) / other.0 + 1))
    }

    /// Exact halving, rounding towards zero.
    pub fn half(self) -> Self {
        Self(self.0 >> 1)
    }

    /// Square root rounding towards zero.
    pub fn sqrt(self) -> Result<Self, Error> {
        let radicand = self.0.checked_mul(*ONE_18).ok_or(Error::Overflow)?;
        Ok(Self(integer_sqrt(radicand)))
    }
}

/// Newton's method with a bit-length based initial guess, converging from
/// above onto `floor(sqrt(x))`.
fn integer_sqrt(x: U256) -> U256 {
    if x.is_zero() {
        return x;
    }
    let mut guess = U256::one() << (x.bits() / 2 + 1);
    loop {
        let next = (guess + x / guess) >> 1;
        if next >= guess {
            return guess;
        }
        guess = next;
    }
}

impl FromStr for Bfp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidLiteral(s.to_string());
        let (integer, fraction) = s.split_once('.').unwrap_or((s, ""));
        if integer.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if fraction.len() > 18 {
            return Err(invalid());
        }
        let integer = if integer.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(integer).map_err(|_| invalid())?
        };
        let fraction = if fraction.is_empty() {
            U256::zero()
        } else {
            let scale = U256::exp10(18 - fraction.len());
            U256::from_dec_str(fraction).map_err(|_| invalid())? * scale
        };
        integer
            .checked_mul(*ONE_18)
            .and_then(|wei| wei.checked_add(fraction))
            .map(Self)
            .ok_or(Error::Overflow)
    }
}

impl Display for Bfp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let integer = self.0 / *ONE_18;
        let fraction = self.0 % *ONE_18;
        if fraction.is_zero() {
            return write!(f, "{integer}.0");
        }
        let digits = fraction.to_string();
        let mut fraction = "0".repeat(18 - digits.len()) + &digits;
        while fraction.ends_with('0') {
            fraction.pop();
        }
        write!(f, "{integer}.{fraction}")
    }
}

impl Serialize for Bfp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Bfp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Shorthand for parsing a fixed point number from a decimal literal.
#[macro_export]
macro_rules! bfp {
    ($x:expr) => {
        $x.parse::<$crate::fixed_point::Bfp>().unwrap()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!(bfp!("1.0"), Bfp::one());
        assert_eq!(bfp!("0.5"), Bfp::from_wei(U256::exp10(17) * 5));
        assert_eq!(bfp!("42"), Bfp::from_wei(U256::exp10(18) * 42));
        assert_eq!(bfp!("1000.25").to_string(), "1000.25");
        assert_eq!(Bfp::zero().to_string(), "0.0");
        assert!("".parse::<Bfp>().is_err());
        assert!(".".parse::<Bfp>().is_err());
        assert!("-1".parse::<Bfp>().is_err());
        assert!("1.0000000000000000001".parse::<Bfp>().is_err());
    }

    #[test]
    fn exp10_matches_decimals() {
        assert_eq!(Bfp::exp10(0), Bfp::one());
        assert_eq!(Bfp::exp10(12), bfp!("1000000000000"));
    }

    #[test]
    fn rounding_pairs() {
        let third = bfp!("1.0").div_down(bfp!("3.0")).unwrap();
        assert_eq!(third.as_uint256(), U256::from(333_333_333_333_333_333_u64));
        let third_up = bfp!("1.0").div_up(bfp!("3.0")).unwrap();
        assert_eq!(
            third_up.as_uint256(),
            U256::from(333_333_333_333_333_334_u64)
        );

        assert_eq!(bfp!("2.0").mul_down(bfp!("3.0")).unwrap(), bfp!("6.0"));
        let tiny = Bfp::from_wei(U256::one());
        assert_eq!(tiny.mul_down(tiny).unwrap(), Bfp::zero());
        assert_eq!(tiny.mul_up(tiny).unwrap(), tiny);
        assert_eq!(Bfp::zero().mul_up(tiny).unwrap(), Bfp::zero());
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(
            bfp!("1.0").div_down(Bfp::zero()),
            Err(Error::ZeroDivision)
        );
        assert_eq!(bfp!("1.0").div_up(Bfp::zero()), Err(Error::ZeroDivision));
    }

    #[test]
    fn checked_add_sub() {
        let max = Bfp::from_wei(U256::MAX);
        assert_eq!(max.add(Bfp::one()), Err(Error::Overflow));
        assert_eq!(Bfp::zero().sub(Bfp::one()), Err(Error::Overflow));
        assert_eq!(bfp!("3.0").sub(bfp!("1.5")).unwrap(), bfp!("1.5"));
    }

    #[test]
    fn sqrt_rounds_down() {
        assert_eq!(bfp!("4.0").sqrt().unwrap(), bfp!("2.0"));
        assert_eq!(bfp!("0.25").sqrt().unwrap(), bfp!("0.5"));
        assert_eq!(Bfp::zero().sqrt().unwrap(), Bfp::zero());
        // floor(sqrt(2) * 1e18)
        assert_eq!(
            bfp!("2.0").sqrt().unwrap().as_uint256(),
            U256::from(1_414_213_562_373_095_048_u64)
        );
    }
}
