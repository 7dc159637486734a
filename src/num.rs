//! Infinite-precision rational numbers.
//!
//! Floating-point rounding would break reversibility: running a block
//! forward and then its inverse must restore memory bit for bit. Every
//! Arrow number is therefore an exact signed fraction, reduced to lowest
//! terms at construction and immutable afterwards.

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Raised when a zero denominator would be required: constructing with
/// bottom = 0, taking the reciprocal of zero, or a zero right-hand side
/// in division or modulo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivByZero;

impl fmt::Display for DivByZero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "division by zero")
    }
}

impl std::error::Error for DivByZero {}

/// An exact rational: numerator, denominator, and a sign of +1 or -1.
///
/// Invariants:
/// - `gcd(top, bottom) == 1` and `bottom > 0`
/// - zero is always `(top=0, bottom=1, sign=+1)`, so equality can be
///   structural over all three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Num {
    /// Numerator magnitude.
    pub top: BigUint,
    /// Denominator magnitude, always positive.
    pub bottom: BigUint,
    /// Either +1 or -1.
    pub sign: i8,
}

impl Num {
    /// Build from magnitudes and an explicit sign.
    /// Fails if `bottom` is zero.
    pub fn from_parts(top: BigUint, bottom: BigUint, sign: i8) -> Result<Num, DivByZero> {
        if bottom.is_zero() {
            return Err(DivByZero);
        }
        Ok(Num::normalized(top, bottom, sign))
    }

    /// Build from signed numerator and denominator. The sign is positive
    /// iff the two polarities match. Fails if `bottom` is zero.
    pub fn new(top: BigInt, bottom: BigInt) -> Result<Num, DivByZero> {
        let sign = if (bottom.sign() == Sign::Minus) == (top.sign() == Sign::Minus) {
            1
        } else {
            -1
        };
        Num::from_parts(top.magnitude().clone(), bottom.magnitude().clone(), sign)
    }

    /// A non-negative integer value.
    pub fn from_biguint(n: BigUint) -> Num {
        Num::normalized(n, BigUint::one(), 1)
    }

    /// Internal constructor; the caller guarantees `bottom` is nonzero.
    fn normalized(top: BigUint, bottom: BigUint, sign: i8) -> Num {
        if top.is_zero() {
            // Canonical zero, so structural equality stays total.
            return Num {
                top: BigUint::zero(),
                bottom: BigUint::one(),
                sign: 1,
            };
        }
        let d = top.gcd(&bottom);
        Num {
            top: top / &d,
            bottom: bottom / d,
            sign,
        }
    }

    /// Numerator with the sign applied.
    fn signed_top(&self) -> BigInt {
        let sign = if self.sign == -1 { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, self.top.clone())
    }

    /// Collapse a signed numerator over a positive denominator.
    fn from_signed(numer: BigInt, denom: BigUint) -> Num {
        let sign = if numer.sign() == Sign::Minus { -1 } else { 1 };
        let (_, magnitude) = numer.into_parts();
        Num::normalized(magnitude, denom, sign)
    }

    pub fn is_zero(&self) -> bool {
        self.top.is_zero()
    }

    /// True for whole numbers (denominator of one).
    pub fn is_integer(&self) -> bool {
        self.bottom.is_one()
    }

    /// Swap numerator and denominator, keeping the sign.
    /// Fails on zero.
    pub fn reciprocal(&self) -> Result<Num, DivByZero> {
        if self.top.is_zero() {
            return Err(DivByZero);
        }
        Ok(Num {
            top: self.bottom.clone(),
            bottom: self.top.clone(),
            sign: self.sign,
        })
    }

    /// Division by way of the reciprocal. Fails if `rhs` is zero.
    pub fn div(&self, rhs: &Num) -> Result<Num, DivByZero> {
        Ok(self.clone() * rhs.reciprocal()?)
    }

    /// Integer modulo over the numerators. Intended for integer
    /// operands; denominators and signs do not participate.
    pub fn modulo(&self, rhs: &Num) -> Result<Num, DivByZero> {
        if rhs.top.is_zero() {
            return Err(DivByZero);
        }
        Ok(Num::from_biguint(&self.top % &rhs.top))
    }

    /// The numerator as a machine index, if this is a non-negative
    /// integer that fits.
    pub fn to_index(&self) -> Option<usize> {
        if !self.is_integer() || self.sign == -1 {
            return None;
        }
        self.top.to_usize()
    }
}

impl From<i64> for Num {
    fn from(n: i64) -> Num {
        Num::normalized(
            BigUint::from(n.unsigned_abs()),
            BigUint::one(),
            if n < 0 { -1 } else { 1 },
        )
    }
}

impl Add for Num {
    type Output = Num;
    fn add(self, rhs: Num) -> Num {
        // a/b + c/d = (ad + cb) / bd
        let numer = self.signed_top() * BigInt::from(rhs.bottom.clone())
            + rhs.signed_top() * BigInt::from(self.bottom.clone());
        Num::from_signed(numer, self.bottom * rhs.bottom)
    }
}

impl Sub for Num {
    type Output = Num;
    fn sub(self, rhs: Num) -> Num {
        self + (-rhs)
    }
}

impl Neg for Num {
    type Output = Num;
    fn neg(self) -> Num {
        if self.top.is_zero() {
            return self;
        }
        Num {
            top: self.top,
            bottom: self.bottom,
            sign: -self.sign,
        }
    }
}

impl Mul for Num {
    type Output = Num;
    fn mul(self, rhs: Num) -> Num {
        Num::normalized(
            self.top * rhs.top,
            self.bottom * rhs.bottom,
            self.sign * rhs.sign,
        )
    }
}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Num {
    /// `a < b` iff `(a - b).sign == -1`; canonical zero makes this total.
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            Ordering::Equal
        } else if (self.clone() - other.clone()).sign == -1 {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.sign == -1 { "-" } else { "" };
        if self.bottom.is_one() {
            write!(f, "{}{}", sign, self.top)
        } else {
            write!(f, "({}{}/{})", sign, self.top, self.bottom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn ratio(top: i64, bottom: i64) -> Num {
        Num::new(BigInt::from(top), BigInt::from(bottom)).unwrap()
    }

    #[test]
    fn test_lowest_terms() {
        let half = ratio(2, 4);
        assert_eq!(half, ratio(1, 2));
        assert_eq!(half.top, BigUint::from(1u8));
        assert_eq!(half.bottom, BigUint::from(2u8));
    }

    #[test]
    fn test_sign_from_polarity() {
        assert_eq!(ratio(-1, 2).sign, -1);
        assert_eq!(ratio(1, -2).sign, -1);
        assert_eq!(ratio(-1, -2).sign, 1);
        assert_eq!(ratio(1, 2).sign, 1);
    }

    #[test]
    fn test_canonical_zero() {
        let zero = ratio(0, 5);
        assert_eq!(zero.sign, 1);
        assert_eq!(zero.bottom, BigUint::one());
        assert_eq!(-zero.clone(), zero);
        assert_eq!(ratio(3, 7) - ratio(3, 7), Num::from(0));
    }

    #[test]
    fn test_addition() {
        // The classic: 1/2 + 1/3 = 5/6.
        let sum = ratio(1, 2) + ratio(1, 3);
        assert_eq!(sum, ratio(5, 6));
        assert_eq!(sum.top, BigUint::from(5u8));
        assert_eq!(sum.bottom, BigUint::from(6u8));
        assert_eq!(sum.sign, 1);
    }

    #[test]
    fn test_subtraction_crosses_zero() {
        assert_eq!(ratio(1, 2) - ratio(3, 4), ratio(-1, 4));
        assert_eq!(Num::from(3) - Num::from(10), Num::from(-7));
    }

    #[test]
    fn test_multiplication_and_division() {
        assert_eq!(ratio(2, 3) * ratio(3, 4), ratio(1, 2));
        assert_eq!(ratio(-2, 3) * ratio(3, 4), ratio(-1, 2));
        assert_eq!(ratio(1, 2).div(&ratio(1, 3)).unwrap(), ratio(3, 2));
    }

    #[test]
    fn test_reciprocal_of_zero_fails() {
        assert_eq!(Num::from(0).reciprocal(), Err(DivByZero));
        assert_eq!(Num::from(1).div(&Num::from(0)), Err(DivByZero));
    }

    #[test]
    fn test_zero_denominator_fails() {
        assert!(Num::new(BigInt::from(1), BigInt::from(0)).is_err());
    }

    #[test]
    fn test_modulo() {
        assert_eq!(Num::from(7).modulo(&Num::from(3)).unwrap(), Num::from(1));
        assert_eq!(Num::from(6).modulo(&Num::from(3)).unwrap(), Num::from(0));
        assert_eq!(Num::from(5).modulo(&Num::from(0)), Err(DivByZero));
    }

    #[test]
    fn test_ordering() {
        assert!(-ratio(1, 2) < Num::from(0));
        assert!(ratio(1, 3) < ratio(1, 2));
        assert!(Num::from(2) > Num::from(-3));
        assert_eq!(ratio(2, 4).cmp(&ratio(1, 2)), Ordering::Equal);
    }

    #[test]
    fn test_to_index() {
        assert_eq!(Num::from(3).to_index(), Some(3));
        assert_eq!(Num::from(-1).to_index(), None);
        assert_eq!(ratio(1, 2).to_index(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Num::from(-4).to_string(), "-4");
        assert_eq!(ratio(5, 6).to_string(), "(5/6)");
        assert_eq!(ratio(-5, 6).to_string(), "(-5/6)");
        assert_eq!(Num::from(0).to_string(), "0");
    }
}
