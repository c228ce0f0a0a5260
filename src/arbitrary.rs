//! [`BigFloat`], an arbitrary precision [`RealField`] backed by MPFR.
//!
//! New values get the process wide [`default_precision`], 256 bits unless changed with
//! [`set_default_precision`]. Arithmetic results take the precision of the left operand.
use std::cmp::Ordering;
use std::fmt::{self, Display, LowerExp};
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};
use std::str::FromStr;
use std::sync::atomic::{self, AtomicU32};

use approx::{AbsDiffEq, RelativeEq, UlpsEq};
use num_traits::{FromPrimitive, Num, One, Signed, Zero};
use rug::float::{Constant, ParseFloatError, Special};
use rug::ops::Pow;
use rug::Float;
use simba::scalar::{ComplexField, Field, RealField, SubsetOf};
use simba::simd::SimdValue;

use crate::utils::BinaryFloat;

static DEFAULT_PRECISION: AtomicU32 = AtomicU32::new(256);

/// Sets the precision in bits of new [`BigFloat`]s, clamped to what MPFR supports.
///
/// Values created before keep their precision.
pub fn set_default_precision(bits: u32) {
    let bits = bits.clamp(rug::float::prec_min(), rug::float::prec_max());
    DEFAULT_PRECISION.store(bits, atomic::Ordering::Relaxed);
}
/// The precision in bits of new [`BigFloat`]s.
pub fn default_precision() -> u32 {
    DEFAULT_PRECISION.load(atomic::Ordering::Relaxed)
}

/// A [`rug::Float`] usable as scalar of the fitters.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct BigFloat(pub Float);
impl BigFloat {
    /// `value` at the [`default_precision`].
    pub fn new(value: f64) -> Self {
        Self(Float::with_val(default_precision(), value))
    }
    fn int(value: i32) -> Self {
        Self(Float::with_val(default_precision(), value))
    }
    fn constant(constant: Constant) -> Self {
        Self(Float::with_val(default_precision(), constant))
    }
    pub fn precision(&self) -> u32 {
        self.0.prec()
    }
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64()
    }
}
impl From<f64> for BigFloat {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}
impl FromStr for BigFloat {
    type Err = ParseFloatError;
    /// Parses a decimal number at the [`default_precision`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_radix(s, 10)
    }
}
impl Display for BigFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl LowerExp for BigFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        LowerExp::fmt(&self.0, f)
    }
}

macro_rules! impl_op {
    ($op:ident, $method:ident, $assign:ident, $assign_method:ident) => {
        impl $op for BigFloat {
            type Output = Self;
            fn $method(self, rhs: Self) -> Self {
                Self($op::$method(self.0, rhs.0))
            }
        }
        impl $assign for BigFloat {
            fn $assign_method(&mut self, rhs: Self) {
                $assign::$assign_method(&mut self.0, rhs.0);
            }
        }
    };
}
impl_op!(Add, add, AddAssign, add_assign);
impl_op!(Sub, sub, SubAssign, sub_assign);
impl_op!(Mul, mul, MulAssign, mul_assign);
impl_op!(Div, div, DivAssign, div_assign);

impl Rem for BigFloat {
    type Output = Self;
    /// Truncated remainder, same sign as `self`, like `f64`'s.
    fn rem(self, rhs: Self) -> Self {
        let quotient = (self.0.clone() / &rhs.0).trunc();
        Self(self.0 - quotient * rhs.0)
    }
}
impl RemAssign for BigFloat {
    fn rem_assign(&mut self, rhs: Self) {
        *self = self.clone() % rhs;
    }
}
impl Neg for BigFloat {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Zero for BigFloat {
    fn zero() -> Self {
        Self::int(0)
    }
    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}
impl One for BigFloat {
    fn one() -> Self {
        Self::int(1)
    }
}
impl Num for BigFloat {
    type FromStrRadixErr = ParseFloatError;
    fn from_str_radix(src: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        let radix = i32::try_from(radix).unwrap_or(i32::MAX);
        Float::parse_radix(src, radix).map(|parsed| Self(Float::with_val(default_precision(), parsed)))
    }
}
impl Signed for BigFloat {
    fn abs(&self) -> Self {
        Self(self.0.clone().abs())
    }
    fn abs_sub(&self, other: &Self) -> Self {
        if self <= other {
            Self::zero()
        } else {
            self.clone() - other.clone()
        }
    }
    fn signum(&self) -> Self {
        Self(self.0.clone().signum())
    }
    fn is_positive(&self) -> bool {
        self.0.is_sign_positive()
    }
    fn is_negative(&self) -> bool {
        self.0.is_sign_negative()
    }
}
impl FromPrimitive for BigFloat {
    fn from_i64(n: i64) -> Option<Self> {
        Some(Self(Float::with_val(default_precision(), n)))
    }
    fn from_u64(n: u64) -> Option<Self> {
        Some(Self(Float::with_val(default_precision(), n)))
    }
    fn from_f64(n: f64) -> Option<Self> {
        Some(Self::new(n))
    }
}

impl SimdValue for BigFloat {
    const LANES: usize = 1;
    type Element = Self;
    type SimdBool = bool;

    fn splat(val: Self::Element) -> Self {
        val
    }
    fn extract(&self, _: usize) -> Self::Element {
        self.clone()
    }
    unsafe fn extract_unchecked(&self, _: usize) -> Self::Element {
        self.clone()
    }
    fn replace(&mut self, _: usize, val: Self::Element) {
        *self = val;
    }
    unsafe fn replace_unchecked(&mut self, _: usize, val: Self::Element) {
        *self = val;
    }
    fn select(self, cond: Self::SimdBool, other: Self) -> Self {
        if cond {
            self
        } else {
            other
        }
    }
}
impl Field for BigFloat {}

impl SubsetOf<BigFloat> for BigFloat {
    fn to_superset(&self) -> BigFloat {
        self.clone()
    }
    fn from_superset_unchecked(element: &BigFloat) -> Self {
        element.clone()
    }
    fn is_in_subset(_: &BigFloat) -> bool {
        true
    }
}
impl SubsetOf<BigFloat> for f64 {
    fn to_superset(&self) -> BigFloat {
        BigFloat::new(*self)
    }
    fn from_superset_unchecked(element: &BigFloat) -> Self {
        element.to_f64()
    }
    fn is_in_subset(_: &BigFloat) -> bool {
        true
    }
}

impl AbsDiffEq for BigFloat {
    type Epsilon = Self;
    /// One unit in the last place of 1.
    fn default_epsilon() -> Self {
        let precision = default_precision();
        Self(Float::with_val(precision, 1) >> (precision - 1))
    }
    fn abs_diff_eq(&self, other: &Self, epsilon: Self) -> bool {
        (self.clone() - other.clone()).0.abs() <= epsilon.0
    }
}
impl RelativeEq for BigFloat {
    fn default_max_relative() -> Self {
        Self::default_epsilon()
    }
    fn relative_eq(&self, other: &Self, epsilon: Self, max_relative: Self) -> bool {
        if self == other {
            return true;
        }
        if !self.0.is_finite() || !other.0.is_finite() {
            return false;
        }
        let diff = (self.clone() - other.clone()).0.abs();
        if diff <= epsilon.0 {
            return true;
        }
        let largest = self.0.clone().abs().max(&other.0.clone().abs());
        diff <= largest * max_relative.0
    }
}
impl UlpsEq for BigFloat {
    fn default_max_ulps() -> u32 {
        4
    }
    fn ulps_eq(&self, other: &Self, epsilon: Self, max_ulps: u32) -> bool {
        let max_relative = Self::default_epsilon() * Self(Float::with_val(default_precision(), max_ulps));
        self.relative_eq(other, epsilon, max_relative)
    }
}

macro_rules! delegate {
    ($($name:ident),* $(,)?) => {
        $(
            fn $name(self) -> Self {
                Self(self.0.$name())
            }
        )*
    };
}

impl ComplexField for BigFloat {
    type RealField = Self;

    fn from_real(re: Self) -> Self {
        re
    }
    fn real(self) -> Self {
        self
    }
    fn imaginary(self) -> Self {
        Self::zero()
    }
    fn modulus(self) -> Self {
        Self(self.0.abs())
    }
    fn modulus_squared(self) -> Self {
        Self(self.0.square())
    }
    fn argument(self) -> Self {
        if self.0.is_sign_negative() {
            Self::pi()
        } else {
            Self::zero()
        }
    }
    fn norm1(self) -> Self {
        Self(self.0.abs())
    }
    fn scale(self, factor: Self) -> Self {
        self * factor
    }
    fn unscale(self, factor: Self) -> Self {
        self / factor
    }
    fn mul_add(self, a: Self, b: Self) -> Self {
        Self(self.0.mul_add(&a.0, &b.0))
    }
    fn abs(self) -> Self {
        Self(self.0.abs())
    }
    fn hypot(self, other: Self) -> Self {
        Self(self.0.hypot(&other.0))
    }
    fn conjugate(self) -> Self {
        self
    }
    fn sin_cos(self) -> (Self, Self) {
        (Self(self.0.clone().sin()), Self(self.0.cos()))
    }
    fn log(self, base: Self) -> Self {
        Self(self.0.ln() / base.0.ln())
    }
    fn powi(self, n: i32) -> Self {
        Self(self.0.pow(n))
    }
    fn powf(self, n: Self) -> Self {
        Self(self.0.pow(n.0))
    }
    fn powc(self, n: Self) -> Self {
        self.powf(n)
    }
    fn try_sqrt(self) -> Option<Self> {
        if self.0.is_sign_negative() && !self.0.is_zero() {
            None
        } else {
            Some(Self(self.0.sqrt()))
        }
    }
    fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    delegate!(
        floor, ceil, round, trunc, fract, recip, sin, cos, tan, asin, acos, atan, sinh, cosh,
        tanh, asinh, acosh, atanh, log2, log10, ln, ln_1p, sqrt, exp, exp2, exp_m1, cbrt,
    );
}

impl RealField for BigFloat {
    fn is_sign_positive(&self) -> bool {
        self.0.is_sign_positive()
    }
    fn is_sign_negative(&self) -> bool {
        self.0.is_sign_negative()
    }
    fn copysign(self, sign: Self) -> Self {
        Self(self.0.copysign(&sign.0))
    }
    fn max(self, other: Self) -> Self {
        Self(self.0.max(&other.0))
    }
    fn min(self, other: Self) -> Self {
        Self(self.0.min(&other.0))
    }
    fn clamp(self, min: Self, max: Self) -> Self {
        match (self.partial_cmp(&min), self.partial_cmp(&max)) {
            (Some(Ordering::Less), _) => min,
            (_, Some(Ordering::Greater)) => max,
            _ => self,
        }
    }
    fn atan2(self, other: Self) -> Self {
        Self(self.0.atan2(&other.0))
    }
    fn min_value() -> Option<Self> {
        None
    }
    fn max_value() -> Option<Self> {
        None
    }

    fn pi() -> Self {
        Self::constant(Constant::Pi)
    }
    fn two_pi() -> Self {
        Self::pi() * Self::int(2)
    }
    fn frac_pi_2() -> Self {
        Self::pi() / Self::int(2)
    }
    fn frac_pi_3() -> Self {
        Self::pi() / Self::int(3)
    }
    fn frac_pi_4() -> Self {
        Self::pi() / Self::int(4)
    }
    fn frac_pi_6() -> Self {
        Self::pi() / Self::int(6)
    }
    fn frac_pi_8() -> Self {
        Self::pi() / Self::int(8)
    }
    fn frac_1_pi() -> Self {
        Self::one() / Self::pi()
    }
    fn frac_2_pi() -> Self {
        Self::int(2) / Self::pi()
    }
    fn frac_2_sqrt_pi() -> Self {
        Self::int(2) / Self(Self::pi().0.sqrt())
    }
    fn e() -> Self {
        Self(Self::one().0.exp())
    }
    fn log2_e() -> Self {
        Self::one() / Self::ln_2()
    }
    fn log10_e() -> Self {
        Self::one() / Self::ln_10()
    }
    fn ln_2() -> Self {
        Self::constant(Constant::Log2)
    }
    fn ln_10() -> Self {
        Self(Self::int(10).0.ln())
    }
}

impl BinaryFloat for BigFloat {
    fn infinity() -> Self {
        Self(Float::with_val(default_precision(), Special::Infinity))
    }
    fn exponent(&self) -> Option<i64> {
        // MPFR normalises the significand to [0.5, 1)
        self.0.get_exp().map(|e| i64::from(e) - 1)
    }
    fn ldexp(self, exponent: i64) -> Self {
        let exponent = i32::try_from(exponent).unwrap_or(if exponent < 0 { i32::MIN } else { i32::MAX });
        Self(self.0 << exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Complex, DMatrix, DVector};

    #[test]
    fn arithmetic() {
        let third = BigFloat::one() / BigFloat::int(3);
        assert_eq!(third.precision(), default_precision());
        let back = third.clone() * BigFloat::int(3);
        assert!(approx::relative_eq!(back, BigFloat::one()));
        // more digits than f64 has
        let tiny = BigFloat::one() + BigFloat::one().ldexp(-100);
        assert!(tiny > BigFloat::one());

        assert_eq!(BigFloat::new(7.5) % BigFloat::int(2), BigFloat::new(1.5));
        assert_eq!(BigFloat::new(-7.5) % BigFloat::int(2), BigFloat::new(-1.5));
        assert_eq!(<BigFloat as Num>::from_str_radix("0.25", 10).unwrap(), BigFloat::new(0.25));
        assert_eq!("-1.5e3".parse::<BigFloat>().unwrap(), BigFloat::new(-1500.0));
        assert!("one".parse::<BigFloat>().is_err());
    }

    #[test]
    fn binary() {
        assert_eq!(BigFloat::new(1.0).exponent(), Some(0));
        assert_eq!(BigFloat::new(0.75).exponent(), Some(-1));
        assert_eq!(BigFloat::new(-6.0).exponent(), Some(2));
        assert_eq!(BigFloat::zero().exponent(), None);
        assert_eq!(BigFloat::infinity().exponent(), None);
        assert_eq!(BigFloat::new(3.0).ldexp(-2), BigFloat::new(0.75));
    }

    #[test]
    fn field() {
        let x = BigFloat::new(2.0);
        assert!(approx::relative_eq!(
            ComplexField::sqrt(x.clone()).powi(2),
            x,
            epsilon = BigFloat::new(1e-70)
        ));
        assert!(ComplexField::try_sqrt(BigFloat::new(-1.0)).is_none());
        assert!(BigFloat::pi() > BigFloat::new(3.14159) && BigFloat::pi() < BigFloat::new(3.1416));
        assert_eq!(RealField::max(BigFloat::new(1.0), BigFloat::new(2.0)), BigFloat::new(2.0));
        assert_eq!(
            BigFloat::new(5.0).clamp(BigFloat::zero(), BigFloat::one()),
            BigFloat::one()
        );
    }

    #[test]
    fn complex_solve() {
        let c = |re: f64, im: f64| Complex::new(BigFloat::new(re), BigFloat::new(im));
        let m = DMatrix::from_row_slice(2, 2, &[c(4.0, 0.0), c(1.0, 1.0), c(1.0, -1.0), c(3.0, 0.0)]);
        let expected = DVector::from_vec(vec![c(1.0, -1.0), c(0.5, 2.0)]);
        let v = &m * &expected;
        let x = crate::linalg::solve_hermitian(m, &v).unwrap();
        for (x, e) in x.iter().zip(expected.iter()) {
            let diff = x.clone() - e.clone();
            assert!(diff.re.0.abs() < 1e-70 && diff.im.0.abs() < 1e-70);
        }
    }
}
