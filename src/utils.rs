//! Helpers to judge and present fit results.
use nalgebra::{Complex, ComplexField, RealField};
use num_traits::Zero;

use crate::error::{Error, Result};
use crate::linalg::ComplexVector;

/// A binary floating point [`RealField`], with access to its exponent.
pub trait BinaryFloat: RealField {
    fn infinity() -> Self;
    /// `floor(log2(|self|))`, or [`None`] for zero, infinite, and NaN values.
    fn exponent(&self) -> Option<i64>;
    /// `self · 2^exponent`. Exact unless the result leaves the normal range.
    fn ldexp(self, exponent: i64) -> Self;
}

macro_rules! impl_binary_float {
    ($t:ty, $bits:ty, $mantissa:expr, $bias:expr) => {
        impl BinaryFloat for $t {
            fn infinity() -> Self {
                <$t>::INFINITY
            }
            fn exponent(&self) -> Option<i64> {
                if *self == 0.0 || !self.is_finite() {
                    return None;
                }
                let biased = ((self.to_bits() >> $mantissa) & (2 * $bias + 1)) as i64;
                if biased == 0 {
                    // subnormal, 2⁶⁴ lifts it into the normal range
                    return (*self * 18446744073709551616.0).exponent().map(|e| e - 64);
                }
                Some(biased - $bias)
            }
            fn ldexp(self, exponent: i64) -> Self {
                // `e` must be in the normal range
                fn pow2(e: i64) -> $t {
                    <$t>::from_bits(((e + $bias) as $bits) << $mantissa)
                }

                if self == 0.0 || !self.is_finite() {
                    return self;
                }
                let (mut x, mut e) = (self, exponent);
                while e > $bias {
                    x *= pow2($bias);
                    e -= $bias;
                    if !x.is_finite() {
                        return x;
                    }
                }
                while e < 1 - $bias {
                    x *= pow2(1 - $bias);
                    e += $bias - 1;
                    if x == 0.0 {
                        return x;
                    }
                }
                x * pow2(e)
            }
        }
    };
}
impl_binary_float!(f32, u32, 23, 127);
impl_binary_float!(f64, u64, 52, 1023);

/// `max(|Δre|, |Δim|) / |expected|`.
///
/// If `expected` is zero, the error is zero if `actual` is too, and infinite otherwise.
pub fn relative_error<T: BinaryFloat>(expected: &Complex<T>, actual: &Complex<T>) -> T {
    if expected.is_zero() {
        return if actual.is_zero() {
            T::zero()
        } else {
            T::infinity()
        };
    }
    absolute_error(expected, actual) / expected.clone().modulus()
}

/// `max(|Δre|, |Δim|)`.
pub fn absolute_error<T: RealField>(expected: &Complex<T>, actual: &Complex<T>) -> T {
    let diff = expected.clone() - actual.clone();
    diff.re.abs().max(diff.im.abs())
}

fn max_error<T: RealField>(
    expected: &ComplexVector<T>,
    actual: &ComplexVector<T>,
    error: impl Fn(&Complex<T>, &Complex<T>) -> T,
) -> Result<T> {
    if expected.len() != actual.len() {
        return Err(Error::SizeMismatch {
            what: "actual",
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    Ok(expected
        .iter()
        .zip(actual.iter())
        .fold(T::zero(), |max, (e, a)| max.max(error(e, a))))
}

/// The largest [`relative_error`] of corresponding entries.
///
/// # Errors
///
/// [`Error::SizeMismatch`] if the vectors have different lengths.
pub fn max_relative_error<T: BinaryFloat>(
    expected: &ComplexVector<T>,
    actual: &ComplexVector<T>,
) -> Result<T> {
    max_error(expected, actual, relative_error)
}

/// The largest [`absolute_error`] of corresponding entries.
///
/// # Errors
///
/// [`Error::SizeMismatch`] if the vectors have different lengths.
pub fn max_absolute_error<T: RealField>(
    expected: &ComplexVector<T>,
    actual: &ComplexVector<T>,
) -> Result<T> {
    max_error(expected, actual, absolute_error)
}

/// Pairs up numerator and denominator coefficients of Padé `parameters` by power.
///
/// `parameters` hold `m` numerator then `n` denominator coefficients, as returned by
/// [`crate::PadeFitter::fit`]. The shorter side is padded with zeros.
///
/// # Errors
///
/// [`Error::SizeMismatch`] unless `parameters` has `m + n` entries.
pub fn enumerate_pade_coefficients<T: RealField>(
    parameters: &ComplexVector<T>,
    m: usize,
    n: usize,
) -> Result<Vec<(Complex<T>, Complex<T>)>> {
    let len = m.checked_add(n).ok_or(Error::Overflow { what: "m + n" })?;
    if parameters.len() != len {
        return Err(Error::SizeMismatch {
            what: "parameters",
            expected: len,
            actual: parameters.len(),
        });
    }
    let (numer, denom) = parameters.as_slice().split_at(m);
    let coefficient = |side: &[Complex<T>], k: usize| side.get(k).cloned().unwrap_or_else(Complex::zero);

    Ok((0..m.max(n))
        .map(|k| (coefficient(numer, k), coefficient(denom, k)))
        .collect())
}

/// Scales `v` by a power of two so its largest component (real or imaginary part) has exponent 0.
///
/// Returns the exponent `scale` and the scaled vector. `ldexp` of the scaled components by `scale`
/// gives back `v` exactly.
///
/// # Errors
///
/// [`Error::Degenerate`] if `v` is empty, all zero, or has a non-finite component.
pub fn standardize_exponent<T: BinaryFloat>(v: &ComplexVector<T>) -> Result<(i64, ComplexVector<T>)> {
    if v.iter().all(Zero::is_zero) {
        return Err(Error::Degenerate("zero vector"));
    }
    if !v.iter().all(crate::linalg::is_finite) {
        return Err(Error::Degenerate("vector with non-finite components"));
    }

    let scale = v
        .iter()
        .flat_map(|c| [c.re.exponent(), c.im.exponent()])
        .flatten()
        .max()
        .ok_or(Error::Degenerate("zero vector"))?;
    let scaled = v.map(|c| Complex::new(c.re.ldexp(-scale), c.im.ldexp(-scale)));

    Ok((scale, scaled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    type C = Complex<f64>;

    #[test]
    fn exponents() {
        assert_eq!(1.0f64.exponent(), Some(0));
        assert_eq!(1.999f64.exponent(), Some(0));
        assert_eq!((-3.0f64).exponent(), Some(1));
        assert_eq!(0.75f64.exponent(), Some(-1));
        assert_eq!(f64::MIN_POSITIVE.exponent(), Some(-1022));
        assert_eq!(f64::from_bits(1).exponent(), Some(-1074));
        assert_eq!(f64::MAX.exponent(), Some(1023));
        assert_eq!(0.0f64.exponent(), None);
        assert_eq!(f64::NAN.exponent(), None);
        assert_eq!(f64::NEG_INFINITY.exponent(), None);
        assert_eq!(0.1f32.exponent(), Some(-4));
        assert_eq!(f32::from_bits(1).exponent(), Some(-149));
    }

    #[test]
    fn ldexp() {
        assert_eq!(3.0f64.ldexp(4), 48.0);
        assert_eq!(3.0f64.ldexp(-2), 0.75);
        assert_eq!(1.0f64.ldexp(-1074), f64::from_bits(1));
        assert_eq!(f64::from_bits(1).ldexp(2000), 2f64.powi(926));
        assert_eq!(1.0f64.ldexp(1024), f64::INFINITY);
        assert_eq!(1.0f64.ldexp(i64::MIN), 0.0);
        assert_eq!(0.0f64.ldexp(i64::MAX), 0.0);
        assert_eq!(1.5f32.ldexp(10), 1536.0);
    }

    proptest! {
        #[test]
        fn ldexp_normalises(x in any::<f64>()) {
            prop_assume!(x.is_finite() && x != 0.0);
            let e = x.exponent().unwrap();
            let normal = x.ldexp(-e);
            prop_assert!((1.0..2.0).contains(&normal.abs()));
            prop_assert_eq!(normal.ldexp(e), x);
        }
    }

    #[test]
    fn errors() {
        let zero = C::new(0.0, 0.0);
        assert_eq!(relative_error(&zero, &zero), 0.0);
        assert_eq!(relative_error(&zero, &C::new(0.0, 1e-300)), f64::INFINITY);
        assert_eq!(relative_error(&C::new(4.0, 0.0), &C::new(3.0, 0.5)), 0.25);
        assert_eq!(absolute_error(&C::new(3.0, 4.0), &C::new(1.0, 3.5)), 2.0);

        let expected = ComplexVector::from_vec(vec![C::new(1.0, 0.0), C::new(0.0, 2.0)]);
        let actual = ComplexVector::from_vec(vec![C::new(1.5, 0.0), C::new(0.0, 1.0)]);
        assert_eq!(max_absolute_error(&expected, &actual).unwrap(), 1.0);
        assert_eq!(max_relative_error(&expected, &actual).unwrap(), 0.5);
        let short = ComplexVector::from_vec(vec![zero]);
        assert_eq!(max_relative_error(&expected, &short).unwrap_err().kind(), ErrorKind::Size);
    }

    #[test]
    fn pade_pairs() {
        let c = |re: f64| C::new(re, 0.0);
        let parameters = ComplexVector::from_vec(vec![c(1.0), c(2.0), c(3.0), c(1.0), c(-1.0)]);

        let pairs = enumerate_pade_coefficients(&parameters, 3, 2).unwrap();
        assert_eq!(pairs, vec![(c(1.0), c(1.0)), (c(2.0), c(-1.0)), (c(3.0), c(0.0))]);

        let pairs = enumerate_pade_coefficients(&parameters, 2, 3).unwrap();
        assert_eq!(pairs, vec![(c(1.0), c(3.0)), (c(2.0), c(1.0)), (c(0.0), c(-1.0))]);

        assert_eq!(
            enumerate_pade_coefficients(&parameters, 2, 2).unwrap_err(),
            Error::SizeMismatch {
                what: "parameters",
                expected: 4,
                actual: 5
            }
        );
    }

    #[test]
    fn standardize() {
        let v = ComplexVector::from_vec(vec![C::new(3.0, -0.25), C::new(0.0, 1e-3), C::new(-2.5, 0.0)]);
        let (scale, standardized) = standardize_exponent(&v).unwrap();
        assert_eq!(scale, 1);
        assert_eq!(standardized[0], C::new(1.5, -0.125));
        let max = standardized
            .iter()
            .flat_map(|c| [c.re.exponent(), c.im.exponent()])
            .flatten()
            .max();
        assert_eq!(max, Some(0));
        for (s, v) in standardized.iter().zip(v.iter()) {
            assert_eq!(C::new(s.re.ldexp(scale), s.im.ldexp(scale)), *v);
        }

        let tiny = ComplexVector::from_vec(vec![C::new(0.0, 3e-300)]);
        let (scale, standardized) = standardize_exponent(&tiny).unwrap();
        assert_eq!(scale, -995);
        assert_eq!(standardized[0].im.ldexp(scale), 3e-300);
    }

    #[test]
    fn standardize_rejects() {
        let degenerate = |v: Vec<C>| standardize_exponent(&ComplexVector::from_vec(v)).unwrap_err().kind();
        assert_eq!(degenerate(vec![]), ErrorKind::Degenerate);
        assert_eq!(degenerate(vec![C::new(0.0, 0.0); 3]), ErrorKind::Degenerate);
        assert_eq!(degenerate(vec![C::new(1.0, 0.0), C::new(f64::NAN, 0.0)]), ErrorKind::Degenerate);
        assert_eq!(degenerate(vec![C::new(0.0, f64::INFINITY)]), ErrorKind::Degenerate);
    }
}
