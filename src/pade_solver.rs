//! Padé approximants straight from power series coefficients.
//!
//! # Info on implementation
//!
//! The `[m/n]` approximant `P/Q` of `C(x) = Σ cₖ·xᵏ` satisfies `P(x) = Q(x)·C(x) mod xᵐ⁺ⁿ⁺¹`.
//! With `q₀ = 1`, the constant term gives `p₀ = c₀`. The coefficients of `x¹ … xᵐ⁺ⁿ` give a square
//! system in `p₁ … pₘ, q₁ … qₙ`:
//!
//! `pₖ - Σ_{j=1}^{min(k, n)} qⱼ·cₖ₋ⱼ = cₖ`
//!
//! where `pₖ = 0` for `k > m`. The numerator unknowns form an identity block, the denominator
//! unknowns a Toeplitz block of the series.
use nalgebra::{Complex, RealField};
use num_traits::One;

use crate::error::{Error, Result};
use crate::linalg::{self, ComplexMatrix, ComplexVector};

/// Computes the `[m/n]` Padé approximant of the series with `coefficients` (constant term first).
///
/// Returns the `m + 1` numerator and `n + 1` denominator coefficients. The constant numerator
/// coefficient is `coefficients[0]`, the constant denominator coefficient is 1.
///
/// # Errors
///
/// - [`Error::SizeMismatch`] unless there are exactly `m + n + 1` coefficients.
/// - [`Error::Overflow`] if `m + n + 1` overflows.
/// - [`Error::Singular`] if the approximant doesn't exist in this form (the system is singular).
///
/// # Examples
///
/// ```
/// # use complex_fitting::{pade_solver, Complex};
/// // 1 / (1 - x) = 1 + x + x² + …
/// let series = [Complex::new(1.0, 0.0), Complex::new(1.0, 0.0)];
/// let (numer, denom) = pade_solver::solve(&series, 0, 1).unwrap();
/// assert_eq!(numer.as_slice(), &[Complex::new(1.0, 0.0)]);
/// assert_eq!(denom.as_slice(), &[Complex::new(1.0, 0.0), Complex::new(-1.0, 0.0)]);
/// ```
pub fn solve<T: RealField>(
    coefficients: &[Complex<T>],
    m: usize,
    n: usize,
) -> Result<(ComplexVector<T>, ComplexVector<T>)> {
    let k = m.checked_add(n).ok_or(Error::Overflow { what: "m + n" })?;
    let len = k.checked_add(1).ok_or(Error::Overflow { what: "m + n" })?;
    if coefficients.len() != len {
        return Err(Error::SizeMismatch {
            what: "coefficients",
            expected: len,
            actual: coefficients.len(),
        });
    }
    log::debug!("solving [{m}/{n}] Padé approximant from series");

    let mut a = ComplexMatrix::zeros(k, k);
    for i in 0..m {
        a[(i, i)] = Complex::one();
    }
    for i in m..k {
        for (r, j) in (i - m..k).enumerate() {
            a[(j, i)] = -coefficients[r].clone();
        }
    }
    let c = ComplexVector::from_vec(coefficients[1..].to_vec());

    let v = linalg::solve_general(a, &c)?;
    let one = Complex::one();
    let numer = linalg::concat(&[&coefficients[..1], &v.as_slice()[..m]]);
    let denom = linalg::concat(&[std::slice::from_ref(&one), &v.as_slice()[m..]]);

    Ok((numer, denom))
}
