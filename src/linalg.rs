//! Thin layer over [`nalgebra`]'s factorisations, plus the helpers to build and reduce the
//! Hermitian systems the fitters produce.
use nalgebra::{Cholesky, Complex, DMatrix, DVector, RealField};
use num_traits::Zero;

use crate::error::{Error, Result, Solver};

/// Column vector of complex scalars. Samples, residuals, and parameters all use this.
pub type ComplexVector<T> = DVector<Complex<T>>;
/// Dense complex matrix.
pub type ComplexMatrix<T> = DMatrix<Complex<T>>;

/// Evaluates the polynomial with `coefficients` (constant term first) at `x`.
///
/// O(n), Horner's scheme.
pub fn polynomial<T: RealField>(x: &Complex<T>, coefficients: &[Complex<T>]) -> Complex<T> {
    coefficients
        .iter()
        .rev()
        .fold(Complex::zero(), |acc, coefficient| acc * x + coefficient)
}

pub(crate) fn is_finite<T: RealField>(value: &Complex<T>) -> bool {
    value.re.is_finite() && value.im.is_finite()
}

/// Builds a `dim`x`dim` Hermitian matrix from its upper triangle.
///
/// `upper(i, j)` is only called for `i <= j`. The lower triangle is the conjugate mirror and the
/// diagonal keeps only its real part.
pub(crate) fn hermitian<T: RealField>(
    dim: usize,
    mut upper: impl FnMut(usize, usize) -> Complex<T>,
) -> ComplexMatrix<T> {
    let mut m = ComplexMatrix::zeros(dim, dim);
    for i in 0..dim {
        for j in i..dim {
            let value = upper(i, j);
            if i == j {
                m[(i, i)] = real_diagonal(value);
            } else {
                m[(j, i)] = value.conj();
                m[(i, j)] = value;
            }
        }
    }
    m
}

/// A diagonal entry is a sum of values times their own conjugates, so it is real up to rounding.
/// The imaginary noise is dropped, since the Cholesky solver reads the diagonal as real.
fn real_diagonal<T: RealField>(value: Complex<T>) -> Complex<T> {
    debug_assert!(
        !(value.im.clone().abs() > value.re.clone().abs() * T::default_epsilon().sqrt()),
        "diagonal entry {value:?} of a Hermitian system is not real"
    );
    Complex::new(value.re, T::zero())
}

fn is_hermitian<T: RealField>(m: &ComplexMatrix<T>) -> bool {
    m.is_square()
        && (0..m.nrows()).all(|i| (i..m.ncols()).all(|j| m[(i, j)] == m[(j, i)].conj()))
}

/// Pins the first unknown of `m·p = v` to `value`.
///
/// Moves its column to the right-hand side and drops its row and column, leaving the system for
/// the remaining unknowns. `m` must be Hermitian and at least 1x1.
pub(crate) fn pin_leading<T: RealField>(
    m: &ComplexMatrix<T>,
    v: &ComplexVector<T>,
    value: &Complex<T>,
) -> (ComplexMatrix<T>, ComplexVector<T>) {
    debug_assert!(m.nrows() >= 1 && m.nrows() == v.len());
    let dim = m.nrows() - 1;

    let rhs = ComplexVector::from_fn(dim, |i, _| {
        v[i + 1].clone() - value.clone() * m[(i + 1, 0)].clone()
    });
    let reduced = m.view((1, 1), (dim, dim)).into_owned();

    (reduced, rhs)
}

/// Solves `m·x = v` for Hermitian positive definite `m`.
///
/// Only the lower triangle of `m` is read. In debug builds, `m` is asserted to be Hermitian.
pub fn solve_hermitian<T: RealField>(
    m: ComplexMatrix<T>,
    v: &ComplexVector<T>,
) -> Result<ComplexVector<T>> {
    let dim = m.nrows();
    if dim == 0 {
        return Ok(ComplexVector::zeros(0));
    }
    debug_assert!(is_hermitian(&m), "the system matrix is not Hermitian");

    let singular = Error::Singular {
        solver: Solver::Hermitian,
        dim,
    };
    let cholesky = Cholesky::new(m).ok_or_else(|| singular.clone())?;
    // A negative pivot shows up as an (almost) imaginary factor.
    let positive = cholesky
        .l_dirty()
        .diagonal()
        .iter()
        .all(|l| l.re > T::zero() && l.im.clone().abs() < l.re);
    if !positive {
        return Err(singular);
    }
    let x = cholesky.solve(v);

    if x.iter().all(is_finite) {
        Ok(x)
    } else {
        Err(singular)
    }
}

/// Solves the square system `m·x = v`.
pub fn solve_general<T: RealField>(
    m: ComplexMatrix<T>,
    v: &ComplexVector<T>,
) -> Result<ComplexVector<T>> {
    let dim = m.nrows();
    if dim == 0 {
        return Ok(ComplexVector::zeros(0));
    }

    m.lu()
        .solve(v)
        .filter(|x| x.iter().all(is_finite))
        .ok_or(Error::Singular {
            solver: Solver::General,
            dim,
        })
}

/// Joins `pieces` into a single vector.
pub(crate) fn concat<T: RealField>(pieces: &[&[Complex<T>]]) -> ComplexVector<T> {
    let len = pieces.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(len);
    for piece in pieces {
        out.extend_from_slice(piece);
    }
    ComplexVector::from_vec(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    #[test]
    fn horner() {
        // 1 + 2x + 3x²
        let coefficients = [c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0)];
        assert_eq!(polynomial(&c(2.0, 0.0), &coefficients), c(17.0, 0.0));
        assert_eq!(polynomial(&c(0.0, 1.0), &coefficients), c(-2.0, 2.0));
        assert_eq!(polynomial(&c(0.0, 0.0), &coefficients), c(1.0, 0.0));
        assert_eq!(polynomial::<f64>(&c(5.0, 0.0), &[]), c(0.0, 0.0));
    }

    #[test]
    fn hermitian_mirror() {
        let m = hermitian(3, |i, j| c((i + j) as f64, (j - i) as f64));
        assert_eq!(m[(0, 2)], c(2.0, 2.0));
        assert_eq!(m[(2, 0)], c(2.0, -2.0));
        assert_eq!(m[(1, 1)], c(2.0, 0.0));
        assert!(is_hermitian(&m));
    }

    #[test]
    fn hermitian_solve() {
        let m = hermitian(2, |i, j| match (i, j) {
            (0, 0) => c(4.0, 0.0),
            (0, 1) => c(1.0, 1.0),
            _ => c(3.0, 0.0),
        });
        let expected = ComplexVector::from_vec(vec![c(1.0, -1.0), c(0.5, 2.0)]);
        let v = &m * &expected;
        let x = solve_hermitian(m, &v).unwrap();
        for (x, e) in x.iter().zip(expected.iter()) {
            assert!((x - e).norm() < 1e-14);
        }
    }

    #[test]
    fn indefinite() {
        let m = hermitian(2, |i, j| if i == j { c(1.0, 0.0) } else { c(2.0, 0.0) });
        let v = ComplexVector::from_vec(vec![c(1.0, 0.0), c(1.0, 0.0)]);
        let err = solve_hermitian(m, &v).unwrap_err();
        assert_eq!(
            err,
            Error::Singular {
                solver: Solver::Hermitian,
                dim: 2
            }
        );
    }

    #[test]
    fn general_singular() {
        let m = ComplexMatrix::from_element(2, 2, c(1.0, 0.0));
        let v = ComplexVector::from_element(2, c(1.0, 0.0));
        assert!(solve_general(m, &v).is_err());
    }

    #[test]
    fn pinning_matches_full_solve() {
        let m = hermitian(3, |i, j| match (i, j) {
            (0, 0) => c(5.0, 0.0),
            (1, 1) => c(4.0, 0.0),
            (2, 2) => c(6.0, 0.0),
            (0, 1) => c(1.0, -1.0),
            (0, 2) => c(0.5, 0.0),
            _ => c(0.0, 1.0),
        });
        let p = ComplexVector::from_vec(vec![c(0.75, 1.0), c(-1.0, 0.5), c(2.0, 0.0)]);
        let v = &m * &p;

        let (reduced, rhs) = pin_leading(&m, &v, &p[0]);
        assert_eq!(reduced.shape(), (2, 2));
        let rest = solve_hermitian(reduced, &rhs).unwrap();
        assert!((rest[0] - p[1]).norm() < 1e-14);
        assert!((rest[1] - p[2]).norm() < 1e-14);
    }
}
