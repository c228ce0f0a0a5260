//! Weighted least squares rational functions, `y ≈ P(x) / Q(x)`.
//!
//! # Info on implementation
//!
//! Minimizing `Σ wₖ·|yₖ - P(xₖ)/Q(xₖ)|²` isn't linear in the coefficients. Multiplying through by
//! `Q` gives `Σ wₖ·|yₖ·Q(xₖ) - P(xₖ)|²`, which is. With the constant term of `Q` fixed at 1 (moved
//! to the right hand side), the normal equations of the `numer + denom - 1` free coefficients are:
//!
//! | block (`i <= j`)               | entry                                   |
//! | ------------------------------ | --------------------------------------- |
//! | numerator, numerator           | `S(j, i, 0, 0)`                         |
//! | numerator `i`, denominator `j` | `-conj(S(i + 1, j - numer, 0, 1))`      |
//! | denominator, denominator       | `S(j - numer + 1, i - numer + 1, 1, 1)` |
//!
//! with the right hand side `S(0, i, 1, 0)` for numerator rows and `-S(1, i - numer, 1, 1)` for
//! denominator rows, `S` being the moments of the [`SumTable`].
//!
//! The linearised problem weighs each residual by `|Q(xₖ)|²`, so it isn't the true least squares
//! rational fit. The cross terms pair `conj(x)·xᵃ⁻¹·y` with the numerator powers, which equals
//! `xᵃ·y` only on the real line. For real samples from a rational function of the fitted order,
//! the fit is exact; for complex samples it's an approximation even then.
use std::rc::Rc;
use std::slice;

use log::debug;
use nalgebra::{Complex, RealField};
use num_traits::One;

use crate::error::{Error, Result};
use crate::fitter::{Fitter, Samples};
use crate::linalg::{self, ComplexVector};
use crate::sum_table::{SharedSumTable, SumTable};

#[derive(Debug)]
pub struct PadeFitter<T: RealField> {
    samples: Samples<T>,
    sum_table: SharedSumTable<T>,
    intercept: Option<Complex<T>>,
    numer: usize,
    denom: usize,
}
impl<T: RealField> PadeFitter<T> {
    /// A fitter for `numer` numerator and `denom` denominator coefficients.
    ///
    /// If `intercept` is given, the constant numerator coefficient is fixed to it. As the constant
    /// denominator coefficient is always 1, the fit then passes through `(0, intercept)`.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] if `numer` or `denom` is below 2.
    /// - [`Error::SizeMismatch`] if `x` and `y` have different lengths.
    /// - [`Error::TooFewSamples`] if there are fewer samples than `numer + denom`.
    pub fn new(
        x: &[Complex<T>],
        y: &[Complex<T>],
        numer: usize,
        denom: usize,
        intercept: Option<Complex<T>>,
    ) -> Result<Self> {
        let parameters = Self::parameter_count(numer, denom)?;
        let samples = Samples::new(x, y, parameters)?;
        let sum_table = SumTable::shared(x, y)?;

        Ok(Self {
            samples,
            sum_table,
            intercept,
            numer,
            denom,
        })
    }
    /// Same as [`Self::new`], but uses the samples of `sum_table` and shares its moments.
    ///
    /// Use this to try several orders on the same samples: the moments one fit computes are
    /// reused by the next, as long as the weights stay the same.
    ///
    /// # Errors
    ///
    /// As [`Self::new`], and [`Error::TableInUse`] if `sum_table` is mutably borrowed.
    pub fn with_table(
        sum_table: SharedSumTable<T>,
        numer: usize,
        denom: usize,
        intercept: Option<Complex<T>>,
    ) -> Result<Self> {
        let parameters = Self::parameter_count(numer, denom)?;
        let samples = {
            let table = sum_table.try_borrow().map_err(|_| Error::TableInUse)?;
            Samples::new(table.x().as_slice(), table.y().as_slice(), parameters)?
        };

        Ok(Self {
            samples,
            sum_table,
            intercept,
            numer,
            denom,
        })
    }
    fn parameter_count(numer: usize, denom: usize) -> Result<usize> {
        for (what, actual) in [("numer", numer), ("denom", denom)] {
            if actual < 2 {
                return Err(Error::OutOfRange {
                    what,
                    minimum: 2,
                    actual,
                });
            }
        }
        numer
            .checked_add(denom)
            .ok_or(Error::Overflow { what: "numer + denom" })
    }

    /// Count of numerator coefficients.
    pub fn numer(&self) -> usize {
        self.numer
    }
    /// Count of denominator coefficients, including the constant 1.
    pub fn denom(&self) -> usize {
        self.denom
    }
    pub fn intercept(&self) -> Option<&Complex<T>> {
        self.intercept.as_ref()
    }
    /// The moment table, possibly shared with other fitters.
    pub fn sum_table(&self) -> &SharedSumTable<T> {
        &self.sum_table
    }

    /// Evaluates numerator and denominator separately.
    ///
    /// `parameters` are the `numer` numerator coefficients followed by the `denom` denominator
    /// coefficients, each constant term first.
    pub fn fraction(
        &self,
        x: &Complex<T>,
        parameters: &ComplexVector<T>,
    ) -> Result<(Complex<T>, Complex<T>)> {
        self.samples.check(parameters)?;
        let (numer, denom) = parameters.as_slice().split_at(self.numer);
        Ok((linalg::polynomial(x, numer), linalg::polynomial(x, denom)))
    }

    /// Fits the coefficients, laid out as taken by [`Self::fraction`]. The constant denominator
    /// coefficient is 1.
    ///
    /// `norm_cost` adds `norm_cost · Σw` to the diagonal of the normal equations (ridge
    /// regularisation), which keeps high orders solvable at the cost of a slightly worse fit.
    ///
    /// # Errors
    ///
    /// - [`Error::SizeMismatch`] if `weights` has the wrong length.
    /// - [`Error::Singular`] if the system can't be solved in `T`. High orders on real-valued
    ///   samples quickly need either `norm_cost` or more precision.
    /// - [`Error::TableInUse`] if the shared table is borrowed elsewhere.
    pub fn fit(&mut self, weights: Option<&[T]>, norm_cost: Option<T>) -> Result<ComplexVector<T>> {
        let numer = self.numer;
        let dim = numer + self.denom - 1;
        debug!(
            "fitting Padé ({numer}, {}) to {} samples (intercept fixed: {}, norm cost: {:?}, weighted: {})",
            self.denom,
            self.points(),
            self.intercept.is_some(),
            norm_cost,
            weights.is_some()
        );

        let mut table = self.sum_table.try_borrow_mut().map_err(|_| Error::TableInUse)?;
        table.set_weights(weights)?;

        let mut m = linalg::hermitian(dim, |i, j| {
            if j < numer {
                table.sum(j, i, 0, 0)
            } else if i < numer {
                -table.sum(i + 1, j - numer, 0, 1).conj()
            } else {
                table.sum(j - numer + 1, i - numer + 1, 1, 1)
            }
        });
        let v = ComplexVector::from_fn(dim, |i, _| {
            if i < numer {
                table.sum(0, i, 1, 0)
            } else {
                -table.sum(1, i - numer, 1, 1)
            }
        });

        if let Some(norm_cost) = norm_cost {
            let c = table.sum(0, 0, 0, 0).scale(norm_cost);
            for i in 0..dim {
                m[(i, i)] = m[(i, i)].clone() + c.clone();
            }
        }
        drop(table);

        let (m, v) = match &self.intercept {
            Some(intercept) => linalg::pin_leading(&m, &v, intercept),
            None => (m, v),
        };
        let solved_dim = m.nrows();
        let solution = linalg::solve_hermitian(m, &v)?;
        debug!("solved {solved_dim}x{solved_dim} Padé system");

        let free = match &self.intercept {
            Some(intercept) => linalg::concat(&[slice::from_ref(intercept), solution.as_slice()]),
            None => solution,
        };
        let one = Complex::one();
        let (numerator, denominator) = free.as_slice().split_at(numer);
        Ok(linalg::concat(&[numerator, slice::from_ref(&one), denominator]))
    }
}
impl<T: RealField> Fitter<T> for PadeFitter<T> {
    fn samples(&self) -> &Samples<T> {
        &self.samples
    }
    fn regress(&self, x: &Complex<T>, parameters: &ComplexVector<T>) -> Result<Complex<T>> {
        let (numer, denom) = self.fraction(x, parameters)?;
        Ok(numer / denom)
    }
}

/// Shares `table` between fitters of every `(numer, denom)` in `orders`.
///
/// Convenience for scanning orders on the same samples.
pub fn fitters_for_orders<T: RealField>(
    table: &SharedSumTable<T>,
    orders: impl IntoIterator<Item = (usize, usize)>,
    intercept: Option<Complex<T>>,
) -> Result<Vec<PadeFitter<T>>> {
    orders
        .into_iter()
        .map(|(numer, denom)| PadeFitter::with_table(Rc::clone(table), numer, denom, intercept.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    type C = Complex<f64>;

    /// 40 points on the real line in `[-1, 1)`.
    fn line() -> Vec<C> {
        (0..40).map(|k| C::new((k as f64 - 20.0) / 20.0, 0.0)).collect()
    }
    fn grid() -> Vec<C> {
        let mut x = Vec::new();
        for re in -3..=3 {
            for im in -3..=3 {
                x.push(C::new(re as f64 / 4.0, im as f64 / 4.0));
            }
        }
        x
    }

    // (1 + 0.5x) / (1 - 0.25x + 0.1x²)
    const EXPECTED: [(f64, f64); 5] = [(1.0, 0.0), (0.5, 0.0), (1.0, 0.0), (-0.25, 0.0), (0.1, 0.0)];

    fn rational(&x: &C) -> C {
        (C::new(1.0, 0.0) + x * 0.5) / (C::new(1.0, 0.0) - x * 0.25 + x * x * 0.1)
    }

    fn assert_params(p: &ComplexVector<f64>, tolerance: f64) {
        assert_eq!(p.len(), EXPECTED.len());
        for (p, &(re, im)) in p.iter().zip(EXPECTED.iter()) {
            approx::assert_abs_diff_eq!(p.re, re, epsilon = tolerance);
            approx::assert_abs_diff_eq!(p.im, im, epsilon = tolerance);
        }
    }

    #[test]
    fn recovers_rational() {
        let x = line();
        let y: Vec<C> = x.iter().map(rational).collect();
        let mut fitter = PadeFitter::new(&x, &y, 2, 3, None).unwrap();
        assert_eq!(fitter.parameters(), 5);

        let p = fitter.fit(None, None).unwrap();
        assert_eq!(p[2], C::new(1.0, 0.0));
        assert_params(&p, 1e-10);
        assert!(fitter.cost(&p).unwrap() < 1e-20);

        let (n, d) = fitter.fraction(&x[3], &p).unwrap();
        assert!((n / d - y[3]).norm() < 1e-12);
    }

    #[test]
    fn fixed_intercept() {
        let x = line();
        let y: Vec<C> = x.iter().map(rational).collect();
        let intercept = C::new(1.0, 0.0);
        let mut fitter = PadeFitter::new(&x, &y, 2, 3, Some(intercept)).unwrap();
        let p = fitter.fit(None, None).unwrap();
        assert_eq!(p[0], intercept);
        assert_eq!(p[2], C::new(1.0, 0.0));
        assert_params(&p, 1e-10);
        assert_eq!(fitter.regress(&C::new(0.0, 0.0), &p).unwrap(), intercept);

        // a wrong intercept is still hit exactly
        let intercept = C::new(0.5, 0.25);
        let mut fitter = PadeFitter::new(&x, &y, 2, 3, Some(intercept)).unwrap();
        let p = fitter.fit(None, None).unwrap();
        assert_eq!(fitter.regress(&C::new(0.0, 0.0), &p).unwrap(), intercept);
    }

    #[test]
    fn norm_cost() {
        let x = line();
        let y: Vec<C> = x.iter().map(rational).collect();
        let mut fitter = PadeFitter::new(&x, &y, 2, 3, None).unwrap();

        let plain = fitter.fit(None, None).unwrap();
        assert_eq!(fitter.fit(None, Some(0.0)).unwrap(), plain);

        let free_norm = |p: &ComplexVector<f64>| p.norm_squared() - 1.0;
        let ridge = fitter.fit(None, Some(1.0)).unwrap();
        assert!(free_norm(&ridge) < free_norm(&plain));
        assert!(fitter.cost(&ridge).unwrap() > fitter.cost(&plain).unwrap());
    }

    #[test]
    fn shared_table() {
        let x = line();
        let y: Vec<C> = x.iter().map(rational).collect();
        let table = SumTable::shared(&x, &y).unwrap();

        let mut fitters = fitters_for_orders(&table, [(2, 2), (2, 3), (3, 2)], None).unwrap();
        let results: Vec<_> = fitters
            .iter_mut()
            .map(|fitter| fitter.fit(None, None).unwrap())
            .collect();
        assert!(Rc::ptr_eq(fitters[0].sum_table(), &table));
        // the numerator block of (3, 2) and the denominator block of (2, 3)
        assert!(table.borrow().cached(2, 2, 0, 0).is_some());
        assert!(table.borrow().cached(2, 2, 1, 1).is_some());
        assert!(table.borrow().cached(3, 3, 1, 1).is_none());

        // sharing doesn't change the results
        let mut private = PadeFitter::new(&x, &y, 2, 3, None).unwrap();
        assert_eq!(private.fit(None, None).unwrap(), results[1]);
        assert_params(&results[1], 1e-10);
    }

    #[test]
    fn complex_samples_are_approximated() {
        let x = grid();
        let y: Vec<C> = x.iter().map(rational).collect();
        let mut fitter = PadeFitter::new(&x, &y, 2, 3, Some(C::new(1.0, 0.0))).unwrap();
        let p = fitter.fit(None, None).unwrap();
        assert_eq!(p[2], C::new(1.0, 0.0));
        assert_eq!(fitter.regress(&C::new(0.0, 0.0), &p).unwrap(), C::new(1.0, 0.0));
        assert!(fitter.cost(&p).unwrap().is_finite());
    }

    #[test]
    fn busy_table() {
        let x = line();
        let y: Vec<C> = x.iter().map(rational).collect();
        let table = SumTable::shared(&x, &y).unwrap();
        let mut fitter = PadeFitter::with_table(Rc::clone(&table), 2, 3, None).unwrap();

        let held = table.borrow();
        assert_eq!(fitter.fit(None, None).unwrap_err(), Error::TableInUse);
        drop(held);
        let held = table.borrow_mut();
        assert_eq!(
            PadeFitter::with_table(Rc::clone(&table), 2, 2, None).unwrap_err(),
            Error::TableInUse
        );
        drop(held);

        assert_params(&fitter.fit(None, None).unwrap(), 1e-10);
    }

    #[test]
    fn errors() {
        let x = grid();
        assert_eq!(
            PadeFitter::new(&x, &x, 1, 2, None).unwrap_err(),
            Error::OutOfRange {
                what: "numer",
                minimum: 2,
                actual: 1
            }
        );
        assert_eq!(
            PadeFitter::new(&x, &x, 2, 0, None).unwrap_err(),
            Error::OutOfRange {
                what: "denom",
                minimum: 2,
                actual: 0
            }
        );
        assert_eq!(
            PadeFitter::new(&x, &x, usize::MAX, 2, None).unwrap_err().kind(),
            ErrorKind::Range
        );
        assert_eq!(
            PadeFitter::new(&x[..4], &x[..4], 3, 2, None).unwrap_err(),
            Error::TooFewSamples {
                samples: 4,
                parameters: 5
            }
        );
        assert_eq!(
            PadeFitter::new(&x, &x[1..], 2, 2, None).unwrap_err().kind(),
            ErrorKind::Size
        );

        let mut fitter = PadeFitter::new(&x, &x, 2, 2, None).unwrap();
        assert_eq!(
            fitter.fit(Some(&[1.0; 3][..]), None).unwrap_err().kind(),
            ErrorKind::Size
        );
        let p = ComplexVector::from_element(3, C::new(1.0, 0.0));
        assert_eq!(fitter.regress(&x[0], &p).unwrap_err().kind(), ErrorKind::Size);
        assert_eq!(fitter.fraction(&x[0], &p).unwrap_err().kind(), ErrorKind::Size);
    }
}
