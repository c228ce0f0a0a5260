//! Weighted least squares polynomials, `y ≈ Σ cₖ·xᵏ`.
//!
//! # Info on implementation
//!
//! The normal equations of the monomial basis are the Gram matrix `M[i, j] = Σ wₖ·conj(xₖ)ⁱ·xₖʲ`
//! and the projections `v[i] = Σ wₖ·conj(xₖ)ⁱ·yₖ`, both plain lookups in a [`SumTable`].
//!
//! A fixed intercept `c₀` is subtracted from `y` up front. The remaining coefficients then fit the
//! shifted samples through the origin, which is the same system with every power raised by one.
use std::slice;

use log::debug;
use nalgebra::{Complex, RealField};

use crate::error::{Error, Result};
use crate::fitter::{Fitter, Samples};
use crate::linalg::{self, ComplexVector};
use crate::sum_table::SumTable;

#[derive(Debug, Clone)]
pub struct PolynomialFitter<T: RealField> {
    samples: Samples<T>,
    sum_table: SumTable<T>,
    intercept: Option<Complex<T>>,
    degree: usize,
}
impl<T: RealField> PolynomialFitter<T> {
    /// A fitter for polynomials of `degree` (that's `degree + 1` coefficients).
    ///
    /// If `intercept` is given, the constant coefficient is fixed to it instead of being fitted.
    ///
    /// # Errors
    ///
    /// Fails if `x` and `y` have different lengths or there are fewer samples than coefficients.
    pub fn new(
        x: &[Complex<T>],
        y: &[Complex<T>],
        degree: usize,
        intercept: Option<Complex<T>>,
    ) -> Result<Self> {
        let parameters = degree.checked_add(1).ok_or(Error::Overflow { what: "degree" })?;
        let samples = Samples::new(x, y, parameters)?;

        let sum_table = match &intercept {
            Some(intercept) => {
                let shifted: Vec<_> = y.iter().map(|y| y.clone() - intercept.clone()).collect();
                SumTable::new(x, &shifted)?
            }
            None => SumTable::new(x, y)?,
        };

        Ok(Self {
            samples,
            sum_table,
            intercept,
            degree,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
    pub fn intercept(&self) -> Option<&Complex<T>> {
        self.intercept.as_ref()
    }

    /// Fits the coefficients, constant term first.
    ///
    /// `weights` (one per sample) scale each sample's squared residual. [`None`] weighs all
    /// samples equally.
    ///
    /// # Errors
    ///
    /// - [`Error::SizeMismatch`] if `weights` has the wrong length.
    /// - [`Error::Singular`] if the samples can't tell the coefficients apart (e.g. too many
    ///   coincident points), or the system is too ill-conditioned for `T`.
    pub fn fit(&mut self, weights: Option<&[T]>) -> Result<ComplexVector<T>> {
        self.sum_table.set_weights(weights)?;

        let shift = usize::from(self.intercept.is_some());
        let dim = self.degree + 1 - shift;
        debug!(
            "fitting polynomial of degree {} to {} samples (intercept fixed: {}, weighted: {})",
            self.degree,
            self.points(),
            self.intercept.is_some(),
            weights.is_some()
        );

        let table = &mut self.sum_table;
        let m = linalg::hermitian(dim, |i, j| table.sum(j + shift, i + shift, 0, 0));
        let v = ComplexVector::from_fn(dim, |i, _| table.sum(0, i + shift, 1, 0));

        let solution = linalg::solve_hermitian(m, &v)?;
        debug!("solved {dim}x{dim} polynomial system");

        Ok(match &self.intercept {
            Some(intercept) => linalg::concat(&[slice::from_ref(intercept), solution.as_slice()]),
            None => solution,
        })
    }
}
impl<T: RealField> Fitter<T> for PolynomialFitter<T> {
    fn samples(&self) -> &Samples<T> {
        &self.samples
    }
    fn regress(&self, x: &Complex<T>, parameters: &ComplexVector<T>) -> Result<Complex<T>> {
        self.samples.check(parameters)?;
        Ok(linalg::polynomial(x, parameters.as_slice()))
    }
}
