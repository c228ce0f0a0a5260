//! The contract shared by all fitters: a model evaluated at a single point, with everything else
//! derived from that.
use nalgebra::{Complex, RealField};

use crate::error::{Error, Result};
use crate::linalg::ComplexVector;

/// The samples a fitter works on, and the count of parameters of its model.
///
/// Owns copies of the sample vectors, so the caller can't change them under a fitter.
#[derive(Debug, Clone)]
pub struct Samples<T: RealField> {
    x: ComplexVector<T>,
    y: ComplexVector<T>,
    parameters: usize,
}
impl<T: RealField> Samples<T> {
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] if `parameters == 0`.
    /// - [`Error::SizeMismatch`] if `x` and `y` have different lengths.
    /// - [`Error::TooFewSamples`] if there are fewer samples than `parameters`.
    pub fn new(x: &[Complex<T>], y: &[Complex<T>], parameters: usize) -> Result<Self> {
        if parameters < 1 {
            return Err(Error::OutOfRange {
                what: "parameters",
                minimum: 1,
                actual: parameters,
            });
        }
        if x.len() != y.len() {
            return Err(Error::SizeMismatch {
                what: "y",
                expected: x.len(),
                actual: y.len(),
            });
        }
        if x.len() < parameters {
            return Err(Error::TooFewSamples {
                samples: x.len(),
                parameters,
            });
        }
        Ok(Self {
            x: ComplexVector::from_vec(x.to_vec()),
            y: ComplexVector::from_vec(y.to_vec()),
            parameters,
        })
    }
    pub fn x(&self) -> &ComplexVector<T> {
        &self.x
    }
    pub fn y(&self) -> &ComplexVector<T> {
        &self.y
    }
    /// Count of samples.
    pub fn points(&self) -> usize {
        self.x.len()
    }
    /// Count of model parameters.
    pub fn parameters(&self) -> usize {
        self.parameters
    }
    /// Fails with [`Error::SizeMismatch`] unless `parameters` has the model's length.
    pub fn check(&self, parameters: &ComplexVector<T>) -> Result<()> {
        if parameters.len() == self.parameters {
            Ok(())
        } else {
            Err(Error::SizeMismatch {
                what: "parameters",
                expected: self.parameters,
                actual: parameters.len(),
            })
        }
    }
}

/// A model fitted to complex samples.
///
/// Implementors provide [`Self::regress`] for a single point; residuals, cost, and evaluation over
/// many points follow from it.
pub trait Fitter<T: RealField> {
    fn samples(&self) -> &Samples<T>;

    /// Evaluates the model with `parameters` at `x`.
    ///
    /// # Errors
    ///
    /// [`Error::SizeMismatch`] if `parameters` doesn't have the model's length.
    fn regress(&self, x: &Complex<T>, parameters: &ComplexVector<T>) -> Result<Complex<T>>;

    fn x(&self) -> &ComplexVector<T> {
        self.samples().x()
    }
    fn y(&self) -> &ComplexVector<T> {
        self.samples().y()
    }
    /// Count of samples.
    fn points(&self) -> usize {
        self.samples().points()
    }
    /// Count of model parameters.
    fn parameters(&self) -> usize {
        self.samples().parameters()
    }

    /// [`Self::regress`] for every entry of `xs`.
    fn regress_all(
        &self,
        xs: &ComplexVector<T>,
        parameters: &ComplexVector<T>,
    ) -> Result<ComplexVector<T>> {
        let ys = xs
            .iter()
            .map(|x| self.regress(x, parameters))
            .collect::<Result<Vec<_>>>()?;
        Ok(ComplexVector::from_vec(ys))
    }

    /// The residuals, `regress(xᵢ) - yᵢ` for every sample.
    fn error(&self, parameters: &ComplexVector<T>) -> Result<ComplexVector<T>> {
        self.samples().check(parameters)?;
        Ok(self.regress_all(self.x(), parameters)? - self.y())
    }

    /// Sum of squared magnitudes of the residuals.
    fn cost(&self, parameters: &ComplexVector<T>) -> Result<T> {
        Ok(self.error(parameters)?.norm_squared())
    }
}
