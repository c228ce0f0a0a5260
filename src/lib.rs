//! Weighted least squares fitting of polynomials and Padé (rational) approximants to complex
//! samples, plus Padé approximants of power series.
//!
//! Everything is generic over the real scalar `T: RealField`. Use `f64` for quick fits, and
//! [`BigFloat`] (feature `arbitrary-precision`) when the normal equations of high orders lose more
//! digits than `f64` carries.
//!
//! ```
//! use complex_fitting::{Complex, Fitter, PolynomialFitter};
//!
//! let x: Vec<_> = (0..8).map(|i| Complex::new(i as f64 / 8.0, 0.25)).collect();
//! let y: Vec<_> = x.iter().map(|x| x * x + Complex::new(1.0, -1.0)).collect();
//!
//! let mut fitter = PolynomialFitter::new(&x, &y, 2, None).unwrap();
//! let parameters = fitter.fit(None).unwrap();
//! assert!(fitter.cost(&parameters).unwrap() < 1e-20);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod fitter;
pub mod linalg;
pub mod pade;
pub mod pade_solver;
pub mod polynomial;
pub mod sum_table;
pub mod utils;

#[cfg(feature = "arbitrary-precision")]
#[cfg_attr(docsrs, doc(cfg(feature = "arbitrary-precision")))]
pub mod arbitrary;

pub use nalgebra::Complex;

#[cfg(feature = "arbitrary-precision")]
pub use arbitrary::{default_precision, set_default_precision, BigFloat};
pub use error::{Error, ErrorKind, Result, Solver};
pub use fitter::{Fitter, Samples};
pub use linalg::{polynomial, solve_general, solve_hermitian, ComplexMatrix, ComplexVector};
pub use pade::{fitters_for_orders, PadeFitter};
pub use polynomial::PolynomialFitter;
pub use sum_table::{MomentKey, SharedSumTable, SumTable};
pub use utils::{
    absolute_error, enumerate_pade_coefficients, max_absolute_error, max_relative_error,
    relative_error, standardize_exponent, BinaryFloat,
};
