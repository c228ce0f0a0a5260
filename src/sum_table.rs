//! Memoized moment sums of complex samples.
//!
//! A moment is `Σ wᵢ · xᵢ^a · conj(xᵢ)^b · yᵢ^c · conj(yᵢ)^d`. The normal equations of both the
//! polynomial and the Padé fitter are made of nothing else, so a [`SumTable`] turns the `O(n²·N)`
//! work of building them into `O(n²)` lookups plus one `O(N)` reduction per distinct moment.
//!
//! # Info on implementation
//!
//! Powers of the four sample sequences are kept in separate ladders. The `k`th power is the
//! product of two earlier rungs, `⌈k/2⌉` and `⌊k/2⌋`, so a ladder reaching exponent `n` costs
//! `n - 1` elementwise products and every rung is computed exactly once, no matter in which order
//! the moments are requested.
//!
//! The ladders don't depend on the weights. Changing the weights only drops the scalar cache.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use nalgebra::{Complex, DVector, RealField};
use num_traits::Zero;

use crate::error::{Error, Result};
use crate::linalg::ComplexVector;

/// Exponents `(xn, xn_conj, yn, yn_conj)` of a moment.
pub type MomentKey = (usize, usize, usize, usize);

/// A [`SumTable`] shared by several fitters on the same samples.
///
/// Setting the weights through one holder invalidates the sums for all of them; fits sharing a
/// table must run one after the other.
pub type SharedSumTable<T> = Rc<RefCell<SumTable<T>>>;

/// Powers `v¹, v², …` of a sample vector, grown on demand.
#[derive(Debug, Clone)]
struct PowerLadder<T: RealField> {
    rungs: Vec<ComplexVector<T>>,
}
impl<T: RealField> PowerLadder<T> {
    fn new(base: ComplexVector<T>) -> Self {
        Self { rungs: vec![base] }
    }
    /// Highest exponent available without growing.
    fn top(&self) -> usize {
        self.rungs.len()
    }
    fn grow_to(&mut self, exponent: usize) {
        for i in self.rungs.len()..exponent {
            // rung `i` holds exponent `i + 1`
            let low = (i + 1) / 2 - 1;
            let high = i - low - 1;
            let next = self.rungs[low].component_mul(&self.rungs[high]);
            self.rungs.push(next);
        }
    }
    /// `exponent` must be in `1..=self.top()`.
    fn get(&self, exponent: usize) -> &ComplexVector<T> {
        &self.rungs[exponent - 1]
    }
}

#[derive(Debug, Clone)]
pub struct SumTable<T: RealField> {
    x: ComplexVector<T>,
    y: ComplexVector<T>,
    x_powers: PowerLadder<T>,
    x_conj_powers: PowerLadder<T>,
    y_powers: PowerLadder<T>,
    y_conj_powers: PowerLadder<T>,
    weights: Option<DVector<T>>,
    sums: HashMap<MomentKey, Complex<T>>,
}
impl<T: RealField> SumTable<T> {
    /// Copies the samples.
    ///
    /// # Errors
    ///
    /// [`Error::SizeMismatch`] if `x` and `y` have different lengths.
    pub fn new(x: &[Complex<T>], y: &[Complex<T>]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::SizeMismatch {
                what: "y",
                expected: x.len(),
                actual: y.len(),
            });
        }
        let x = ComplexVector::from_vec(x.to_vec());
        let y = ComplexVector::from_vec(y.to_vec());

        let mut me = Self {
            x_powers: PowerLadder::new(x.clone()),
            x_conj_powers: PowerLadder::new(x.conjugate()),
            y_powers: PowerLadder::new(y.clone()),
            y_conj_powers: PowerLadder::new(y.conjugate()),
            x,
            y,
            weights: None,
            sums: HashMap::new(),
        };
        me.reset_sums();
        Ok(me)
    }
    /// Same as [`Self::new`], wrapped to be handed to several [`crate::PadeFitter`]s.
    pub fn shared(x: &[Complex<T>], y: &[Complex<T>]) -> Result<SharedSumTable<T>> {
        Self::new(x, y).map(|table| Rc::new(RefCell::new(table)))
    }

    pub fn x(&self) -> &ComplexVector<T> {
        &self.x
    }
    pub fn y(&self) -> &ComplexVector<T> {
        &self.y
    }
    /// Count of samples.
    pub fn len(&self) -> usize {
        self.x.len()
    }
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
    pub fn weights(&self) -> Option<&DVector<T>> {
        self.weights.as_ref()
    }
    /// Rebinds the weights. [`None`] weighs every sample with 1.
    ///
    /// All cached sums are dropped; the zero order sum becomes the weight sum. The power ladders
    /// are kept. Setting the current weights again keeps the cached sums, so fitters sharing a
    /// table reuse each other's work.
    ///
    /// # Errors
    ///
    /// [`Error::SizeMismatch`] if `weights` doesn't have one entry per sample. The table is left
    /// untouched.
    pub fn set_weights(&mut self, weights: Option<&[T]>) -> Result<()> {
        if let Some(weights) = weights {
            if weights.len() != self.len() {
                return Err(Error::SizeMismatch {
                    what: "weights",
                    expected: self.len(),
                    actual: weights.len(),
                });
            }
        }
        let unchanged = match (&self.weights, weights) {
            (None, None) => true,
            (Some(current), Some(weights)) => current.as_slice() == weights,
            _ => false,
        };
        if unchanged {
            return Ok(());
        }
        self.weights = weights.map(|weights| DVector::from_vec(weights.to_vec()));
        self.reset_sums();
        Ok(())
    }
    fn reset_sums(&mut self) {
        let zero_order = match &self.weights {
            Some(weights) => weights.sum(),
            None => nalgebra::convert(self.len() as f64),
        };
        self.sums.clear();
        self.sums.insert((0, 0, 0, 0), Complex::new(zero_order, T::zero()));
    }

    /// The sum if it's already been computed.
    pub fn cached(
        &self,
        xn: usize,
        xn_conj: usize,
        yn: usize,
        yn_conj: usize,
    ) -> Option<&Complex<T>> {
        self.sums.get(&(xn, xn_conj, yn, yn_conj))
    }

    /// `Σ wᵢ · xᵢ^xn · conj(xᵢ)^xn_conj · yᵢ^yn · conj(yᵢ)^yn_conj`.
    ///
    /// Computed on the first request for these exponents, then answered from the cache until the
    /// weights change.
    pub fn sum(&mut self, xn: usize, xn_conj: usize, yn: usize, yn_conj: usize) -> Complex<T> {
        let key = (xn, xn_conj, yn, yn_conj);
        if let Some(sum) = self.sums.get(&key) {
            return sum.clone();
        }

        let ladders = [
            (&mut self.x_powers, xn),
            (&mut self.x_conj_powers, xn_conj),
            (&mut self.y_powers, yn),
            (&mut self.y_conj_powers, yn_conj),
        ];
        let mut product: Option<ComplexVector<T>> = None;
        for (ladder, exponent) in ladders {
            if exponent == 0 {
                continue;
            }
            if exponent > ladder.top() {
                log::trace!("growing power ladder from {} to {exponent}", ladder.top());
                ladder.grow_to(exponent);
            }
            let factor = ladder.get(exponent);
            product = Some(match product {
                Some(product) => product.component_mul(factor),
                None => factor.clone(),
            });
        }
        // only `(0, 0, 0, 0)` has no factor, and that one is always cached
        let product = product.unwrap_or_else(|| {
            ComplexVector::from_element(self.len(), Complex::new(T::one(), T::zero()))
        });

        let sum = match &self.weights {
            Some(weights) => product
                .iter()
                .zip(weights.iter())
                .fold(Complex::zero(), |acc, (value, weight)| {
                    acc + value.clone() * weight.clone()
                }),
            None => product.sum(),
        };
        log::trace!("computed moment {key:?}");

        self.sums.insert(key, sum.clone());
        sum
    }
}
