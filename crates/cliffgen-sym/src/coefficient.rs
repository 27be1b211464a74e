use std::collections::BTreeSet;
use std::fmt::Debug;

use ndarray::{ArrayD, IxDyn};
use num_rational::BigRational;
use num_traits::ToPrimitive;

use crate::error::SymError;
use crate::expr::Expr;
use crate::kernel::Kernel;
use crate::symbol::Symbol;

/// A ring of multivector coefficients that kernels can evaluate over.
///
/// Implemented for `f64` (single values), `ArrayD<f64>` (batched columns,
/// combined element-wise with broadcasting) and `Expr` (symbolic values).
/// Method names avoid `add`/`mul` so they never shadow the `std::ops`
/// traits these types already implement.
pub trait Coefficient: Clone + Debug + PartialEq {
    /// Additive identity.
    fn zero() -> Self;

    fn is_zero(&self) -> bool;

    /// Embed an exact rational constant.
    fn constant(value: &BigRational) -> Self;

    fn plus(&self, rhs: &Self) -> Self;

    fn minus(&self, rhs: &Self) -> Self;

    fn times(&self, rhs: &Self) -> Self;

    fn over(&self, rhs: &Self) -> Self;

    fn negated(&self) -> Self;

    /// Whether `self` cannot be divided by. Kernels check every divisor
    /// before dividing.
    fn is_singular(&self) -> bool {
        self.is_zero()
    }

    /// A fresh named symbol, for coefficient types that can hold one.
    fn symbol(_name: &str) -> Option<Self> {
        None
    }

    fn sqrt(&self) -> Option<Self> {
        None
    }

    fn free_symbols(&self) -> BTreeSet<Symbol> {
        BTreeSet::new()
    }

    /// Shape of one coefficient; empty for scalars.
    fn shape(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Evaluate `kernel`. Types with a specialized path override this.
    fn run(kernel: &Kernel, args: &[Self]) -> Result<Vec<Self>, SymError> {
        kernel.eval(args)
    }
}

impl Coefficient for f64 {
    fn zero() -> Self {
        0.0
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn constant(value: &BigRational) -> Self {
        value.to_f64().unwrap_or(f64::NAN)
    }

    fn plus(&self, rhs: &Self) -> Self {
        self + rhs
    }

    fn minus(&self, rhs: &Self) -> Self {
        self - rhs
    }

    fn times(&self, rhs: &Self) -> Self {
        self * rhs
    }

    fn over(&self, rhs: &Self) -> Self {
        self / rhs
    }

    fn negated(&self) -> Self {
        -self
    }

    fn is_singular(&self) -> bool {
        *self == 0.0 || !self.is_finite()
    }

    fn sqrt(&self) -> Option<Self> {
        (*self >= 0.0).then(|| f64::sqrt(*self))
    }

    fn run(kernel: &Kernel, args: &[Self]) -> Result<Vec<Self>, SymError> {
        kernel.eval_f64(args)
    }
}

impl Coefficient for Expr {
    fn zero() -> Self {
        Expr::zero()
    }

    fn is_zero(&self) -> bool {
        Expr::is_zero(self)
    }

    fn constant(value: &BigRational) -> Self {
        Expr::constant(value.clone())
    }

    fn plus(&self, rhs: &Self) -> Self {
        self + rhs
    }

    fn minus(&self, rhs: &Self) -> Self {
        self - rhs
    }

    fn times(&self, rhs: &Self) -> Self {
        self * rhs
    }

    fn over(&self, rhs: &Self) -> Self {
        self / rhs
    }

    fn negated(&self) -> Self {
        -self
    }

    fn symbol(name: &str) -> Option<Self> {
        Some(Expr::symbol(name))
    }

    fn free_symbols(&self) -> BTreeSet<Symbol> {
        Expr::free_symbols(self)
    }
}

/// Batched coefficients. Constants are zero-dimensional arrays and broadcast
/// against any batch shape; mismatched batch shapes panic as in `ndarray`.
impl Coefficient for ArrayD<f64> {
    fn zero() -> Self {
        ArrayD::zeros(IxDyn(&[]))
    }

    fn is_zero(&self) -> bool {
        self.iter().all(|v| *v == 0.0)
    }

    fn constant(value: &BigRational) -> Self {
        ArrayD::from_elem(IxDyn(&[]), value.to_f64().unwrap_or(f64::NAN))
    }

    fn plus(&self, rhs: &Self) -> Self {
        self + rhs
    }

    fn minus(&self, rhs: &Self) -> Self {
        self - rhs
    }

    fn times(&self, rhs: &Self) -> Self {
        self * rhs
    }

    fn over(&self, rhs: &Self) -> Self {
        self / rhs
    }

    fn negated(&self) -> Self {
        -self
    }

    /// Singular when any element is.
    fn is_singular(&self) -> bool {
        self.iter().any(|v| *v == 0.0 || !v.is_finite())
    }

    fn sqrt(&self) -> Option<Self> {
        self.iter()
            .all(|v| *v >= 0.0)
            .then(|| self.mapv(f64::sqrt))
    }

    fn shape(&self) -> Vec<usize> {
        ArrayD::shape(self).to_vec()
    }
}
