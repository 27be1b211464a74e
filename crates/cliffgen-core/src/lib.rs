//! Geometric algebra over Cl(p, q, r) with symbolically derived operators.
//!
//! Multivectors are sparse: parallel lists of bitmask blade keys and
//! coefficients. Every binary product is derived once per pair of key
//! lists by running it on placeholder symbols, simplified, compiled to a
//! kernel and cached on the `Algebra`. Later calls with the same key
//! layout only evaluate the kernel, whether the coefficients are `f64`,
//! `ndarray` batches or symbolic `Expr`s.
//!
//! Inverses use Shirokov's method; duals are polarity or Hodge depending
//! on the number of degenerate directions.

pub mod algebra;
pub mod batch;
pub mod config;
pub mod derive;
pub mod duality;
pub mod error;
pub mod multivector;
pub mod specialize;

pub use algebra::{Algebra, Key, MAX_DIMENSION, shirokov_size};
pub use batch::BatchMultiVector;
pub use cliffgen_sym::{Backend, Coefficient, CompileFlags, Expr, SymError, Symbol, TapeBackend};
pub use config::{AlgebraConfig, ENV_CSE, ENV_JIT};
pub use derive::{Contraction, Operator, Terms};
pub use duality::DualKind;
pub use error::{GaError, Result};
pub use multivector::{BladeRef, MultiVector, MultiVectorBuilder};
pub use specialize::Specialized;
