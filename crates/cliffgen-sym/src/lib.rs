//! Symbolic expressions and compiled evaluation kernels for cliffgen.
//!
//! `Expr` is a canonical rational function over named symbols with exact
//! rational coefficients, so two expressions are equal exactly when their
//! canonical forms are. `Backend::compile` lowers an ordered parameter list
//! and a list of expressions into a `Kernel`, an instruction tape that
//! evaluates over any `Coefficient` ring: plain `f64`, batched `ndarray`
//! columns, or `Expr` itself.
//!
//! Zero I/O. Pure math with no opinions about where formulas come from.

pub mod backend;
pub mod coefficient;
pub mod error;
pub mod expr;
pub mod kernel;
pub mod poly;
pub mod symbol;

pub use backend::{Backend, CompileFlags, TapeBackend};
pub use coefficient::Coefficient;
pub use error::SymError;
pub use expr::Expr;
pub use kernel::{Instr, Kernel};
pub use num_rational::BigRational;
pub use poly::{Monomial, Poly};
pub use symbol::Symbol;
