//! Turns derived terms into compiled kernels.
//!
//! Binary operators take the left operand's coefficients then the right's;
//! unary operators take only their operand's. Outputs follow the ascending
//! key order of the derived terms.

use cliffgen_sym::{Expr, Kernel, Symbol, SymError};

use crate::algebra::{Algebra, Key};
use crate::derive::{self, Operator, Terms};
use crate::error::{GaError, Result};
use crate::multivector::MultiVector;

/// A compiled operator: output keys plus the kernel producing their values.
#[derive(Debug)]
pub struct Specialized {
    pub keys: Vec<Key>,
    pub kernel: Kernel,
}

/// Derive `op` on fresh placeholders for `left` (and `right`) and compile it.
pub(crate) fn derive(
    algebra: &Algebra,
    op: Operator,
    left: &[Key],
    right: &[Key],
) -> Result<Specialized> {
    let x = MultiVector::placeholder(algebra, "a", left);
    if op.is_unary() {
        let terms = derive::unary(op, &x, algebra.max_inverse_iterations())?;
        return unary(&x, terms);
    }
    let y = MultiVector::placeholder(algebra, "b", right);
    let terms = derive::binary(op, &x, &y)?;
    binary(&x, &y, terms)
}

pub fn binary(x: &MultiVector<'_, Expr>, y: &MultiVector<'_, Expr>, terms: Terms) -> Result<Specialized> {
    let mut params = parameters(x)?;
    params.extend(parameters(y)?);
    compile(x.algebra(), &params, terms)
}

pub fn unary(x: &MultiVector<'_, Expr>, terms: Terms) -> Result<Specialized> {
    compile(x.algebra(), &parameters(x)?, terms)
}

/// Kernel over a multivector's own free symbols, sorted by name.
pub fn free(x: &MultiVector<'_, Expr>) -> Result<Specialized> {
    let params: Vec<Symbol> = x.free_symbols().iter().cloned().collect();
    let kernel = x
        .algebra()
        .backend()
        .compile(&params, x.values(), x.algebra().flags())?;
    Ok(Specialized {
        keys: x.keys().to_vec(),
        kernel,
    })
}

/// Each coefficient must be a bare symbol to serve as a positional parameter.
fn parameters(x: &MultiVector<'_, Expr>) -> Result<Vec<Symbol>> {
    x.values()
        .iter()
        .map(|v| {
            v.as_symbol()
                .cloned()
                .ok_or_else(|| GaError::from(SymError::NotAParameter(v.to_string())))
        })
        .collect()
}

fn compile(algebra: &Algebra, params: &[Symbol], terms: Terms) -> Result<Specialized> {
    let (keys, outputs): (Vec<Key>, Vec<Expr>) = terms.into_iter().unzip();
    let kernel = algebra.backend().compile(params, &outputs, algebra.flags())?;
    Ok(Specialized { keys, kernel })
}
