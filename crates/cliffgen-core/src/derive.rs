//! Symbolic derivation of operators.
//!
//! Every operator is derived once per key signature by running it on
//! placeholder multivectors whose coefficients are fresh symbols. The
//! result is a map from output key to a canonical expression in those
//! symbols; entries that simplify to zero are dropped.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use cliffgen_sym::Expr;

use crate::algebra::Key;
use crate::duality::DualKind;
use crate::error::{GaError, Result};
use crate::multivector::{MultiVector, signed};

/// Output key to coefficient expression, ascending by key.
pub type Terms = BTreeMap<Key, Expr>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Geometric,
    Sandwich,
    Commutator,
    Anticommutator,
    Inner,
    LeftContraction,
    RightContraction,
    Scalar,
    Projection,
    Outer,
    Regressive,
    Inverse,
    NormSquared,
}

impl Operator {
    /// Operators taking a single operand.
    pub fn is_unary(self) -> bool {
        matches!(self, Operator::Inverse | Operator::NormSquared)
    }
}

/// Which blade pairs an inner-product family member keeps.
///
/// With `ei`, `ej` the operand keys, the pair contributes when
/// `ei ^ ej` equals `|ei - ej|` (symmetric), `ej - ei` (left),
/// `ei - ej` (right) or `0` (scalar).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contraction {
    Symmetric,
    Left,
    Right,
    Scalar,
}

impl Contraction {
    fn admits(self, ei: Key, ej: Key) -> bool {
        let diff = ei as i64 - ej as i64;
        let target = match self {
            Contraction::Symmetric => diff.abs(),
            Contraction::Left => -diff,
            Contraction::Right => diff,
            Contraction::Scalar => 0,
        };
        (ei ^ ej) as i64 == target
    }
}

type Placeholder<'a> = MultiVector<'a, Expr>;

pub fn binary(operator: Operator, x: &Placeholder<'_>, y: &Placeholder<'_>) -> Result<Terms> {
    match operator {
        Operator::Geometric => Ok(gp(x, y)),
        Operator::Sandwich => Ok(conj(x, y)),
        Operator::Commutator => Ok(cp(x, y)),
        Operator::Anticommutator => acp(x, y),
        Operator::Inner => Ok(ip(x, y, Contraction::Symmetric)),
        Operator::LeftContraction => Ok(ip(x, y, Contraction::Left)),
        Operator::RightContraction => Ok(ip(x, y, Contraction::Right)),
        Operator::Scalar => Ok(ip(x, y, Contraction::Scalar)),
        Operator::Projection => Ok(proj(x, y)),
        Operator::Outer => Ok(op(x, y)),
        Operator::Regressive => rp(x, y),
        Operator::Inverse | Operator::NormSquared => Err(GaError::Unsupported(format!(
            "{operator:?} takes a single operand"
        ))),
    }
}

pub fn unary(operator: Operator, x: &Placeholder<'_>, max_iterations: usize) -> Result<Terms> {
    match operator {
        Operator::Inverse => inv(x, max_iterations),
        Operator::NormSquared => Ok(gp(x, &x.reverse())),
        _ => Err(GaError::Unsupported(format!("{operator:?} takes two operands"))),
    }
}

fn accumulate(acc: &mut Terms, key: Key, term: Expr) {
    match acc.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(term);
        }
        Entry::Occupied(mut slot) => {
            let sum = slot.get() + &term;
            *slot.get_mut() = sum;
        }
    }
}

/// Drop entries that cancelled.
fn finish(acc: Terms) -> Terms {
    acc.into_iter()
        .map(|(k, v)| (k, v.simplify()))
        .filter(|(_, v)| !v.is_zero())
        .collect()
}

pub fn gp(x: &Placeholder<'_>, y: &Placeholder<'_>) -> Terms {
    let alg = x.algebra();
    let mut acc = Terms::new();
    for (ei, vi) in x.items() {
        for (ej, vj) in y.items() {
            let sign = alg.sign(ei, ej);
            if sign == 0 {
                continue;
            }
            accumulate(&mut acc, ei ^ ej, signed(&(vi * vj), sign));
        }
    }
    finish(acc)
}

/// `x * y * ~x`.
pub fn conj(x: &Placeholder<'_>, y: &Placeholder<'_>) -> Terms {
    let xy = MultiVector::from_terms(x.algebra(), gp(x, y));
    gp(&xy, &x.reverse())
}

/// `x * (y/2) - y * (x/2)`.
pub fn cp(x: &Placeholder<'_>, y: &Placeholder<'_>) -> Terms {
    let half = Expr::ratio(1, 2);
    let mut acc = gp(x, &y.scale(&half));
    for (k, v) in gp(y, &x.scale(&half)) {
        accumulate(&mut acc, k, -v);
    }
    finish(acc)
}

pub fn acp(_x: &Placeholder<'_>, _y: &Placeholder<'_>) -> Result<Terms> {
    Err(GaError::Unsupported(
        "anticommutator product is not implemented".into(),
    ))
}

/// Inner-product family; `rule` picks which blade pairs survive.
pub fn ip(x: &Placeholder<'_>, y: &Placeholder<'_>, rule: Contraction) -> Terms {
    let alg = x.algebra();
    let mut acc = Terms::new();
    for (ei, vi) in x.items() {
        for (ej, vj) in y.items() {
            if !rule.admits(ei, ej) {
                continue;
            }
            let sign = alg.sign(ei, ej);
            if sign == 0 {
                continue;
            }
            accumulate(&mut acc, ei ^ ej, signed(&(vi * vj), sign));
        }
    }
    finish(acc)
}

/// `(x . y) * ~y`.
pub fn proj(x: &Placeholder<'_>, y: &Placeholder<'_>) -> Terms {
    let inner = MultiVector::from_terms(x.algebra(), ip(x, y, Contraction::Symmetric));
    gp(&inner, &y.reverse())
}

/// Keeps pairs with no shared basis vector; sign from reordering parity only.
pub fn op(x: &Placeholder<'_>, y: &Placeholder<'_>) -> Terms {
    let alg = x.algebra();
    let mut acc = Terms::new();
    for (ei, vi) in x.items() {
        for (ej, vj) in y.items() {
            if ei ^ ej != ei + ej {
                continue;
            }
            let sign = if alg.swaps(ei, ej) % 2 == 0 { 1 } else { -1 };
            accumulate(&mut acc, ei + ej, signed(&(vi * vj), sign));
        }
    }
    finish(acc)
}

/// `undual(dual(x) ^ dual(y))` under the automatic dual.
pub fn rp(x: &Placeholder<'_>, y: &Placeholder<'_>) -> Result<Terms> {
    let alg = x.algebra();
    let xd = x.dual(DualKind::Auto)?;
    let yd = y.dual(DualKind::Auto)?;
    let wedge = MultiVector::from_terms(alg, op(&xd, &yd));
    let back = wedge.undual(DualKind::Auto)?;
    Ok(finish(back.to_terms()))
}

/// Shirokov's inverse.
///
/// With `k = 2^ceil((d + 1) / 2)` and `x_1 = x`, each step takes
/// `c_i = k * <x_i>_0 / i`, `adj_i = x_i - c_i` and `x_{i+1} = x * adj_i`
/// until `x_i` is a pure scalar. The inverse is `adj / x_i`.
pub fn inv(x: &Placeholder<'_>, max_iterations: usize) -> Result<Terms> {
    let alg = x.algebra();
    let k = Expr::integer(crate::algebra::shirokov_size(alg.dimension()) as i64);

    let mut current = finish(x.to_terms());
    if current.is_empty() {
        return Err(GaError::NotInvertible);
    }
    let mut adj = Terms::from([(0, Expr::one())]);
    let mut i = 1usize;
    while current.keys().any(|&key| key != 0) {
        if i > max_iterations {
            tracing::warn!("inverse did not reach a scalar after {max_iterations} iterations");
            return Err(GaError::NonTermination {
                iterations: max_iterations,
            });
        }
        let scalar = current.get(&0).cloned().unwrap_or_else(Expr::zero);
        let c = &(&k * &scalar) / &Expr::integer(i as i64);
        adj = current;
        accumulate(&mut adj, 0, -c);
        adj = finish(adj);
        current = gp(x, &MultiVector::from_terms(alg, adj.clone()));
        i += 1;
    }

    let Some(denominator) = current.get(&0) else {
        return Err(GaError::NotInvertible);
    };
    tracing::debug!("inverse reached a scalar after {} iterations", i - 1);
    Ok(finish(
        adj.into_iter().map(|(key, v)| (key, &v / denominator)).collect(),
    ))
}
