//! Polarity and Hodge duality.

use std::str::FromStr;

use cliffgen_sym::Coefficient;

use crate::algebra::Algebra;
use crate::error::{GaError, Result};
use crate::multivector::{MultiVector, signed};

/// Which dual to apply. `Auto` picks polarity for non-degenerate algebras
/// and Hodge when there is exactly one degenerate direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DualKind {
    #[default]
    Auto,
    Polarity,
    Hodge,
}

impl FromStr for DualKind {
    type Err = GaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(DualKind::Auto),
            "polarity" => Ok(DualKind::Polarity),
            "hodge" => Ok(DualKind::Hodge),
            other => Err(GaError::Duality(format!("no dual found for kind `{other}`"))),
        }
    }
}

enum Resolved {
    Polarity,
    Hodge,
}

impl Algebra {
    fn resolve_dual(&self, kind: DualKind) -> Result<Resolved> {
        match kind {
            DualKind::Polarity => Ok(Resolved::Polarity),
            DualKind::Hodge => Ok(Resolved::Hodge),
            DualKind::Auto => match self.degenerate() {
                0 => Ok(Resolved::Polarity),
                1 => Ok(Resolved::Hodge),
                r => Err(GaError::Duality(format!(
                    "cannot pick a dual automatically with {r} degenerate directions"
                ))),
            },
        }
    }
}

impl<T: Coefficient> MultiVector<'_, T> {
    /// Polarity: `self / I`. Hodge: key `k` maps to its complement with
    /// the sign of `e_k * e_complement`.
    pub fn dual(&self, kind: DualKind) -> Result<Self> {
        match self.algebra().resolve_dual(kind)? {
            Resolved::Polarity => self.div(&self.algebra().pss()),
            Resolved::Hodge => Ok(self.hodge(false)),
        }
    }

    /// Inverse of `dual`. Polarity: `self * I`.
    pub fn undual(&self, kind: DualKind) -> Result<Self> {
        match self.algebra().resolve_dual(kind)? {
            Resolved::Polarity => self.gp(&self.algebra().pss()),
            Resolved::Hodge => Ok(self.hodge(true)),
        }
    }

    fn hodge(&self, inverse: bool) -> Self {
        let algebra = self.algebra();
        let top = algebra.blade_count() - 1;
        let (keys, values) = self
            .items()
            .map(|(k, v)| {
                let complement = top - k;
                let sign = if inverse {
                    algebra.sign(complement, k)
                } else {
                    algebra.sign(k, complement)
                };
                (complement, signed(v, sign))
            })
            .unzip();
        MultiVector::from_trusted(algebra, keys, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_kind() {
        assert_eq!("hodge".parse::<DualKind>().unwrap(), DualKind::Hodge);
        assert_eq!("auto".parse::<DualKind>().unwrap(), DualKind::Auto);
        assert!(matches!(
            "star".parse::<DualKind>(),
            Err(GaError::Duality(_))
        ));
    }

    #[test]
    fn test_polarity_dual_of_vector() {
        // e1 / e123 = e1 * -e123 = -e23
        let alg = Algebra::new(3, 0, 0).unwrap();
        let e1 = alg.blade("e1", 1.0).unwrap();
        let d = e1.dual(DualKind::Auto).unwrap();
        assert_relative_eq!(d.get("e23").unwrap(), -1.0);
        assert_eq!(d.undual(DualKind::Auto).unwrap(), e1);
    }

    #[test]
    fn test_hodge_dual_in_pga() {
        let alg = Algebra::new(2, 0, 1).unwrap();
        let e0 = alg.blade("e0", 1.0).unwrap();
        let d = e0.dual(DualKind::Auto).unwrap();
        // e0 * e12 = e012
        assert_eq!(d.keys(), &[0b110]);
        assert_relative_eq!(d.get("e12").unwrap(), 1.0);
        assert_eq!(d.undual(DualKind::Auto).unwrap(), e0);
    }

    #[test]
    fn test_auto_fails_with_two_degenerate_directions() {
        let alg = Algebra::new(1, 0, 2).unwrap();
        let x = alg.blade(1usize, 1.0).unwrap();
        assert!(matches!(x.dual(DualKind::Auto), Err(GaError::Duality(_))));
        assert!(x.dual(DualKind::Hodge).is_ok());
    }
}
