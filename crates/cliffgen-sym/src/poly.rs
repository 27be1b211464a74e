use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::symbol::Symbol;

/// Product of symbols raised to positive powers.
///
/// Factors are kept sorted by symbol with no repeats, so structurally equal
/// monomials are equal values. The empty monomial is the constant 1.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Monomial(Vec<(Symbol, u32)>);

impl Monomial {
    pub fn one() -> Self {
        Self(Vec::new())
    }

    pub fn var(symbol: Symbol) -> Self {
        Self(vec![(symbol, 1)])
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    pub fn factors(&self) -> &[(Symbol, u32)] {
        &self.0
    }

    pub fn degree(&self) -> u32 {
        self.0.iter().map(|(_, p)| p).sum()
    }

    /// Merge two sorted factor lists, adding powers of shared symbols.
    fn product(&self, other: &Self) -> Self {
        let mut out = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            let (a, b) = (&self.0[i], &other.0[j]);
            match a.0.cmp(&b.0) {
                std::cmp::Ordering::Less => {
                    out.push(a.clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(b.clone());
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    out.push((a.0.clone(), a.1 + b.1));
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&self.0[i..]);
        out.extend_from_slice(&other.0[j..]);
        Self(out)
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, (sym, pow)) in self.0.iter().enumerate() {
            if n > 0 {
                f.write_str("*")?;
            }
            if *pow == 1 {
                write!(f, "{sym}")?;
            } else {
                write!(f, "{sym}^{pow}")?;
            }
        }
        Ok(())
    }
}

/// Multivariate polynomial with exact rational coefficients.
///
/// Canonical: no term ever carries a zero coefficient, so the zero
/// polynomial is the empty map and equality is structural.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Poly {
    terms: BTreeMap<Monomial, BigRational>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(BigRational::one())
    }

    pub fn constant(value: BigRational) -> Self {
        let mut terms = BTreeMap::new();
        if !value.is_zero() {
            terms.insert(Monomial::one(), value);
        }
        Self { terms }
    }

    pub fn var(symbol: Symbol) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(Monomial::var(symbol), BigRational::one());
        Self { terms }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.as_constant().is_some_and(|c| c.is_one())
    }

    /// The constant value, if this polynomial has no variable terms.
    pub fn as_constant(&self) -> Option<BigRational> {
        match self.terms.len() {
            0 => Some(BigRational::zero()),
            1 => self.terms.get(&Monomial::one()).cloned(),
            _ => None,
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &BigRational)> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Coefficient of the greatest monomial; used to make denominators monic.
    pub fn leading_coefficient(&self) -> Option<&BigRational> {
        self.terms.values().next_back()
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        self.terms
            .keys()
            .flat_map(|m| m.factors().iter().map(|(s, _)| s.clone()))
            .collect()
    }

    pub fn scale(&self, factor: &BigRational) -> Self {
        if factor.is_zero() {
            return Self::zero();
        }
        Self {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), c * factor))
                .collect(),
        }
    }

    fn accumulate(terms: &mut BTreeMap<Monomial, BigRational>, mono: Monomial, coeff: BigRational) {
        match terms.entry(mono) {
            Entry::Vacant(slot) => {
                if !coeff.is_zero() {
                    slot.insert(coeff);
                }
            }
            Entry::Occupied(mut slot) => {
                *slot.get_mut() += coeff;
                if slot.get().is_zero() {
                    slot.remove();
                }
            }
        }
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: &Poly) -> Poly {
        let mut terms = self.terms.clone();
        for (m, c) in &rhs.terms {
            Poly::accumulate(&mut terms, m.clone(), c.clone());
        }
        Poly { terms }
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: &Poly) -> Poly {
        let mut terms = self.terms.clone();
        for (m, c) in &rhs.terms {
            Poly::accumulate(&mut terms, m.clone(), -c.clone());
        }
        Poly { terms }
    }
}

impl Mul for &Poly {
    type Output = Poly;

    fn mul(self, rhs: &Poly) -> Poly {
        let mut terms = BTreeMap::new();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &rhs.terms {
                Poly::accumulate(&mut terms, ma.product(mb), ca * cb);
            }
        }
        Poly { terms }
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        Poly {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), -c.clone()))
                .collect(),
        }
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("0");
        }
        for (n, (mono, coeff)) in self.terms.iter().enumerate() {
            let magnitude = coeff.abs();
            if n == 0 {
                if coeff.is_negative() {
                    f.write_str("-")?;
                }
            } else if coeff.is_negative() {
                f.write_str(" - ")?;
            } else {
                f.write_str(" + ")?;
            }
            match (mono.is_one(), magnitude.is_one()) {
                (true, _) => write!(f, "{magnitude}")?,
                (false, true) => write!(f, "{mono}")?,
                (false, false) => write!(f, "{magnitude}*{mono}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn var(name: &str) -> Poly {
        Poly::var(Symbol::new(name))
    }

    fn int(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    #[test]
    fn test_cancellation_drops_term() {
        let a = var("a");
        let b = var("b");
        let sum = &(&a + &b) - &a;
        assert_eq!(sum, b);
        assert_eq!(sum.len(), 1);
    }

    #[test]
    fn test_product_merges_powers() {
        let a = var("a");
        let b = var("b");
        let sq = &(&a + &b) * &(&a + &b);
        // a^2 + 2ab + b^2
        assert_eq!(sq.len(), 3);
        let cross: Vec<_> = sq.terms().filter(|(m, _)| m.factors().len() == 2).collect();
        assert_eq!(cross.len(), 1);
        assert_eq!(cross[0].1, &int(2));
    }

    #[test]
    fn test_difference_of_squares_is_zero() {
        let a = var("a");
        let b = var("b");
        let lhs = &(&a + &b) * &(&a - &b);
        let rhs = &(&a * &a) - &(&b * &b);
        assert!((&lhs - &rhs).is_zero());
    }

    #[test]
    fn test_constant_detection() {
        assert_eq!(Poly::zero().as_constant(), Some(int(0)));
        assert_eq!(Poly::constant(int(3)).as_constant(), Some(int(3)));
        assert_eq!(var("x").as_constant(), None);
        assert!(Poly::one().is_one());
    }

    #[test]
    fn test_scale_by_zero() {
        assert!(var("a").scale(&int(0)).is_zero());
    }

    #[test]
    fn test_display() {
        let a = var("a");
        let b = var("b");
        let p = &(&a.scale(&int(2)) - &b) + &Poly::constant(int(1));
        assert_eq!(p.to_string(), "1 + 2*a - b");
    }
}
