use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::poly::Poly;
use crate::symbol::Symbol;

/// Symbolic expression: a quotient of two polynomials.
///
/// Every constructor and operator returns the normalized form:
/// - zero is `0 / 1`,
/// - a constant denominator is folded into the numerator,
/// - any other denominator is scaled to have a leading coefficient of 1.
///
/// Polynomial expressions (denominator 1) therefore compare equal exactly
/// when they are equal as polynomials, and `is_zero` is a complete test for
/// symbolic cancellation. Common polynomial factors between numerator and
/// denominator are not cancelled.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Expr {
    num: Poly,
    den: Poly,
}

impl Expr {
    pub fn zero() -> Self {
        Self {
            num: Poly::zero(),
            den: Poly::one(),
        }
    }

    pub fn one() -> Self {
        Self::constant(BigRational::one())
    }

    pub fn symbol(name: &str) -> Self {
        Self::from_symbol(Symbol::new(name))
    }

    pub fn from_symbol(symbol: Symbol) -> Self {
        Self {
            num: Poly::var(symbol),
            den: Poly::one(),
        }
    }

    pub fn constant(value: BigRational) -> Self {
        Self {
            num: Poly::constant(value),
            den: Poly::one(),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::constant(BigRational::from_integer(BigInt::from(value)))
    }

    /// Exact fraction `numer / denom`.
    ///
    /// # Panics
    /// Panics if `denom` is zero.
    pub fn ratio(numer: i64, denom: i64) -> Self {
        Self::constant(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    /// Build `num / den` in normalized form.
    ///
    /// # Panics
    /// Panics if `den` is the zero polynomial.
    pub fn from_parts(num: Poly, den: Poly) -> Self {
        assert!(!den.is_zero(), "division by an expression that is identically zero");
        if num.is_zero() {
            return Self::zero();
        }
        if let Some(c) = den.as_constant() {
            if c.is_one() {
                return Self { num, den };
            }
            return Self {
                num: num.scale(&c.recip()),
                den: Poly::one(),
            };
        }
        let lead = den
            .leading_coefficient()
            .cloned()
            .unwrap_or_else(BigRational::one);
        let (num, den) = if lead.is_one() {
            (num, den)
        } else {
            let inv = lead.recip();
            (num.scale(&inv), den.scale(&inv))
        };
        if num == den {
            return Self::one();
        }
        Self { num, den }
    }

    pub fn numerator(&self) -> &Poly {
        &self.num
    }

    pub fn denominator(&self) -> &Poly {
        &self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn is_polynomial(&self) -> bool {
        self.den.is_one()
    }

    /// The value of a symbol-free expression.
    pub fn as_constant(&self) -> Option<BigRational> {
        if self.is_polynomial() {
            self.num.as_constant()
        } else {
            None
        }
    }

    /// The symbol, if this expression is exactly one bare symbol.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        if !self.is_polynomial() || self.num.len() != 1 {
            return None;
        }
        let (mono, coeff) = self.num.terms().next()?;
        match mono.factors() {
            [(sym, 1)] if coeff.is_one() => Some(sym),
            _ => None,
        }
    }

    /// Re-normalize. Expressions are always kept in normal form, so this is
    /// the identity on values built through the public API; it exists so
    /// callers can state where a simplification step belongs.
    pub fn simplify(&self) -> Self {
        Self::from_parts(self.num.clone(), self.den.clone())
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut syms = self.num.free_symbols();
        syms.extend(self.den.free_symbols());
        syms
    }

    pub fn scale(&self, factor: &BigRational) -> Self {
        Self::from_parts(self.num.scale(factor), self.den.clone())
    }
}

impl Default for Expr {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

impl From<BigRational> for Expr {
    fn from(value: BigRational) -> Self {
        Self::constant(value)
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Self::from_symbol(symbol)
    }
}

impl Add for &Expr {
    type Output = Expr;

    fn add(self, rhs: &Expr) -> Expr {
        if self.den == rhs.den {
            return Expr::from_parts(&self.num + &rhs.num, self.den.clone());
        }
        let num = &(&self.num * &rhs.den) + &(&rhs.num * &self.den);
        Expr::from_parts(num, &self.den * &rhs.den)
    }
}

impl Sub for &Expr {
    type Output = Expr;

    fn sub(self, rhs: &Expr) -> Expr {
        if self.den == rhs.den {
            return Expr::from_parts(&self.num - &rhs.num, self.den.clone());
        }
        let num = &(&self.num * &rhs.den) - &(&rhs.num * &self.den);
        Expr::from_parts(num, &self.den * &rhs.den)
    }
}

impl Mul for &Expr {
    type Output = Expr;

    fn mul(self, rhs: &Expr) -> Expr {
        if self.is_polynomial() && rhs.is_polynomial() {
            return Expr::from_parts(&self.num * &rhs.num, Poly::one());
        }
        Expr::from_parts(&self.num * &rhs.num, &self.den * &rhs.den)
    }
}

/// # Panics
/// Panics if `rhs` is identically zero.
impl Div for &Expr {
    type Output = Expr;

    fn div(self, rhs: &Expr) -> Expr {
        assert!(!rhs.is_zero(), "division by an expression that is identically zero");
        Expr::from_parts(&self.num * &rhs.den, &self.den * &rhs.num)
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr {
            num: -&self.num,
            den: self.den.clone(),
        }
    }
}

macro_rules! forward_owned_binop {
    ($($trait:ident :: $method:ident),*) => {$(
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                (&self).$method(rhs)
            }
        }
    )*};
}

forward_owned_binop!(Add::add, Sub::sub, Mul::mul, Div::div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        -&self
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_polynomial() {
            write!(f, "{}", self.num)
        } else {
            write!(f, "({}) / ({})", self.num, self.den)
        }
    }
}
