use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Shl, Shr, Sub};
use std::rc::Rc;

use cliffgen_sym::{BigRational, Coefficient, Expr, SymError, Symbol};

use crate::algebra::{Algebra, Key};
use crate::derive::{Operator, Terms};
use crate::error::{GaError, Result};
use crate::specialize::{self, Specialized};

/// A basis blade given either by bitmask key or by canonical name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BladeRef {
    Key(Key),
    Name(String),
}

impl From<Key> for BladeRef {
    fn from(key: Key) -> Self {
        BladeRef::Key(key)
    }
}

impl From<&str> for BladeRef {
    fn from(name: &str) -> Self {
        BladeRef::Name(name.to_string())
    }
}

impl From<String> for BladeRef {
    fn from(name: String) -> Self {
        BladeRef::Name(name)
    }
}

/// A sparse multivector: parallel `keys` and `values`, one coefficient per
/// basis blade present. Absent keys are zero. Keys keep insertion order
/// and never repeat.
#[derive(Clone)]
pub struct MultiVector<'a, T> {
    algebra: &'a Algebra,
    keys: Vec<Key>,
    values: Vec<T>,
    grades: OnceCell<Vec<usize>>,
    symbols: OnceCell<BTreeSet<Symbol>>,
    /// Kernel over this multivector's own free symbols, built on first `call`.
    compiled: OnceCell<Rc<Specialized>>,
}

impl<'a, T: Coefficient> MultiVector<'a, T> {
    /// Caller guarantees distinct, in-range keys and equal lengths.
    pub(crate) fn from_trusted(algebra: &'a Algebra, keys: Vec<Key>, values: Vec<T>) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self {
            algebra,
            keys,
            values,
            grades: OnceCell::new(),
            symbols: OnceCell::new(),
            compiled: OnceCell::new(),
        }
    }

    pub(crate) fn from_terms(algebra: &'a Algebra, terms: BTreeMap<Key, T>) -> Self {
        let (keys, values) = terms.into_iter().unzip();
        Self::from_trusted(algebra, keys, values)
    }

    pub fn algebra(&self) -> &'a Algebra {
        self.algebra
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn items(&self) -> impl Iterator<Item = (Key, &T)> {
        self.keys.iter().copied().zip(self.values.iter())
    }

    pub fn into_parts(self) -> (Vec<Key>, Vec<T>) {
        (self.keys, self.values)
    }

    /// Number of stored blades.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `[len, ..value shape]`. Batch dimensions come from the first value
    /// that has any; zero-dimensional values broadcast.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = vec![self.len()];
        if let Some(batch) = self.values.iter().map(Coefficient::shape).find(|s| !s.is_empty()) {
            shape.extend(batch);
        }
        shape
    }

    // --- Access ---

    /// Coefficient of `blade`, zero when absent.
    pub fn get(&self, blade: impl Into<BladeRef>) -> Result<T> {
        let key = self.algebra.resolve(&blade.into())?;
        Ok(self.value(key).cloned().unwrap_or_else(T::zero))
    }

    pub fn value(&self, key: Key) -> Option<&T> {
        self.keys.iter().position(|&k| k == key).map(|i| &self.values[i])
    }

    pub fn contains(&self, blade: impl Into<BladeRef>) -> Result<bool> {
        let key = self.algebra.resolve(&blade.into())?;
        Ok(self.keys.contains(&key))
    }

    /// Sorted distinct grades of the stored keys.
    pub fn grades(&self) -> &[usize] {
        self.grades.get_or_init(|| {
            let set: BTreeSet<usize> = self.keys.iter().map(|k| k.count_ones() as usize).collect();
            set.into_iter().collect()
        })
    }

    /// Only the entries whose grade is in `grades`, in canonical key order.
    pub fn grade(&self, grades: &[usize]) -> Self {
        let (keys, values) = self
            .algebra
            .indices_for_grades(grades)
            .into_iter()
            .filter_map(|k| self.value(k).map(|v| (k, v.clone())))
            .unzip();
        Self::from_trusted(self.algebra, keys, values)
    }

    pub fn free_symbols(&self) -> &BTreeSet<Symbol> {
        self.symbols
            .get_or_init(|| self.values.iter().flat_map(Coefficient::free_symbols).collect())
    }

    pub fn is_symbolic(&self) -> bool {
        !self.free_symbols().is_empty()
    }

    // --- Linear ---

    fn map_values(&self, f: impl Fn(Key, &T) -> T) -> Self {
        let values = self.items().map(|(k, v)| f(k, v)).collect();
        Self::from_trusted(self.algebra, self.keys.clone(), values)
    }

    pub fn negate(&self) -> Self {
        self.map_values(|_, v| v.negated())
    }

    /// Reversion: grade `g` picks up `(-1)^(g(g-1)/2)`.
    pub fn reverse(&self) -> Self {
        self.map_values(|k, v| {
            let g = k.count_ones();
            if (g * g.saturating_sub(1) / 2) % 2 == 0 {
                v.clone()
            } else {
                v.negated()
            }
        })
    }

    /// Keys of `self` first, then the keys only `other` has.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.combine(other, |a, b| a.plus(b), |b| b.clone())
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.combine(other, |a, b| a.minus(b), |b| b.negated())
    }

    fn combine(
        &self,
        other: &Self,
        both: impl Fn(&T, &T) -> T,
        right_only: impl Fn(&T) -> T,
    ) -> Result<Self> {
        self.same_algebra(other)?;
        let mut keys = self.keys.clone();
        let mut values = self.values.clone();
        for (k, v) in other.items() {
            match keys.iter().position(|&existing| existing == k) {
                Some(i) => values[i] = both(&values[i], v),
                None => {
                    keys.push(k);
                    values.push(right_only(v));
                }
            }
        }
        Ok(Self::from_trusted(self.algebra, keys, values))
    }

    pub fn add_scalar(&self, scalar: &T) -> Self {
        let mut out = self.clone_bare();
        match out.keys.iter().position(|&k| k == 0) {
            Some(i) => out.values[i] = out.values[i].plus(scalar),
            None => {
                out.keys.insert(0, 0);
                out.values.insert(0, scalar.clone());
            }
        }
        out
    }

    pub fn scale(&self, factor: &T) -> Self {
        self.map_values(|_, v| v.times(factor))
    }

    fn clone_bare(&self) -> Self {
        Self::from_trusted(self.algebra, self.keys.clone(), self.values.clone())
    }

    fn same_algebra(&self, other: &Self) -> Result<()> {
        if std::ptr::eq(self.algebra, other.algebra) {
            Ok(())
        } else {
            Err(GaError::Unsupported(
                "operands belong to different algebras".into(),
            ))
        }
    }

    // --- Products ---

    fn binary(&self, op: Operator, other: &Self) -> Result<Self> {
        self.same_algebra(other)?;
        let specialized = self.algebra.specialized(op, &self.keys, &other.keys)?;
        let args: Vec<T> = self.values.iter().chain(&other.values).cloned().collect();
        let values = specialized.kernel.call(&args)?;
        Ok(Self::from_trusted(self.algebra, specialized.keys.clone(), values))
    }

    fn unary(&self, op: Operator) -> Result<Self> {
        let specialized = self.algebra.specialized(op, &self.keys, &[])?;
        let values = specialized.kernel.call(&self.values)?;
        Ok(Self::from_trusted(self.algebra, specialized.keys.clone(), values))
    }

    /// Geometric product.
    pub fn gp(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::Geometric, other)
    }

    /// Sandwich product `self * other * ~self`.
    pub fn conj(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::Sandwich, other)
    }

    /// Commutator product `(self*other - other*self) / 2`.
    pub fn cp(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::Commutator, other)
    }

    /// Anticommutator product. Always fails with `Unsupported`.
    pub fn acp(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::Anticommutator, other)
    }

    /// Symmetric inner product.
    pub fn ip(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::Inner, other)
    }

    pub fn lc(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::LeftContraction, other)
    }

    pub fn rc(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::RightContraction, other)
    }

    /// Scalar product.
    pub fn sp(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::Scalar, other)
    }

    /// Projection of `self` onto `other`: `(self . other) * ~other`.
    pub fn proj(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::Projection, other)
    }

    /// Outer (wedge) product.
    pub fn op(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::Outer, other)
    }

    /// Regressive product, through the algebra's automatic dual.
    pub fn rp(&self, other: &Self) -> Result<Self> {
        self.binary(Operator::Regressive, other)
    }

    /// Multiplicative inverse by Shirokov's method.
    ///
    /// The inverse is derived once for the key layout; a concrete value
    /// whose evaluated denominator is zero (or non-finite) is
    /// `NotInvertible`.
    pub fn inv(&self) -> Result<Self> {
        self.unary(Operator::Inverse).map_err(|err| match err {
            GaError::Sym(SymError::SingularDivisor) => GaError::NotInvertible,
            other => other,
        })
    }

    /// `self * other.inv()`.
    pub fn div(&self, other: &Self) -> Result<Self> {
        self.gp(&other.inv()?)
    }

    /// Only the square is supported.
    pub fn pow(&self, exponent: u32) -> Result<Self> {
        match exponent {
            2 => self.gp(self),
            n => Err(GaError::Unsupported(format!("power {n}; only squares are supported"))),
        }
    }

    /// `self * ~self`, derived from a single operand so cross terms cancel.
    pub fn normsq(&self) -> Result<Self> {
        self.unary(Operator::NormSquared)
    }

    /// `self` divided by the square root of its scalar squared norm.
    pub fn normalized(&self) -> Result<Self> {
        let normsq = self.normsq()?;
        if normsq.items().any(|(k, v)| k != 0 && !v.is_zero()) {
            return Err(GaError::Unsupported(
                "normalization needs a purely scalar squared norm".into(),
            ));
        }
        let norm = normsq
            .get(0usize)?
            .sqrt()
            .ok_or_else(|| GaError::Unsupported("norm has no square root in this coefficient ring".into()))?;
        if norm.is_singular() {
            return Err(GaError::NotInvertible);
        }
        Ok(self.map_values(|_, v| v.over(&norm)))
    }
}

impl<'a> MultiVector<'a, Expr> {
    /// One fresh symbol per key, named `prefix` plus the blade's labels.
    pub(crate) fn placeholder(algebra: &'a Algebra, prefix: &str, keys: &[Key]) -> Self {
        let values = keys
            .iter()
            .map(|&k| Expr::symbol(&algebra.symbol_name(prefix, k)))
            .collect();
        Self::from_trusted(algebra, keys.to_vec(), values)
    }

    pub(crate) fn to_terms(&self) -> Terms {
        self.items().map(|(k, v)| (k, v.clone())).collect()
    }

    /// Evaluate the symbolic coefficients at `args`, bound positionally to
    /// the free symbols in name order.
    ///
    /// The compiled kernel is memoized on this multivector. With no free
    /// symbols the constant coefficients are converted directly and `args`
    /// is ignored.
    pub fn call<T: Coefficient>(&self, args: &[T]) -> Result<MultiVector<'a, T>> {
        if self.free_symbols().is_empty() {
            let values = self
                .values
                .iter()
                .map(|v| {
                    v.as_constant()
                        .map(|c| T::constant(&c))
                        .ok_or_else(|| GaError::Unsupported(format!("`{v}` is not a constant")))
                })
                .collect::<Result<Vec<T>>>()?;
            return Ok(MultiVector::from_trusted(self.algebra, self.keys.clone(), values));
        }

        let compiled = match self.compiled.get() {
            Some(compiled) => compiled.clone(),
            None => {
                let compiled = Rc::new(specialize::free(self)?);
                let _ = self.compiled.set(compiled.clone());
                compiled
            }
        };
        let values = compiled.kernel.call(args)?;
        Ok(MultiVector::from_trusted(self.algebra, compiled.keys.clone(), values))
    }
}

/// Missing keys compare as zero.
impl<T: Coefficient> PartialEq for MultiVector<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        if !std::ptr::eq(self.algebra, other.algebra) {
            return false;
        }
        let lhs = self.items().all(|(k, v)| match other.value(k) {
            Some(w) => v == w,
            None => v.is_zero(),
        });
        lhs && other
            .items()
            .all(|(k, w)| self.keys.contains(&k) || w.is_zero())
    }
}

impl<T: Coefficient> fmt::Debug for MultiVector<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.items() {
            map.entry(&self.algebra.canonical_name(k).unwrap_or("?"), v);
        }
        map.finish()
    }
}

/// Sign as a coefficient multiplier: `+v`, `-v` or zero.
pub(crate) fn signed<T: Coefficient>(value: &T, sign: i8) -> T {
    match sign {
        0 => T::zero(),
        s if s > 0 => value.clone(),
        _ => value.negated(),
    }
}

/// `1` in any coefficient ring.
pub(crate) fn unit<T: Coefficient>() -> T {
    T::constant(&BigRational::from_integer(1.into()))
}

// --- Builder ---

/// Collects the inputs of a multivector construction and validates them in
/// `build`.
///
/// Values are interpreted, in priority order, as: an explicit key/value
/// map; a full-length dense list; a list covering exactly the requested
/// grades; fresh symbols from `name`; or a list parallel to `keys`.
pub struct MultiVectorBuilder<'a, T> {
    algebra: &'a Algebra,
    values: Vec<T>,
    keys: Vec<BladeRef>,
    map: Option<Vec<(BladeRef, T)>>,
    name: Option<String>,
    grades: Option<Vec<usize>>,
}

impl<'a, T: Coefficient> MultiVectorBuilder<'a, T> {
    pub(crate) fn new(algebra: &'a Algebra) -> Self {
        Self {
            algebra,
            values: Vec::new(),
            keys: Vec::new(),
            map: None,
            name: None,
            grades: None,
        }
    }

    pub fn values(mut self, values: Vec<T>) -> Self {
        self.values = values;
        self
    }

    pub fn keys<B: Into<BladeRef>>(mut self, keys: impl IntoIterator<Item = B>) -> Self {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn map<B: Into<BladeRef>>(mut self, entries: impl IntoIterator<Item = (B, T)>) -> Self {
        self.map = Some(entries.into_iter().map(|(b, v)| (b.into(), v)).collect());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn grades(mut self, grades: &[usize]) -> Self {
        self.grades = Some(grades.to_vec());
        self
    }

    pub fn build(self) -> Result<MultiVector<'a, T>> {
        let algebra = self.algebra;
        let d = algebra.dimension();
        let grades = match self.grades {
            Some(grades) => {
                if let Some(&grade) = grades.iter().find(|&&g| g > d) {
                    return Err(GaError::GradeOutOfRange { grade, dimension: d });
                }
                grades
            }
            None => (0..=d).collect(),
        };
        let grade_keys = algebra.indices_for_grades(&grades);

        let (refs, values): (Vec<BladeRef>, Option<Vec<T>>) = if let Some(map) = self.map {
            let (refs, values) = map.into_iter().unzip();
            (refs, Some(values))
        } else if self.keys.is_empty() && self.values.len() == algebra.blade_count() {
            ((0..algebra.blade_count()).map(BladeRef::Key).collect(), Some(self.values))
        } else if self.keys.is_empty() && self.values.len() == grade_keys.len() {
            (grade_keys.iter().copied().map(BladeRef::Key).collect(), Some(self.values))
        } else if self.name.is_some() && self.values.is_empty() {
            let refs = if self.keys.is_empty() {
                grade_keys.iter().copied().map(BladeRef::Key).collect()
            } else {
                self.keys
            };
            (refs, None)
        } else if self.keys.len() != self.values.len() {
            return Err(GaError::KeyValueLength {
                keys: self.keys.len(),
                values: self.values.len(),
            });
        } else {
            (self.keys, Some(self.values))
        };

        let allowed: HashSet<Key> = grade_keys.into_iter().collect();
        let mut seen = HashSet::with_capacity(refs.len());
        let mut keys = Vec::with_capacity(refs.len());
        for blade in &refs {
            let key = algebra.resolve(blade)?;
            if !allowed.contains(&key) {
                return Err(GaError::KeyOutsideGrades(key));
            }
            if !seen.insert(key) {
                return Err(GaError::DuplicateKey(key));
            }
            keys.push(key);
        }

        let values = match values {
            Some(values) => values,
            None => {
                let name = self.name.unwrap_or_default();
                keys.iter()
                    .map(|&k| T::symbol(&algebra.symbol_name(&name, k)).ok_or(GaError::SymbolicRequired))
                    .collect::<Result<Vec<T>>>()?
            }
        };
        Ok(MultiVector::from_trusted(algebra, keys, values))
    }
}

// --- Operator sugar ---
//
// The arithmetic operators panic where the named methods return `Err`.

fn or_panic<T>(result: Result<T>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{what}: {err}"),
    }
}

impl<'a, T: Coefficient> Neg for &MultiVector<'a, T> {
    type Output = MultiVector<'a, T>;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl<'a, T: Coefficient> Neg for MultiVector<'a, T> {
    type Output = MultiVector<'a, T>;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

/// `!x` is the reverse `~x`.
impl<'a, T: Coefficient> Not for &MultiVector<'a, T> {
    type Output = MultiVector<'a, T>;

    fn not(self) -> Self::Output {
        self.reverse()
    }
}

macro_rules! sugar {
    ($trait:ident, $fn:ident, $method:ident, $what:literal) => {
        /// # Panics
        ///
        /// When the operands belong to different algebras or the
        /// underlying method fails.
        impl<'a, T: Coefficient> $trait for &MultiVector<'a, T> {
            type Output = MultiVector<'a, T>;

            fn $fn(self, rhs: Self) -> Self::Output {
                or_panic(MultiVector::$method(self, rhs), $what)
            }
        }
    };
}

sugar!(Add, add, add, "addition failed");
sugar!(Sub, sub, sub, "subtraction failed");
sugar!(Mul, mul, gp, "geometric product failed");
sugar!(BitXor, bitxor, op, "outer product failed");
sugar!(BitOr, bitor, ip, "inner product failed");
sugar!(Shl, shl, lc, "left contraction failed");
sugar!(Shr, shr, rc, "right contraction failed");
sugar!(BitAnd, bitand, rp, "regressive product failed");
sugar!(Div, div, div, "division failed");
