//! Clifford algebra Cl(p, q, r) descriptor and operator cache.
//!
//! Basis vectors are ordered degenerate first, then positive, then
//! negative: the signature is `[0]*r + [1]*p + [-1]*q`. Blades are bitmask
//! keys; bit `i` is basis vector `i`. Sign, parity and name tables are
//! precomputed once at construction and shared read-only by every
//! multivector and derivation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use cliffgen_sym::{Backend, Coefficient, CompileFlags, Expr, TapeBackend};

use crate::config::AlgebraConfig;
use crate::derive::Operator;
use crate::error::{GaError, Result};
use crate::multivector::{BladeRef, MultiVector, MultiVectorBuilder, unit};
use crate::specialize::{self, Specialized};

/// Basis blade key: bit `i` set means basis vector `i` is a factor.
pub type Key = usize;

/// Tables grow as 4^d; beyond this they stop being a sensible precompute.
pub const MAX_DIMENSION: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    op: Operator,
    left: Vec<Key>,
    right: Vec<Key>,
}

pub struct Algebra {
    p: usize,
    q: usize,
    r: usize,
    d: usize,
    signature: Vec<i8>,
    /// `signs[a * len + b]`: metric sign of `e_a * e_b`, 0 if a shared vector is degenerate.
    signs: Vec<i8>,
    /// `swaps[a * len + b]`: transpositions needed to sort `e_a e_b`.
    swaps: Vec<u8>,
    bin2canon: Vec<String>,
    canon2bin: HashMap<String, Key>,
    grade_keys: Vec<Vec<Key>>,
    flags: CompileFlags,
    max_inverse_iterations: usize,
    backend: Box<dyn Backend>,
    cache: RefCell<HashMap<CacheKey, Rc<Specialized>>>,
}

impl Algebra {
    /// Cl(p, q, r) with default options.
    pub fn new(p: usize, q: usize, r: usize) -> Result<Self> {
        Self::from_config(&AlgebraConfig::new(p, q, r))
    }

    pub fn from_config(config: &AlgebraConfig) -> Result<Self> {
        Self::with_backend(config, Box::new(TapeBackend))
    }

    /// Build with a custom compilation backend.
    pub fn with_backend(config: &AlgebraConfig, backend: Box<dyn Backend>) -> Result<Self> {
        let (p, q, r) = (config.p, config.q, config.r);
        let d = p + q + r;
        if d > MAX_DIMENSION {
            return Err(GaError::DimensionTooLarge {
                dimension: d,
                max: MAX_DIMENSION,
            });
        }
        let len = 1usize << d;

        let signature: Vec<i8> = std::iter::repeat_n(0, r)
            .chain(std::iter::repeat_n(1, p))
            .chain(std::iter::repeat_n(-1, q))
            .collect();

        let mut signs = vec![0i8; len * len];
        let mut swaps = vec![0u8; len * len];
        for a in 0..len {
            for b in 0..len {
                let n = reorder_swaps(a, b);
                let mut sign: i8 = if n % 2 == 0 { 1 } else { -1 };
                let shared = a & b;
                for (bit, metric) in signature.iter().enumerate() {
                    if shared & (1 << bit) != 0 {
                        sign *= metric;
                    }
                }
                signs[a * len + b] = sign;
                swaps[a * len + b] = n as u8;
            }
        }

        let start = config.start_index.unwrap_or(if r == 1 { 0 } else { 1 });
        let bin2canon: Vec<String> = (0..len)
            .map(|key| {
                let labels: String = (0..d)
                    .filter(|bit| key & (1 << bit) != 0)
                    .map(|bit| (start + bit).to_string())
                    .collect();
                format!("e{labels}")
            })
            .collect();
        let canon2bin = bin2canon
            .iter()
            .enumerate()
            .map(|(key, name)| (name.clone(), key))
            .collect();

        // Within a grade, keys follow the lexicographic order of their
        // basis-vector index lists, so e14 precedes e23 even though its key is larger.
        let mut grade_keys = vec![Vec::new(); d + 1];
        let mut by_indices: Vec<(Vec<usize>, Key)> = (0..len)
            .map(|key| ((0..d).filter(|bit| key & (1 << bit) != 0).collect(), key))
            .collect();
        by_indices.sort();
        for (indices, key) in by_indices {
            grade_keys[indices.len()].push(key);
        }

        let max_inverse_iterations = config
            .max_inverse_iterations
            .unwrap_or_else(|| shirokov_size(d));

        tracing::debug!(
            "built algebra Cl({p},{q},{r}) with {len} blades (cse={}, jit={})",
            config.cse,
            config.jit
        );

        Ok(Self {
            p,
            q,
            r,
            d,
            signature,
            signs,
            swaps,
            bin2canon,
            canon2bin,
            grade_keys,
            flags: CompileFlags {
                cse: config.cse,
                jit: config.jit,
            },
            max_inverse_iterations,
            backend,
            cache: RefCell::new(HashMap::new()),
        })
    }

    // --- Signature ---

    pub fn p(&self) -> usize {
        self.p
    }

    pub fn q(&self) -> usize {
        self.q
    }

    /// Number of degenerate basis vectors.
    pub fn degenerate(&self) -> usize {
        self.r
    }

    /// Number of basis vectors.
    pub fn dimension(&self) -> usize {
        self.d
    }

    /// Number of basis blades, `2^d`.
    pub fn blade_count(&self) -> usize {
        1 << self.d
    }

    pub fn signature(&self) -> &[i8] {
        &self.signature
    }

    // --- Tables ---

    /// Sign of `e_a * e_b` including the metric; 0 when a degenerate vector is shared.
    pub fn sign(&self, a: Key, b: Key) -> i8 {
        self.signs[a * self.blade_count() + b]
    }

    /// Number of transpositions that sort the concatenated factors of `e_a e_b`.
    pub fn swaps(&self, a: Key, b: Key) -> u32 {
        u32::from(self.swaps[a * self.blade_count() + b])
    }

    pub fn canonical_name(&self, key: Key) -> Option<&str> {
        self.bin2canon.get(key).map(String::as_str)
    }

    pub fn key_for(&self, name: &str) -> Option<Key> {
        self.canon2bin.get(name).copied()
    }

    pub fn resolve(&self, blade: &BladeRef) -> Result<Key> {
        match blade {
            BladeRef::Key(key) if *key < self.blade_count() => Ok(*key),
            BladeRef::Key(key) => Err(GaError::UnknownBlade(key.to_string())),
            BladeRef::Name(name) => self
                .key_for(name)
                .ok_or_else(|| GaError::UnknownBlade(name.clone())),
        }
    }

    /// Keys of the given grades, grade by grade in canonical order.
    /// Grades above the dimension contribute nothing.
    pub fn indices_for_grades(&self, grades: &[usize]) -> Vec<Key> {
        let mut grades = grades.to_vec();
        grades.sort_unstable();
        grades.dedup();
        grades
            .into_iter()
            .filter_map(|g| self.grade_keys.get(g))
            .flatten()
            .copied()
            .collect()
    }

    /// Name of the placeholder symbol for `key`: `prefix` plus the blade's
    /// labels, so `e12` under prefix `a` is `a12` and the scalar is `a`.
    pub fn symbol_name(&self, prefix: &str, key: Key) -> String {
        let canon = &self.bin2canon[key];
        format!("{prefix}{}", &canon[1..])
    }

    // --- Options ---

    pub fn flags(&self) -> CompileFlags {
        self.flags
    }

    pub fn max_inverse_iterations(&self) -> usize {
        self.max_inverse_iterations
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    // --- Operator cache ---

    /// Derive and compile `op` for the given key signature, or reuse the
    /// kernel compiled by an earlier call with the same signature.
    pub(crate) fn specialized(
        &self,
        op: Operator,
        left: &[Key],
        right: &[Key],
    ) -> Result<Rc<Specialized>> {
        let key = CacheKey {
            op,
            left: left.to_vec(),
            right: right.to_vec(),
        };
        let hit = self.cache.borrow().get(&key).cloned();
        if let Some(hit) = hit {
            tracing::trace!("cache hit for {op:?} {left:?} x {right:?}");
            return Ok(hit);
        }

        // No borrow is held here: composite derivations re-enter the cache.
        let derived = Rc::new(specialize::derive(self, op, left, right)?);
        tracing::debug!(
            "derived {op:?} for {left:?} x {right:?}: {} outputs, {} instructions",
            derived.keys.len(),
            derived.kernel.instructions().len()
        );
        Ok(self
            .cache
            .borrow_mut()
            .entry(key)
            .or_insert(derived)
            .clone())
    }

    /// Number of compiled operator signatures held in the cache.
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    // --- Constructors ---

    /// Start building a multivector in this algebra.
    pub fn multivector<T: Coefficient>(&self) -> MultiVectorBuilder<'_, T> {
        MultiVectorBuilder::new(self)
    }

    pub fn scalar<T: Coefficient>(&self, value: T) -> MultiVector<'_, T> {
        MultiVector::from_trusted(self, vec![0], vec![value])
    }

    /// Multivector restricted to `grades`, with values in canonical key order.
    pub fn graded<T: Coefficient>(
        &self,
        grades: &[usize],
        values: Vec<T>,
    ) -> Result<MultiVector<'_, T>> {
        self.multivector().grades(grades).values(values).build()
    }

    pub fn vector<T: Coefficient>(&self, values: Vec<T>) -> Result<MultiVector<'_, T>> {
        self.graded(&[1], values)
    }

    pub fn bivector<T: Coefficient>(&self, values: Vec<T>) -> Result<MultiVector<'_, T>> {
        self.graded(&[2], values)
    }

    /// A single basis blade, by key or canonical name.
    pub fn blade<T: Coefficient>(
        &self,
        blade: impl Into<BladeRef>,
        value: T,
    ) -> Result<MultiVector<'_, T>> {
        let key = self.resolve(&blade.into())?;
        Ok(MultiVector::from_trusted(self, vec![key], vec![value]))
    }

    /// One fresh symbol per key of `grades`, named after `name`.
    pub fn symbolic(&self, name: &str, grades: &[usize]) -> Result<MultiVector<'_, Expr>> {
        self.multivector().name(name).grades(grades).build()
    }

    /// The unit pseudoscalar.
    pub fn pss<T: Coefficient>(&self) -> MultiVector<'_, T> {
        MultiVector::from_trusted(self, vec![self.blade_count() - 1], vec![unit()])
    }
}

impl fmt::Debug for Algebra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Algebra")
            .field("p", &self.p)
            .field("q", &self.q)
            .field("r", &self.r)
            .field("flags", &self.flags)
            .field("cached", &self.cache_len())
            .finish()
    }
}

/// Pairs `(i in a, j in b)` with `i > j`.
fn reorder_swaps(a: Key, b: Key) -> u32 {
    let mut a = a >> 1;
    let mut n = 0;
    while a != 0 {
        n += (a & b).count_ones();
        a >>= 1;
    }
    n
}

/// Size of the matrix representation Shirokov's method works in:
/// `2^ceil((d + 1) / 2)`.
pub fn shirokov_size(d: usize) -> usize {
    1 << (d + 1).div_ceil(2)
}
