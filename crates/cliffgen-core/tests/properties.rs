//! Algebraic identities checked over random coefficients.

use cliffgen_core::{Algebra, DualKind, MultiVector};
use proptest::prelude::*;

fn coeffs(n: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-4.0f64..4.0, n)
}

fn full<'a>(alg: &'a Algebra, values: Vec<f64>) -> MultiVector<'a, f64> {
    alg.multivector().values(values).build().unwrap()
}

fn close(a: &MultiVector<'_, f64>, b: &MultiVector<'_, f64>, tol: f64) -> bool {
    (0..a.algebra().blade_count()).all(|k| (a.get(k).unwrap() - b.get(k).unwrap()).abs() < tol)
}

#[test]
fn geometric_product_is_associative() {
    let alg = Algebra::new(3, 0, 0).unwrap();
    proptest!(ProptestConfig::with_cases(64), |(a in coeffs(8), b in coeffs(8), c in coeffs(8))| {
        let (a, b, c) = (full(&alg, a), full(&alg, b), full(&alg, c));
        let left = a.gp(&b).unwrap().gp(&c).unwrap();
        let right = a.gp(&b.gp(&c).unwrap()).unwrap();
        prop_assert!(close(&left, &right, 1e-9));
    });
}

#[test]
fn geometric_product_distributes_over_addition() {
    let alg = Algebra::new(2, 1, 0).unwrap();
    proptest!(ProptestConfig::with_cases(64), |(a in coeffs(8), b in coeffs(8), c in coeffs(8))| {
        let (a, b, c) = (full(&alg, a), full(&alg, b), full(&alg, c));
        let left = a.gp(&b.add(&c).unwrap()).unwrap();
        let right = a.gp(&b).unwrap().add(&a.gp(&c).unwrap()).unwrap();
        prop_assert!(close(&left, &right, 1e-9));
    });
}

#[test]
fn reverse_is_an_anti_automorphism() {
    let alg = Algebra::new(3, 0, 1).unwrap();
    proptest!(ProptestConfig::with_cases(64), |(a in coeffs(16), b in coeffs(16))| {
        let (a, b) = (full(&alg, a), full(&alg, b));
        let left = a.gp(&b).unwrap().reverse();
        let right = b.reverse().gp(&a.reverse()).unwrap();
        prop_assert!(close(&left, &right, 1e-9));
    });
}

#[test]
fn outer_product_of_vectors_is_antisymmetric() {
    let alg = Algebra::new(4, 0, 0).unwrap();
    proptest!(|(a in coeffs(4), b in coeffs(4))| {
        let a = alg.vector(a).unwrap();
        let b = alg.vector(b).unwrap();
        let ab = a.op(&b).unwrap();
        let ba = b.op(&a).unwrap();
        prop_assert!(close(&ab, &ba.negate(), 1e-12));
        prop_assert!(a.op(&a).unwrap().values().iter().all(|v| v.abs() < 1e-12));
    });
}

#[test]
fn vector_product_splits_into_inner_and_outer() {
    let alg = Algebra::new(1, 3, 0).unwrap();
    proptest!(|(a in coeffs(4), b in coeffs(4))| {
        let a = alg.vector(a).unwrap();
        let b = alg.vector(b).unwrap();
        let sum = a.ip(&b).unwrap().add(&a.op(&b).unwrap()).unwrap();
        prop_assert!(close(&a.gp(&b).unwrap(), &sum, 1e-9));
    });
}

#[test]
fn vector_inverse_is_a_right_inverse() {
    let alg = Algebra::new(3, 0, 0).unwrap();
    proptest!(|(v in coeffs(3))| {
        prop_assume!(v.iter().map(|x| x * x).sum::<f64>() > 1e-3);
        let v = alg.vector(v).unwrap();
        let product = v.gp(&v.inv().unwrap()).unwrap();
        prop_assert!(close(&product, &alg.scalar(1.0), 1e-9));
    });
}

#[test]
fn hodge_dual_round_trips() {
    let alg = Algebra::new(3, 0, 1).unwrap();
    proptest!(|(a in coeffs(16))| {
        let a = full(&alg, a);
        let back = a.dual(DualKind::Hodge).unwrap().undual(DualKind::Hodge).unwrap();
        prop_assert_eq!(back, a);
    });
}

#[test]
fn symbolic_and_numeric_agree() {
    let alg = Algebra::new(3, 0, 0).unwrap();
    let x = alg.symbolic("x", &[0, 2]).unwrap();
    let y = alg.symbolic("y", &[1]).unwrap();
    let sandwich = x.conj(&y).unwrap();
    proptest!(ProptestConfig::with_cases(32), |(r in coeffs(4), v in coeffs(3))| {
        let mut args = r.clone();
        args.extend(&v);
        let from_symbolic = sandwich.call(&args).unwrap();
        let rotor = alg.graded(&[0, 2], r).unwrap();
        let vector = alg.vector(v).unwrap();
        let direct = rotor.conj(&vector).unwrap();
        prop_assert!(close(&from_symbolic, &direct, 1e-9));
    });
}

#[test]
fn grade_selection_is_idempotent() {
    let alg = Algebra::new(3, 0, 0).unwrap();
    proptest!(|(a in coeffs(8), g in prop::collection::vec(0usize..=3, 0..4))| {
        let a = full(&alg, a);
        let once = a.grade(&g);
        prop_assert_eq!(once.grade(&g), once);
    });
}

#[test]
fn zero_is_the_additive_identity() {
    let alg = Algebra::new(2, 0, 1).unwrap();
    proptest!(|(a in coeffs(3))| {
        let v = alg.vector(a).unwrap();
        let zero = alg.multivector::<f64>().build().unwrap();
        prop_assert!(zero.is_empty());
        prop_assert_eq!(v.add(&zero).unwrap(), v.clone());
        prop_assert_eq!(v.get("e12").unwrap(), 0.0);
    });
}

#[test]
fn reversion_is_an_involution() {
    let alg = Algebra::new(2, 2, 0).unwrap();
    proptest!(|(a in coeffs(16))| {
        let a = full(&alg, a);
        prop_assert_eq!(a.reverse().reverse(), a);
    });
}

#[test]
fn scalars_factor_out_of_products() {
    let alg = Algebra::new(3, 0, 0).unwrap();
    proptest!(|(s in -4.0f64..4.0, a in coeffs(8), b in coeffs(8))| {
        let (a, b) = (full(&alg, a), full(&alg, b));
        let s = alg.scalar(s);
        let left = s.gp(&a).unwrap().gp(&b).unwrap();
        let right = s.gp(&a.gp(&b).unwrap()).unwrap();
        prop_assert!(close(&left, &right, 1e-9));
    });
}

#[test]
fn commutator_is_antisymmetric() {
    let alg = Algebra::new(3, 0, 0).unwrap();
    proptest!(|(a in coeffs(3), b in coeffs(3), grade in 1usize..=2)| {
        let a = alg.graded(&[grade], a).unwrap();
        let b = alg.graded(&[grade], b).unwrap();
        let ab = a.cp(&b).unwrap();
        let ba = b.cp(&a).unwrap();
        prop_assert!(close(&ab, &ba.negate(), 1e-12));
    });
}

#[test]
fn basis_vectors_wedge_to_nothing() {
    for (p, q, r) in [(3, 0, 0), (1, 3, 0), (3, 0, 1)] {
        let alg = Algebra::new(p, q, r).unwrap();
        for i in 0..alg.dimension() {
            let e = alg.blade(1usize << i, 1.0).unwrap();
            assert!(e.op(&e).unwrap().is_empty());
        }
    }
}
