//! Ring identities of `Expr` and agreement between kernel variants.

use cliffgen_sym::{CompileFlags, Expr, Kernel, Symbol};
use proptest::prelude::*;

const NAMES: [&str; 3] = ["x", "y", "z"];

/// Random polynomial: sum of up to four terms `c * s_i * s_j`.
fn poly() -> impl Strategy<Value = Expr> {
    prop::collection::vec((-5i64..=5, 0usize..3, 0usize..4), 1..5).prop_map(|terms| {
        terms.into_iter().fold(Expr::zero(), |acc, (c, i, j)| {
            let mut term = &Expr::integer(c) * &Expr::symbol(NAMES[i]);
            if let Some(name) = NAMES.get(j) {
                term = &term * &Expr::symbol(name);
            }
            &acc + &term
        })
    })
}

fn params() -> Vec<Symbol> {
    NAMES.iter().map(|n| Symbol::new(n)).collect()
}

proptest! {
    #[test]
    fn addition_cancels(a in poly(), b in poly()) {
        prop_assert_eq!(&(&a + &b) - &b, a);
    }

    #[test]
    fn multiplication_distributes(a in poly(), b in poly(), c in poly()) {
        prop_assert_eq!(&a * &(&b + &c), &(&a * &b) + &(&a * &c));
    }

    #[test]
    fn difference_with_self_is_zero(a in poly()) {
        prop_assert!((&a - &a).is_zero());
    }

    #[test]
    fn constant_division_undoes_scaling(a in poly(), c in -7i64..=7) {
        prop_assume!(c != 0);
        let c = Expr::integer(c);
        prop_assert_eq!(&(&a * &c) / &c, a);
    }

    #[test]
    fn quotients_are_normalized(a in poly(), b in poly()) {
        prop_assume!(!b.is_zero() && b.as_constant().is_none());
        let q = &a / &b;
        // Equal quotients built two ways compare equal.
        let doubled = &(&a * &Expr::integer(2)) / &(&b * &Expr::integer(2));
        prop_assert_eq!(q, doubled);
    }

    #[test]
    fn kernel_flags_agree(
        a in poly(),
        b in poly(),
        args in prop::collection::vec(-3.0f64..3.0, 3),
    ) {
        let outputs = [a.clone(), &a * &b, &a - &b];
        let mut results = Vec::new();
        for (cse, jit) in [(false, false), (true, false), (true, true)] {
            let kernel = Kernel::compile(&params(), &outputs, CompileFlags { cse, jit }).unwrap();
            results.push(kernel.call(&args).unwrap());
        }
        for pair in results.windows(2) {
            for (l, r) in pair[0].iter().zip(&pair[1]) {
                prop_assert!((l - r).abs() <= 1e-9 * (1.0 + l.abs()));
            }
        }
    }

    #[test]
    fn symbolic_evaluation_is_substitution(a in poly()) {
        // Feeding the parameters back in as symbols reproduces the expression.
        let kernel = Kernel::compile(&params(), &[a.clone()], CompileFlags::default()).unwrap();
        let args: Vec<Expr> = NAMES.iter().map(|n| Expr::symbol(n)).collect();
        prop_assert_eq!(kernel.call(&args).unwrap(), vec![a]);
    }
}
