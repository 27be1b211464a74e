use std::collections::HashMap;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::backend::CompileFlags;
use crate::coefficient::Coefficient;
use crate::error::SymError;
use crate::expr::Expr;
use crate::poly::Poly;
use crate::symbol::Symbol;

/// One step of a kernel program. Operands are register indices; every
/// instruction writes the next register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Instr {
    Input(usize),
    Const(usize),
    Add(usize, usize),
    Sub(usize, usize),
    Mul(usize, usize),
    Neg(usize),
    Div(usize, usize),
}

/// A compiled list of expressions over a fixed, ordered parameter list.
///
/// Registers `0..arity` always hold the inputs. Evaluation is generic over
/// the `Coefficient` ring, so one kernel serves scalar, batched and
/// symbolic arguments alike.
#[derive(Clone, Debug)]
pub struct Kernel {
    arity: usize,
    consts: Vec<BigRational>,
    instrs: Vec<Instr>,
    outputs: Vec<usize>,
    /// Constants converted to `f64` at compile time; set by `jit`.
    f64_consts: Option<Vec<f64>>,
}

impl Kernel {
    /// Lower `outputs` over the ordered `params`.
    pub fn compile(
        params: &[Symbol],
        outputs: &[Expr],
        flags: CompileFlags,
    ) -> Result<Self, SymError> {
        let mut emitter = Emitter::new(flags.cse);
        let mut inputs = HashMap::with_capacity(params.len());
        for (i, sym) in params.iter().enumerate() {
            if inputs.insert(sym.clone(), i).is_some() {
                return Err(SymError::DuplicateParameter(sym.name().to_string()));
            }
            emitter.emit(Instr::Input(i));
        }

        let mut regs = Vec::with_capacity(outputs.len());
        for expr in outputs {
            regs.push(emitter.expr(expr, &inputs)?);
        }

        let f64_consts = flags.jit.then(|| {
            emitter
                .consts
                .iter()
                .map(|c| c.to_f64().unwrap_or(f64::NAN))
                .collect()
        });

        Ok(Self {
            arity: params.len(),
            consts: emitter.consts,
            instrs: emitter.instrs,
            outputs: regs,
            f64_consts,
        })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Number of outputs per call.
    pub fn width(&self) -> usize {
        self.outputs.len()
    }

    pub fn instructions(&self) -> &[Instr] {
        &self.instrs
    }

    /// Whether constants were converted to `f64` at compile time.
    pub fn has_f64_constants(&self) -> bool {
        self.f64_consts.is_some()
    }

    /// Evaluate through the coefficient type's preferred path.
    pub fn call<T: Coefficient>(&self, args: &[T]) -> Result<Vec<T>, SymError> {
        T::run(self, args)
    }

    /// Generic tape interpreter.
    ///
    /// Fails with `SingularDivisor` instead of dividing by a zero (or, for
    /// floats, non-finite) register.
    pub fn eval<T: Coefficient>(&self, args: &[T]) -> Result<Vec<T>, SymError> {
        self.check_arity(args.len())?;
        let mut regs: Vec<T> = Vec::with_capacity(self.instrs.len());
        for instr in &self.instrs {
            let value = match *instr {
                Instr::Input(i) => args[i].clone(),
                Instr::Const(c) => T::constant(&self.consts[c]),
                Instr::Add(a, b) => regs[a].plus(&regs[b]),
                Instr::Sub(a, b) => regs[a].minus(&regs[b]),
                Instr::Mul(a, b) => regs[a].times(&regs[b]),
                Instr::Neg(a) => regs[a].negated(),
                Instr::Div(a, b) => {
                    if regs[b].is_singular() {
                        return Err(SymError::SingularDivisor);
                    }
                    regs[a].over(&regs[b])
                }
            };
            regs.push(value);
        }
        Ok(self.outputs.iter().map(|&r| regs[r].clone()).collect())
    }

    /// `f64` evaluation. Reads the compile-time `f64` constants when
    /// available, otherwise falls back to `eval`.
    pub fn eval_f64(&self, args: &[f64]) -> Result<Vec<f64>, SymError> {
        let Some(consts) = &self.f64_consts else {
            return self.eval(args);
        };
        self.check_arity(args.len())?;
        let mut regs = vec![0.0f64; self.instrs.len()];
        for (r, instr) in self.instrs.iter().enumerate() {
            regs[r] = match *instr {
                Instr::Input(i) => args[i],
                Instr::Const(c) => consts[c],
                Instr::Add(a, b) => regs[a] + regs[b],
                Instr::Sub(a, b) => regs[a] - regs[b],
                Instr::Mul(a, b) => regs[a] * regs[b],
                Instr::Neg(a) => -regs[a],
                Instr::Div(a, b) => {
                    if Coefficient::is_singular(&regs[b]) {
                        return Err(SymError::SingularDivisor);
                    }
                    regs[a] / regs[b]
                }
            };
        }
        Ok(self.outputs.iter().map(|&r| regs[r]).collect())
    }

    fn check_arity(&self, got: usize) -> Result<(), SymError> {
        if got != self.arity {
            return Err(SymError::Arity {
                expected: self.arity,
                got,
            });
        }
        Ok(())
    }
}

/// Appends instructions, optionally hash-consing them so repeated
/// subexpressions share one register.
struct Emitter {
    instrs: Vec<Instr>,
    consts: Vec<BigRational>,
    const_index: HashMap<BigRational, usize>,
    memo: Option<HashMap<Instr, usize>>,
}

impl Emitter {
    fn new(cse: bool) -> Self {
        Self {
            instrs: Vec::new(),
            consts: Vec::new(),
            const_index: HashMap::new(),
            memo: cse.then(HashMap::new),
        }
    }

    fn emit(&mut self, instr: Instr) -> usize {
        if let Some(memo) = &self.memo
            && let Some(&reg) = memo.get(&instr)
        {
            return reg;
        }
        let reg = self.instrs.len();
        self.instrs.push(instr);
        if let Some(memo) = &mut self.memo {
            memo.insert(instr, reg);
        }
        reg
    }

    fn constant(&mut self, value: &BigRational) -> usize {
        let next = self.consts.len();
        let idx = *self.const_index.entry(value.clone()).or_insert(next);
        if idx == next {
            self.consts.push(value.clone());
        }
        self.emit(Instr::Const(idx))
    }

    fn expr(&mut self, expr: &Expr, inputs: &HashMap<Symbol, usize>) -> Result<usize, SymError> {
        let num = self.poly(expr.numerator(), inputs)?;
        if expr.is_polynomial() {
            return Ok(num);
        }
        let den = self.poly(expr.denominator(), inputs)?;
        Ok(self.emit(Instr::Div(num, den)))
    }

    /// Sum of products; negative coefficients become subtractions.
    fn poly(&mut self, poly: &Poly, inputs: &HashMap<Symbol, usize>) -> Result<usize, SymError> {
        if poly.is_zero() {
            return Ok(self.constant(&BigRational::from_integer(BigInt::zero())));
        }
        let mut acc: Option<usize> = None;
        for (mono, coeff) in poly.terms() {
            let mut product: Option<usize> = None;
            for (sym, pow) in mono.factors() {
                let input = *inputs
                    .get(sym)
                    .ok_or_else(|| SymError::UnboundSymbol(sym.name().to_string()))?;
                for _ in 0..*pow {
                    product = Some(match product {
                        None => input,
                        Some(p) => self.emit(Instr::Mul(p, input)),
                    });
                }
            }
            let magnitude = coeff.abs();
            let term = match product {
                None => self.constant(&magnitude),
                Some(p) if magnitude.is_one() => p,
                Some(p) => {
                    let c = self.constant(&magnitude);
                    self.emit(Instr::Mul(c, p))
                }
            };
            acc = Some(match acc {
                None if coeff.is_negative() => self.emit(Instr::Neg(term)),
                None => term,
                Some(a) if coeff.is_negative() => self.emit(Instr::Sub(a, term)),
                Some(a) => self.emit(Instr::Add(a, term)),
            });
        }
        Ok(acc.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{ArrayD, array};

    fn syms(names: &[&str]) -> Vec<Symbol> {
        names.iter().map(|n| Symbol::new(n)).collect()
    }

    fn e(name: &str) -> Expr {
        Expr::symbol(name)
    }

    /// a*b + a*b*c and a*b - c share the a*b product.
    fn shared_outputs() -> Vec<Expr> {
        let ab = &e("a") * &e("b");
        vec![&ab + &(&ab * &e("c")), &ab - &e("c")]
    }

    #[test]
    fn test_eval_matches_formula() {
        let k = Kernel::compile(&syms(&["a", "b", "c"]), &shared_outputs(), CompileFlags::default())
            .unwrap();
        let out = k.call(&[2.0, 3.0, 5.0]).unwrap();
        assert_relative_eq!(out[0], 6.0 + 30.0);
        assert_relative_eq!(out[1], 1.0);
    }

    #[test]
    fn test_cse_shrinks_program() {
        let params = syms(&["a", "b", "c"]);
        let plain = Kernel::compile(&params, &shared_outputs(), CompileFlags { cse: false, jit: false })
            .unwrap();
        let cse = Kernel::compile(&params, &shared_outputs(), CompileFlags { cse: true, jit: false })
            .unwrap();
        assert!(cse.instructions().len() < plain.instructions().len());
        assert_eq!(
            cse.call(&[1.5, -2.0, 0.25]).unwrap(),
            plain.call(&[1.5, -2.0, 0.25]).unwrap()
        );
    }

    #[test]
    fn test_f64_constants_agree_with_generic() {
        let params = syms(&["x", "y"]);
        let outputs = vec![
            &(&e("x") * &Expr::ratio(3, 2)) - &e("y"),
            &e("x") / &(&e("x") + &e("y")),
        ];
        let jit = Kernel::compile(&params, &outputs, CompileFlags { cse: true, jit: true }).unwrap();
        assert!(jit.has_f64_constants());
        let fast = jit.eval_f64(&[4.0, 1.0]).unwrap();
        let generic = jit.eval(&[4.0, 1.0]).unwrap();
        assert_relative_eq!(fast[0], 5.0);
        assert_relative_eq!(fast[1], 0.8);
        assert_eq!(fast, generic);
    }

    #[test]
    fn test_symbolic_evaluation_substitutes() {
        let params = syms(&["x"]);
        let outputs = vec![&e("x") * &e("x")];
        let k = Kernel::compile(&params, &outputs, CompileFlags::default()).unwrap();
        let out = k.call(&[&e("u") + &Expr::one()]).unwrap();
        let expected = &(&(&e("u") * &e("u")) + &(&e("u") * &Expr::integer(2))) + &Expr::one();
        assert_eq!(out[0], expected);
    }

    #[test]
    fn test_batched_evaluation() {
        let params = syms(&["x", "y"]);
        let outputs = vec![&e("x") * &e("y"), Expr::integer(7)];
        let k = Kernel::compile(&params, &outputs, CompileFlags::default()).unwrap();
        let xs: ArrayD<f64> = array![1.0, 2.0].into_dyn();
        let ys: ArrayD<f64> = array![3.0, 4.0].into_dyn();
        let out = k.call(&[xs, ys]).unwrap();
        assert_eq!(out[0], array![3.0, 8.0].into_dyn());
        assert_eq!(out[1].ndim(), 0);
    }

    #[test]
    fn test_singular_divisor_is_an_error() {
        let params = syms(&["x", "y"]);
        let outputs = vec![&e("x") / &(&(&e("x") * &e("x")) - &(&e("y") * &e("y")))];
        for jit in [false, true] {
            let k = Kernel::compile(&params, &outputs, CompileFlags { cse: true, jit }).unwrap();
            assert_eq!(k.call(&[1.0, 1.0]).unwrap_err(), SymError::SingularDivisor);
            assert_relative_eq!(k.call(&[2.0, 1.0]).unwrap()[0], 2.0 / 3.0);
        }
        let k = Kernel::compile(&params, &outputs, CompileFlags::default()).unwrap();
        let err = k.call(&[Expr::integer(3), Expr::integer(-3)]).unwrap_err();
        assert_eq!(err, SymError::SingularDivisor);
        let batched = k
            .call(&[array![1.0, 2.0].into_dyn(), array![1.0, 1.0].into_dyn()])
            .unwrap_err();
        assert_eq!(batched, SymError::SingularDivisor);
    }

    #[test]
    fn test_zero_output() {
        let k = Kernel::compile(&syms(&["x"]), &[Expr::zero()], CompileFlags::default()).unwrap();
        assert_eq!(k.call(&[3.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_arity_mismatch() {
        let k = Kernel::compile(&syms(&["x", "y"]), &[e("x")], CompileFlags::default()).unwrap();
        assert_eq!(
            k.call(&[1.0]).unwrap_err(),
            SymError::Arity {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_unbound_symbol_rejected() {
        let err = Kernel::compile(&syms(&["x"]), &[e("z")], CompileFlags::default()).unwrap_err();
        assert_eq!(err, SymError::UnboundSymbol("z".into()));
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = Kernel::compile(&syms(&["x", "x"]), &[e("x")], CompileFlags::default()).unwrap_err();
        assert_eq!(err, SymError::DuplicateParameter("x".into()));
    }
}
