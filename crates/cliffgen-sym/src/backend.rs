use crate::error::SymError;
use crate::expr::Expr;
use crate::kernel::Kernel;
use crate::symbol::Symbol;

/// Options forwarded to a backend when compiling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileFlags {
    /// Share repeated subexpressions between and within outputs.
    pub cse: bool,
    /// Convert the kernel's constants to `f64` once at compile time. `f64`
    /// evaluation then reads them directly instead of converting each
    /// exact rational on every call. The same tape runs either way.
    pub jit: bool,
}

/// Turns an ordered parameter list and a list of expressions into a
/// callable kernel.
///
/// The kernel's positional arguments are `params` in order; its outputs are
/// aligned with `outputs`. Implementations may simplify or reorder work
/// but must preserve that contract.
pub trait Backend {
    fn compile(
        &self,
        params: &[Symbol],
        outputs: &[Expr],
        flags: CompileFlags,
    ) -> Result<Kernel, SymError>;
}

/// The built-in backend: an instruction tape interpreted over any
/// coefficient ring.
#[derive(Clone, Copy, Debug, Default)]
pub struct TapeBackend;

impl Backend for TapeBackend {
    fn compile(
        &self,
        params: &[Symbol],
        outputs: &[Expr],
        flags: CompileFlags,
    ) -> Result<Kernel, SymError> {
        Kernel::compile(params, outputs, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tape_backend_respects_parameter_order() {
        let params = [Symbol::new("y"), Symbol::new("x")];
        let outputs = [&Expr::symbol("x") - &Expr::symbol("y")];
        let kernel = TapeBackend
            .compile(&params, &outputs, CompileFlags::default())
            .unwrap();
        // y = 1, x = 10
        assert_eq!(kernel.call(&[1.0, 10.0]).unwrap(), vec![9.0]);
    }

    #[test]
    fn test_backend_is_object_safe() {
        let backend: Box<dyn Backend> = Box::new(TapeBackend);
        let kernel = backend
            .compile(&[Symbol::new("x")], &[Expr::symbol("x")], CompileFlags::default())
            .unwrap();
        assert_eq!(kernel.width(), 1);
        assert_eq!(kernel.arity(), 1);
    }
}
