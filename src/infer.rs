use tessera_shape_inference::{Analyzer, Predicate, Proof, SymExpr};

use crate::diagnostic::Diagnostic;
use crate::expr::Expr;
use crate::op_registry::OpRegistry;
use crate::struct_info::StructInfo;

/// Context passed to struct info inference functions.
///
/// Borrows the symbolic analyzer and the operator registry for the duration
/// of one inference call. Both are read-only, so contexts for different calls
/// can be used concurrently.
#[derive(Clone, Copy)]
pub struct InferCtx<'a> {
    analyzer: &'a Analyzer,
    registry: &'a OpRegistry,
}

impl<'a> InferCtx<'a> {
    pub fn new(analyzer: &'a Analyzer, registry: &'a OpRegistry) -> Self {
        Self { analyzer, registry }
    }

    pub fn analyzer(&self) -> &'a Analyzer {
        self.analyzer
    }

    pub fn registry(&self) -> &'a OpRegistry {
        self.registry
    }

    pub fn prove(&self, pred: &Predicate) -> Proof {
        self.analyzer.prove(pred)
    }

    pub fn simplify(&self, expr: &SymExpr) -> SymExpr {
        self.analyzer.simplify(expr)
    }

    pub fn checked_simplify(&self, expr: &SymExpr) -> Option<SymExpr> {
        self.analyzer.checked_simplify(expr)
    }

    /// Return the struct info of an operand.
    ///
    /// Nested calls are inferred recursively. Returns `Ok(None)` if the
    /// operand carries no struct info.
    pub fn struct_info_of(&self, expr: &Expr) -> Result<Option<StructInfo>, Diagnostic> {
        match expr {
            Expr::Call(call) => self.registry.infer_struct_info(call, self).map(Some),
            _ => Ok(expr.struct_info()),
        }
    }
}
