use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::expr::{Call, Expr};
use crate::infer::InferCtx;
use crate::struct_info::StructInfo;

pub const CALL_TIR: &str = "relax.call_tir";
pub const CALL_DPS_PACKED: &str = "relax.call_dps_packed";

/// Create a call to a tensor-level function in destination-passing style.
///
/// `callee` is usually a [`Expr::GlobalVar`]. `out_sinfo` describes the
/// outputs the callee writes, as a single tensor or a tuple. `tir_vars`
/// optionally passes extra symbolic integers as an [`Expr::Shape`].
pub fn call_tir(
    callee: Expr,
    args: Vec<Expr>,
    out_sinfo: StructInfo,
    tir_vars: Option<Expr>,
) -> Call {
    let mut call_args = vec![callee, Expr::Tuple(args)];
    call_args.extend(tir_vars);
    Call::new(Expr::op(CALL_TIR), call_args).with_sinfo_args(vec![out_sinfo])
}

/// Create a call to a packed function in destination-passing style.
pub fn call_dps_packed(callee: Expr, args: Vec<Expr>, out_sinfo: StructInfo) -> Call {
    Call::new(Expr::op(CALL_DPS_PACKED), vec![callee, Expr::Tuple(args)])
        .with_sinfo_args(vec![out_sinfo])
}

fn declared_output(
    call: &Call,
    op: &str,
    arg_counts: std::ops::RangeInclusive<usize>,
) -> Result<StructInfo, Diagnostic> {
    if !arg_counts.contains(&call.args.len()) {
        return Err(Diagnostic::new(
            DiagnosticKind::InvalidArguments,
            op,
            format!(
                "expects {} to {} arguments, but {} were given",
                arg_counts.start(),
                arg_counts.end(),
                call.args.len()
            ),
        ));
    }
    match call.sinfo_args.as_slice() {
        [out_sinfo] => Ok(out_sinfo.clone()),
        other => Err(Diagnostic::new(
            DiagnosticKind::InvalidArguments,
            op,
            format!(
                "expects exactly one output struct info annotation, got {}",
                other.len()
            ),
        )
        .at("sinfo_args")),
    }
}

pub(crate) fn infer_call_tir(call: &Call, _ctx: &InferCtx) -> Result<StructInfo, Diagnostic> {
    declared_output(call, CALL_TIR, 2..=3)
}

pub(crate) fn infer_call_dps_packed(
    call: &Call,
    _ctx: &InferCtx,
) -> Result<StructInfo, Diagnostic> {
    declared_output(call, CALL_DPS_PACKED, 2..=2)
}
