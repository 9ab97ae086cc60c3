use tessera_shape_inference::{BijectiveLayout, Layout, Predicate, Proof, SymExpr};

use super::ConstructError;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::dtype::DataType;
use crate::expr::Call;
use crate::infer::InferCtx;
use crate::struct_info::{StructInfo, TensorShape, TensorStructInfo};

/// Expand a 2D padding spec to `[top, left, bottom, right]`.
///
/// A single value applies to all sides and `[h, w]` expands to `[h, w, h, w]`.
pub fn complete_padding_2d(op: &'static str, padding: &[i64]) -> Result<[i64; 4], ConstructError> {
    match *padding {
        [p] => Ok([p; 4]),
        [h, w] => Ok([h, w, h, w]),
        [top, left, bottom, right] => Ok([top, left, bottom, right]),
        _ => Err(ConstructError::InvalidLength {
            op,
            attr: "padding",
            expected: "1, 2 or 4",
            values: padding.to_vec(),
        }),
    }
}

/// Broadcast a one-element `(height, width)` parameter to two elements.
pub fn broadcast_2d(
    op: &'static str,
    attr: &'static str,
    values: &[i64],
) -> Result<[i64; 2], ConstructError> {
    match *values {
        [x] => Ok([x, x]),
        [h, w] => Ok([h, w]),
        _ => Err(ConstructError::InvalidLength {
            op,
            attr,
            expected: "1 or 2",
            values: values.to_vec(),
        }),
    }
}

/// Check that all `values` are >= `min`.
pub fn check_min(
    op: &'static str,
    attr: &'static str,
    values: &[i64],
    min: i64,
) -> Result<(), ConstructError> {
    if values.iter().all(|&x| x >= min) {
        return Ok(());
    }
    Err(ConstructError::InvalidValue {
        op,
        attr,
        requirement: if min > 0 { "positive" } else { "non-negative" },
        values: values.to_vec(),
    })
}

/// Return the tensor struct info of each of the `N` operands of `call`.
pub fn input_tensor_sinfo<const N: usize>(
    call: &Call,
    ctx: &InferCtx,
    op: &str,
) -> Result<[TensorStructInfo; N], Diagnostic> {
    let count_error = || {
        Diagnostic::new(
            DiagnosticKind::InvalidArguments,
            op,
            format!("expects {} arguments, but {} were given", N, call.args.len()),
        )
    };
    if call.args.len() != N {
        return Err(count_error());
    }

    let sinfo: Vec<TensorStructInfo> = call
        .args
        .iter()
        .enumerate()
        .map(|(i, arg)| match ctx.struct_info_of(arg)? {
            Some(StructInfo::Tensor(tensor)) => Ok(tensor),
            other => Err(Diagnostic::new(
                DiagnosticKind::InvalidArguments,
                op,
                format!("expects its input to be a tensor, got {:?}", other),
            )
            .at(format!("args[{}]", i))),
        })
        .collect::<Result<_, _>>()?;
    sinfo.try_into().map_err(|_| count_error())
}

/// Parse `layout` and create a converter from it to `canonical`.
///
/// `role` names the tensor the layout describes ("data", "kernel" or
/// "output") and `attr` the attribute field it came from.
pub fn check_layout(
    op: &str,
    layout: &str,
    canonical: &str,
    role: &str,
    attr: &str,
) -> Result<BijectiveLayout, Diagnostic> {
    Layout::parse(layout)
        .and_then(|src| BijectiveLayout::new(src, Layout::parse(canonical)?))
        .map_err(|err| {
            Diagnostic::new(
                DiagnosticKind::InvalidLayout,
                op,
                format!(
                    "{} layout \"{}\" is expected to be convertible to \"{}\": {}",
                    role, layout, canonical, err
                ),
            )
            .at(format!("attrs.{}", attr))
        })
}

/// Check that the rank of a tensor matches its layout and return its
/// dimensions, if known.
pub fn check_ndim_and_get_shape<'a>(
    op: &str,
    sinfo: &'a TensorStructInfo,
    layout: &Layout,
    role: &str,
    arg_index: usize,
) -> Result<Option<&'a [SymExpr]>, Diagnostic> {
    if sinfo.ndim() != layout.ndim() {
        return Err(Diagnostic::new(
            DiagnosticKind::RankMismatch,
            op,
            format!(
                "{} is expected to have rank {} as given by layout \"{}\", got {}",
                role,
                layout.ndim(),
                layout,
                sinfo.ndim()
            ),
        )
        .at(format!("args[{}]", arg_index)));
    }
    Ok(match &sinfo.shape {
        TensorShape::Known(dims) => Some(dims),
        TensorShape::Rank(_) => None,
    })
}

/// Infer the output dtype of a binary arithmetic operator.
///
/// Unknown (void) operand dtypes yield an unknown output dtype. Known dtypes
/// must be equal.
pub fn binary_arith_out_dtype(
    op: &str,
    lhs: &TensorStructInfo,
    rhs: &TensorStructInfo,
) -> Result<DataType, Diagnostic> {
    if lhs.dtype.is_void() || rhs.dtype.is_void() {
        return Ok(DataType::Void);
    }
    if lhs.dtype != rhs.dtype {
        return Err(Diagnostic::new(
            DiagnosticKind::DtypeMismatch,
            op,
            format!(
                "data types {} and {} must be equal for binary operators",
                lhs.dtype, rhs.dtype
            ),
        ));
    }
    Ok(lhs.dtype)
}

/// Fail with the diagnostic from `on_violation` if `violation` is provably
/// true.
///
/// If the analyzer cannot decide `violation`, the operand shapes are trusted
/// and the check passes.
pub fn reject_if_provable(
    ctx: &InferCtx,
    check: &'static str,
    violation: &Predicate,
    on_violation: impl FnOnce() -> Diagnostic,
) -> Result<(), Diagnostic> {
    match ctx.prove(violation) {
        Proof::True => Err(on_violation()),
        Proof::False => Ok(()),
        Proof::Unknown => {
            tracing::debug!(check, ?violation, "check is indeterminate, trusting input shapes");
            Ok(())
        }
    }
}
