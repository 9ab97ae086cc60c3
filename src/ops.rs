//! Built-in operators.
//!
//! Each operator provides a construction function, which validates and
//! normalizes its attributes and returns a [`Call`](crate::Call), and an
//! inference function registered in the [`OpRegistry`].

use thiserror::Error;

use crate::op_registry::{OpDef, OpRegistry};

mod call_tir;
mod conv;
mod util;

pub use call_tir::{CALL_DPS_PACKED, CALL_TIR, call_dps_packed, call_tir};
pub use conv::{
    CONV2D, CONV2D_TRANSPOSE, Conv2dParams, Conv2dTransposeParams, conv2d, conv2d_transpose,
};

/// Errors raised when constructing a call with invalid attributes.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConstructError {
    #[error("{op}: the number of groups is expected to be positive, got {groups}")]
    NonPositiveGroups { op: &'static str, groups: i32 },

    #[error("{op}: {attr} is expected to have {expected} elements, got {values:?}")]
    InvalidLength {
        op: &'static str,
        attr: &'static str,
        expected: &'static str,
        values: Vec<i64>,
    },

    #[error("{op}: {attr} values are expected to be {requirement}, got {values:?}")]
    InvalidValue {
        op: &'static str,
        attr: &'static str,
        requirement: &'static str,
        values: Vec<i64>,
    },
}

/// Register all built-in operators in `reg`.
pub(crate) fn register_all_ops(reg: &mut OpRegistry) {
    reg.register(
        OpDef::new(CONV2D)
            .num_inputs(2)
            .argument("data", "Tensor", "The input tensor.")
            .argument("weight", "Tensor", "The weight tensor.")
            .attrs_type("relax.attrs.Conv2DAttrs")
            .infer_with(conv::infer_conv2d),
    );
    reg.register(
        OpDef::new(CONV2D_TRANSPOSE)
            .num_inputs(2)
            .argument("data", "Tensor", "The input tensor.")
            .argument("weight", "Tensor", "The weight tensor.")
            .attrs_type("relax.attrs.Conv2DTransposeAttrs")
            .infer_with(conv::infer_conv2d_transpose),
    );
    reg.register(
        OpDef::new(CALL_TIR)
            .argument("gvar", "GlobalVar", "The global variable of the PrimFunc.")
            .argument("args", "Tuple", "The input arguments.")
            .argument("packed_ints", "Shape", "Symbolic shape variables passed to the PrimFunc.")
            .infer_with(call_tir::infer_call_tir),
    );
    reg.register(
        OpDef::new(CALL_DPS_PACKED)
            .num_inputs(2)
            .argument("func", "Expr", "The destination-passing-style function.")
            .argument("args", "Tuple", "The input arguments.")
            .infer_with(call_tir::infer_call_dps_packed),
    );
}
