//! tessera is the struct-info inference and printing layer of a tensor
//! program IR.
//!
//! The crate provides:
//!
//! - An IR model of [expressions](Expr), [calls](Call),
//!   [struct info](StructInfo) and [attribute records](Attrs).
//! - Construction functions for built-in operators, such as
//!   [`conv2d`](ops::conv2d), which validate and normalize attributes.
//! - An [operator registry](OpRegistry) which maps operator names to
//!   struct-info inference functions, and an [`InferencePass`] which runs
//!   inference over many calls in parallel.
//! - A [`Printer`](printer::Printer) which renders calls in a canonical,
//!   deterministic textual form.
//!
//! Symbolic shape arithmetic, the proof oracle and the axis layout algebra
//! live in the [`tessera_shape_inference`] crate.
//!
//! # Example
//!
//! ```
//! use tessera::ops::{Conv2dParams, conv2d};
//! use tessera::{Analyzer, DataType, Expr, InferCtx, OpRegistry, TensorStructInfo, sym_shape};
//!
//! let data = Expr::var(
//!     "x",
//!     TensorStructInfo::new(sym_shape!(1, 3, 32, 32), DataType::FLOAT32),
//! );
//! let weight = Expr::var(
//!     "w",
//!     TensorStructInfo::new(sym_shape!(16, 3, 3, 3), DataType::FLOAT32),
//! );
//! let call = conv2d(data, weight, Conv2dParams::default()).unwrap();
//!
//! let registry = OpRegistry::with_all_ops();
//! let analyzer = Analyzer::new();
//! let ctx = InferCtx::new(&analyzer, &registry);
//! let sinfo = registry.infer_struct_info(&call, &ctx).unwrap();
//! assert_eq!(
//!     sinfo,
//!     TensorStructInfo::new(sym_shape!(1, 16, 30, 30), DataType::FLOAT32).into()
//! );
//!
//! let text = tessera::printer::print_call(&call).unwrap();
//! assert!(text.starts_with("R.nn.conv2d(x, w, strides=[1, 1]"));
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`] events, eg. when a shape check cannot be
//! decided symbolically and the operand shapes are trusted. It never installs
//! a subscriber.

mod attrs;
mod diagnostic;
mod dtype;
mod env;
mod expr;
mod infer;
mod op_registry;
mod pass;
mod struct_info;

pub mod ops;
pub mod printer;

pub use attrs::{
    AttrValue, AttrVisitor, Attrs, Conv2dAttrs, Conv2dTransposeAttrs, ObjectRef, ReflectAttrs,
};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use dtype::{DataType, ParseDataTypeError};
pub use expr::{Call, Expr, PrimValue, Var};
pub use infer::InferCtx;
pub use op_registry::{InferStructInfoFn, OpArgument, OpDef, OpRegistry};
pub use pass::{InferencePass, PassOptions};
pub use struct_info::{DTensorStructInfo, StructInfo, TensorShape, TensorStructInfo};

pub use tessera_shape_inference::{Analyzer, Proof, SymExpr, sym_shape};
