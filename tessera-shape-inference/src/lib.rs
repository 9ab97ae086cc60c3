//! Symbolic shape arithmetic for the Tessera IR.
//!
//! Shapes of tensors in the IR are sequences of symbolic integer
//! expressions ([`SymExpr`]). A dimension may be a known value such as `32`,
//! a named symbol such as `batch`, or a composite such as `(h + 2) // 2`.
//!
//! This crate provides three things used during shape inference:
//!
//! - [`SymExpr`], the expression type and its simplifier.
//! - [`Analyzer`], an oracle which attempts to prove predicates over
//!   expressions. Its answer is a three-valued [`Proof`], since a predicate
//!   over symbols is often neither provably true nor provably false.
//! - [`Layout`] and [`BijectiveLayout`], which describe the role of each
//!   tensor axis (eg. `NCHW`) and convert shapes between layouts.
//!
//! ```
//! use tessera_shape_inference::{Analyzer, BijectiveLayout, Layout, Predicate, Proof, SymExpr};
//!
//! let nhwc = Layout::parse("NHWC").unwrap();
//! let nchw = Layout::parse("NCHW").unwrap();
//! let converter = BijectiveLayout::new(nhwc, nchw).unwrap();
//!
//! let shape = [SymExpr::from("batch"), 32.into(), 32.into(), 3.into()];
//! let canonical = converter.forward_shape(&shape).unwrap();
//! assert_eq!(canonical[1], SymExpr::from(3));
//!
//! let analyzer = Analyzer::new();
//! let pred = Predicate::eq(canonical[0].clone(), 1);
//! assert_eq!(analyzer.prove(&pred), Proof::Unknown);
//! ```

mod analyzer;
mod layout;
mod sym_expr;

pub use analyzer::{Analyzer, Bounds, Predicate, Proof};
pub use layout::{BijectiveLayout, Layout, LayoutAxis, LayoutError};
pub use sym_expr::{SymExpr, Symbol, div_ceil, floor_div, floor_mod};

/// Create a `Vec<SymExpr>` from a list of dimension sizes and symbol names.
///
/// ```
/// use tessera_shape_inference::{SymExpr, sym_shape};
///
/// let shape = sym_shape!("batch", 3, 32, 32);
/// assert_eq!(shape[0], SymExpr::from("batch"));
/// assert_eq!(shape[1], SymExpr::from(3));
/// ```
#[macro_export]
macro_rules! sym_shape {
    ($($dim:expr),* $(,)?) => {
        vec![$($crate::SymExpr::from($dim)),*]
    };
}
