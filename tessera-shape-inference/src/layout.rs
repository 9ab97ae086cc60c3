//! Axis layouts and conversion of shapes between them.
//!
//! A layout names the role of each axis of a tensor. Upper-case letters are
//! _primal_ axes (eg. `N`, `C`, `H`, `W`). A primal axis can be split into an
//! outer part, named by the upper-case letter, and an inner part of fixed
//! size, named by the lower-case letter prefixed with its size. For example
//! `NCHW16c` splits the channel axis into `C` blocks of 16 channels each.

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

use crate::sym_expr::SymExpr;

/// Errors produced when parsing layouts or converting shapes between them.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("layout string is empty")]
    Empty,

    #[error("invalid character {ch:?} in layout \"{layout}\"")]
    InvalidChar { layout: String, ch: char },

    #[error("axis {axis} appears more than once in layout \"{layout}\"")]
    DuplicateAxis { layout: String, axis: char },

    #[error("sub-axis {axis} in layout \"{layout}\" must have a positive split factor")]
    MissingFactor { layout: String, axis: char },

    #[error("split factor in layout \"{layout}\" is not followed by a sub-axis")]
    DanglingFactor { layout: String },

    #[error("sub-axis {axis} in layout \"{layout}\" has no primal axis")]
    MissingPrimal { layout: String, axis: char },

    #[error("layouts \"{src}\" and \"{dst}\" do not have the same primal axes")]
    Incompatible { src: String, dst: String },

    #[error("expected shape of rank {expected} for layout \"{layout}\", got {actual}")]
    RankMismatch {
        layout: String,
        expected: usize,
        actual: usize,
    },
}

/// A single axis in a [`Layout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutAxis {
    name: char,

    /// Size of the axis, if this is the inner part of a split axis.
    factor: Option<i64>,
}

impl LayoutAxis {
    pub fn name(&self) -> char {
        self.name
    }

    pub fn is_primal(&self) -> bool {
        self.name.is_ascii_uppercase()
    }

    /// Return the upper-case name of the primal axis this axis belongs to.
    pub fn primal(&self) -> char {
        self.name.to_ascii_uppercase()
    }

    pub fn factor(&self) -> Option<i64> {
        self.factor
    }
}

/// Parsed tensor axis layout such as `NCHW` or `NCHW16c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    name: String,
    axes: SmallVec<[LayoutAxis; 5]>,
}

impl Layout {
    /// Parse a layout string.
    pub fn parse(name: &str) -> Result<Layout, LayoutError> {
        if name.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut axes: SmallVec<[LayoutAxis; 5]> = SmallVec::new();
        let mut factor: Option<i64> = None;

        for ch in name.chars() {
            if let Some(digit) = ch.to_digit(10) {
                let prev = factor.unwrap_or(0);
                factor = Some(prev.saturating_mul(10).saturating_add(digit as i64));
                continue;
            }

            if !ch.is_ascii_alphabetic() {
                return Err(LayoutError::InvalidChar {
                    layout: name.to_string(),
                    ch,
                });
            }
            if axes.iter().any(|axis| axis.name == ch) {
                return Err(LayoutError::DuplicateAxis {
                    layout: name.to_string(),
                    axis: ch,
                });
            }

            let axis = if ch.is_ascii_uppercase() {
                if factor.is_some() {
                    return Err(LayoutError::DanglingFactor {
                        layout: name.to_string(),
                    });
                }
                LayoutAxis {
                    name: ch,
                    factor: None,
                }
            } else {
                match factor.take() {
                    Some(f) if f > 0 => LayoutAxis {
                        name: ch,
                        factor: Some(f),
                    },
                    _ => {
                        return Err(LayoutError::MissingFactor {
                            layout: name.to_string(),
                            axis: ch,
                        });
                    }
                }
            };
            axes.push(axis);
        }

        if factor.is_some() {
            return Err(LayoutError::DanglingFactor {
                layout: name.to_string(),
            });
        }

        if let Some(sub) = axes
            .iter()
            .find(|axis| !axis.is_primal() && !axes.iter().any(|a| a.name == axis.primal()))
        {
            return Err(LayoutError::MissingPrimal {
                layout: name.to_string(),
                axis: sub.name,
            });
        }

        Ok(Layout {
            name: name.to_string(),
            axes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axes(&self) -> &[LayoutAxis] {
        &self.axes
    }

    /// Return the rank of shapes in this layout, counting sub-axes.
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Return the number of primal axes.
    pub fn ndim_primal(&self) -> usize {
        self.axes.iter().filter(|axis| axis.is_primal()).count()
    }

    /// Return the position of the axis named `name`.
    pub fn index_of(&self, name: char) -> Option<usize> {
        self.axes.iter().position(|axis| axis.name == name)
    }

    /// Return the split factor of the primal axis `name`, if it is split.
    pub fn factor_of(&self, name: char) -> Option<i64> {
        let sub = name.to_ascii_lowercase();
        self.axes
            .iter()
            .find(|axis| axis.name == sub)
            .and_then(|axis| axis.factor)
    }

    fn primal_axes(&self) -> impl Iterator<Item = char> + '_ {
        self.axes
            .iter()
            .filter(|axis| axis.is_primal())
            .map(|axis| axis.name)
    }

    fn check_rank(&self, shape: &[SymExpr]) -> Result<(), LayoutError> {
        if shape.len() != self.ndim() {
            return Err(LayoutError::RankMismatch {
                layout: self.name.clone(),
                expected: self.ndim(),
                actual: shape.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Converter between shapes in two layouts with the same primal axes.
#[derive(Clone, Debug)]
pub struct BijectiveLayout {
    src: Layout,
    dst: Layout,
}

impl BijectiveLayout {
    pub fn new(src: Layout, dst: Layout) -> Result<Self, LayoutError> {
        let same_primal = src.ndim_primal() == dst.ndim_primal()
            && src.primal_axes().all(|axis| dst.index_of(axis).is_some());
        if !same_primal {
            return Err(LayoutError::Incompatible {
                src: src.name,
                dst: dst.name,
            });
        }
        Ok(Self { src, dst })
    }

    pub fn src(&self) -> &Layout {
        &self.src
    }

    pub fn dst(&self) -> &Layout {
        &self.dst
    }

    /// Convert a shape in the source layout to the destination layout.
    pub fn forward_shape(&self, shape: &[SymExpr]) -> Result<Vec<SymExpr>, LayoutError> {
        convert_shape(&self.src, &self.dst, shape)
    }

    /// Convert a shape in the destination layout to the source layout.
    pub fn backward_shape(&self, shape: &[SymExpr]) -> Result<Vec<SymExpr>, LayoutError> {
        convert_shape(&self.dst, &self.src, shape)
    }
}

fn convert_shape(
    from: &Layout,
    to: &Layout,
    shape: &[SymExpr],
) -> Result<Vec<SymExpr>, LayoutError> {
    from.check_rank(shape)?;

    // Logical size of a primal axis, combining its outer and inner parts.
    let logical_size = |primal: char| -> SymExpr {
        let outer = from
            .index_of(primal)
            .map(|idx| shape[idx].clone())
            .unwrap_or(SymExpr::Value(1));
        match from.index_of(primal.to_ascii_lowercase()) {
            Some(inner) => outer * shape[inner].clone(),
            None => outer,
        }
    };

    let out_shape = to
        .axes()
        .iter()
        .map(|axis| {
            let dim = match (axis.is_primal(), axis.factor) {
                (false, Some(factor)) => SymExpr::Value(factor),
                _ => {
                    let size = logical_size(axis.primal());
                    match to.factor_of(axis.primal()) {
                        Some(factor) => size.div_ceil(&SymExpr::Value(factor)),
                        None => size,
                    }
                }
            };
            dim.simplify()
        })
        .collect();

    Ok(out_shape)
}
