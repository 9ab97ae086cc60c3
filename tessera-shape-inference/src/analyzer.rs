//! Three-valued reasoning about symbolic integer expressions.

use crate::sym_expr::{SymExpr, div_ceil, floor_div};

/// Result of trying to prove a predicate.
///
/// Callers must handle [`Proof::Unknown`] explicitly. A check which cannot be
/// decided statically is neither a success nor a failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Proof {
    /// The predicate holds for all values of the symbols.
    True,
    /// The predicate is false for all values of the symbols.
    False,
    /// The predicate may or may not hold depending on symbol values.
    Unknown,
}

impl Proof {
    fn not(self) -> Proof {
        match self {
            Proof::True => Proof::False,
            Proof::False => Proof::True,
            Proof::Unknown => Proof::Unknown,
        }
    }

    fn and(self, other: Proof) -> Proof {
        match (self, other) {
            (Proof::False, _) | (_, Proof::False) => Proof::False,
            (Proof::True, Proof::True) => Proof::True,
            _ => Proof::Unknown,
        }
    }

    fn or(self, other: Proof) -> Proof {
        match (self, other) {
            (Proof::True, _) | (_, Proof::True) => Proof::True,
            (Proof::False, Proof::False) => Proof::False,
            _ => Proof::Unknown,
        }
    }
}

/// Boolean predicate over symbolic expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Eq(SymExpr, SymExpr),
    Ne(SymExpr, SymExpr),
    Lt(SymExpr, SymExpr),
    Le(SymExpr, SymExpr),
    Gt(SymExpr, SymExpr),
    Ge(SymExpr, SymExpr),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(lhs: impl Into<SymExpr>, rhs: impl Into<SymExpr>) -> Self {
        Self::Eq(lhs.into(), rhs.into())
    }

    pub fn ne(lhs: impl Into<SymExpr>, rhs: impl Into<SymExpr>) -> Self {
        Self::Ne(lhs.into(), rhs.into())
    }

    pub fn lt(lhs: impl Into<SymExpr>, rhs: impl Into<SymExpr>) -> Self {
        Self::Lt(lhs.into(), rhs.into())
    }

    pub fn ge(lhs: impl Into<SymExpr>, rhs: impl Into<SymExpr>) -> Self {
        Self::Ge(lhs.into(), rhs.into())
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::And(self.into(), other.into())
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::Or(self.into(), other.into())
    }
}

/// Inclusive range of values an expression may take.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    const UNBOUNDED: Bounds = Bounds {
        min: i64::MIN,
        max: i64::MAX,
    };

    fn exact(value: i64) -> Bounds {
        Bounds {
            min: value,
            max: value,
        }
    }

    fn add(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.saturating_add(other.min),
            max: self.max.saturating_add(other.max),
        }
    }

    fn neg(self) -> Bounds {
        Bounds {
            min: self.max.saturating_neg(),
            max: self.min.saturating_neg(),
        }
    }

    fn mul(self, other: Bounds) -> Bounds {
        let corners = [
            self.min.saturating_mul(other.min),
            self.min.saturating_mul(other.max),
            self.max.saturating_mul(other.min),
            self.max.saturating_mul(other.max),
        ];
        Bounds {
            min: corners.iter().copied().min().unwrap_or(i64::MIN),
            max: corners.iter().copied().max().unwrap_or(i64::MAX),
        }
    }

    fn as_exact(&self) -> Option<i64> {
        (self.min == self.max).then_some(self.min)
    }
}

/// Symbolic-proof oracle used during shape inference.
///
/// The analyzer decides comparisons by simplifying the difference between the
/// two sides and then bounding it using interval arithmetic. Symbols created
/// with a positivity assumption (see [`SymExpr::pos_var`]) are bounded below
/// by zero.
///
/// The analyzer holds no state, so a single instance can be shared between
/// threads.
#[derive(Clone, Debug, Default)]
pub struct Analyzer {}

impl Analyzer {
    pub fn new() -> Self {
        Self {}
    }

    /// Simplify an expression. See [`SymExpr::simplify`].
    pub fn simplify(&self, expr: &SymExpr) -> SymExpr {
        expr.simplify()
    }

    /// Simplify an expression, or return `None` if a constant term overflows.
    /// See [`SymExpr::checked_simplify`].
    pub fn checked_simplify(&self, expr: &SymExpr) -> Option<SymExpr> {
        expr.checked_simplify()
    }

    /// Return the range of values that `expr` may have.
    pub fn bounds(&self, expr: &SymExpr) -> Bounds {
        match expr {
            SymExpr::Value(x) => Bounds::exact(*x),
            SymExpr::Var(sym) => {
                if sym.positive {
                    Bounds {
                        min: 0,
                        max: i64::MAX,
                    }
                } else {
                    Bounds::UNBOUNDED
                }
            }
            SymExpr::Neg(x) => self.bounds(x).neg(),
            SymExpr::Add(lhs, rhs) => self.bounds(lhs).add(self.bounds(rhs)),
            SymExpr::Sub(lhs, rhs) => self.bounds(lhs).add(self.bounds(rhs).neg()),
            SymExpr::Mul(lhs, rhs) => self.bounds(lhs).mul(self.bounds(rhs)),
            SymExpr::Div(lhs, rhs) | SymExpr::DivCeil(lhs, rhs) => {
                // Only division by a positive constant is bounded. Rounding
                // is monotonic, so dividing the end points is exact.
                let round = if matches!(expr, SymExpr::Div(..)) {
                    floor_div
                } else {
                    div_ceil
                };
                match self.bounds(rhs).as_exact() {
                    Some(d) if d > 0 => {
                        let lhs = self.bounds(lhs);
                        Bounds {
                            min: round(lhs.min, d),
                            max: round(lhs.max, d),
                        }
                    }
                    _ => Bounds::UNBOUNDED,
                }
            }
            SymExpr::Mod(lhs, rhs) => match self.bounds(rhs).as_exact() {
                Some(d) if d > 0 => {
                    let lhs = self.bounds(lhs);
                    if lhs.min >= 0 && lhs.max < d {
                        lhs
                    } else {
                        Bounds { min: 0, max: d - 1 }
                    }
                }
                _ => Bounds::UNBOUNDED,
            },
        }
    }

    /// Try to prove a predicate for all values of the symbols it contains.
    pub fn prove(&self, pred: &Predicate) -> Proof {
        match pred {
            Predicate::Eq(lhs, rhs) => {
                let diff = self.bounds(&self.difference(lhs, rhs));
                if diff.min == 0 && diff.max == 0 {
                    Proof::True
                } else if diff.min > 0 || diff.max < 0 {
                    Proof::False
                } else {
                    Proof::Unknown
                }
            }
            Predicate::Ne(lhs, rhs) => self.prove(&Predicate::Eq(lhs.clone(), rhs.clone())).not(),
            // lhs < rhs  <=>  rhs - lhs > 0
            Predicate::Lt(lhs, rhs) => {
                let diff = self.bounds(&self.difference(rhs, lhs));
                if diff.min > 0 {
                    Proof::True
                } else if diff.max <= 0 {
                    Proof::False
                } else {
                    Proof::Unknown
                }
            }
            Predicate::Le(lhs, rhs) => self.prove(&Predicate::Lt(rhs.clone(), lhs.clone())).not(),
            Predicate::Gt(lhs, rhs) => self.prove(&Predicate::Lt(rhs.clone(), lhs.clone())),
            Predicate::Ge(lhs, rhs) => self.prove(&Predicate::Lt(lhs.clone(), rhs.clone())).not(),
            Predicate::And(lhs, rhs) => self.prove(lhs).and(self.prove(rhs)),
            Predicate::Or(lhs, rhs) => self.prove(lhs).or(self.prove(rhs)),
            Predicate::Not(pred) => self.prove(pred).not(),
        }
    }

    /// Return true if `pred` is provably true.
    ///
    /// A `false` result does not mean that the predicate is false, only that
    /// it could not be proven.
    pub fn can_prove(&self, pred: &Predicate) -> bool {
        self.prove(pred) == Proof::True
    }

    /// Return true if `lhs` and `rhs` are provably equal.
    pub fn can_prove_equal(&self, lhs: &SymExpr, rhs: &SymExpr) -> bool {
        self.can_prove(&Predicate::Eq(lhs.clone(), rhs.clone()))
    }

    fn difference(&self, lhs: &SymExpr, rhs: &SymExpr) -> SymExpr {
        (lhs.clone() - rhs.clone()).simplify()
    }
}
