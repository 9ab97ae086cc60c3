//! Symbolic expressions representing integer values.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::sync::Arc;

/// A named variable.
///
/// The variable may carry assumptions about its value, such as being >= 0.
///
/// Two symbols are equal if they have the same name.
#[derive(Clone, PartialEq)]
pub struct Symbol {
    pub name: String,

    // True if this value is assumed to be >= 0.
    pub positive: bool,
}

/// Symbolic expression representing an integer value.
///
/// Expressions can be known integer values, named symbols or composite
/// expressions. Division and remainder use floor semantics, so `-7 // 2` is
/// `-4` and `-7 % 2` is `1`.
#[derive(Clone)]
pub enum SymExpr {
    /// Element with a known integer value.
    Value(i64),
    /// Symbolic value
    Var(Arc<Symbol>),
    /// Addition of two symbolic values
    Add(Arc<SymExpr>, Arc<SymExpr>),
    /// Subtraction of two symbolic values
    Sub(Arc<SymExpr>, Arc<SymExpr>),
    /// Multiplication of two symbolic values
    Mul(Arc<SymExpr>, Arc<SymExpr>),
    /// Flooring division of first expression by second.
    Div(Arc<SymExpr>, Arc<SymExpr>),
    /// Ceiling division of first expression by second.
    DivCeil(Arc<SymExpr>, Arc<SymExpr>),
    /// Flooring remainder of first expression divided by second.
    Mod(Arc<SymExpr>, Arc<SymExpr>),
    /// Negation of a value
    Neg(Arc<SymExpr>),
}

/// Maximum number of canonicalize/simplify rounds performed by
/// [`SymExpr::simplify`].
const MAX_SIMPLIFY_ROUNDS: usize = 8;

impl SymExpr {
    /// Return the result of dividing `self` by `other`, rounded up.
    pub fn div_ceil(&self, other: &SymExpr) -> SymExpr {
        Self::DivCeil(self.clone().into(), other.clone().into())
    }

    /// Return the fixed value of this expression, if it is a constant.
    pub fn as_value(&self) -> Option<i64> {
        match self {
            Self::Value(x) => Some(*x),
            _ => None,
        }
    }

    fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    // Re-order and re-associate operands of commutative and associative
    // operations so that constants are on the left or "canonical order".
    //
    // For example `Mul(Mul(a, 2), Mul(b, 3))` becomes
    // `Mul(Mul(2, 3), Mul(a, b))`.
    fn canonicalize(&self) -> SymExpr {
        fn collect_terms(
            terms: &mut Vec<SymExpr>,
            term: &SymExpr,
            extract_lhs_rhs: &impl Fn(&SymExpr) -> Option<(&Arc<SymExpr>, &Arc<SymExpr>)>,
        ) {
            if let Some((lhs, rhs)) = extract_lhs_rhs(term) {
                collect_terms(terms, lhs, extract_lhs_rhs);
                collect_terms(terms, rhs, extract_lhs_rhs);
            } else {
                terms.push(term.canonicalize());
            }
        }

        // Collect the terms of a nested associative expression, sort them so
        // that constants come first and related terms are adjacent, simplify
        // the term list and fold it back into an expression.
        fn reassociate_terms(
            term: &SymExpr,
            extract_terms: &impl Fn(&SymExpr) -> Option<(&Arc<SymExpr>, &Arc<SymExpr>)>,
            simplify: impl Fn(Vec<SymExpr>) -> Vec<SymExpr>,
            default: SymExpr,
            reduce: impl Fn(SymExpr, SymExpr) -> SymExpr,
        ) -> SymExpr {
            let mut terms = Vec::new();
            collect_terms(&mut terms, term, extract_terms);
            terms.sort_by(cmp_values_first);
            let terms = simplify(terms);
            terms.into_iter().reduce(reduce).unwrap_or(default)
        }

        match self {
            Self::Value(_) | Self::Var(_) => self.clone(),
            Self::Neg(expr) => match expr.canonicalize() {
                SymExpr::Value(x) if x != i64::MIN => SymExpr::Value(-x),
                SymExpr::Neg(inner) => Arc::unwrap_or_clone(inner),
                // -(a + b) => -a + -b, so the negated terms can cancel
                // against terms in an enclosing sum.
                SymExpr::Add(lhs, rhs) => {
                    let lhs = Arc::unwrap_or_clone(lhs);
                    let rhs = Arc::unwrap_or_clone(rhs);
                    Self::Add((-lhs).into(), (-rhs).into()).canonicalize()
                }
                expr => Self::Neg(expr.into()),
            },
            Self::Mul(..) => reassociate_terms(
                self,
                &|term| match term {
                    Self::Mul(lhs, rhs) => Some((lhs, rhs)),
                    _ => None,
                },
                |terms| terms,
                SymExpr::Value(1),
                |prod, x| prod * x,
            ),
            Self::Add(..) => {
                // Remove adjacent terms which cancel.
                let remove_adjacent_opposite_terms = |mut terms: Vec<SymExpr>| {
                    let mut idx = 0;
                    while idx < terms.len().saturating_sub(1) {
                        if terms[idx].is_negation_of(&terms[idx + 1]) {
                            terms.remove(idx);
                            terms.remove(idx);
                        } else {
                            idx += 1;
                        }
                    }
                    terms
                };

                reassociate_terms(
                    self,
                    &|term| match term {
                        Self::Add(lhs, rhs) => Some((lhs, rhs)),
                        _ => None,
                    },
                    remove_adjacent_opposite_terms,
                    SymExpr::Value(0),
                    |sum, x| sum + x,
                )
            }
            Self::Sub(lhs, rhs) => {
                // Rewrite `x - y` as `x + (-y)`. This makes it easier to
                // simplify expressions by canceling opposite terms.
                let lhs = lhs.canonicalize();
                let rhs = rhs.canonicalize();
                Self::Add(lhs.into(), (-rhs).into()).canonicalize()
            }
            Self::Div(lhs, rhs) => Self::Div(lhs.canonicalize().into(), rhs.canonicalize().into()),
            Self::DivCeil(lhs, rhs) => {
                Self::DivCeil(lhs.canonicalize().into(), rhs.canonicalize().into())
            }
            Self::Mod(lhs, rhs) => Self::Mod(lhs.canonicalize().into(), rhs.canonicalize().into()),
        }
    }

    /// Simplify an expression.
    ///
    /// This folds constants and removes identities (eg. `x + 0` becomes `x`).
    /// Canonicalization and simplification are repeated until the expression
    /// stops changing, since folding can expose new constant terms.
    pub fn simplify(&self) -> SymExpr {
        let mut expr = self.canonicalize().simplify_canonical();
        for _ in 1..MAX_SIMPLIFY_ROUNDS {
            let next = expr.canonicalize().simplify_canonical();
            if next == expr {
                break;
            }
            expr = next;
        }
        expr
    }

    /// Simplify an expression, returning `None` if folding its constant terms
    /// overflows an `i64`.
    ///
    /// [`simplify`](Self::simplify) never wraps on overflow. It leaves the
    /// offending operation unfolded instead, which this method detects.
    pub fn checked_simplify(&self) -> Option<SymExpr> {
        let expr = self.simplify();
        (!expr.has_overflow()).then_some(expr)
    }

    /// Return true if this expression contains an operation on two constants
    /// whose result is not representable as an `i64`.
    fn has_overflow(&self) -> bool {
        match self {
            Self::Value(_) | Self::Var(_) => false,
            Self::Neg(expr) => match expr.as_ref() {
                Self::Value(x) => *x == i64::MIN,
                expr => expr.has_overflow(),
            },
            Self::Add(lhs, rhs)
            | Self::Sub(lhs, rhs)
            | Self::Mul(lhs, rhs)
            | Self::Div(lhs, rhs)
            | Self::DivCeil(lhs, rhs)
            | Self::Mod(lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
                (Self::Value(x), Self::Value(y)) => match self {
                    Self::Add(..) => x.checked_add(*y).is_none(),
                    Self::Sub(..) => x.checked_sub(*y).is_none(),
                    Self::Mul(..) => x.checked_mul(*y).is_none(),
                    _ => *x == i64::MIN && *y == -1,
                },
                (lhs, rhs) => lhs.has_overflow() || rhs.has_overflow(),
            },
        }
    }

    /// Simplify an expression which is assumed to have been put in canonical
    /// form by [`canonicalize`](Self::canonicalize).
    fn simplify_canonical(self) -> SymExpr {
        match self {
            Self::Value(_) | Self::Var(_) => self,
            Self::Neg(expr) => match Arc::unwrap_or_clone(expr).simplify_canonical() {
                SymExpr::Value(x) if x != i64::MIN => SymExpr::Value(-x),
                expr => Self::Neg(expr.into()),
            },
            Self::Add(lhs, rhs) => {
                let lhs = Arc::unwrap_or_clone(lhs).simplify_canonical();
                let rhs = Arc::unwrap_or_clone(rhs).simplify_canonical();

                match (lhs, rhs) {
                    (SymExpr::Value(0), rhs) => rhs,
                    (lhs, SymExpr::Value(0)) => lhs,
                    (SymExpr::Value(x), SymExpr::Value(y)) if x.checked_add(y).is_some() => {
                        SymExpr::Value(x + y)
                    }
                    (lhs, SymExpr::Neg(rhs)) if lhs == *rhs => SymExpr::Value(0),
                    (lhs, rhs) => lhs + rhs,
                }
            }
            Self::Sub(lhs, rhs) => {
                let lhs = Arc::unwrap_or_clone(lhs).simplify_canonical();
                let rhs = Arc::unwrap_or_clone(rhs).simplify_canonical();

                match (lhs, rhs) {
                    (lhs, SymExpr::Value(0)) => lhs,
                    (SymExpr::Value(x), SymExpr::Value(y)) if x.checked_sub(y).is_some() => {
                        SymExpr::Value(x - y)
                    }
                    (lhs, rhs) if lhs == rhs => SymExpr::Value(0),
                    (lhs, rhs) => lhs - rhs,
                }
            }
            Self::Mul(lhs, rhs) => {
                let lhs = Arc::unwrap_or_clone(lhs).simplify_canonical();
                let rhs = Arc::unwrap_or_clone(rhs).simplify_canonical();

                match (lhs, rhs) {
                    (SymExpr::Value(0), _) | (_, SymExpr::Value(0)) => SymExpr::Value(0),
                    (SymExpr::Value(1), rhs) => rhs,
                    (lhs, SymExpr::Value(1)) => lhs,
                    (SymExpr::Value(x), SymExpr::Value(y)) if x.checked_mul(y).is_some() => {
                        SymExpr::Value(x * y)
                    }
                    (lhs, rhs) => lhs * rhs,
                }
            }
            Self::Div(lhs, rhs) => {
                let lhs = Arc::unwrap_or_clone(lhs).simplify_canonical();
                let rhs = Arc::unwrap_or_clone(rhs).simplify_canonical();
                let (lhs, rhs) = remove_common_factors(lhs, rhs);

                match (lhs, rhs) {
                    (lhs, SymExpr::Value(1)) => lhs,
                    (SymExpr::Value(x), SymExpr::Value(y)) if can_divide(x, y) => {
                        SymExpr::Value(floor_div(x, y))
                    }
                    // x // b // c => x // (b * c) if b > 0 and c > 0.
                    (SymExpr::Div(lhs, c1), SymExpr::Value(c2)) => match c1.as_value() {
                        Some(c1) if c1 > 0 && c2 > 0 && c1.checked_mul(c2).is_some() => {
                            (*lhs).clone() / SymExpr::Value(c1 * c2)
                        }
                        _ => SymExpr::Div(lhs, c1) / SymExpr::Value(c2),
                    },
                    (lhs, rhs) => lhs / rhs,
                }
            }
            Self::DivCeil(lhs, rhs) => {
                let lhs = Arc::unwrap_or_clone(lhs).simplify_canonical();
                let rhs = Arc::unwrap_or_clone(rhs).simplify_canonical();
                let (lhs, rhs) = remove_common_factors(lhs, rhs);

                match (lhs, rhs) {
                    (lhs, SymExpr::Value(1)) => lhs,
                    (SymExpr::Value(x), SymExpr::Value(y)) if can_divide(x, y) => {
                        SymExpr::Value(div_ceil(x, y))
                    }
                    // x.div_ceil(b).div_ceil(c) => x.div_ceil(b * c) if b > 0
                    // and c > 0.
                    (SymExpr::DivCeil(lhs, c1), SymExpr::Value(c2)) => match c1.as_value() {
                        Some(c1) if c1 > 0 && c2 > 0 && c1.checked_mul(c2).is_some() => {
                            lhs.div_ceil(&SymExpr::Value(c1 * c2))
                        }
                        _ => SymExpr::DivCeil(lhs, c1).div_ceil(&SymExpr::Value(c2)),
                    },
                    (lhs, rhs) => lhs.div_ceil(&rhs),
                }
            }
            Self::Mod(lhs, rhs) => {
                let lhs = Arc::unwrap_or_clone(lhs).simplify_canonical();
                let rhs = Arc::unwrap_or_clone(rhs).simplify_canonical();

                match (lhs, rhs) {
                    (_, SymExpr::Value(1)) => SymExpr::Value(0),
                    (SymExpr::Value(x), SymExpr::Value(y)) if can_divide(x, y) => {
                        SymExpr::Value(floor_mod(x, y))
                    }
                    // (a * x) % x => 0
                    (lhs, rhs) if has_factor(&lhs, &rhs) => SymExpr::Value(0),
                    (lhs, rhs) => lhs % rhs,
                }
            }
        }
    }

    /// Return the precedence of the operator.
    ///
    /// This is used to add parentheses when formatting an expression tree.
    fn precedence(&self) -> u8 {
        match self {
            // Functions and atomic values have the maximum precedence, so they
            // never need to be wrapped in parens when formatting an expression.
            Self::Value(_) | Self::Var(_) | Self::DivCeil(..) => 5,
            Self::Neg(_) => 4,
            Self::Mul(..) | Self::Div(..) | Self::Mod(..) => 3,
            Self::Add(..) | Self::Sub(..) => 1,
        }
    }

    /// Create a named symbol, with no assumptions about the value.
    pub fn var(name: &str) -> Self {
        SymExpr::Var(
            Symbol {
                name: name.to_string(),
                positive: false,
            }
            .into(),
        )
    }

    /// Create a named symbol representing a positive value (ie. `>= 0`).
    pub fn pos_var(name: &str) -> Self {
        SymExpr::Var(
            Symbol {
                name: name.to_string(),
                positive: true,
            }
            .into(),
        )
    }

    /// Return the name of the symbol in a unary expression.
    ///
    /// Returns `None` if the expression is not unary or has a fixed value.
    fn name(&self) -> Option<&str> {
        match self {
            SymExpr::Var(sym) => Some(&sym.name),
            SymExpr::Neg(x) => x.name(),
            SymExpr::Value(_)
            | SymExpr::Add(..)
            | SymExpr::Sub(..)
            | SymExpr::Mul(..)
            | SymExpr::Div(..)
            | SymExpr::DivCeil(..)
            | SymExpr::Mod(..) => None,
        }
    }

    /// Return true if `self` and `other` are negations of each other, meaning
    /// that adding the two terms together will produce zero.
    fn is_negation_of(&self, other: &SymExpr) -> bool {
        match (self, other) {
            (x, SymExpr::Neg(y)) if *x == **y => true,
            (SymExpr::Neg(x), y) if **x == *y => true,
            _ => false,
        }
    }

    fn fmt_expr(&self, f: &mut fmt::Formatter<'_>, debug: bool) -> fmt::Result {
        let operand = |f: &mut fmt::Formatter<'_>, expr: &SymExpr, parens: bool| {
            if parens {
                write!(f, "(")?;
                expr.fmt_expr(f, debug)?;
                write!(f, ")")
            } else {
                expr.fmt_expr(f, debug)
            }
        };

        // Left operands need parens only if they bind more loosely. Right
        // operands also need them at equal precedence, unless the operator is
        // associative and the operand is the same operator.
        let write_binop = |f: &mut fmt::Formatter<'_>, op: &str, lhs: &SymExpr, rhs: &SymExpr| {
            let prec = self.precedence();
            let rhs_assoc = matches!(
                (self, rhs),
                (SymExpr::Add(..), SymExpr::Add(..)) | (SymExpr::Mul(..), SymExpr::Mul(..))
            );
            operand(f, lhs, lhs.precedence() < prec)?;
            write!(f, " {op} ")?;
            operand(
                f,
                rhs,
                rhs.precedence() < prec || (rhs.precedence() == prec && !rhs_assoc),
            )
        };

        match self {
            Self::Value(val) => write!(f, "{}", val),
            Self::Var(sym) if debug => write!(
                f,
                "\"{}\"{}",
                sym.name,
                if sym.positive { 'u' } else { 'i' }
            ),
            Self::Var(sym) => write!(f, "{}", sym.name),
            // nb. No space between "-" and expression to make formatting
            // distinct from subtraction.
            Self::Neg(expr) => {
                write!(f, "-")?;
                operand(f, expr, expr.precedence() < self.precedence())
            }
            Self::Add(lhs, rhs) => write_binop(f, "+", lhs, rhs),
            Self::Sub(lhs, rhs) => write_binop(f, "-", lhs, rhs),
            Self::Mul(lhs, rhs) => write_binop(f, "*", lhs, rhs),
            Self::Div(lhs, rhs) => write_binop(f, "//", lhs, rhs),
            Self::Mod(lhs, rhs) => write_binop(f, "%", lhs, rhs),
            Self::DivCeil(lhs, rhs) => {
                write!(f, "ceil_div(")?;
                lhs.fmt_expr(f, debug)?;
                write!(f, ", ")?;
                rhs.fmt_expr(f, debug)?;
                write!(f, ")")
            }
        }
    }
}

/// Sort terms in an order that makes simplification easier, by making terms
/// which can be combined or eliminated adjacent.
fn cmp_values_first(a: &SymExpr, b: &SymExpr) -> Ordering {
    match (a.is_value(), b.is_value()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => match (a.name(), b.name()) {
            (Some(a_name), Some(b_name)) => a_name.cmp(b_name),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        },
    }
}

/// Collect the factors of a (possibly nested) product.
fn collect_factors(terms: &mut Vec<SymExpr>, term: &SymExpr) {
    if let SymExpr::Mul(lhs, rhs) = term {
        collect_factors(terms, lhs);
        collect_factors(terms, rhs);
    } else {
        terms.push(term.clone());
    }
}

/// Return true if `factor` is one of the factors of the product `expr`.
fn has_factor(expr: &SymExpr, factor: &SymExpr) -> bool {
    if matches!(factor, SymExpr::Value(0)) {
        return false;
    }
    let mut terms = Vec::new();
    collect_factors(&mut terms, expr);
    terms.len() > 1 && terms.iter().any(|t| t == factor)
}

/// Remove common factors from `lhs` and `rhs`.
fn remove_common_factors(lhs: SymExpr, rhs: SymExpr) -> (SymExpr, SymExpr) {
    let mut lhs_terms = Vec::new();
    collect_factors(&mut lhs_terms, &lhs);

    let mut rhs_terms = Vec::new();
    collect_factors(&mut rhs_terms, &rhs);

    let mut i = 0;
    while i < lhs_terms.len() {
        let lhs_term = &lhs_terms[i];
        let k = rhs_terms
            .iter()
            .position(|t| lhs_term == t && !matches!(t, SymExpr::Value(0)));
        if let Some(k) = k {
            lhs_terms.remove(i);
            rhs_terms.remove(k);
        } else {
            i += 1;
        }
    }

    let lhs = lhs_terms
        .into_iter()
        .reduce(|prod, x| prod * x)
        .unwrap_or(SymExpr::Value(1));
    let rhs = rhs_terms
        .into_iter()
        .reduce(|prod, x| prod * x)
        .unwrap_or(SymExpr::Value(1));
    (lhs, rhs)
}

impl PartialEq<SymExpr> for SymExpr {
    fn eq(&self, other: &SymExpr) -> bool {
        let commutative_eq = |self_lhs, self_rhs, other_lhs, other_rhs| {
            (self_lhs == other_lhs && self_rhs == other_rhs)
                || (self_lhs == other_rhs && self_rhs == other_lhs)
        };

        // Symbols are equal if they have the same value or the same name.
        match (self, other) {
            (Self::Value(x), Self::Value(y)) => x == y,
            (Self::Var(x), Self::Var(y)) => x.name == y.name,
            (Self::Neg(x), Self::Neg(y)) => x == y,
            (Self::Add(a, b), Self::Add(c, d)) | (Self::Mul(a, b), Self::Mul(c, d)) => {
                commutative_eq(a, b, c, d)
            }
            (Self::Sub(a, b), Self::Sub(c, d))
            | (Self::Div(a, b), Self::Div(c, d))
            | (Self::DivCeil(a, b), Self::DivCeil(c, d))
            | (Self::Mod(a, b), Self::Mod(c, d)) => a == c && b == d,
            _ => false,
        }
    }
}

impl Add<SymExpr> for SymExpr {
    type Output = SymExpr;

    fn add(self, rhs: SymExpr) -> Self {
        Self::Add(self.into(), rhs.into())
    }
}

impl Sub<SymExpr> for SymExpr {
    type Output = SymExpr;

    fn sub(self, rhs: SymExpr) -> Self {
        Self::Sub(self.into(), rhs.into())
    }
}

impl Mul<SymExpr> for SymExpr {
    type Output = SymExpr;

    fn mul(self, rhs: SymExpr) -> Self {
        Self::Mul(self.into(), rhs.into())
    }
}

/// Flooring division.
impl Div<SymExpr> for SymExpr {
    type Output = SymExpr;

    fn div(self, rhs: SymExpr) -> Self {
        Self::Div(self.into(), rhs.into())
    }
}

/// Flooring remainder.
impl Rem<SymExpr> for SymExpr {
    type Output = SymExpr;

    fn rem(self, rhs: SymExpr) -> Self {
        Self::Mod(self.into(), rhs.into())
    }
}

impl Neg for SymExpr {
    type Output = SymExpr;

    fn neg(self) -> Self {
        Self::Neg(self.into())
    }
}

impl From<Symbol> for SymExpr {
    fn from(val: Symbol) -> Self {
        Self::Var(val.into())
    }
}

/// Create a symbol with a given name and an assumption that the value is
/// positive (`>= 0`).
///
/// The rationale for the positivity assumption is that during shape inference,
/// the most common use of symbols is to represent dimension sizes.
impl<'a> From<&'a str> for SymExpr {
    fn from(name: &'a str) -> Self {
        SymExpr::pos_var(name)
    }
}

impl From<i64> for SymExpr {
    fn from(val: i64) -> Self {
        SymExpr::Value(val)
    }
}

impl From<i32> for SymExpr {
    fn from(val: i32) -> Self {
        SymExpr::Value(val as i64)
    }
}

impl fmt::Debug for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_expr(f, true)
    }
}

impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_expr(f, false)
    }
}

/// Return true if `lhs / rhs` is defined and does not overflow.
const fn can_divide(lhs: i64, rhs: i64) -> bool {
    rhs != 0 && !(lhs == i64::MIN && rhs == -1)
}

/// Integer division rounding towards negative infinity.
pub const fn floor_div(lhs: i64, rhs: i64) -> i64 {
    let d = lhs / rhs;
    let r = lhs % rhs;
    if r != 0 && ((r < 0) != (rhs < 0)) {
        d - 1
    } else {
        d
    }
}

/// Remainder of [`floor_div`]. The result has the same sign as `rhs`.
pub const fn floor_mod(lhs: i64, rhs: i64) -> i64 {
    let r = lhs % rhs;
    if r != 0 && ((r < 0) != (rhs < 0)) {
        r + rhs
    } else {
        r
    }
}

/// Integer division rounding towards positive infinity.
pub const fn div_ceil(lhs: i64, rhs: i64) -> i64 {
    let d = lhs / rhs;
    let r = lhs % rhs;
    if r != 0 && ((r > 0) == (rhs > 0)) {
        d + 1
    } else {
        d
    }
}
