use std::fmt;

use tessera_shape_inference::SymExpr;

/// Node of the textual form of an expression.
///
/// A `Doc` is rendered with [`Display`](fmt::Display), using Python-style
/// literals.
#[derive(Clone, Debug, PartialEq)]
pub enum Doc {
    /// Bare identifier, eg. a variable name.
    Id(String),

    /// Attribute access, `value.name`.
    Attr(Box<Doc>, String),

    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    None,

    /// Symbolic integer expression.
    Sym(SymExpr),

    List(Vec<Doc>),
    Tuple(Vec<Doc>),
    Call {
        callee: Box<Doc>,
        args: Vec<Doc>,
        kwargs: Vec<(String, Doc)>,
    },
}

impl Doc {
    pub fn id(name: impl Into<String>) -> Doc {
        Doc::Id(name.into())
    }

    pub fn str(val: impl Into<String>) -> Doc {
        Doc::Str(val.into())
    }

    /// Return a literal for integer dimensions and a symbolic doc otherwise.
    pub fn dim(expr: &SymExpr) -> Doc {
        match expr.as_value() {
            Some(val) => Doc::Int(val),
            None => Doc::Sym(expr.clone()),
        }
    }

    /// Return a doc for `self.name`.
    pub fn attr(self, name: impl Into<String>) -> Doc {
        Doc::Attr(Box::new(self), name.into())
    }

    /// Return a doc for a call with `self` as the callee.
    pub fn call(self, args: Vec<Doc>, kwargs: Vec<(String, Doc)>) -> Doc {
        Doc::Call {
            callee: Box::new(self),
            args,
            kwargs,
        }
    }
}

fn write_list<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = &'a Doc>,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Return true for invisible formatting and separator characters, which
/// Python does not consider printable.
fn is_format_char(c: char) -> bool {
    matches!(c, '\u{ad}' | '\u{200b}'..='\u{200f}' | '\u{2028}'..='\u{202e}' | '\u{feff}')
}

/// Write a double-quoted Python string literal.
///
/// Printable characters, including non-ASCII ones, are written as-is. Other
/// characters use Python's `\xNN`, `\uNNNN` or `\UNNNNNNNN` escapes.
fn write_str_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '\\' => write!(f, "\\\\")?,
            '"' => write!(f, "\\\"")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            c if c.is_control() || is_format_char(c) => {
                let code = c as u32;
                if code <= 0xff {
                    write!(f, "\\x{:02x}", code)?;
                } else if code <= 0xffff {
                    write!(f, "\\u{:04x}", code)?;
                } else {
                    write!(f, "\\U{:08x}", code)?;
                }
            }
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

/// Write a Python float literal. Non-finite values have no literal syntax.
fn write_float_literal(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        write!(f, "float(\"nan\")")
    } else if x.is_infinite() {
        let sign = if x < 0.0 { "-" } else { "" };
        write!(f, "float(\"{}inf\")", sign)
    } else {
        write!(f, "{:?}", x)
    }
}

impl fmt::Display for Doc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Doc::Id(name) => write!(f, "{}", name),
            Doc::Attr(value, name) => write!(f, "{}.{}", value, name),
            Doc::Str(s) => write_str_literal(f, s),
            Doc::Int(x) => write!(f, "{}", x),
            Doc::UInt(x) => write!(f, "{}", x),
            Doc::Float(x) => write_float_literal(f, *x),
            Doc::Bool(true) => write!(f, "True"),
            Doc::Bool(false) => write!(f, "False"),
            Doc::None => write!(f, "None"),
            Doc::Sym(expr) => write!(f, "{}", expr),
            Doc::List(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Doc::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Doc::Call {
                callee,
                args,
                kwargs,
            } => {
                write!(f, "{}(", callee)?;
                write_list(f, args)?;
                for (i, (key, value)) in kwargs.iter().enumerate() {
                    if i > 0 || !args.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                write!(f, ")")
            }
        }
    }
}
