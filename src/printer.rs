//! Conversion of calls and expressions to their canonical textual form.
//!
//! The output uses a Python-like syntax, where builtins are accessed through
//! an IR prefix (`R` by default):
//!
//! ```text
//! R.nn.conv2d(x, w, strides=[1, 1], padding=[0, 0, 0, 0], ..., out_dtype="void")
//! R.call_tir(add_one, (x,), out_sinfo=R.Tensor((4, 4), dtype="float32"))
//! ```
//!
//! Printing is deterministic. Dictionary attributes are emitted in sorted key
//! order and all other attribute records in field declaration order.

use thiserror::Error;

use crate::env::{env_setting, parse_identifier};
use crate::expr::{Call, Expr};
use crate::struct_info::StructInfo;

mod attrs;
mod call;
mod doc;
mod expr;

pub use doc::Doc;

/// Errors that indicate a call or attribute record cannot be printed.
///
/// These signal an inconsistency in an attribute schema or IR construction,
/// rather than invalid user input.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PrintError {
    /// An attribute field has a kind with no textual form.
    #[error("TypeError: {kind} is not allowed in Attrs (field \"{key}\")")]
    UnsupportedAttrField { key: String, kind: &'static str },

    /// The callee of a call is not an operator, external function or
    /// variable.
    #[error("TypeError: unsupported callee {0}")]
    UnsupportedCallee(&'static str),

    /// A call violates the structure required by its operator.
    #[error("{op}: {reason}")]
    MalformedCall { op: String, reason: String },
}

/// Options which configure a [`Printer`].
#[derive(Clone, Debug, PartialEq)]
pub struct PrinterOptions {
    ir_prefix: String,
    op_namespace: String,
}

impl Default for PrinterOptions {
    /// The IR prefix defaults to `R` and can be overridden by the
    /// `TESSERA_IR_PREFIX` environment variable.
    fn default() -> Self {
        Self {
            ir_prefix: env_setting("TESSERA_IR_PREFIX", parse_identifier)
                .unwrap_or_else(|| "R".to_string()),
            op_namespace: "relax.".to_string(),
        }
    }
}

impl PrinterOptions {
    /// Set the identifier through which builtins are accessed.
    pub fn ir_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ir_prefix = prefix.into();
        self
    }

    /// Set the namespace which is stripped from operator names.
    ///
    /// Operators in this namespace are printed as attributes of the IR
    /// prefix. Other operators are printed by their full name.
    pub fn op_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.op_namespace = namespace.into();
        self
    }
}

/// Converts IR nodes to text.
#[derive(Clone, Debug, Default)]
pub struct Printer {
    options: PrinterOptions,
}

impl Printer {
    pub fn new(options: PrinterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PrinterOptions {
        &self.options
    }

    pub fn print_call(&self, call: &Call) -> Result<String, PrintError> {
        self.call_doc(call).map(|doc| doc.to_string())
    }

    pub fn print_expr(&self, expr: &Expr) -> Result<String, PrintError> {
        self.expr_doc(expr).map(|doc| doc.to_string())
    }

    pub fn print_struct_info(&self, sinfo: &StructInfo) -> String {
        self.struct_info_doc(sinfo).to_string()
    }

    /// Return a doc for the builtin `name`, accessed through the IR prefix.
    ///
    /// `name` may be dotted, eg. `nn.conv2d`.
    fn builtin(&self, name: &str) -> Doc {
        name.split('.')
            .fold(Doc::id(self.options.ir_prefix.as_str()), |doc, part| {
                doc.attr(part)
            })
    }

    /// Return a doc for a reference to the registered operator `name`.
    fn op_ref(&self, name: &str) -> Doc {
        match name.strip_prefix(self.options.op_namespace.as_str()) {
            Some(local_name) if !self.options.op_namespace.is_empty() => self.builtin(local_name),
            _ => Doc::id(name),
        }
    }
}

/// Print `call` with the default options.
pub fn print_call(call: &Call) -> Result<String, PrintError> {
    Printer::default().print_call(call)
}
