//! IR expressions.

use tessera_shape_inference::SymExpr;

use crate::attrs::Attrs;
use crate::dtype::DataType;
use crate::struct_info::{StructInfo, TensorShape};

/// A local variable, optionally annotated with its struct info.
#[derive(Clone, Debug)]
pub struct Var {
    pub name: String,
    pub struct_info: Option<StructInfo>,
}

/// A scalar value of a primitive type.
#[derive(Clone, Debug)]
pub struct PrimValue {
    pub value: SymExpr,
    pub dtype: DataType,
}

/// Expression node in the IR.
#[derive(Clone, Debug)]
pub enum Expr {
    Var(Var),

    /// Reference to a function in the enclosing module.
    GlobalVar(String),

    /// Reference to an external symbol, such as a packed function.
    ExternFunc(String),

    /// Reference to a registered operator, by name.
    Op(String),

    Tuple(Vec<Expr>),
    Shape(Vec<SymExpr>),
    PrimValue(PrimValue),
    StringImm(String),
    DataTypeImm(DataType),
    Call(Box<Call>),
}

impl Expr {
    pub fn var(name: &str, struct_info: impl Into<StructInfo>) -> Expr {
        Expr::Var(Var {
            name: name.to_string(),
            struct_info: Some(struct_info.into()),
        })
    }

    /// Create a variable with no struct info annotation.
    pub fn untyped_var(name: &str) -> Expr {
        Expr::Var(Var {
            name: name.to_string(),
            struct_info: None,
        })
    }

    pub fn op(name: &str) -> Expr {
        Expr::Op(name.to_string())
    }

    pub fn extern_func(symbol: &str) -> Expr {
        Expr::ExternFunc(symbol.to_string())
    }

    pub fn global_var(name: &str) -> Expr {
        Expr::GlobalVar(name.to_string())
    }

    pub fn prim_value(value: impl Into<SymExpr>, dtype: DataType) -> Expr {
        Expr::PrimValue(PrimValue {
            value: value.into(),
            dtype,
        })
    }

    /// Return the struct info that is known for this expression without
    /// running inference.
    ///
    /// Calls return `None`, as their struct info is the result of inference.
    pub fn struct_info(&self) -> Option<StructInfo> {
        match self {
            Self::Var(var) => var.struct_info.clone(),
            Self::Tuple(fields) => fields
                .iter()
                .map(|f| f.struct_info())
                .collect::<Option<Vec<_>>>()
                .map(StructInfo::Tuple),
            Self::Shape(dims) => Some(StructInfo::Shape(TensorShape::Known(dims.clone()))),
            Self::PrimValue(prim) => Some(StructInfo::Prim(prim.dtype)),
            Self::StringImm(_) | Self::DataTypeImm(_) => Some(StructInfo::Object),
            Self::GlobalVar(_) | Self::ExternFunc(_) | Self::Op(_) | Self::Call(_) => None,
        }
    }
}

impl From<Call> for Expr {
    fn from(val: Call) -> Self {
        Expr::Call(val.into())
    }
}

/// Invocation of an operator or function.
#[derive(Clone, Debug)]
pub struct Call {
    /// The callee. Usually an [`Expr::Op`].
    pub op: Expr,
    pub args: Vec<Expr>,
    pub attrs: Option<Attrs>,

    /// Explicit struct info annotations for the result.
    pub sinfo_args: Vec<StructInfo>,
}

impl Call {
    pub fn new(op: Expr, args: Vec<Expr>) -> Self {
        Self {
            op,
            args,
            attrs: None,
            sinfo_args: Vec::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: impl Into<Attrs>) -> Self {
        self.attrs = Some(attrs.into());
        self
    }

    pub fn with_sinfo_args(mut self, sinfo_args: Vec<StructInfo>) -> Self {
        self.sinfo_args = sinfo_args;
        self
    }

    /// Return the name of the operator this call invokes, if the callee is an
    /// operator reference.
    pub fn op_name(&self) -> Option<&str> {
        match &self.op {
            Expr::Op(name) => Some(name),
            _ => None,
        }
    }
}
