use super::{Doc, PrintError, Printer};
use crate::attrs::ObjectRef;
use crate::expr::Expr;
use crate::struct_info::{StructInfo, TensorShape};

/// Return the name of the kind of `expr`, for use in errors.
pub(super) fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::Var(_) => "Var",
        Expr::GlobalVar(_) => "GlobalVar",
        Expr::ExternFunc(_) => "ExternFunc",
        Expr::Op(_) => "Op",
        Expr::Tuple(_) => "Tuple",
        Expr::Shape(_) => "ShapeExpr",
        Expr::PrimValue(_) => "PrimValue",
        Expr::StringImm(_) => "StringImm",
        Expr::DataTypeImm(_) => "DataTypeImm",
        Expr::Call(_) => "Call",
    }
}

impl Printer {
    pub(super) fn expr_doc(&self, expr: &Expr) -> Result<Doc, PrintError> {
        let doc = match expr {
            Expr::Var(var) => Doc::id(var.name.as_str()),
            Expr::GlobalVar(name) => Doc::id(name.as_str()),
            Expr::ExternFunc(symbol) => self
                .builtin("ExternFunc")
                .call(vec![Doc::str(symbol.as_str())], Vec::new()),
            Expr::Op(name) => self.op_ref(name),
            Expr::Tuple(fields) => Doc::Tuple(
                fields
                    .iter()
                    .map(|f| self.expr_doc(f))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Shape(dims) => self.builtin("shape").call(
                vec![Doc::List(dims.iter().map(Doc::dim).collect())],
                Vec::new(),
            ),
            Expr::PrimValue(prim) => self
                .builtin("prim_value")
                .call(vec![Doc::dim(&prim.value)], Vec::new()),
            Expr::StringImm(s) => self
                .builtin("str")
                .call(vec![Doc::str(s.as_str())], Vec::new()),
            Expr::DataTypeImm(dtype) => self
                .builtin("dtype")
                .call(vec![Doc::str(dtype.to_string())], Vec::new()),
            Expr::Call(call) => self.call_doc(call)?,
        };
        Ok(doc)
    }

    /// Return a doc for an expression in callee position.
    ///
    /// External functions are printed as their symbol name.
    pub(super) fn callee_doc(&self, expr: &Expr) -> Result<Doc, PrintError> {
        match expr {
            Expr::ExternFunc(symbol) => Ok(Doc::str(symbol.as_str())),
            _ => self.expr_doc(expr),
        }
    }

    pub(super) fn object_doc(&self, obj: &ObjectRef) -> Result<Doc, PrintError> {
        let doc = match obj {
            ObjectRef::Int(x) => Doc::Int(*x),
            ObjectRef::Float(x) => Doc::Float(*x),
            ObjectRef::Bool(x) => Doc::Bool(*x),
            ObjectRef::Str(s) => Doc::str(s.as_str()),
            ObjectRef::IntArray(values) => {
                Doc::List(values.iter().copied().map(Doc::Int).collect())
            }
            ObjectRef::Array(items) => Doc::List(
                items
                    .iter()
                    .map(|item| self.object_doc(item))
                    .collect::<Result<_, _>>()?,
            ),
            ObjectRef::Expr(expr) => self.expr_doc(expr)?,
        };
        Ok(doc)
    }

    fn shape_doc(shape: &[tessera_shape_inference::SymExpr]) -> Doc {
        Doc::Tuple(shape.iter().map(Doc::dim).collect())
    }

    pub(super) fn struct_info_doc(&self, sinfo: &StructInfo) -> Doc {
        match sinfo {
            StructInfo::Tensor(tensor) => {
                let mut args = Vec::new();
                let mut kwargs = Vec::new();
                if !tensor.dtype.is_void() {
                    kwargs.push(("dtype".to_string(), Doc::str(tensor.dtype.to_string())));
                }
                match &tensor.shape {
                    TensorShape::Known(dims) => args.push(Self::shape_doc(dims)),
                    TensorShape::Rank(ndim) => {
                        kwargs.push(("ndim".to_string(), Doc::Int(*ndim as i64)))
                    }
                }
                self.builtin("Tensor").call(args, kwargs)
            }
            StructInfo::DTensor(dtensor) => {
                let tensor = &dtensor.tensor;
                let (shape, kwargs) = match &tensor.shape {
                    TensorShape::Known(dims) => (Self::shape_doc(dims), Vec::new()),
                    TensorShape::Rank(ndim) => {
                        (Doc::None, vec![("ndim".to_string(), Doc::Int(*ndim as i64))])
                    }
                };
                let args = vec![
                    shape,
                    Doc::str(tensor.dtype.to_string()),
                    Doc::str(dtensor.device_mesh.as_str()),
                    Doc::str(dtensor.placement.as_str()),
                ];
                self.builtin("DTensor").call(args, kwargs)
            }
            StructInfo::Tuple(fields) => self.builtin("Tuple").call(
                fields.iter().map(|f| self.struct_info_doc(f)).collect(),
                Vec::new(),
            ),
            StructInfo::Shape(TensorShape::Known(dims)) => self.builtin("Shape").call(
                vec![Doc::List(dims.iter().map(Doc::dim).collect())],
                Vec::new(),
            ),
            StructInfo::Shape(TensorShape::Rank(ndim)) => self
                .builtin("Shape")
                .call(Vec::new(), vec![("ndim".to_string(), Doc::Int(*ndim as i64))]),
            StructInfo::Prim(dtype) => self
                .builtin("Prim")
                .call(vec![Doc::str(dtype.to_string())], Vec::new()),
            StructInfo::Object => self.builtin("Object"),
        }
    }
}
