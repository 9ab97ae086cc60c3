//! Operator attribute records and reflection over their fields.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::dtype::DataType;
use crate::expr::Expr;
use crate::printer::PrintError;

/// Opaque value stored in an attribute field or a dictionary attribute.
#[derive(Clone, Debug)]
pub enum ObjectRef {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    IntArray(Vec<i64>),
    Array(Vec<ObjectRef>),
    Expr(Box<Expr>),
}

impl From<i64> for ObjectRef {
    fn from(val: i64) -> Self {
        Self::Int(val)
    }
}

impl From<&str> for ObjectRef {
    fn from(val: &str) -> Self {
        Self::Str(val.to_string())
    }
}

impl From<Vec<i64>> for ObjectRef {
    fn from(val: Vec<i64>) -> Self {
        Self::IntArray(val)
    }
}

impl From<Expr> for ObjectRef {
    fn from(val: Expr) -> Self {
        Self::Expr(val.into())
    }
}

/// A field value passed to an [`AttrVisitor`].
///
/// This is a closed set of primitive kinds plus [`AttrValue::Object`] for
/// anything richer. `RawPtr` and `NdArray` exist so that attribute schemas
/// can describe such fields, but they have no textual form.
#[derive(Copy, Clone, Debug)]
pub enum AttrValue<'a> {
    F64(f64),
    I64(i64),
    U64(u64),
    Int(i32),
    Bool(bool),
    Str(&'a str),
    DType(DataType),
    Object(&'a ObjectRef),
    RawPtr,
    NdArray,
}

impl AttrValue<'_> {
    /// Return the name of this value's field kind, for use in errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::F64(_) => "double",
            Self::I64(_) => "int64",
            Self::U64(_) => "uint64",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::DType(_) => "dtype",
            Self::Object(_) => "object",
            Self::RawPtr => "void*",
            Self::NdArray => "NDArray",
        }
    }
}

/// Callback invoked for each field of an attribute record, in declaration
/// order.
pub trait AttrVisitor {
    fn visit(&mut self, key: &str, value: AttrValue<'_>) -> Result<(), PrintError>;
}

/// An attribute record whose fields can be enumerated.
pub trait ReflectAttrs: fmt::Debug + Send + Sync {
    /// Name of the attribute schema, eg. `relax.attrs.Conv2DAttrs`.
    fn type_key(&self) -> &str;

    /// Pass each field to `visitor`, in declaration order.
    fn visit_attrs(&self, visitor: &mut dyn AttrVisitor) -> Result<(), PrintError>;
}

/// Attributes of `relax.nn.conv2d`.
///
/// Fields are normalized at construction: `padding` is in
/// `(top, left, bottom, right)` order and `out_layout` is always set.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv2dAttrs {
    pub strides: [i64; 2],
    pub padding: [i64; 4],
    pub dilation: [i64; 2],
    pub groups: i32,
    pub data_layout: String,
    pub kernel_layout: String,
    pub out_layout: String,

    /// Output dtype, or [`DataType::Void`] to infer it from the operands.
    pub out_dtype: DataType,
}

impl ReflectAttrs for Conv2dAttrs {
    fn type_key(&self) -> &str {
        "relax.attrs.Conv2DAttrs"
    }

    fn visit_attrs(&self, v: &mut dyn AttrVisitor) -> Result<(), PrintError> {
        v.visit("strides", AttrValue::Object(&self.strides.to_vec().into()))?;
        v.visit("padding", AttrValue::Object(&self.padding.to_vec().into()))?;
        v.visit("dilation", AttrValue::Object(&self.dilation.to_vec().into()))?;
        v.visit("groups", AttrValue::Int(self.groups))?;
        v.visit("data_layout", AttrValue::Str(&self.data_layout))?;
        v.visit("kernel_layout", AttrValue::Str(&self.kernel_layout))?;
        v.visit("out_layout", AttrValue::Str(&self.out_layout))?;
        v.visit("out_dtype", AttrValue::DType(self.out_dtype))
    }
}

/// Attributes of `relax.nn.conv2d_transpose`.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv2dTransposeAttrs {
    pub strides: [i64; 2],
    pub padding: [i64; 4],
    pub output_padding: [i64; 2],
    pub dilation: [i64; 2],
    pub groups: i32,
    pub data_layout: String,
    pub kernel_layout: String,
    pub out_layout: String,
    pub out_dtype: DataType,
}

impl ReflectAttrs for Conv2dTransposeAttrs {
    fn type_key(&self) -> &str {
        "relax.attrs.Conv2DTransposeAttrs"
    }

    fn visit_attrs(&self, v: &mut dyn AttrVisitor) -> Result<(), PrintError> {
        v.visit("strides", AttrValue::Object(&self.strides.to_vec().into()))?;
        v.visit("padding", AttrValue::Object(&self.padding.to_vec().into()))?;
        v.visit(
            "output_padding",
            AttrValue::Object(&self.output_padding.to_vec().into()),
        )?;
        v.visit("dilation", AttrValue::Object(&self.dilation.to_vec().into()))?;
        v.visit("groups", AttrValue::Int(self.groups))?;
        v.visit("data_layout", AttrValue::Str(&self.data_layout))?;
        v.visit("kernel_layout", AttrValue::Str(&self.kernel_layout))?;
        v.visit("out_layout", AttrValue::Str(&self.out_layout))?;
        v.visit("out_dtype", AttrValue::DType(self.out_dtype))
    }
}

/// Attribute record attached to a call.
#[derive(Clone, Debug)]
pub enum Attrs {
    Conv2d(Conv2dAttrs),
    Conv2dTranspose(Conv2dTransposeAttrs),

    /// Free-form dictionary. Iteration order is unspecified.
    Dict(FxHashMap<String, ObjectRef>),

    /// A schema defined outside this crate.
    Custom(Arc<dyn ReflectAttrs>),
}

impl Attrs {
    pub fn type_key(&self) -> &str {
        match self {
            Self::Dict(_) => "DictAttrs",
            _ => self.as_reflect().map(|r| r.type_key()).unwrap_or_default(),
        }
    }

    /// Return the reflectable record, or `None` for dictionary attributes.
    pub fn as_reflect(&self) -> Option<&dyn ReflectAttrs> {
        match self {
            Self::Conv2d(attrs) => Some(attrs),
            Self::Conv2dTranspose(attrs) => Some(attrs),
            Self::Custom(attrs) => Some(attrs.as_ref()),
            Self::Dict(_) => None,
        }
    }
}

impl From<Conv2dAttrs> for Attrs {
    fn from(val: Conv2dAttrs) -> Self {
        Self::Conv2d(val)
    }
}

impl From<Conv2dTransposeAttrs> for Attrs {
    fn from(val: Conv2dTransposeAttrs) -> Self {
        Self::Conv2dTranspose(val)
    }
}

#[cfg(test)]
mod tests {
    use super::{AttrValue, AttrVisitor, Attrs, Conv2dAttrs};
    use crate::dtype::DataType;
    use crate::printer::PrintError;

    #[derive(Default)]
    struct FieldCollector {
        fields: Vec<(String, &'static str)>,
    }

    impl AttrVisitor for FieldCollector {
        fn visit(&mut self, key: &str, value: AttrValue<'_>) -> Result<(), PrintError> {
            self.fields.push((key.to_string(), value.kind_name()));
            Ok(())
        }
    }

    #[test]
    fn test_visit_conv2d_attrs_in_declaration_order() {
        let attrs = Attrs::from(Conv2dAttrs {
            strides: [1, 1],
            padding: [0, 0, 0, 0],
            dilation: [1, 1],
            groups: 1,
            data_layout: "NCHW".into(),
            kernel_layout: "OIHW".into(),
            out_layout: "NCHW".into(),
            out_dtype: DataType::Void,
        });
        assert_eq!(attrs.type_key(), "relax.attrs.Conv2DAttrs");

        let mut collector = FieldCollector::default();
        attrs
            .as_reflect()
            .unwrap()
            .visit_attrs(&mut collector)
            .unwrap();

        let keys: Vec<_> = collector.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            [
                "strides",
                "padding",
                "dilation",
                "groups",
                "data_layout",
                "kernel_layout",
                "out_layout",
                "out_dtype"
            ]
        );
        assert_eq!(collector.fields[3].1, "int");
        assert_eq!(collector.fields[7].1, "dtype");
    }

    #[test]
    fn test_dict_attrs_are_not_reflected() {
        let attrs = Attrs::Dict(Default::default());
        assert_eq!(attrs.type_key(), "DictAttrs");
        assert!(attrs.as_reflect().is_none());
    }
}
