//! Static type and shape information for IR values.

use tessera_shape_inference::SymExpr;

use crate::dtype::DataType;

/// Shape of a tensor, known either per-dimension or only by rank.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorShape {
    /// Each dimension is a known value or a symbolic expression.
    Known(Vec<SymExpr>),

    /// The number of dimensions is known, but not their sizes.
    Rank(usize),
}

impl TensorShape {
    pub fn ndim(&self) -> usize {
        match self {
            Self::Known(dims) => dims.len(),
            Self::Rank(ndim) => *ndim,
        }
    }

    pub fn dims(&self) -> Option<&[SymExpr]> {
        match self {
            Self::Known(dims) => Some(dims),
            Self::Rank(_) => None,
        }
    }
}

/// Struct info for a tensor: element type plus shape.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorStructInfo {
    pub dtype: DataType,
    pub shape: TensorShape,
}

impl TensorStructInfo {
    pub fn new(shape: Vec<SymExpr>, dtype: DataType) -> Self {
        Self {
            dtype,
            shape: TensorShape::Known(shape),
        }
    }

    pub fn with_rank(ndim: usize, dtype: DataType) -> Self {
        Self {
            dtype,
            shape: TensorShape::Rank(ndim),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }
}

/// Struct info for a tensor that is sharded across a device mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct DTensorStructInfo {
    pub tensor: TensorStructInfo,

    /// Name of the device mesh.
    pub device_mesh: String,

    /// Placement of each tensor axis on the mesh, eg. `"S[0], R"`.
    pub placement: String,
}

/// Static information about the structure of an IR value.
#[derive(Clone, Debug, PartialEq)]
pub enum StructInfo {
    Tensor(TensorStructInfo),
    DTensor(DTensorStructInfo),
    Tuple(Vec<StructInfo>),

    /// A shape value, with known dimensions or only a known length.
    Shape(TensorShape),

    /// A scalar of a primitive type.
    Prim(DataType),

    /// An opaque object.
    Object,
}

impl StructInfo {
    pub fn as_tensor(&self) -> Option<&TensorStructInfo> {
        match self {
            Self::Tensor(info) => Some(info),
            _ => None,
        }
    }

    /// Return true if this is a distributed tensor, or a tuple containing one.
    pub fn contains_dtensor(&self) -> bool {
        match self {
            Self::DTensor(_) => true,
            Self::Tuple(fields) => fields.iter().any(|f| f.contains_dtensor()),
            _ => false,
        }
    }
}

impl From<TensorStructInfo> for StructInfo {
    fn from(val: TensorStructInfo) -> Self {
        StructInfo::Tensor(val)
    }
}

impl From<DTensorStructInfo> for StructInfo {
    fn from(val: DTensorStructInfo) -> Self {
        StructInfo::DTensor(val)
    }
}
