use std::fmt;
use std::str::FromStr;

/// Scalar element type of a tensor or primitive value.
///
/// [`DataType::Void`] means the type is not known, or in an attribute record,
/// that it should be inferred.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataType {
    #[default]
    Void,
    Bool,
    Int(u8),
    UInt(u8),
    Float(u8),
    BFloat(u8),
}

impl DataType {
    pub const FLOAT32: DataType = DataType::Float(32);
    pub const FLOAT16: DataType = DataType::Float(16);
    pub const INT32: DataType = DataType::Int(32);
    pub const INT64: DataType = DataType::Int(64);

    pub fn is_void(&self) -> bool {
        *self == DataType::Void
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Bool => write!(f, "bool"),
            Self::Int(bits) => write!(f, "int{}", bits),
            Self::UInt(bits) => write!(f, "uint{}", bits),
            Self::Float(bits) => write!(f, "float{}", bits),
            Self::BFloat(bits) => write!(f, "bfloat{}", bits),
        }
    }
}

/// Error returned when parsing an unrecognized data type name.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("unknown data type \"{0}\"")]
pub struct ParseDataTypeError(String);

impl FromStr for DataType {
    type Err = ParseDataTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDataTypeError(s.to_string());

        match s {
            "void" | "" => return Ok(Self::Void),
            "bool" => return Ok(Self::Bool),
            _ => {}
        }

        // Prefixes are ordered so that "uint" and "bfloat" are tried before
        // "int" and "float".
        let prefixes: [(&str, fn(u8) -> DataType); 4] = [
            ("uint", DataType::UInt),
            ("int", DataType::Int),
            ("bfloat", DataType::BFloat),
            ("float", DataType::Float),
        ];
        let (ctor, bits) = prefixes
            .iter()
            .find_map(|(prefix, ctor)| s.strip_prefix(prefix).map(|bits| (ctor, bits)))
            .ok_or_else(err)?;
        let bits: u8 = bits.parse().map_err(|_| err())?;
        if !matches!(bits, 1 | 4 | 8 | 16 | 32 | 64) {
            return Err(err());
        }
        Ok(ctor(bits))
    }
}
