use std::error::Error;
use std::fmt::{Display, Formatter};

/// The category of an inference failure. See [`Diagnostic::kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiagnosticKind {
    /// A layout string is malformed or has the wrong axes.
    InvalidLayout,
    /// An operand's rank does not match its layout.
    RankMismatch,
    /// The channel counts of the data and weight are provably incompatible.
    ChannelMismatch,
    /// A channel count is provably not divisible by `groups`.
    GroupDivisibility,
    /// An output padding is provably not smaller than the stride.
    OutputPadding,
    /// A computed dimension does not fit in a 64-bit integer.
    ShapeOverflow,
    /// Operand dtypes are known and differ.
    DtypeMismatch,
    /// The operands have the wrong count or are not tensors.
    InvalidArguments,
    /// The call has no attributes, or attributes of the wrong schema.
    MissingAttrs,
    /// The callee is not a registered operator.
    UnknownOperator,
}

/// Fatal error produced while inferring the struct info of a call.
///
/// A diagnostic is attributed to the operator of the call which produced it
/// and, where possible, to a path within the call such as `attrs.groups`.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    kind: DiagnosticKind,
    op_name: String,
    path: Option<String>,
    message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, op_name: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            op_name: op_name.to_string(),
            path: None,
            message: message.into(),
        }
    }

    /// Attribute this diagnostic to a path within the call.
    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Return the general category of error.
    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    /// Name of the operator whose call failed.
    pub fn op_name(&self) -> &str {
        &self.op_name
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.op_name)?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl Error for Diagnostic {}
