use tessera_shape_inference::{BijectiveLayout, Predicate, SymExpr};

use super::ConstructError;
use super::util::{
    binary_arith_out_dtype, broadcast_2d, check_layout, check_min, check_ndim_and_get_shape,
    complete_padding_2d, input_tensor_sinfo, reject_if_provable,
};
use crate::attrs::{Attrs, Conv2dAttrs, Conv2dTransposeAttrs};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::dtype::DataType;
use crate::expr::{Call, Expr};
use crate::infer::InferCtx;
use crate::struct_info::{StructInfo, TensorStructInfo};

pub const CONV2D: &str = "relax.nn.conv2d";
pub const CONV2D_TRANSPOSE: &str = "relax.nn.conv2d_transpose";

/// Parameters for [`conv2d`].
///
/// `strides` and `dilation` may have one or two elements. `padding` may have
/// one, two or four elements (see [`conv2d`]).
#[derive(Clone, Debug)]
pub struct Conv2dParams {
    pub strides: Vec<i64>,
    pub padding: Vec<i64>,
    pub dilation: Vec<i64>,
    pub groups: i32,
    pub data_layout: String,
    pub kernel_layout: String,

    /// Layout of the output. Defaults to `data_layout`.
    pub out_layout: Option<String>,

    /// Output dtype. [`DataType::Void`] infers it from the operands.
    pub out_dtype: DataType,
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Self {
            strides: [1, 1].into(),
            padding: [0, 0].into(),
            dilation: [1, 1].into(),
            groups: 1,
            data_layout: "NCHW".into(),
            kernel_layout: "OIHW".into(),
            out_layout: None,
            out_dtype: DataType::Void,
        }
    }
}

impl Conv2dParams {
    pub fn strides(mut self, strides: &[i64]) -> Self {
        self.strides = strides.to_vec();
        self
    }

    pub fn padding(mut self, padding: &[i64]) -> Self {
        self.padding = padding.to_vec();
        self
    }

    pub fn dilation(mut self, dilation: &[i64]) -> Self {
        self.dilation = dilation.to_vec();
        self
    }

    pub fn groups(mut self, groups: i32) -> Self {
        self.groups = groups;
        self
    }

    pub fn data_layout(mut self, layout: &str) -> Self {
        self.data_layout = layout.to_string();
        self
    }

    pub fn kernel_layout(mut self, layout: &str) -> Self {
        self.kernel_layout = layout.to_string();
        self
    }

    pub fn out_layout(mut self, layout: &str) -> Self {
        self.out_layout = Some(layout.to_string());
        self
    }

    pub fn out_dtype(mut self, dtype: DataType) -> Self {
        self.out_dtype = dtype;
        self
    }
}

/// Parameters for [`conv2d_transpose`].
#[derive(Clone, Debug)]
pub struct Conv2dTransposeParams {
    pub conv: Conv2dParams,

    /// Extra size added to one side of each spatial output dimension.
    pub output_padding: Vec<i64>,
}

impl Default for Conv2dTransposeParams {
    fn default() -> Self {
        Self {
            conv: Conv2dParams::default().kernel_layout("IOHW"),
            output_padding: [0, 0].into(),
        }
    }
}

impl Conv2dTransposeParams {
    pub fn with_conv(conv: Conv2dParams) -> Self {
        Self {
            conv,
            ..Default::default()
        }
    }

    pub fn output_padding(mut self, output_padding: &[i64]) -> Self {
        self.output_padding = output_padding.to_vec();
        self
    }

    pub fn strides(mut self, strides: &[i64]) -> Self {
        self.conv = self.conv.strides(strides);
        self
    }

    pub fn padding(mut self, padding: &[i64]) -> Self {
        self.conv = self.conv.padding(padding);
        self
    }

    pub fn dilation(mut self, dilation: &[i64]) -> Self {
        self.conv = self.conv.dilation(dilation);
        self
    }

    pub fn groups(mut self, groups: i32) -> Self {
        self.conv = self.conv.groups(groups);
        self
    }

    pub fn data_layout(mut self, layout: &str) -> Self {
        self.conv = self.conv.data_layout(layout);
        self
    }

    pub fn kernel_layout(mut self, layout: &str) -> Self {
        self.conv = self.conv.kernel_layout(layout);
        self
    }

    pub fn out_layout(mut self, layout: &str) -> Self {
        self.conv = self.conv.out_layout(layout);
        self
    }

    pub fn out_dtype(mut self, dtype: DataType) -> Self {
        self.conv = self.conv.out_dtype(dtype);
        self
    }
}

/// Normalized spatial parameters shared by both convolution kinds.
struct Spatial {
    strides: [i64; 2],
    padding: [i64; 4],
    dilation: [i64; 2],
}

fn normalize_spatial(op: &'static str, params: &Conv2dParams) -> Result<Spatial, ConstructError> {
    let padding = complete_padding_2d(op, &params.padding)?;
    let strides = broadcast_2d(op, "strides", &params.strides)?;
    let dilation = broadcast_2d(op, "dilation", &params.dilation)?;

    if params.groups <= 0 {
        return Err(ConstructError::NonPositiveGroups {
            op,
            groups: params.groups,
        });
    }
    check_min(op, "strides", &strides, 1)?;
    check_min(op, "dilation", &dilation, 1)?;
    check_min(op, "padding", &padding, 0)?;

    Ok(Spatial {
        strides,
        padding,
        dilation,
    })
}

/// Create a call to `relax.nn.conv2d`.
///
/// Padding is normalized to `[top, left, bottom, right]`: a single value
/// applies to all sides and `[h, w]` becomes `[h, w, h, w]`. One-element
/// strides and dilations apply to both spatial axes.
pub fn conv2d(data: Expr, weight: Expr, params: Conv2dParams) -> Result<Call, ConstructError> {
    let Spatial {
        strides,
        padding,
        dilation,
    } = normalize_spatial(CONV2D, &params)?;

    let attrs = Conv2dAttrs {
        strides,
        padding,
        dilation,
        groups: params.groups,
        out_layout: params
            .out_layout
            .unwrap_or_else(|| params.data_layout.clone()),
        data_layout: params.data_layout,
        kernel_layout: params.kernel_layout,
        out_dtype: params.out_dtype,
    };
    tracing::trace!(op = CONV2D, ?attrs, "constructed call");

    Ok(Call::new(Expr::op(CONV2D), vec![data, weight]).with_attrs(attrs))
}

/// Create a call to `relax.nn.conv2d_transpose`.
///
/// Parameters are normalized as for [`conv2d`]. `output_padding` may have one
/// or two elements.
pub fn conv2d_transpose(
    data: Expr,
    weight: Expr,
    params: Conv2dTransposeParams,
) -> Result<Call, ConstructError> {
    let Conv2dTransposeParams {
        conv,
        output_padding,
    } = params;
    let Spatial {
        strides,
        padding,
        dilation,
    } = normalize_spatial(CONV2D_TRANSPOSE, &conv)?;
    let output_padding = broadcast_2d(CONV2D_TRANSPOSE, "output_padding", &output_padding)?;
    check_min(CONV2D_TRANSPOSE, "output_padding", &output_padding, 0)?;

    let attrs = Conv2dTransposeAttrs {
        strides,
        padding,
        output_padding,
        dilation,
        groups: conv.groups,
        out_layout: conv.out_layout.unwrap_or_else(|| conv.data_layout.clone()),
        data_layout: conv.data_layout,
        kernel_layout: conv.kernel_layout,
        out_dtype: conv.out_dtype,
    };
    tracing::trace!(op = CONV2D_TRANSPOSE, ?attrs, "constructed call");

    Ok(Call::new(Expr::op(CONV2D_TRANSPOSE), vec![data, weight]).with_attrs(attrs))
}

/// Layout attributes of a convolution.
struct ConvLayouts<'a> {
    data: &'a str,
    kernel: &'a str,
    kernel_canonical: &'a str,
    out: &'a str,
}

/// Operands of a convolution, resolved and converted to canonical layouts.
enum ConvOperands {
    /// At least one operand has an unknown shape. Holds the result.
    RankOnly(StructInfo),

    Known {
        /// Data shape in `NCHW` order.
        data: Vec<SymExpr>,

        /// Weight shape in the canonical kernel layout.
        weight: Vec<SymExpr>,

        /// Converter from the output layout to `NCHW`.
        out: BijectiveLayout,
        dtype: DataType,
    },
}

fn resolve_conv_operands(
    call: &Call,
    ctx: &InferCtx,
    op: &str,
    layouts: ConvLayouts,
    out_dtype: DataType,
) -> Result<ConvOperands, Diagnostic> {
    let [data_sinfo, weight_sinfo] = input_tensor_sinfo(call, ctx, op)?;

    let data_to_nchw = check_layout(op, layouts.data, "NCHW", "data", "data_layout")?;
    let weight_to_canonical = check_layout(
        op,
        layouts.kernel,
        layouts.kernel_canonical,
        "kernel",
        "kernel_layout",
    )?;
    let out_to_nchw = check_layout(op, layouts.out, "NCHW", "output", "out_layout")?;

    let data_shape = check_ndim_and_get_shape(op, &data_sinfo, data_to_nchw.src(), "data", 0)?;
    let weight_shape =
        check_ndim_and_get_shape(op, &weight_sinfo, weight_to_canonical.src(), "kernel", 1)?;

    let dtype = if out_dtype.is_void() {
        binary_arith_out_dtype(op, &data_sinfo, &weight_sinfo)?
    } else {
        out_dtype
    };

    let (Some(data_shape), Some(weight_shape)) = (data_shape, weight_shape) else {
        let ndim = out_to_nchw.src().ndim();
        return Ok(ConvOperands::RankOnly(
            TensorStructInfo::with_rank(ndim, dtype).into(),
        ));
    };

    // Layouts and ranks were validated above, so conversion cannot fail.
    let convert = |converter: &BijectiveLayout, shape: &[SymExpr]| {
        converter.forward_shape(shape).map_err(|err| {
            Diagnostic::new(DiagnosticKind::RankMismatch, op, err.to_string())
        })
    };

    Ok(ConvOperands::Known {
        data: convert(&data_to_nchw, data_shape)?,
        weight: convert(&weight_to_canonical, weight_shape)?,
        out: out_to_nchw,
        dtype,
    })
}

fn output_struct_info(
    op: &str,
    out: &BijectiveLayout,
    out_nchw: Vec<SymExpr>,
    dtype: DataType,
) -> Result<StructInfo, Diagnostic> {
    let shape = out.backward_shape(&out_nchw).map_err(|err| {
        Diagnostic::new(DiagnosticKind::InvalidLayout, op, err.to_string()).at("attrs.out_layout")
    })?;
    Ok(TensorStructInfo::new(shape, dtype).into())
}

/// Infer the struct info of a `relax.nn.conv2d` call.
pub(crate) fn infer_conv2d(call: &Call, ctx: &InferCtx) -> Result<StructInfo, Diagnostic> {
    let Some(Attrs::Conv2d(attrs)) = &call.attrs else {
        return Err(Diagnostic::new(
            DiagnosticKind::MissingAttrs,
            CONV2D,
            "expects attributes of type relax.attrs.Conv2DAttrs",
        ));
    };

    let layouts = ConvLayouts {
        data: &attrs.data_layout,
        kernel: &attrs.kernel_layout,
        kernel_canonical: "OIHW",
        out: &attrs.out_layout,
    };
    let (data, weight, out, dtype) =
        match resolve_conv_operands(call, ctx, CONV2D, layouts, attrs.out_dtype)? {
            ConvOperands::RankOnly(sinfo) => return Ok(sinfo),
            ConvOperands::Known {
                data,
                weight,
                out,
                dtype,
            } => (data, weight, out, dtype),
        };

    let groups = SymExpr::Value(attrs.groups as i64);
    let data_channels = data[1].clone();
    let kernel_in_channels = weight[1].clone();
    let kernel_out_channels = weight[0].clone();

    reject_if_provable(
        ctx,
        "channel",
        &Predicate::ne(
            data_channels.clone(),
            kernel_in_channels.clone() * groups.clone(),
        ),
        || {
            Diagnostic::new(
                DiagnosticKind::ChannelMismatch,
                CONV2D,
                format!(
                    "the channel size of the data should equal the product of the weight input \
                     channel size and the number of groups, but the data channel size is {} while \
                     the weight input channel size and number of groups are {} and {}",
                    data_channels, kernel_in_channels, attrs.groups
                ),
            )
        },
    )?;

    reject_if_provable(
        ctx,
        "group divisibility",
        &Predicate::ne(kernel_out_channels.clone() % groups, 0),
        || {
            Diagnostic::new(
                DiagnosticKind::GroupDivisibility,
                CONV2D,
                format!(
                    "the number of output channels should be divisible by the number of groups, \
                     but the number of output channels is {} while the number of groups is {}",
                    kernel_out_channels, attrs.groups
                ),
            )
            .at("attrs.groups")
        },
    )?;

    let out_size = |axis: usize| {
        let input = data[2 + axis].clone();
        let kernel = weight[2 + axis].clone();
        let pad_total =
            SymExpr::Value(attrs.padding[axis]) + SymExpr::Value(attrs.padding[axis + 2]);
        let numerator = input + pad_total
            - SymExpr::Value(attrs.dilation[axis]) * (kernel - SymExpr::Value(1))
            - SymExpr::Value(1);
        let size = numerator / SymExpr::Value(attrs.strides[axis]) + SymExpr::Value(1);
        ctx.checked_simplify(&size).ok_or_else(|| output_overflow(CONV2D, SPATIAL_DIMS[axis]))
    };

    let out_nchw = vec![data[0].clone(), kernel_out_channels, out_size(0)?, out_size(1)?];
    output_struct_info(CONV2D, &out, out_nchw, dtype)
}

const SPATIAL_DIMS: [&str; 2] = ["height", "width"];

fn output_overflow(op_name: &str, dim: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::ShapeOverflow,
        op_name,
        format!("the output {} does not fit in a 64-bit integer", dim),
    )
}

/// Infer the struct info of a `relax.nn.conv2d_transpose` call.
pub(crate) fn infer_conv2d_transpose(
    call: &Call,
    ctx: &InferCtx,
) -> Result<StructInfo, Diagnostic> {
    let Some(Attrs::Conv2dTranspose(attrs)) = &call.attrs else {
        return Err(Diagnostic::new(
            DiagnosticKind::MissingAttrs,
            CONV2D_TRANSPOSE,
            "expects attributes of type relax.attrs.Conv2DTransposeAttrs",
        ));
    };

    let layouts = ConvLayouts {
        data: &attrs.data_layout,
        kernel: &attrs.kernel_layout,
        kernel_canonical: "IOHW",
        out: &attrs.out_layout,
    };
    let (data, weight, out, dtype) =
        match resolve_conv_operands(call, ctx, CONV2D_TRANSPOSE, layouts, attrs.out_dtype)? {
            ConvOperands::RankOnly(sinfo) => return Ok(sinfo),
            ConvOperands::Known {
                data,
                weight,
                out,
                dtype,
            } => (data, weight, out, dtype),
        };

    let groups = SymExpr::Value(attrs.groups as i64);
    let data_channels = data[1].clone();
    let kernel_in_channels = weight[0].clone();

    reject_if_provable(
        ctx,
        "channel",
        &Predicate::ne(data_channels.clone(), kernel_in_channels.clone()),
        || {
            Diagnostic::new(
                DiagnosticKind::ChannelMismatch,
                CONV2D_TRANSPOSE,
                format!(
                    "the channel size of the data should equal the input channel size of the \
                     weight, but the data channel size is {} while the weight input channel \
                     size is {}",
                    data_channels, kernel_in_channels
                ),
            )
        },
    )?;

    reject_if_provable(
        ctx,
        "group divisibility",
        &Predicate::ne(kernel_in_channels.clone() % groups.clone(), 0),
        || {
            Diagnostic::new(
                DiagnosticKind::GroupDivisibility,
                CONV2D_TRANSPOSE,
                format!(
                    "the number of input channels should be divisible by the number of groups, \
                     but the number of input channels is {} while the number of groups is {}",
                    kernel_in_channels, attrs.groups
                ),
            )
            .at("attrs.groups")
        },
    )?;

    let output_padding_too_large = |axis: usize| {
        Predicate::Ge(
            SymExpr::Value(attrs.output_padding[axis]),
            SymExpr::Value(attrs.strides[axis]),
        )
    };
    reject_if_provable(
        ctx,
        "output padding",
        &output_padding_too_large(0).or(output_padding_too_large(1)),
        || {
            Diagnostic::new(
                DiagnosticKind::OutputPadding,
                CONV2D_TRANSPOSE,
                format!(
                    "the output padding should be less than the strides, but the output padding \
                     is {:?} while the strides are {:?}",
                    attrs.output_padding, attrs.strides
                ),
            )
            .at("attrs.output_padding")
        },
    )?;

    let out_size = |axis: usize| {
        let input = data[2 + axis].clone();
        let kernel = weight[2 + axis].clone();
        let pad_total =
            SymExpr::Value(attrs.padding[axis]) + SymExpr::Value(attrs.padding[axis + 2]);
        let size = (input - SymExpr::Value(1)) * SymExpr::Value(attrs.strides[axis]) - pad_total
            + SymExpr::Value(attrs.dilation[axis]) * (kernel - SymExpr::Value(1))
            + SymExpr::Value(attrs.output_padding[axis])
            + SymExpr::Value(1);
        ctx.checked_simplify(&size)
            .ok_or_else(|| output_overflow(CONV2D_TRANSPOSE, SPATIAL_DIMS[axis]))
    };

    let out_channels = ctx
        .checked_simplify(&(weight[1].clone() * groups))
        .ok_or_else(|| output_overflow(CONV2D_TRANSPOSE, "channel size"))?;
    let out_nchw = vec![data[0].clone(), out_channels, out_size(0)?, out_size(1)?];
    output_struct_info(CONV2D_TRANSPOSE, &out, out_nchw, dtype)
}

#[cfg(test)]
mod tests {
    use tessera_shape_inference::{Analyzer, SymExpr, sym_shape};
    use tessera_testing::TestCases;

    use super::{Conv2dParams, Conv2dTransposeParams, conv2d, conv2d_transpose};
    use crate::attrs::Attrs;
    use crate::diagnostic::DiagnosticKind;
    use crate::dtype::DataType;
    use crate::expr::{Call, Expr};
    use crate::infer::InferCtx;
    use crate::op_registry::OpRegistry;
    use crate::ops::ConstructError;
    use crate::struct_info::{StructInfo, TensorStructInfo};

    fn tensor(name: &str, shape: Vec<SymExpr>, dtype: DataType) -> Expr {
        Expr::var(name, TensorStructInfo::new(shape, dtype))
    }

    fn infer(call: &Call) -> Result<StructInfo, crate::Diagnostic> {
        let registry = OpRegistry::with_all_ops();
        let analyzer = Analyzer::new();
        let ctx = InferCtx::new(&analyzer, &registry);
        registry.infer_struct_info(call, &ctx)
    }

    fn f32_tensor(shape: Vec<SymExpr>) -> StructInfo {
        TensorStructInfo::new(shape, DataType::FLOAT32).into()
    }

    #[test]
    fn test_conv2d_normalizes_attrs() {
        let x = tensor("x", sym_shape!(1, 3, 32, 32), DataType::FLOAT32);
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::FLOAT32);
        let call = conv2d(
            x,
            w,
            Conv2dParams::default()
                .strides(&[2])
                .padding(&[1, 2])
                .dilation(&[3]),
        )
        .unwrap();

        let Some(Attrs::Conv2d(attrs)) = &call.attrs else {
            panic!("expected conv2d attrs");
        };
        assert_eq!(attrs.strides, [2, 2]);
        assert_eq!(attrs.padding, [1, 2, 1, 2]);
        assert_eq!(attrs.dilation, [3, 3]);
        assert_eq!(attrs.out_layout, "NCHW");
        assert_eq!(call.op_name(), Some("relax.nn.conv2d"));
    }

    #[test]
    fn test_conv2d_invalid_params() {
        #[derive(Debug)]
        struct Case {
            params: Conv2dParams,
            expected: &'static str,
        }

        let cases = [
            Case {
                params: Conv2dParams::default().groups(0),
                expected: "relax.nn.conv2d: the number of groups is expected to be positive, got 0",
            },
            Case {
                params: Conv2dParams::default().strides(&[1, 1, 1]),
                expected: "relax.nn.conv2d: strides is expected to have 1 or 2 elements, got [1, 1, 1]",
            },
            Case {
                params: Conv2dParams::default().dilation(&[]),
                expected: "relax.nn.conv2d: dilation is expected to have 1 or 2 elements, got []",
            },
            Case {
                params: Conv2dParams::default().padding(&[1, 1, 1]),
                expected: "relax.nn.conv2d: padding is expected to have 1, 2 or 4 elements, got [1, 1, 1]",
            },
            Case {
                params: Conv2dParams::default().strides(&[0]),
                expected: "relax.nn.conv2d: strides values are expected to be positive, got [0, 0]",
            },
            Case {
                params: Conv2dParams::default().padding(&[-1]),
                expected: "relax.nn.conv2d: padding values are expected to be non-negative, got [-1, -1, -1, -1]",
            },
        ];

        cases.test_each(|case| {
            let err = conv2d(
                Expr::untyped_var("x"),
                Expr::untyped_var("w"),
                case.params.clone(),
            )
            .unwrap_err();
            assert_eq!(err.to_string(), case.expected);
        })
    }

    #[test]
    fn test_conv2d_transpose_normalizes_attrs() {
        let params = Conv2dTransposeParams::default()
            .output_padding(&[1])
            .strides(&[2]);
        let call = conv2d_transpose(Expr::untyped_var("x"), Expr::untyped_var("w"), params).unwrap();

        let Some(Attrs::Conv2dTranspose(attrs)) = &call.attrs else {
            panic!("expected conv2d_transpose attrs");
        };
        assert_eq!(attrs.output_padding, [1, 1]);
        assert_eq!(attrs.strides, [2, 2]);
        assert_eq!(attrs.kernel_layout, "IOHW");

        let params = Conv2dTransposeParams::default()
            .dilation(&[2])
            .data_layout("NHWC")
            .kernel_layout("HWOI")
            .out_layout("NCHW")
            .out_dtype(DataType::FLOAT16);
        let call = conv2d_transpose(Expr::untyped_var("x"), Expr::untyped_var("w"), params).unwrap();
        let Some(Attrs::Conv2dTranspose(attrs)) = &call.attrs else {
            panic!("expected conv2d_transpose attrs");
        };
        assert_eq!(attrs.dilation, [2, 2]);
        assert_eq!(attrs.data_layout, "NHWC");
        assert_eq!(attrs.kernel_layout, "HWOI");
        assert_eq!(attrs.out_layout, "NCHW");
        assert_eq!(attrs.out_dtype, DataType::FLOAT16);

        let err = conv2d_transpose(
            Expr::untyped_var("x"),
            Expr::untyped_var("w"),
            Conv2dTransposeParams::default().output_padding(&[0, 0, 0]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConstructError::InvalidLength {
                attr: "output_padding",
                ..
            }
        ));
    }

    #[test]
    fn test_infer_conv2d() {
        #[derive(Debug)]
        struct Case {
            data: Vec<SymExpr>,
            weight: Vec<SymExpr>,
            params: Conv2dParams,
            expected: Vec<SymExpr>,
        }

        let cases = [
            Case {
                data: sym_shape!(1, 3, 32, 32),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dParams::default(),
                expected: sym_shape!(1, 16, 30, 30),
            },
            Case {
                data: sym_shape!(1, 3, 32, 32),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dParams::default().strides(&[2]).padding(&[1]),
                expected: sym_shape!(1, 16, 16, 16),
            },
            Case {
                data: sym_shape!(1, 3, 32, 32),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dParams::default().dilation(&[2]),
                expected: sym_shape!(1, 16, 28, 28),
            },
            // Grouped convolution
            Case {
                data: sym_shape!(2, 8, 10, 10),
                weight: sym_shape!(8, 2, 3, 3),
                params: Conv2dParams::default().groups(4),
                expected: sym_shape!(2, 8, 8, 8),
            },
            // Non-default layouts
            Case {
                data: sym_shape!(1, 32, 32, 3),
                weight: sym_shape!(3, 3, 3, 16),
                params: Conv2dParams::default()
                    .data_layout("NHWC")
                    .kernel_layout("HWIO"),
                expected: sym_shape!(1, 30, 30, 16),
            },
            Case {
                data: sym_shape!(1, 3, 32, 32),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dParams::default().out_layout("NHWC"),
                expected: sym_shape!(1, 30, 30, 16),
            },
            // Blocked channel layout
            Case {
                data: sym_shape!(1, 2, 32, 32, 16),
                weight: sym_shape!(16, 32, 3, 3),
                params: Conv2dParams::default().data_layout("NCHW16c"),
                expected: sym_shape!(1, 1, 30, 30, 16),
            },
            // Symbolic batch and spatial sizes
            Case {
                data: sym_shape!("n", 3, "h", 32),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dParams::default(),
                expected: vec![
                    "n".into(),
                    16.into(),
                    SymExpr::from(-2) + SymExpr::from("h"),
                    30.into(),
                ],
            },
            // Symbolic channel count which cannot be checked.
            Case {
                data: sym_shape!(1, "c", 32, 32),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dParams::default(),
                expected: sym_shape!(1, 16, 30, 30),
            },
            // Channels match, but divisibility of the symbolic output channel
            // count by the groups is unknown.
            Case {
                data: sym_shape!(1, 4, 32, 32),
                weight: sym_shape!("o", 2, 3, 3),
                params: Conv2dParams::default().groups(2),
                expected: sym_shape!(1, "o", 30, 30),
            },
        ];

        cases.test_each(|case| {
            let x = tensor("x", case.data.clone(), DataType::FLOAT32);
            let w = tensor("w", case.weight.clone(), DataType::FLOAT32);
            let call = conv2d(x, w, case.params.clone()).unwrap();
            assert_eq!(infer(&call), Ok(f32_tensor(case.expected.clone())));
        })
    }

    #[test]
    fn test_infer_conv2d_errors() {
        #[derive(Debug)]
        struct Case {
            data: StructInfo,
            weight: StructInfo,
            params: Conv2dParams,
            expected: DiagnosticKind,
        }

        let cases = [
            Case {
                data: f32_tensor(sym_shape!(1, 4, 32, 32)),
                weight: f32_tensor(sym_shape!(16, 3, 3, 3)),
                params: Conv2dParams::default(),
                expected: DiagnosticKind::ChannelMismatch,
            },
            Case {
                data: f32_tensor(sym_shape!(1, 6, 32, 32)),
                weight: f32_tensor(sym_shape!(10, 2, 3, 3)),
                params: Conv2dParams::default().groups(3),
                expected: DiagnosticKind::GroupDivisibility,
            },
            Case {
                data: f32_tensor(sym_shape!(1, 3, 32)),
                weight: f32_tensor(sym_shape!(16, 3, 3, 3)),
                params: Conv2dParams::default(),
                expected: DiagnosticKind::RankMismatch,
            },
            Case {
                data: f32_tensor(sym_shape!(1, 3, 32, 32)),
                weight: f32_tensor(sym_shape!(16, 3, 3, 3)),
                params: Conv2dParams::default().data_layout("NCDW"),
                expected: DiagnosticKind::InvalidLayout,
            },
            Case {
                data: f32_tensor(sym_shape!(1, 3, 32, 32)),
                weight: f32_tensor(sym_shape!(16, 3, 3, 3)),
                params: Conv2dParams::default().kernel_layout("OHW"),
                expected: DiagnosticKind::InvalidLayout,
            },
            Case {
                data: f32_tensor(sym_shape!(1, 3, 32, 32)),
                weight: TensorStructInfo::new(sym_shape!(16, 3, 3, 3), DataType::FLOAT16).into(),
                params: Conv2dParams::default(),
                expected: DiagnosticKind::DtypeMismatch,
            },
            Case {
                data: StructInfo::Object,
                weight: f32_tensor(sym_shape!(16, 3, 3, 3)),
                params: Conv2dParams::default(),
                expected: DiagnosticKind::InvalidArguments,
            },
        ];

        cases.test_each(|case| {
            let x = Expr::var("x", case.data.clone());
            let w = Expr::var("w", case.weight.clone());
            let call = conv2d(x, w, case.params.clone()).unwrap();
            let err = infer(&call).unwrap_err();
            assert_eq!(err.kind(), case.expected);
            assert_eq!(err.op_name(), "relax.nn.conv2d");
        })
    }

    #[test]
    fn test_infer_conv2d_channel_mismatch_message() {
        let x = tensor("x", sym_shape!(1, 4, 32, 32), DataType::FLOAT32);
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::FLOAT32);
        let call = conv2d(x, w, Conv2dParams::default()).unwrap();
        let err = infer(&call).unwrap_err();
        assert!(err.message().contains("data channel size is 4"));
        assert!(err.message().contains("are 3 and 1"));
    }

    #[test]
    fn test_infer_conv2d_dtype() {
        // Explicit output dtype is used as-is.
        let x = tensor("x", sym_shape!(1, 3, 32, 32), DataType::Int(8));
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::Int(8));
        let call = conv2d(x, w, Conv2dParams::default().out_dtype(DataType::INT32)).unwrap();
        assert_eq!(
            infer(&call),
            Ok(TensorStructInfo::new(sym_shape!(1, 16, 30, 30), DataType::INT32).into())
        );

        // An unknown operand dtype gives an unknown output dtype.
        let x = tensor("x", sym_shape!(1, 3, 32, 32), DataType::Void);
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::FLOAT32);
        let call = conv2d(x, w, Conv2dParams::default()).unwrap();
        assert_eq!(
            infer(&call),
            Ok(TensorStructInfo::new(sym_shape!(1, 16, 30, 30), DataType::Void).into())
        );
    }

    #[test]
    fn test_infer_conv2d_rank_only() {
        let x = Expr::var("x", TensorStructInfo::with_rank(4, DataType::FLOAT32));
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::FLOAT32);
        let call = conv2d(x, w, Conv2dParams::default().out_layout("NCHW4c")).unwrap();
        assert_eq!(
            infer(&call),
            Ok(TensorStructInfo::with_rank(5, DataType::FLOAT32).into())
        );

        // Rank is still checked against the layout.
        let x = Expr::var("x", TensorStructInfo::with_rank(5, DataType::FLOAT32));
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::FLOAT32);
        let call = conv2d(x, w, Conv2dParams::default()).unwrap();
        assert_eq!(infer(&call).unwrap_err().kind(), DiagnosticKind::RankMismatch);
    }

    #[test]
    fn test_infer_conv2d_missing_attrs() {
        let x = tensor("x", sym_shape!(1, 3, 32, 32), DataType::FLOAT32);
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::FLOAT32);
        let call = Call::new(Expr::op("relax.nn.conv2d"), vec![x, w]);
        assert_eq!(infer(&call).unwrap_err().kind(), DiagnosticKind::MissingAttrs);
    }

    #[test]
    fn test_infer_nested_call() {
        let x = tensor("x", sym_shape!(1, 3, 32, 32), DataType::FLOAT32);
        let w1 = tensor("w1", sym_shape!(8, 3, 3, 3), DataType::FLOAT32);
        let w2 = tensor("w2", sym_shape!(16, 8, 3, 3), DataType::FLOAT32);

        let inner = conv2d(x, w1, Conv2dParams::default()).unwrap();
        let outer = conv2d(inner.into(), w2, Conv2dParams::default()).unwrap();
        assert_eq!(infer(&outer), Ok(f32_tensor(sym_shape!(1, 16, 28, 28))));
    }

    #[test]
    fn test_infer_conv2d_transpose() {
        #[derive(Debug)]
        struct Case {
            data: Vec<SymExpr>,
            weight: Vec<SymExpr>,
            params: Conv2dTransposeParams,
            expected: Vec<SymExpr>,
        }

        let cases = [
            Case {
                data: sym_shape!(1, 16, 30, 30),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dTransposeParams::default(),
                expected: sym_shape!(1, 3, 32, 32),
            },
            Case {
                data: sym_shape!(1, 16, 16, 16),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dTransposeParams::default()
                    .strides(&[2])
                    .padding(&[1])
                    .output_padding(&[1]),
                expected: sym_shape!(1, 3, 32, 32),
            },
            // Output channels are multiplied by the number of groups.
            Case {
                data: sym_shape!(1, 4, 8, 8),
                weight: sym_shape!(4, 2, 3, 3),
                params: Conv2dTransposeParams::default().groups(2),
                expected: sym_shape!(1, 4, 10, 10),
            },
            Case {
                data: sym_shape!("n", 16, 30, 30),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dTransposeParams::default(),
                expected: sym_shape!("n", 3, 32, 32),
            },
            // Symbolic data channels cannot be compared with the weight.
            Case {
                data: sym_shape!(1, "c", 30, 30),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dTransposeParams::default(),
                expected: sym_shape!(1, 3, 32, 32),
            },
            // Symbolic weight input channels with groups > 1. Neither the
            // channel check nor the divisibility check can be decided.
            Case {
                data: sym_shape!(1, "c", 8, 8),
                weight: sym_shape!("k", 2, 3, 3),
                params: Conv2dTransposeParams::default().groups(2),
                expected: sym_shape!(1, 4, 10, 10),
            },
            // Same symbol on both sides, so only divisibility is unknown.
            Case {
                data: sym_shape!(1, "c", 8, 8),
                weight: sym_shape!("c", "o", 3, 3),
                params: Conv2dTransposeParams::default().groups(4),
                expected: vec![
                    1.into(),
                    SymExpr::from(4) * SymExpr::from("o"),
                    10.into(),
                    10.into(),
                ],
            },
        ];

        cases.test_each(|case| {
            let x = tensor("x", case.data.clone(), DataType::FLOAT32);
            let w = tensor("w", case.weight.clone(), DataType::FLOAT32);
            let call = conv2d_transpose(x, w, case.params.clone()).unwrap();
            assert_eq!(infer(&call), Ok(f32_tensor(case.expected.clone())));
        })
    }

    #[test]
    fn test_conv2d_transpose_inverts_conv2d() {
        #[derive(Debug)]
        struct Case {
            size: i64,
            kernel: i64,
            stride: i64,
            padding: i64,
            dilation: i64,
        }

        let cases = [
            Case {
                size: 32,
                kernel: 3,
                stride: 1,
                padding: 0,
                dilation: 1,
            },
            Case {
                size: 33,
                kernel: 3,
                stride: 2,
                padding: 1,
                dilation: 1,
            },
            Case {
                size: 29,
                kernel: 5,
                stride: 4,
                padding: 2,
                dilation: 1,
            },
            Case {
                size: 20,
                kernel: 3,
                stride: 1,
                padding: 1,
                dilation: 2,
            },
        ];

        cases.test_each(|case| {
            let params = Conv2dParams::default()
                .strides(&[case.stride])
                .padding(&[case.padding])
                .dilation(&[case.dilation]);

            let x = tensor("x", sym_shape!(1, 4, case.size, case.size), DataType::FLOAT32);
            let w = tensor(
                "w",
                sym_shape!(8, 4, case.kernel, case.kernel),
                DataType::FLOAT32,
            );
            let fwd = conv2d(x, w, params.clone()).unwrap();
            let Ok(StructInfo::Tensor(out)) = infer(&fwd) else {
                panic!("conv2d inference failed");
            };

            let y = Expr::var("y", out);
            let wt = tensor(
                "wt",
                sym_shape!(8, 4, case.kernel, case.kernel),
                DataType::FLOAT32,
            );
            let params = Conv2dTransposeParams::with_conv(params.kernel_layout("IOHW"));
            let bwd = conv2d_transpose(y, wt, params).unwrap();
            assert_eq!(
                infer(&bwd),
                Ok(f32_tensor(sym_shape!(1, 4, case.size, case.size)))
            );
        })
    }

    #[test]
    fn test_infer_conv2d_transpose_errors() {
        #[derive(Debug)]
        struct Case {
            data: Vec<SymExpr>,
            weight: Vec<SymExpr>,
            params: Conv2dTransposeParams,
            expected: DiagnosticKind,
        }

        let cases = [
            Case {
                data: sym_shape!(1, 8, 16, 16),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dTransposeParams::default(),
                expected: DiagnosticKind::ChannelMismatch,
            },
            Case {
                data: sym_shape!(1, 9, 16, 16),
                weight: sym_shape!(9, 3, 3, 3),
                params: Conv2dTransposeParams::default().groups(2),
                expected: DiagnosticKind::GroupDivisibility,
            },
            Case {
                data: sym_shape!(1, 16, 16, 16),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dTransposeParams::default()
                    .strides(&[2])
                    .output_padding(&[2]),
                expected: DiagnosticKind::OutputPadding,
            },
            Case {
                data: sym_shape!(1, 16, 16, 16),
                weight: sym_shape!(16, 3, 3, 3),
                params: Conv2dTransposeParams::default().output_padding(&[0, 1]),
                expected: DiagnosticKind::OutputPadding,
            },
        ];

        cases.test_each(|case| {
            let x = tensor("x", case.data.clone(), DataType::FLOAT32);
            let w = tensor("w", case.weight.clone(), DataType::FLOAT32);
            let call = conv2d_transpose(x, w, case.params.clone()).unwrap();
            let err = infer(&call).unwrap_err();
            assert_eq!(err.kind(), case.expected);
        })
    }

    #[test]
    fn test_infer_conv_output_overflow() {
        let x = tensor("x", sym_shape!(1, 3, 32, 32), DataType::FLOAT32);
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::FLOAT32);
        let call = conv2d(x, w, Conv2dParams::default().padding(&[i64::MAX])).unwrap();
        let err = infer(&call).unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::ShapeOverflow);
        assert_eq!(err.op_name(), "relax.nn.conv2d");
        assert_eq!(
            err.message(),
            "the output height does not fit in a 64-bit integer"
        );

        let x = tensor("x", sym_shape!(1, 16, 10, 10), DataType::FLOAT32);
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::FLOAT32);
        let params = Conv2dTransposeParams::default().strides(&[i64::MAX / 4]);
        let call = conv2d_transpose(x, w, params).unwrap();
        let err = infer(&call).unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::ShapeOverflow);
        assert_eq!(err.op_name(), "relax.nn.conv2d_transpose");

        let x = tensor("x", sym_shape!(1, 16, 10, 10), DataType::FLOAT32);
        let w = tensor("w", sym_shape!(16, i64::MAX, 3, 3), DataType::FLOAT32);
        let call = conv2d_transpose(x, w, Conv2dTransposeParams::default().groups(2)).unwrap();
        let err = infer(&call).unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::ShapeOverflow);
        assert_eq!(
            err.message(),
            "the output channel size does not fit in a 64-bit integer"
        );

        // Sizes close to the limit which still fit are inferred.
        let x = tensor("x", sym_shape!(1, 3, i64::MAX, 32), DataType::FLOAT32);
        let w = tensor("w", sym_shape!(16, 3, 3, 3), DataType::FLOAT32);
        let call = conv2d(x, w, Conv2dParams::default()).unwrap();
        assert_eq!(
            infer(&call),
            Ok(f32_tensor(sym_shape!(1, 16, i64::MAX - 2, 30)))
        );
    }

    #[test]
    fn test_infer_conv2d_transpose_rank_only() {
        let x = tensor("x", sym_shape!(1, 16, 30, 30), DataType::FLOAT32);
        let w = Expr::var("w", TensorStructInfo::with_rank(4, DataType::FLOAT32));
        let call = conv2d_transpose(x, w, Conv2dTransposeParams::default()).unwrap();
        assert_eq!(
            infer(&call),
            Ok(TensorStructInfo::with_rank(4, DataType::FLOAT32).into())
        );
    }
}
