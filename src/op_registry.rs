use rustc_hash::FxHashMap;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::expr::{Call, Expr};
use crate::infer::InferCtx;
use crate::ops;
use crate::struct_info::StructInfo;

/// Function which infers the struct info of a call to an operator.
pub type InferStructInfoFn = fn(&Call, &InferCtx) -> Result<StructInfo, Diagnostic>;

/// Description of one operand of an operator.
#[derive(Clone, Debug)]
pub struct OpArgument {
    pub name: &'static str,
    pub type_info: &'static str,
    pub description: &'static str,
}

/// Definition of a registered operator.
#[derive(Clone, Debug)]
pub struct OpDef {
    /// Namespaced operator name, eg. `relax.nn.conv2d`.
    pub name: String,

    /// Number of operands, or `None` if the operator is variadic.
    pub num_inputs: Option<usize>,
    pub arguments: Vec<OpArgument>,

    /// Type key of the attribute schema, if the operator has attributes.
    pub attrs_type_key: Option<&'static str>,
    pub infer_struct_info: Option<InferStructInfoFn>,
}

impl OpDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            num_inputs: None,
            arguments: Vec::new(),
            attrs_type_key: None,
            infer_struct_info: None,
        }
    }

    pub fn num_inputs(mut self, n: usize) -> Self {
        self.num_inputs = Some(n);
        self
    }

    pub fn argument(
        mut self,
        name: &'static str,
        type_info: &'static str,
        description: &'static str,
    ) -> Self {
        self.arguments.push(OpArgument {
            name,
            type_info,
            description,
        });
        self
    }

    pub fn attrs_type(mut self, type_key: &'static str) -> Self {
        self.attrs_type_key = Some(type_key);
        self
    }

    pub fn infer_with(mut self, infer: InferStructInfoFn) -> Self {
        self.infer_struct_info = Some(infer);
        self
    }
}

/// Registry of operators, keyed by name.
///
/// New registries have no operators registered. To create a registry with
/// all built-in operators pre-registered, use [`OpRegistry::with_all_ops`].
#[derive(Default)]
pub struct OpRegistry {
    ops: FxHashMap<String, OpDef>,
}

impl OpRegistry {
    /// Create a new empty registry.
    pub fn new() -> OpRegistry {
        OpRegistry {
            ops: FxHashMap::default(),
        }
    }

    /// Create a new registry with all built-in operators registered.
    pub fn with_all_ops() -> OpRegistry {
        let mut reg = OpRegistry::new();
        ops::register_all_ops(&mut reg);
        reg
    }

    /// Register an operator, replacing any existing one with the same name.
    pub fn register(&mut self, def: OpDef) {
        self.ops.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&OpDef> {
        self.ops.get(name)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Infer the struct info of a call.
    ///
    /// Calls to an operator use its registered inference function. If there
    /// is none, or the callee is not an operator, the call must carry exactly
    /// one explicit struct info annotation, which is returned.
    pub fn infer_struct_info(&self, call: &Call, ctx: &InferCtx) -> Result<StructInfo, Diagnostic> {
        let infer = match &call.op {
            Expr::Op(name) => {
                let def = self.get(name).ok_or_else(|| {
                    Diagnostic::new(
                        DiagnosticKind::UnknownOperator,
                        name,
                        "operator is not registered",
                    )
                })?;
                def.infer_struct_info
            }
            _ => None,
        };

        if let Some(infer) = infer {
            return infer(call, ctx);
        }

        match call.sinfo_args.as_slice() {
            [sinfo] => Ok(sinfo.clone()),
            _ => Err(Diagnostic::new(
                DiagnosticKind::UnknownOperator,
                call.op_name().unwrap_or("<callee>"),
                format!(
                    "cannot infer struct info without an inference function and with {} annotations",
                    call.sinfo_args.len()
                ),
            )),
        }
    }
}
