use super::expr::expr_kind;
use super::{Doc, PrintError, Printer};
use crate::expr::{Call, Expr};
use crate::ops::{CALL_DPS_PACKED, CALL_TIR};
use crate::struct_info::StructInfo;

impl Printer {
    pub(super) fn call_doc(&self, call: &Call) -> Result<Doc, PrintError> {
        if let Some(doc) = self.fused_call_doc(call)? {
            return Ok(doc);
        }

        let mut args = Vec::with_capacity(call.args.len() + 1);
        let mut kwargs = Vec::new();

        let callee = match &call.op {
            Expr::ExternFunc(symbol) => {
                args.push(Doc::str(symbol.as_str()));
                self.builtin("call_packed")
            }
            Expr::Op(name) => self.op_ref(name),
            Expr::Var(_) | Expr::GlobalVar(_) => self.expr_doc(&call.op)?,
            other => return Err(PrintError::UnsupportedCallee(expr_kind(other))),
        };

        if let Some((first, rest)) = call.args.split_first() {
            args.push(self.callee_doc(first)?);
            for arg in rest {
                args.push(self.expr_doc(arg)?);
            }
        }

        if let Some(attrs) = &call.attrs {
            if matches!(call.op, Expr::ExternFunc(_)) {
                kwargs.push(("attrs_type_key".to_string(), Doc::str(attrs.type_key())));
            }
            self.attr_kwargs(attrs, &mut kwargs)?;
        }

        match call.sinfo_args.as_slice() {
            [] => {}
            [sinfo] => kwargs.push(("sinfo_args".to_string(), self.struct_info_doc(sinfo))),
            sinfo_args => kwargs.push((
                "sinfo_args".to_string(),
                Doc::Tuple(sinfo_args.iter().map(|s| self.struct_info_doc(s)).collect()),
            )),
        }

        Ok(callee.call(args, kwargs))
    }

    /// Print calls which dispatch to a tensor-level or packed function in
    /// destination-passing style.
    ///
    /// Returns `None` if `call` is not such a call.
    fn fused_call_doc(&self, call: &Call) -> Result<Option<Doc>, PrintError> {
        let op = match call.op_name() {
            Some(name @ (CALL_TIR | CALL_DPS_PACKED)) => name,
            _ => return Ok(None),
        };

        let malformed = |reason: String| PrintError::MalformedCall {
            op: op.to_string(),
            reason,
        };
        let (callee, inputs, tir_vars) = match call.args.as_slice() {
            [callee, inputs] => (callee, inputs, None),
            [callee, inputs, tir_vars] => (callee, inputs, Some(tir_vars)),
            args => {
                return Err(malformed(format!(
                    "expected 2 or 3 arguments, got {}",
                    args.len()
                )));
            }
        };
        let [out_sinfo] = call.sinfo_args.as_slice() else {
            return Err(malformed(format!(
                "expected exactly one output struct info, got {}",
                call.sinfo_args.len()
            )));
        };

        let args = vec![self.callee_doc(callee)?, self.expr_doc(inputs)?];
        let out_doc = match out_sinfo {
            StructInfo::Tuple(fields) => {
                Doc::List(fields.iter().map(|f| self.struct_info_doc(f)).collect())
            }
            _ => self.struct_info_doc(out_sinfo),
        };
        let mut kwargs = vec![("out_sinfo".to_string(), out_doc)];

        if op == CALL_DPS_PACKED {
            if tir_vars.is_some() {
                return Err(malformed("tir_vars are not supported".to_string()));
            }
            return Ok(Some(self.builtin("call_dps_packed").call(args, kwargs)));
        }

        if let Some(tir_vars) = tir_vars {
            kwargs.push(("tir_vars".to_string(), self.expr_doc(tir_vars)?));
        }
        let name = if out_sinfo.contains_dtensor() {
            "dist.call_tir"
        } else {
            "call_tir"
        };
        Ok(Some(self.builtin(name).call(args, kwargs)))
    }
}
