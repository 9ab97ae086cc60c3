use super::{Doc, PrintError, Printer};
use crate::attrs::{AttrValue, AttrVisitor, Attrs};

/// Visitor which collects the fields of an attribute record as keyword
/// arguments.
struct AttrPrinter<'a> {
    printer: &'a Printer,
    kwargs: &'a mut Vec<(String, Doc)>,
}

impl AttrVisitor for AttrPrinter<'_> {
    fn visit(&mut self, key: &str, value: AttrValue<'_>) -> Result<(), PrintError> {
        let doc = match value {
            AttrValue::F64(x) => Doc::Float(x),
            AttrValue::I64(x) => Doc::Int(x),
            AttrValue::U64(x) => Doc::UInt(x),
            AttrValue::Int(x) => Doc::Int(x.into()),
            AttrValue::Bool(x) => Doc::Bool(x),
            AttrValue::Str(s) => Doc::str(s),
            AttrValue::DType(dtype) => Doc::str(dtype.to_string()),
            AttrValue::Object(obj) => self.printer.object_doc(obj)?,
            AttrValue::RawPtr | AttrValue::NdArray => {
                return Err(PrintError::UnsupportedAttrField {
                    key: key.to_string(),
                    kind: value.kind_name(),
                });
            }
        };
        self.kwargs.push((key.to_string(), doc));
        Ok(())
    }
}

impl Printer {
    /// Append the fields of `attrs` to `kwargs`.
    pub(super) fn attr_kwargs(
        &self,
        attrs: &Attrs,
        kwargs: &mut Vec<(String, Doc)>,
    ) -> Result<(), PrintError> {
        match attrs {
            Attrs::Dict(dict) => {
                let mut entries: Vec<_> = dict.iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                for (key, value) in entries {
                    kwargs.push((key.clone(), self.object_doc(value)?));
                }
                Ok(())
            }
            _ => {
                let Some(record) = attrs.as_reflect() else {
                    return Ok(());
                };
                record.visit_attrs(&mut AttrPrinter {
                    printer: self,
                    kwargs,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::attrs::{AttrValue, AttrVisitor, Attrs, ObjectRef, ReflectAttrs};
    use crate::printer::{PrintError, Printer, PrinterOptions};

    #[derive(Debug)]
    struct PackedAttrs {
        with_buffer: bool,
    }

    impl ReflectAttrs for PackedAttrs {
        fn type_key(&self) -> &str {
            "test.PackedAttrs"
        }

        fn visit_attrs(&self, v: &mut dyn AttrVisitor) -> Result<(), PrintError> {
            v.visit("scale", AttrValue::F64(0.25))?;
            v.visit("seed", AttrValue::U64(42))?;
            v.visit("offset", AttrValue::I64(-1))?;
            v.visit("fast", AttrValue::Bool(true))?;
            if self.with_buffer {
                v.visit("buffer", AttrValue::NdArray)?;
            }
            v.visit("handle", AttrValue::RawPtr)
        }
    }

    fn kwargs_text(attrs: &Attrs) -> Result<Vec<String>, PrintError> {
        let printer = Printer::new(PrinterOptions::default().ir_prefix("R"));
        let mut kwargs = Vec::new();
        printer.attr_kwargs(attrs, &mut kwargs)?;
        Ok(kwargs
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect())
    }

    #[test]
    fn test_unsupported_fields_fail() {
        let attrs = Attrs::Custom(Arc::new(PackedAttrs { with_buffer: true }));
        assert_eq!(
            kwargs_text(&attrs),
            Err(PrintError::UnsupportedAttrField {
                key: "buffer".into(),
                kind: "NDArray",
            })
        );

        let attrs = Attrs::Custom(Arc::new(PackedAttrs { with_buffer: false }));
        let err = kwargs_text(&attrs).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: void* is not allowed in Attrs (field \"handle\")"
        );
    }

    #[test]
    fn test_dict_keys_are_sorted() {
        let mut dict = rustc_hash::FxHashMap::default();
        dict.insert("zeta".to_string(), ObjectRef::Int(1));
        dict.insert("alpha".to_string(), ObjectRef::from("a"));
        dict.insert("mid".to_string(), ObjectRef::IntArray(vec![1, 2]));

        assert_eq!(
            kwargs_text(&Attrs::Dict(dict)).unwrap(),
            ["alpha=\"a\"", "mid=[1, 2]", "zeta=1"]
        );
    }
}
