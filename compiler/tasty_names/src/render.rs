//! The three name renderers: source form, debug form, host-identifier form.

use crate::name::{ErasedRef, ParamSig, TastyName};
use std::borrow::Cow;
use std::fmt::Write;

impl TastyName {
    /// Human-readable source form.
    ///
    /// Views are transparent, `Signed` drops its signature, and the
    /// default getter renders as `<qual>$default$<n+1>`.
    pub fn source_string(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }

    fn write_source(&self, out: &mut String) {
        match self {
            TastyName::Simple(text) => out.push_str(text),
            TastyName::Qualified { qual, sep, selector } => {
                qual.write_source(out);
                out.push_str(sep);
                out.push_str(selector);
            }
            TastyName::Module(base) | TastyName::Type(base) => base.write_source(out),
            TastyName::Signed { qual, .. } => qual.write_source(out),
            TastyName::Unique { qual, sep, num } => {
                qual.write_source(out);
                out.push_str(sep);
                let _ = write!(out, "{num}");
            }
            TastyName::Default { qual, num } => {
                qual.write_source(out);
                let _ = write!(out, "$default${}", num + 1);
            }
            TastyName::Prefix { prefix, qual } => {
                out.push_str(prefix);
                qual.write_source(out);
            }
        }
    }

    /// Self-describing bracket-nested form, for diagnostics only.
    pub fn debug_string(&self) -> String {
        match self {
            TastyName::Simple(text) => text.to_string(),
            TastyName::Qualified { qual, sep, selector } => {
                format!("{}[Qualified {} {}]", qual.debug_string(), sep, selector)
            }
            TastyName::Module(base) => format!("{}[ModuleClass]", base.debug_string()),
            TastyName::Type(base) => format!("{}[Type]", base.debug_string()),
            TastyName::Signed { qual, sig } => {
                let mut params = String::new();
                for (i, param) in sig.params.iter().enumerate() {
                    if i > 0 {
                        params.push(',');
                    }
                    match param {
                        ParamSig::TypeArity(n) => {
                            let _ = write!(params, "{n}");
                        }
                        ParamSig::Value(erased) => params.push_str(&erased.debug_string()),
                    }
                }
                format!(
                    "{}[Signed ({}) {}]",
                    qual.debug_string(),
                    params,
                    sig.result.debug_string()
                )
            }
            TastyName::Unique { qual, sep, num } => {
                format!("{}[Unique {} {}]", qual.debug_string(), sep, num)
            }
            TastyName::Default { qual, num } => {
                format!("{}[Default {}]", qual.debug_string(), num)
            }
            TastyName::Prefix { prefix, qual } => {
                format!("{}[Prefix {}]", qual.debug_string(), prefix)
            }
        }
    }

    /// Host-identifier form: source form with the host's symbolic-character
    /// escape applied to every simple fragment.
    ///
    /// The escape is supplied by the host; the default getter of a
    /// constructor therefore comes out as `$lessinit$greater$default$<n+1>`.
    pub fn encoded_string(&self, escape: &dyn for<'a> Fn(&'a str) -> Cow<'a, str>) -> String {
        let mut out = String::new();
        self.write_encoded(&mut out, escape);
        out
    }

    fn write_encoded(&self, out: &mut String, escape: &dyn for<'a> Fn(&'a str) -> Cow<'a, str>) {
        match self {
            TastyName::Simple(text) => out.push_str(&escape(text)),
            TastyName::Qualified { qual, sep, selector } => {
                qual.write_encoded(out, escape);
                out.push_str(sep);
                out.push_str(&escape(selector));
            }
            TastyName::Module(base) | TastyName::Type(base) => base.write_encoded(out, escape),
            TastyName::Signed { qual, .. } => qual.write_encoded(out, escape),
            TastyName::Unique { qual, sep, num } => {
                qual.write_encoded(out, escape);
                out.push_str(sep);
                let _ = write!(out, "{num}");
            }
            TastyName::Default { qual, num } => {
                qual.write_encoded(out, escape);
                let _ = write!(out, "$default${}", num + 1);
            }
            TastyName::Prefix { prefix, qual } => {
                out.push_str(prefix);
                qual.write_encoded(out, escape);
            }
        }
    }
}

impl ErasedRef {
    fn debug_string(&self) -> String {
        let mut out = self.name.debug_string();
        for _ in 0..self.array_dims {
            out.push_str("[]");
        }
        out
    }
}
