//! Structural `TastyName` values.

use std::rc::Rc;

/// Shared immutable text fragment.
pub type Text = Rc<str>;

/// A structured source-dialect name.
///
/// # Invariants
/// - equality is structural;
/// - the type view is idempotent: `Type(Type(n)) == Type(n)`;
/// - `Unique(Empty, "_$", n)` denotes a wildcard;
/// - `Signed` always carries a method signature.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TastyName {
    /// A raw identifier fragment.
    Simple(Text),
    /// A dotted path with an explicit separator.
    Qualified {
        qual: Box<TastyName>,
        sep: Text,
        selector: Text,
    },
    /// The view of a name as the module's companion class name.
    Module(Box<TastyName>),
    /// The view of a name as a type.
    Type(Box<TastyName>),
    /// Overload-disambiguating adornment with an erased signature.
    Signed {
        qual: Box<TastyName>,
        sig: MethodSig,
    },
    /// Internally generated fresh name with a numeric tag.
    Unique {
        qual: Box<TastyName>,
        sep: Text,
        num: u32,
    },
    /// The `num`-th default-argument getter of `qual`.
    Default {
        qual: Box<TastyName>,
        num: u32,
    },
    /// A prefix decoration, e.g. super- or inline-accessor markers.
    Prefix {
        prefix: Text,
        qual: Box<TastyName>,
    },
}

/// Erased method signature carried by a `Signed` name.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodSig {
    pub params: Vec<ParamSig>,
    pub result: ErasedRef,
}

/// One parameter slot of an erased signature: either the arity of a type
/// parameter section or an erased value-parameter type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ParamSig {
    TypeArity(u32),
    Value(ErasedRef),
}

/// An erased type reference: a qualified type name plus array dimensions.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ErasedRef {
    pub name: Box<TastyName>,
    pub array_dims: u8,
}

impl ErasedRef {
    /// Build from a type name whose underlying fragment may carry trailing
    /// `[]` markers for array dimensions.
    pub fn of(name: TastyName) -> ErasedRef {
        fn strip(text: &str) -> (&str, u8) {
            let mut base = text;
            let mut dims = 0u8;
            while let Some(stripped) = base.strip_suffix("[]") {
                base = stripped;
                dims += 1;
            }
            (base, dims)
        }
        match name {
            TastyName::Simple(text) => {
                let (base, dims) = strip(&text);
                ErasedRef {
                    name: Box::new(TastyName::simple(base)),
                    array_dims: dims,
                }
            }
            TastyName::Qualified { qual, sep, selector } => {
                let (base, dims) = strip(&selector);
                ErasedRef {
                    name: Box::new(TastyName::Qualified {
                        qual,
                        sep,
                        selector: Rc::from(base),
                    }),
                    array_dims: dims,
                }
            }
            other => ErasedRef {
                name: Box::new(other),
                array_dims: 0,
            },
        }
    }
}

impl TastyName {
    /// The separator text of wildcard unique names.
    pub const WILDCARD_SEP: &'static str = "_$";
    /// The constructor fragment.
    pub const CONSTRUCTOR: &'static str = "<init>";

    /// A simple name over the given text.
    pub fn simple(text: &str) -> TastyName {
        TastyName::Simple(Rc::from(text))
    }

    /// The empty simple name.
    pub fn empty() -> TastyName {
        TastyName::simple("")
    }

    /// The constructor name `<init>`.
    pub fn constructor() -> TastyName {
        TastyName::simple(Self::CONSTRUCTOR)
    }

    /// The type view of this name. Idempotent.
    pub fn to_type_name(self) -> TastyName {
        match self {
            TastyName::Type(_) => self,
            other => TastyName::Type(Box::new(other)),
        }
    }

    /// Strip a type view, if any.
    pub fn to_term_name(self) -> TastyName {
        match self {
            TastyName::Type(base) => *base,
            other => other,
        }
    }

    /// Whether this is a type-view name.
    #[inline]
    pub fn is_type_name(&self) -> bool {
        matches!(self, TastyName::Type(_))
    }

    /// Whether the name, type views aside, is a module-class view.
    pub fn is_module_name(&self) -> bool {
        match self {
            TastyName::Type(base) => base.is_module_name(),
            TastyName::Module(_) => true,
            _ => false,
        }
    }

    /// Whether the name, views stripped, is the constructor.
    pub fn is_constructor(&self) -> bool {
        matches!(self.stripped(), TastyName::Simple(text) if &**text == Self::CONSTRUCTOR)
    }

    /// Whether the name, views stripped, is a default-getter name.
    pub fn is_default_getter(&self) -> bool {
        matches!(self.stripped(), TastyName::Default { .. })
    }

    /// Whether this is the wildcard: `Unique(Empty, "_$", n)`.
    pub fn is_wildcard(&self) -> bool {
        match self.stripped() {
            TastyName::Unique { qual, sep, .. } => {
                &**sep == Self::WILDCARD_SEP
                    && matches!(&**qual, TastyName::Simple(text) if text.is_empty())
            }
            _ => false,
        }
    }

    /// The name with `Type` and `Module` views removed.
    pub fn stripped(&self) -> &TastyName {
        match self {
            TastyName::Type(base) | TastyName::Module(base) => base.stripped(),
            other => other,
        }
    }

    /// The signature of a `Signed` name, views stripped.
    pub fn signature(&self) -> Option<&MethodSig> {
        match self.stripped() {
            TastyName::Signed { sig, .. } => Some(sig),
            _ => None,
        }
    }

    /// The name with any `Signed` adornment dropped, views preserved.
    pub fn without_signature(&self) -> TastyName {
        match self {
            TastyName::Signed { qual, .. } => (**qual).clone(),
            TastyName::Type(base) => base.without_signature().to_type_name(),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_view_is_idempotent() {
        let n = TastyName::simple("Foo");
        let once = n.clone().to_type_name();
        let twice = once.clone().to_type_name();
        assert_eq!(once, twice);
        assert_eq!(once.clone().to_term_name(), n);
    }

    #[test]
    fn equality_is_structural() {
        let a = TastyName::Qualified {
            qual: Box::new(TastyName::simple("scala")),
            sep: Rc::from("."),
            selector: Rc::from("Int"),
        };
        let b = TastyName::Qualified {
            qual: Box::new(TastyName::simple("scala")),
            sep: Rc::from("."),
            selector: Rc::from("Int"),
        };
        assert_eq!(a, b);
    }

    #[test]
    fn wildcard_shape() {
        let wild = TastyName::Unique {
            qual: Box::new(TastyName::empty()),
            sep: Rc::from(TastyName::WILDCARD_SEP),
            num: 3,
        };
        assert!(wild.is_wildcard());
        let fresh = TastyName::Unique {
            qual: Box::new(TastyName::simple("x")),
            sep: Rc::from("$"),
            num: 1,
        };
        assert!(!fresh.is_wildcard());
    }

    #[test]
    fn module_view_survives_the_type_view() {
        let module = TastyName::Module(Box::new(TastyName::simple("Foo")));
        assert!(module.is_module_name());
        assert!(module.to_type_name().is_module_name());
        assert!(!TastyName::simple("Foo").is_module_name());
    }

    #[test]
    fn constructor_recognized_through_views() {
        let ctor = TastyName::constructor();
        assert!(ctor.is_constructor());
        assert!(ctor.to_type_name().is_constructor());
    }

    #[test]
    fn erased_ref_strips_array_dims() {
        let erased = ErasedRef::of(TastyName::simple("Int[][]"));
        assert_eq!(erased.array_dims, 2);
        assert_eq!(*erased.name, TastyName::simple("Int"));
    }
}
