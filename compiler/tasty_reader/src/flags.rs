//! Dialect-only flag bits.
//!
//! Modifier tags with no host counterpart accumulate here. Most of them
//! are either tolerated bookkeeping (`OBJECT`, `ENUM`, `PARAM_ALIAS`) or
//! refused outright on the kinds that cannot carry them.

use crate::error::{ReaderError, ReaderResult};
use bitflags::bitflags;
use tasty_format::TastyTag;

bitflags! {
    /// Source-dialect modifier bits the host has no vocabulary for.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TastyOnly: u32 {
        const INLINE = 1 << 0;
        const INLINE_PROXY = 1 << 1;
        const MACRO = 1 << 2;
        const OPAQUE = 1 << 3;
        const ERASED = 1 << 4;
        const OPEN = 1 << 5;
        const INFIX = 1 << 6;
        const TRANSPARENT = 1 << 7;
        const EXPORTED = 1 << 8;
        const ENUM = 1 << 9;
        /// The definition is a module (object) on the wire.
        const OBJECT = 1 << 10;
        /// A class parameter re-exported as a member (param alias).
        const PARAM_ALIAS = 1 << 11;
    }
}

impl TastyOnly {
    /// The noun used when a bit is refused.
    fn noun(self) -> &'static str {
        if self.contains(TastyOnly::MACRO) {
            "macro definitions"
        } else if self.contains(TastyOnly::ERASED) {
            "erased definitions"
        } else if self.contains(TastyOnly::OPAQUE) {
            "opaque type aliases"
        } else if self.contains(TastyOnly::EXPORTED) {
            "export forwarders"
        } else if self.contains(TastyOnly::INLINE) {
            "inline methods"
        } else {
            "this dialect-only modifier"
        }
    }
}

/// Reject dialect-only bits that the definition kind cannot accept.
///
/// `INLINE` on values is screened separately: a value with a literal
/// right-hand side is representable and handled at completion time.
pub fn check_dialect_flags(
    tag: TastyTag,
    tasty: TastyOnly,
    location: &str,
) -> ReaderResult<()> {
    let refused = match tag {
        TastyTag::DefDef => {
            tasty & (TastyOnly::MACRO | TastyOnly::ERASED | TastyOnly::EXPORTED | TastyOnly::INLINE)
        }
        TastyTag::ValDef => tasty & (TastyOnly::MACRO | TastyOnly::ERASED | TastyOnly::EXPORTED),
        TastyTag::TypeDef | TastyTag::TypeParam => {
            tasty & (TastyOnly::MACRO | TastyOnly::ERASED | TastyOnly::OPAQUE)
        }
        TastyTag::Param => tasty & TastyOnly::ERASED,
        _ => TastyOnly::empty(),
    };
    if refused.is_empty() {
        Ok(())
    } else {
        Err(ReaderError::unsupported(refused.noun(), location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerated_bits_pass() {
        assert!(check_dialect_flags(
            TastyTag::ValDef,
            TastyOnly::ENUM | TastyOnly::OBJECT,
            "value v"
        )
        .is_ok());
        assert!(check_dialect_flags(TastyTag::TypeDef, TastyOnly::OPEN, "class C").is_ok());
    }

    #[test]
    fn erased_is_refused_everywhere() {
        for tag in [
            TastyTag::DefDef,
            TastyTag::ValDef,
            TastyTag::TypeDef,
            TastyTag::Param,
        ] {
            let err = check_dialect_flags(tag, TastyOnly::ERASED, "x").unwrap_err();
            assert!(err.is_unsupported());
        }
    }

    #[test]
    fn opaque_only_refused_on_type_definitions() {
        assert!(check_dialect_flags(TastyTag::TypeDef, TastyOnly::OPAQUE, "t").is_err());
        assert!(check_dialect_flags(TastyTag::ValDef, TastyOnly::OPAQUE, "v").is_ok());
    }

    #[test]
    fn inline_methods_are_refused_but_inline_values_pass_here() {
        assert!(check_dialect_flags(TastyTag::DefDef, TastyOnly::INLINE, "m").is_err());
        assert!(check_dialect_flags(TastyTag::ValDef, TastyOnly::INLINE, "v").is_ok());
    }
}
