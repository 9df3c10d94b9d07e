//! The modifier tail of a definition.
//!
//! Each tag toggles one bit, mapped either onto the host vocabulary or
//! onto the dialect-only set. Qualified access modifiers consume a
//! trailing type whose symbol becomes `privateWithin`; annotations are
//! recorded as lazy subtree addresses and materialized at attachment.

use crate::context::Context;
use crate::error::{ReaderError, ReaderResult};
use crate::flags::TastyOnly;
use crate::reader::Unpickler;
use tasty_format::{Addr, TastyCursor, TastyTag};
use tasty_host::{Flags, Host, SymbolId};

/// The outcome of reading a modifier tail.
pub(crate) struct ParsedModifiers {
    pub flags: Flags,
    pub tasty: TastyOnly,
    pub annots: Vec<Addr>,
    pub private_within: SymbolId,
}

impl<'a> Unpickler<'a> {
    /// Read modifier tags up to `end`.
    pub(crate) fn read_modifiers(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        end: Addr,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<ParsedModifiers> {
        let mut parsed = ParsedModifiers {
            flags: Flags::empty(),
            tasty: TastyOnly::empty(),
            annots: Vec::new(),
            private_within: SymbolId::NONE,
        };
        while cursor.current_addr() < end {
            let start = cursor.current_addr();
            let tag = cursor.read_tag()?;
            match tag {
                TastyTag::Private => parsed.flags |= Flags::PRIVATE,
                TastyTag::Protected => parsed.flags |= Flags::PROTECTED,
                TastyTag::Abstract => {
                    // ABSTRACT OVERRIDE is one host concept
                    if cursor.current_addr() < end && cursor.peek_tag()? == TastyTag::Override {
                        cursor.read_tag()?;
                        parsed.flags |= Flags::ABSOVERRIDE;
                    } else {
                        parsed.flags |= Flags::ABSTRACT;
                    }
                }
                TastyTag::Final => parsed.flags |= Flags::FINAL,
                TastyTag::Sealed => parsed.flags |= Flags::SEALED,
                TastyTag::Case => parsed.flags |= Flags::CASE,
                TastyTag::Implicit => parsed.flags |= Flags::IMPLICIT,
                TastyTag::Given => parsed.flags |= Flags::IMPLICIT,
                TastyTag::Lazy => parsed.flags |= Flags::LAZY,
                TastyTag::Override => parsed.flags |= Flags::OVERRIDE,
                TastyTag::Mutable => parsed.flags |= Flags::MUTABLE,
                TastyTag::Static => parsed.flags |= Flags::STATIC,
                TastyTag::Trait => parsed.flags |= Flags::TRAIT,
                TastyTag::Local => parsed.flags |= Flags::LOCAL,
                TastyTag::Synthetic => parsed.flags |= Flags::SYNTHETIC,
                TastyTag::Artifact => parsed.flags |= Flags::ARTIFACT,
                TastyTag::Object => parsed.tasty |= TastyOnly::OBJECT,
                TastyTag::Enum => parsed.tasty |= TastyOnly::ENUM,
                TastyTag::Inline => parsed.tasty |= TastyOnly::INLINE,
                TastyTag::InlineProxy => parsed.tasty |= TastyOnly::INLINE_PROXY,
                TastyTag::Macro => parsed.tasty |= TastyOnly::MACRO,
                TastyTag::Opaque => parsed.tasty |= TastyOnly::OPAQUE,
                TastyTag::Erased => parsed.tasty |= TastyOnly::ERASED,
                TastyTag::Open => parsed.tasty |= TastyOnly::OPEN,
                TastyTag::Infix => parsed.tasty |= TastyOnly::INFIX,
                TastyTag::Transparent => parsed.tasty |= TastyOnly::TRANSPARENT,
                TastyTag::Exported => parsed.tasty |= TastyOnly::EXPORTED,
                TastyTag::ParamAlias => parsed.tasty |= TastyOnly::PARAM_ALIAS,
                TastyTag::PrivateQualified => {
                    parsed.flags |= Flags::PRIVATE;
                    let tpe = self.read_type(cursor, host, ctx)?;
                    parsed.private_within = host.type_symbol_of(tpe);
                }
                TastyTag::ProtectedQualified => {
                    parsed.flags |= Flags::PROTECTED;
                    let tpe = self.read_type(cursor, host, ctx)?;
                    parsed.private_within = host.type_symbol_of(tpe);
                }
                TastyTag::Annotation => {
                    let annot_end = cursor.read_end()?;
                    if !self.settings.ignore_annotations {
                        parsed.annots.push(start);
                    }
                    cursor.goto(annot_end);
                }
                other => {
                    return Err(ReaderError::format(
                        format!("tag {other} in modifier position"),
                        self.location(host, ctx),
                    ));
                }
            }
        }
        Ok(parsed)
    }
}
