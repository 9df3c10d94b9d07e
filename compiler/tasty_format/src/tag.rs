//! The dense wire-tag enum and its shape classification.
//!
//! Tags are partitioned by magic ranges into five categories. The first
//! category carries no operand at all and scans exactly like a nat-only tag
//! with zero operands, which is why subtree skipping needs only one
//! exhaustive match per category.

use std::fmt;

/// Shape of a tag's wire payload.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TagCategory {
    /// No operand (modifiers, simple constants).
    TagOnly,
    /// One variable-length natural (addresses, name refs, small constants).
    Nat,
    /// One subtree.
    Ast,
    /// One natural followed by one subtree.
    NatAst,
    /// Length prefix giving the absolute end of the payload.
    Length,
}

/// Declare every wire tag with its discriminant in a single location.
///
/// Generates the `TastyTag` enum, `from_u8`, and `as_str` (the format's
/// own spelling, used in diagnostics).
macro_rules! define_tags {
    ($( $variant:ident = $value:literal, $wire:literal );+ $(;)?) => {
        /// A wire tag of the tree stream.
        ///
        /// Discriminants are the on-wire byte values; the category ranges
        /// below partition them by payload shape.
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        #[repr(u8)]
        pub enum TastyTag {
            $( $variant = $value, )+
        }

        impl TastyTag {
            /// Decode a tag byte. `None` for values outside the assignment.
            pub fn from_u8(byte: u8) -> Option<TastyTag> {
                match byte {
                    $( $value => Some(TastyTag::$variant), )+
                    _ => None,
                }
            }

            /// The format's own spelling of the tag, for diagnostics.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( TastyTag::$variant => $wire, )+
                }
            }
        }
    };
}

define_tags! {
    // Category 1: no operand (2 ..= 39)
    UnitConst = 2, "UNITconst";
    FalseConst = 3, "FALSEconst";
    TrueConst = 4, "TRUEconst";
    NullConst = 5, "NULLconst";
    Private = 6, "PRIVATE";
    Protected = 7, "PROTECTED";
    Abstract = 8, "ABSTRACT";
    Final = 9, "FINAL";
    Sealed = 10, "SEALED";
    Case = 11, "CASE";
    Implicit = 12, "IMPLICIT";
    Lazy = 13, "LAZY";
    Override = 14, "OVERRIDE";
    Inline = 15, "INLINE";
    InlineProxy = 16, "INLINEPROXY";
    Macro = 17, "MACRO";
    Opaque = 18, "OPAQUE";
    Static = 19, "STATIC";
    Object = 20, "OBJECT";
    Trait = 21, "TRAIT";
    Enum = 22, "ENUM";
    Local = 23, "LOCAL";
    Synthetic = 24, "SYNTHETIC";
    Artifact = 25, "ARTIFACT";
    Mutable = 26, "MUTABLE";
    Erased = 27, "ERASED";
    Open = 28, "OPEN";
    Infix = 29, "INFIX";
    Transparent = 30, "TRANSPARENT";
    Exported = 31, "EXPORTED";
    Given = 32, "GIVEN";
    ParamAlias = 33, "PARAMalias";
    ParamEnd = 34, "PARAMEND";

    // Category 2: one nat (40 ..= 69)
    SharedTerm = 40, "SHAREDterm";
    SharedType = 41, "SHAREDtype";
    TermRefDirect = 42, "TERMREFdirect";
    TypeRefDirect = 43, "TYPEREFdirect";
    TermRefPkg = 44, "TERMREFpkg";
    TypeRefPkg = 45, "TYPEREFpkg";
    RecThis = 46, "RECthis";
    ByteConst = 47, "BYTEconst";
    ShortConst = 48, "SHORTconst";
    CharConst = 49, "CHARconst";
    IntConst = 50, "INTconst";
    LongConst = 51, "LONGconst";
    FloatConst = 52, "FLOATconst";
    DoubleConst = 53, "DOUBLEconst";
    StringConst = 54, "STRINGconst";
    Imported = 55, "IMPORTED";
    Renamed = 56, "RENAMED";

    // Category 3: one subtree (70 ..= 89)
    This = 70, "THIS";
    QualThis = 71, "QUALTHIS";
    ClassConst = 72, "CLASSconst";
    ByNameTpt = 73, "BYNAMEtpt";
    New = 74, "NEW";
    Throw = 75, "THROW";
    ImplicitArg = 76, "IMPLICITarg";
    PrivateQualified = 77, "PRIVATEqualified";
    ProtectedQualified = 78, "PROTECTEDqualified";
    RecType = 79, "RECtype";
    SingletonTpt = 80, "SINGLETONtpt";

    // Category 4: one nat, one subtree (90 ..= 109)
    Ident = 90, "IDENT";
    IdentTpt = 91, "IDENTtpt";
    Select = 92, "SELECT";
    SelectTpt = 93, "SELECTtpt";
    TermRefSymbol = 94, "TERMREFsymbol";
    TermRef = 95, "TERMREF";
    TypeRefSymbol = 96, "TYPEREFsymbol";
    TypeRef = 97, "TYPEREF";
    SelfDef = 98, "SELFDEF";
    NamedArg = 99, "NAMEDARG";

    // Category 5: length-prefixed (110 ..)
    Package = 110, "PACKAGE";
    ValDef = 111, "VALDEF";
    DefDef = 112, "DEFDEF";
    TypeDef = 113, "TYPEDEF";
    Import = 114, "IMPORT";
    TypeParam = 115, "TYPEPARAM";
    Param = 116, "PARAM";
    Apply = 117, "APPLY";
    TypeApply = 118, "TYPEAPPLY";
    Typed = 119, "TYPED";
    Assign = 120, "ASSIGN";
    Block = 121, "BLOCK";
    If = 122, "IF";
    Lambda = 123, "LAMBDA";
    Match = 124, "MATCH";
    Return = 125, "RETURN";
    While = 126, "WHILE";
    Try = 127, "TRY";
    Inlined = 128, "INLINED";
    SelectOuter = 129, "SELECTouter";
    Repeated = 130, "REPEATED";
    Bind = 131, "BIND";
    Alternative = 132, "ALTERNATIVE";
    Unapply = 133, "UNAPPLY";
    AnnotatedType = 134, "ANNOTATEDtype";
    AnnotatedTpt = 135, "ANNOTATEDtpt";
    CaseDef = 136, "CASEDEF";
    Template = 137, "TEMPLATE";
    Super = 138, "SUPER";
    SuperType = 139, "SUPERtype";
    RefinedType = 140, "REFINEDtype";
    RefinedTpt = 141, "REFINEDtpt";
    AppliedType = 142, "APPLIEDtype";
    AppliedTpt = 143, "APPLIEDtpt";
    TypeBounds = 144, "TYPEBOUNDS";
    TypeBoundsTpt = 145, "TYPEBOUNDStpt";
    AndType = 146, "ANDtype";
    AndTpt = 147, "ANDtpt";
    OrType = 148, "ORtype";
    OrTpt = 149, "ORtpt";
    PolyType = 150, "POLYtype";
    TypeLambdaType = 151, "TYPELAMBDAtype";
    LambdaTpt = 152, "LAMBDAtpt";
    ParamType = 153, "PARAMtype";
    Annotation = 154, "ANNOTATION";
    TermRefIn = 155, "TERMREFin";
    TypeRefIn = 156, "TYPEREFin";
    SelectIn = 157, "SELECTin";
    Export = 158, "EXPORT";
    MethodType = 159, "METHODtype";
    ImplicitMethodType = 160, "IMPLICITMETHODtype";
    GivenMethodType = 161, "GIVENMETHODtype";
    MatchTpt = 162, "MATCHtpt";
    MatchType = 163, "MATCHtype";
    MatchCaseType = 164, "MATCHCASEtype";
    Hole = 255, "HOLE";
}

/// First tag carrying one nat operand.
pub(crate) const FIRST_NAT_TAG: u8 = 40;
/// First tag carrying one subtree operand.
pub(crate) const FIRST_AST_TAG: u8 = 70;
/// First tag carrying a nat followed by a subtree.
pub(crate) const FIRST_NAT_AST_TAG: u8 = 90;
/// First length-prefixed tag.
pub(crate) const FIRST_LENGTH_TAG: u8 = 110;

impl TastyTag {
    /// The payload shape of this tag.
    #[inline]
    pub fn category(self) -> TagCategory {
        let byte = self as u8;
        if byte >= FIRST_LENGTH_TAG {
            TagCategory::Length
        } else if byte >= FIRST_NAT_AST_TAG {
            TagCategory::NatAst
        } else if byte >= FIRST_AST_TAG {
            TagCategory::Ast
        } else if byte >= FIRST_NAT_TAG {
            TagCategory::Nat
        } else {
            TagCategory::TagOnly
        }
    }

    /// Tags that toggle a modifier bit when read in a modifier tail.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            TastyTag::Private
                | TastyTag::Protected
                | TastyTag::Abstract
                | TastyTag::Final
                | TastyTag::Sealed
                | TastyTag::Case
                | TastyTag::Implicit
                | TastyTag::Lazy
                | TastyTag::Override
                | TastyTag::Inline
                | TastyTag::InlineProxy
                | TastyTag::Macro
                | TastyTag::Opaque
                | TastyTag::Static
                | TastyTag::Object
                | TastyTag::Trait
                | TastyTag::Enum
                | TastyTag::Local
                | TastyTag::Synthetic
                | TastyTag::Artifact
                | TastyTag::Mutable
                | TastyTag::Erased
                | TastyTag::Open
                | TastyTag::Infix
                | TastyTag::Transparent
                | TastyTag::Exported
                | TastyTag::Given
                | TastyTag::ParamAlias
                | TastyTag::PrivateQualified
                | TastyTag::ProtectedQualified
                | TastyTag::Annotation
        )
    }

    /// Tags whose subtree defines a member symbol.
    #[inline]
    pub fn is_member_def(self) -> bool {
        matches!(
            self,
            TastyTag::ValDef
                | TastyTag::DefDef
                | TastyTag::TypeDef
                | TastyTag::TypeParam
                | TastyTag::Param
        )
    }

    /// Number of leading name-reference slots inside a length-prefixed
    /// payload. The owner-tree scanner skips these before recursing.
    pub fn name_ref_slots(self) -> u32 {
        match self {
            TastyTag::ValDef
            | TastyTag::DefDef
            | TastyTag::TypeDef
            | TastyTag::TypeParam
            | TastyTag::Param
            | TastyTag::RefinedType
            | TastyTag::TermRefIn
            | TastyTag::TypeRefIn
            | TastyTag::SelectIn
            | TastyTag::Bind => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for TastyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_ranges() {
        assert_eq!(TastyTag::UnitConst.category(), TagCategory::TagOnly);
        assert_eq!(TastyTag::Mutable.category(), TagCategory::TagOnly);
        assert_eq!(TastyTag::SharedType.category(), TagCategory::Nat);
        assert_eq!(TastyTag::Renamed.category(), TagCategory::Nat);
        assert_eq!(TastyTag::RecType.category(), TagCategory::Ast);
        assert_eq!(TastyTag::Select.category(), TagCategory::NatAst);
        assert_eq!(TastyTag::Template.category(), TagCategory::Length);
        assert_eq!(TastyTag::Hole.category(), TagCategory::Length);
    }

    #[test]
    fn decode_round_trips() {
        for byte in 0..=u8::MAX {
            if let Some(tag) = TastyTag::from_u8(byte) {
                assert_eq!(tag as u8, byte);
            }
        }
        assert_eq!(TastyTag::from_u8(0), None);
        assert_eq!(TastyTag::from_u8(200), None);
    }

    #[test]
    fn member_defs_are_length_prefixed() {
        for tag in [
            TastyTag::ValDef,
            TastyTag::DefDef,
            TastyTag::TypeDef,
            TastyTag::TypeParam,
            TastyTag::Param,
        ] {
            assert!(tag.is_member_def());
            assert_eq!(tag.category(), TagCategory::Length);
            assert_eq!(tag.name_ref_slots(), 1);
        }
        assert!(!TastyTag::Template.is_member_def());
    }

    #[test]
    fn modifier_tags() {
        assert!(TastyTag::Lazy.is_modifier());
        assert!(TastyTag::ProtectedQualified.is_modifier());
        assert!(TastyTag::Annotation.is_modifier());
        assert!(!TastyTag::ValDef.is_modifier());
        assert!(!TastyTag::ParamEnd.is_modifier());
    }
}
