//! The host compiler's modifier vocabulary.

use bitflags::bitflags;

bitflags! {
    /// Host symbol flags.
    ///
    /// The unpickler translates the source dialect's modifier bits into
    /// this vocabulary; bits with no host counterpart live in the reader's
    /// own dialect-only set instead.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Flags: u64 {
        const PRIVATE = 1 << 0;
        const PROTECTED = 1 << 1;
        const ABSTRACT = 1 << 2;
        const FINAL = 1 << 3;
        const SEALED = 1 << 4;
        const CASE = 1 << 5;
        const IMPLICIT = 1 << 6;
        const LAZY = 1 << 7;
        const OVERRIDE = 1 << 8;
        /// `abstract override`, collapsed from the two wire modifiers.
        const ABSOVERRIDE = 1 << 9;
        const MUTABLE = 1 << 10;
        const METHOD = 1 << 11;
        const MODULE = 1 << 12;
        const TRAIT = 1 << 13;
        /// Declared but not defined (no right-hand side).
        const DEFERRED = 1 << 14;
        /// Stable value: legal prefix of a singleton type.
        const STABLE = 1 << 15;
        const ACCESSOR = 1 << 16;
        const PARAM = 1 << 17;
        const PARAM_ACCESSOR = 1 << 18;
        const CASE_ACCESSOR = 1 << 19;
        const SYNTHETIC = 1 << 20;
        const ARTIFACT = 1 << 21;
        const LOCAL = 1 << 22;
        const COVARIANT = 1 << 23;
        const CONTRAVARIANT = 1 << 24;
        /// Carries or owns default-argument getters.
        const DEFAULT_PARAMETERIZED = 1 << 25;
        const ENUM = 1 << 26;
        const MACRO = 1 << 27;
        const STATIC = 1 << 28;
        /// Installed when completion failed; the info is an error type.
        const ERRONEOUS = 1 << 29;
        const PACKAGE = 1 << 30;
    }
}

impl Flags {
    /// Flags a module value carries.
    pub const MODULE_VAL: Flags = Flags::MODULE
        .union(Flags::LAZY)
        .union(Flags::FINAL)
        .union(Flags::STABLE);

    /// Flags a module class carries.
    pub const MODULE_CLASS: Flags = Flags::MODULE.union(Flags::FINAL);

    /// Whether the symbol may be completed into a singleton-type prefix.
    #[inline]
    pub fn is_stable(self) -> bool {
        self.contains(Flags::STABLE) && !self.contains(Flags::MUTABLE)
    }
}
