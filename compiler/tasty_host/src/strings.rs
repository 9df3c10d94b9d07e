//! Interned identifier strings.
//!
//! Compact 32-bit handles with O(1) lookup and equality. The unpickler is
//! single-threaded, so the interner exposes a plain `&mut` API.

use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Interned identifier handle.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Ident(u32);

impl Ident {
    /// Pre-interned empty string.
    pub const EMPTY: Ident = Ident(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ident({})", self.0)
    }
}

/// Identifier interner.
pub struct Strings {
    map: FxHashMap<Rc<str>, u32>,
    items: Vec<Rc<str>>,
}

impl Strings {
    /// Create an interner with the empty string pre-interned at index 0.
    pub fn new() -> Strings {
        let mut strings = Strings {
            map: FxHashMap::default(),
            items: Vec::with_capacity(64),
        };
        strings.intern("");
        strings
    }

    /// Intern a string, returning its handle.
    pub fn intern(&mut self, text: &str) -> Ident {
        if let Some(&index) = self.map.get(text) {
            return Ident(index);
        }
        let index = self.items.len() as u32;
        let shared: Rc<str> = Rc::from(text);
        self.items.push(shared.clone());
        self.map.insert(shared, index);
        Ident(index)
    }

    /// Look up the text for a handle.
    #[inline]
    pub fn lookup(&self, ident: Ident) -> &str {
        &self.items[ident.index()]
    }

    /// Handle for an already-interned string, without interning.
    pub fn find(&self, text: &str) -> Option<Ident> {
        self.map.get(text).map(|&index| Ident(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.len() <= 1
    }
}

impl Default for Strings {
    fn default() -> Self {
        Self::new()
    }
}
