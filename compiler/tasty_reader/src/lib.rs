//! Two-pass, laziness-aware TASTy tree/symbol unpickler.
//!
//! Consumes the `ASTs` section of a TASTy artifact plus its name table
//! and materializes class, module, method, field, parameter and type
//! symbols into the host symbol table, so that older-dialect code can
//! link against newer-dialect libraries.
//!
//! The outer framer (header, section splitting) and the host compiler
//! itself are collaborators, not residents: this crate only reads bytes
//! and drives the `tasty_host` capability set.

mod context;
mod error;
mod flags;
mod owners;
mod reader;

#[cfg(test)]
mod tests;

pub use context::{Context, Mode};
pub use error::{ErrorKind, ReaderError, ReaderResult};
pub use flags::TastyOnly;
pub use reader::Unpickler;

use tasty_host::{Host, SymbolId};
use tasty_names::NameTable;
use tracing::debug;

/// Recognized reader options.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct ReaderSettings {
    /// Echo every major decision through the host reporter.
    pub debug_tasty: bool,
    /// Drop all annotation thunks at modifier-read time.
    pub ignore_annotations: bool,
}

/// Unpickle one `ASTs` section into the host symbol table.
///
/// `class_root` and `module_root` are the symbols the driver assigned to
/// this compilation unit; both must share an owner. The indexing pass
/// runs first, then the roots are forced. A refused construct inside one
/// root is reported to the host and leaves that root with an error info;
/// wire corruption and cyclic references abort the artifact.
pub fn unpickle(
    bytes: &[u8],
    names: &NameTable,
    settings: ReaderSettings,
    host: &mut Host,
    class_root: SymbolId,
    module_root: SymbolId,
    source: &str,
) -> ReaderResult<()> {
    debug!(target: "tasty", source, len = bytes.len(), "unpickling ASTs section");
    let root_owner = host.syms.get(class_root).owner;
    let mut unpickler = Unpickler::new(
        bytes,
        names,
        settings,
        class_root,
        module_root,
        root_owner,
        source,
    );
    unpickler.enter_top_level(host)?;
    unpickler.complete_roots(host)
}

/// Like [`unpickle`], but hands back the unpickler so that the caller can
/// keep forcing member symbols lazily.
pub fn unpickle_lazy<'a>(
    bytes: &'a [u8],
    names: &'a NameTable,
    settings: ReaderSettings,
    host: &mut Host,
    class_root: SymbolId,
    module_root: SymbolId,
    source: &str,
) -> ReaderResult<Unpickler<'a>> {
    let root_owner = host.syms.get(class_root).owner;
    let mut unpickler = Unpickler::new(
        bytes,
        names,
        settings,
        class_root,
        module_root,
        root_owner,
        source,
    );
    unpickler.enter_top_level(host)?;
    unpickler.complete_roots(host)?;
    Ok(unpickler)
}
