//! Wire-level primitives for reading the `ASTs` section of a TASTy artifact.
//!
//! The outer framer (header parsing, section splitting) hands this crate an
//! immutable byte buffer. Everything here is position arithmetic: opaque
//! addresses, the dense tag enum with its shape ranges, and a seekable
//! cursor that decodes variable-length integers.

mod addr;
mod cursor;
mod tag;

pub use addr::{Addr, NameRef};
pub use cursor::{TastyCursor, WireError, WireResult};
pub use tag::{TagCategory, TastyTag};
