//! Reader test suite.
//!
//! `builder` writes well-formed tree streams with the same tag constants
//! the reader decodes; the scenario and property modules drive complete
//! artifacts through `unpickle` and inspect the resulting symbol table.

mod builder;
mod properties;
mod scenarios;
