//! The wire name table.
//!
//! A dense array of names, each entry either atomic (UTF8) or composed
//! from earlier entries. References are 1-based on the wire; entry `i` may
//! only reference entries with lower indices.

use crate::name::{ErasedRef, MethodSig, ParamSig, TastyName};
use std::fmt;
use std::rc::Rc;
use tasty_format::{NameRef, TastyCursor, WireError};

/// Wire tags of name-table entries.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
enum NameTag {
    Utf8 = 1,
    Qualified = 2,
    Expanded = 3,
    ExpandPrefix = 4,
    Unique = 10,
    DefaultGetter = 11,
    SuperAccessor = 20,
    InlineAccessor = 21,
    ObjectClass = 23,
    Signed = 63,
}

impl NameTag {
    fn from_u8(byte: u8) -> Option<NameTag> {
        match byte {
            1 => Some(NameTag::Utf8),
            2 => Some(NameTag::Qualified),
            3 => Some(NameTag::Expanded),
            4 => Some(NameTag::ExpandPrefix),
            10 => Some(NameTag::Unique),
            11 => Some(NameTag::DefaultGetter),
            20 => Some(NameTag::SuperAccessor),
            21 => Some(NameTag::InlineAccessor),
            23 => Some(NameTag::ObjectClass),
            63 => Some(NameTag::Signed),
            _ => None,
        }
    }
}

/// Failure while decoding the name table.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NameError {
    pub message: String,
}

impl NameError {
    #[cold]
    fn new(message: String) -> NameError {
        NameError { message }
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed name table: {}", self.message)
    }
}

impl std::error::Error for NameError {}

impl From<WireError> for NameError {
    fn from(err: WireError) -> NameError {
        NameError::new(err.to_string())
    }
}

/// The decoded name table.
pub struct NameTable {
    names: Vec<TastyName>,
}

impl NameTable {
    /// Decode a name table from its section bytes: an entry count followed
    /// by `count` length-prefixed entries.
    pub fn parse(bytes: &[u8]) -> Result<NameTable, NameError> {
        let mut cursor = TastyCursor::new(bytes);
        let count = cursor.read_nat()? as usize;
        let mut table = NameTable {
            names: Vec::with_capacity(count),
        };
        for index in 0..count {
            let entry = table.parse_entry(&mut cursor, index)?;
            table.names.push(entry);
        }
        Ok(table)
    }

    /// Build a table directly from resolved names (test support and
    /// embedders that pre-parse the section).
    pub fn from_names(names: Vec<TastyName>) -> NameTable {
        NameTable { names }
    }

    /// Resolve a wire reference.
    pub fn get(&self, name_ref: NameRef) -> Option<&TastyName> {
        let raw = name_ref.raw();
        if raw == 0 {
            return None;
        }
        self.names.get(raw as usize - 1)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a reference made by the entry currently being parsed.
    fn back_ref(&self, name_ref: NameRef, entry: usize) -> Result<TastyName, NameError> {
        let raw = name_ref.raw();
        if raw == 0 || raw as usize > entry {
            return Err(NameError::new(format!(
                "entry {} references name {} which is not an earlier entry",
                entry + 1,
                raw
            )));
        }
        Ok(self.names[raw as usize - 1].clone())
    }

    fn simple_text(&self, name_ref: NameRef, entry: usize) -> Result<Rc<str>, NameError> {
        let name = self.back_ref(name_ref, entry)?;
        match name {
            TastyName::Simple(text) => Ok(text),
            other => Err(NameError::new(format!(
                "entry {} expects a simple fragment, found {}",
                entry + 1,
                other.debug_string()
            ))),
        }
    }

    fn parse_entry(
        &self,
        cursor: &mut TastyCursor<'_>,
        index: usize,
    ) -> Result<TastyName, NameError> {
        let tag_byte = cursor.read_byte()?;
        let tag = NameTag::from_u8(tag_byte)
            .ok_or_else(|| NameError::new(format!("unknown name tag {tag_byte}")))?;
        let end = cursor.read_end()?;
        let mut payload = cursor.sub_reader(cursor.current_addr(), end);
        cursor.goto(end);

        let name = match tag {
            NameTag::Utf8 => {
                let len = (end.index() - payload.current_addr().index()) as usize;
                let bytes = payload.read_bytes(len)?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| NameError::new(format!("entry {} is not UTF-8", index + 1)))?;
                TastyName::simple(text)
            }
            NameTag::Qualified | NameTag::Expanded | NameTag::ExpandPrefix => {
                let qual = self.back_ref(payload.read_name_ref()?, index)?;
                let selector = self.simple_text(payload.read_name_ref()?, index)?;
                let sep = match tag {
                    NameTag::Qualified => ".",
                    NameTag::Expanded => "$$",
                    NameTag::ExpandPrefix => "$",
                    _ => unreachable!(),
                };
                TastyName::Qualified {
                    qual: Box::new(qual),
                    sep: Rc::from(sep),
                    selector,
                }
            }
            NameTag::Unique => {
                let sep = self.simple_text(payload.read_name_ref()?, index)?;
                let num = payload.read_nat()?;
                let qual = if payload.is_at_end() {
                    TastyName::empty()
                } else {
                    self.back_ref(payload.read_name_ref()?, index)?
                };
                TastyName::Unique {
                    qual: Box::new(qual),
                    sep,
                    num,
                }
            }
            NameTag::DefaultGetter => {
                let qual = self.back_ref(payload.read_name_ref()?, index)?;
                let num = payload.read_nat()?;
                TastyName::Default {
                    qual: Box::new(qual),
                    num,
                }
            }
            NameTag::SuperAccessor => TastyName::Prefix {
                prefix: Rc::from("super$"),
                qual: Box::new(self.back_ref(payload.read_name_ref()?, index)?),
            },
            NameTag::InlineAccessor => TastyName::Prefix {
                prefix: Rc::from("inline$"),
                qual: Box::new(self.back_ref(payload.read_name_ref()?, index)?),
            },
            NameTag::ObjectClass => {
                TastyName::Module(Box::new(self.back_ref(payload.read_name_ref()?, index)?))
            }
            NameTag::Signed => {
                let qual = self.back_ref(payload.read_name_ref()?, index)?;
                let result_name = self.back_ref(payload.read_name_ref()?, index)?;
                let result = ErasedRef::of(result_name.to_type_name());
                let mut params = Vec::new();
                while !payload.is_at_end() {
                    let slot = payload.read_int()?;
                    if slot < 0 {
                        params.push(ParamSig::TypeArity(slot.unsigned_abs()));
                    } else {
                        let param =
                            self.back_ref(NameRef::new(slot as u32), index)?;
                        params.push(ParamSig::Value(ErasedRef::of(param.to_type_name())));
                    }
                }
                TastyName::Signed {
                    qual: Box::new(qual),
                    sig: MethodSig { params, result },
                }
            }
        };
        Ok(name)
    }
}
