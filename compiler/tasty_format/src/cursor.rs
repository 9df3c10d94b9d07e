//! Seekable byte cursor over an immutable tree-stream buffer.
//!
//! Owns nothing except a position. Forks are independent cursors over the
//! same buffer; sub-readers additionally clamp the visible end so that
//! `is_at_end` reflects the subrange.

use crate::addr::{Addr, NameRef};
use crate::tag::{TagCategory, TastyTag};
use std::fmt;

/// A wire-level decoding failure: truncated buffer or unassigned tag byte.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct WireError {
    /// Byte offset at which the failure was detected.
    pub pos: u32,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at byte {}: {}", self.pos, self.message)
    }
}

impl std::error::Error for WireError {}

pub type WireResult<T> = Result<T, WireError>;

/// Cursor for navigating the `ASTs` byte stream.
///
/// All reads advance the position. `fork` yields an independent cursor;
/// `goto` repositions in place.
#[derive(Copy, Clone)]
pub struct TastyCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> TastyCursor<'a> {
    /// Create a cursor at the start of the buffer.
    pub fn new(bytes: &'a [u8]) -> Self {
        TastyCursor { bytes, pos: 0 }
    }

    /// The current position as an address.
    #[inline]
    pub fn current_addr(&self) -> Addr {
        Addr::new(self.pos as u32)
    }

    /// Reposition the cursor.
    #[inline]
    pub fn goto(&mut self, addr: Addr) {
        self.pos = addr.index() as usize;
    }

    /// An independent cursor at the same position.
    #[inline]
    pub fn fork(&self) -> TastyCursor<'a> {
        *self
    }

    /// An independent cursor positioned at `addr`.
    #[inline]
    pub fn fork_at(&self, addr: Addr) -> TastyCursor<'a> {
        TastyCursor {
            bytes: self.bytes,
            pos: addr.index() as usize,
        }
    }

    /// A cursor restricted to `[start, end)`: positioned at `start`, and
    /// `is_at_end` holds once `end` is reached.
    pub fn sub_reader(&self, start: Addr, end: Addr) -> TastyCursor<'a> {
        TastyCursor {
            bytes: &self.bytes[..end.index() as usize],
            pos: start.index() as usize,
        }
    }

    /// Whether the cursor has consumed its visible range.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Whether the cursor has reached `addr`.
    #[inline]
    pub fn is_at(&self, addr: Addr) -> bool {
        self.pos as u32 == addr.index()
    }

    /// Read one byte.
    #[inline]
    pub fn read_byte(&mut self) -> WireResult<u8> {
        match self.bytes.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Ok(b)
            }
            None => Err(self.truncated("byte")),
        }
    }

    /// Peek at the next byte without advancing.
    #[inline]
    pub fn peek_byte(&self) -> WireResult<u8> {
        match self.bytes.get(self.pos) {
            Some(&b) => Ok(b),
            None => Err(self.truncated("byte")),
        }
    }

    /// Read a tag byte and decode it.
    pub fn read_tag(&mut self) -> WireResult<TastyTag> {
        let byte = self.read_byte()?;
        TastyTag::from_u8(byte).ok_or_else(|| self.bad_tag(byte))
    }

    /// Peek the next tag without advancing.
    pub fn peek_tag(&self) -> WireResult<TastyTag> {
        let byte = self.peek_byte()?;
        TastyTag::from_u8(byte).ok_or_else(|| self.bad_tag(byte))
    }

    /// Peek the next tag, reading through `SHAREDterm`/`SHAREDtype`
    /// indirections to the tag of the pointed-to subtree.
    pub fn peek_unshared_tag(&self) -> WireResult<TastyTag> {
        let mut fork = self.fork();
        loop {
            let tag = fork.read_tag()?;
            if tag != TastyTag::SharedTerm && tag != TastyTag::SharedType {
                return Ok(tag);
            }
            let addr = fork.read_addr()?;
            fork.goto(addr);
        }
    }

    /// Read a variable-length unsigned natural.
    ///
    /// Big-endian base-128 groups; the final byte carries the stop bit in
    /// its high position.
    pub fn read_long_nat(&mut self) -> WireResult<u64> {
        let mut value: u64 = 0;
        loop {
            let b = self.read_byte()?;
            value = (value << 7) | u64::from(b & 0x7f);
            if b & 0x80 != 0 {
                return Ok(value);
            }
        }
    }

    /// Read a natural that must fit 32 bits.
    pub fn read_nat(&mut self) -> WireResult<u32> {
        let value = self.read_long_nat()?;
        u32::try_from(value).map_err(|_| self.overflow(value))
    }

    /// Read a zig-zag signed integer (64-bit).
    pub fn read_long_int(&mut self) -> WireResult<i64> {
        let raw = self.read_long_nat()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    /// Read a zig-zag signed integer that must fit 32 bits.
    pub fn read_int(&mut self) -> WireResult<i32> {
        let value = self.read_long_int()?;
        i32::try_from(value)
            .map_err(|_| self.overflow(value as u64))
    }

    /// Read an absolute address.
    #[inline]
    pub fn read_addr(&mut self) -> WireResult<Addr> {
        Ok(Addr::new(self.read_nat()?))
    }

    /// Read a name-table reference.
    #[inline]
    pub fn read_name_ref(&mut self) -> WireResult<NameRef> {
        Ok(NameRef::new(self.read_nat()?))
    }

    /// Read a length prefix and return the absolute end address of the
    /// payload it delimits.
    pub fn read_end(&mut self) -> WireResult<Addr> {
        let length = self.read_nat()?;
        Ok(Addr::new(self.pos as u32 + length))
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> WireResult<&'a [u8]> {
        match self.bytes.get(self.pos..self.pos + n) {
            Some(slice) => {
                self.pos += n;
                Ok(slice)
            }
            None => Err(self.truncated("byte run")),
        }
    }

    /// Skip one complete subtree, whatever its shape.
    pub fn skip_tree(&mut self) -> WireResult<()> {
        let tag = self.read_tag()?;
        self.skip_tree_tagged(tag)
    }

    /// Skip the remainder of a subtree whose tag has been consumed.
    pub fn skip_tree_tagged(&mut self, tag: TastyTag) -> WireResult<()> {
        match tag.category() {
            TagCategory::TagOnly => Ok(()),
            TagCategory::Nat => {
                self.read_long_nat()?;
                Ok(())
            }
            TagCategory::Ast => self.skip_tree(),
            TagCategory::NatAst => {
                self.read_long_nat()?;
                self.skip_tree()
            }
            TagCategory::Length => {
                let end = self.read_end()?;
                self.goto(end);
                Ok(())
            }
        }
    }

    #[cold]
    fn truncated(&self, what: &str) -> WireError {
        WireError {
            pos: self.pos as u32,
            message: format!("unexpected end of stream while reading a {what}"),
        }
    }

    #[cold]
    fn bad_tag(&self, byte: u8) -> WireError {
        WireError {
            pos: self.pos as u32,
            message: format!("unassigned tag byte {byte}"),
        }
    }

    #[cold]
    fn overflow(&self, value: u64) -> WireError {
        WireError {
            pos: self.pos as u32,
            message: format!("variable-length integer {value} exceeds 32 bits"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode a natural the way the writer does: big-endian base-128,
    /// stop bit on the last byte.
    fn put_nat(out: &mut Vec<u8>, mut value: u64) {
        let mut groups = [0u8; 10];
        let mut n = 0;
        loop {
            groups[n] = (value & 0x7f) as u8;
            value >>= 7;
            n += 1;
            if value == 0 {
                break;
            }
        }
        for i in (0..n).rev() {
            let stop = if i == 0 { 0x80 } else { 0 };
            out.push(groups[i] | stop);
        }
    }

    fn put_int(out: &mut Vec<u8>, value: i64) {
        put_nat(out, ((value << 1) ^ (value >> 63)) as u64);
    }

    #[test]
    fn nat_round_trip() {
        let values = [0u64, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64];
        let mut bytes = Vec::new();
        for &v in &values {
            put_nat(&mut bytes, v);
        }
        let mut cursor = TastyCursor::new(&bytes);
        for &v in &values {
            assert_eq!(cursor.read_long_nat().unwrap(), v);
        }
        assert!(cursor.is_at_end());
    }

    #[test]
    fn int_zig_zag_round_trip() {
        let values = [0i64, -1, 1, -64, 64, -300, 300, i32::MIN as i64, i32::MAX as i64];
        let mut bytes = Vec::new();
        for &v in &values {
            put_int(&mut bytes, v);
        }
        let mut cursor = TastyCursor::new(&bytes);
        for &v in &values {
            assert_eq!(cursor.read_long_int().unwrap(), v);
        }
    }

    #[test]
    fn end_is_absolute() {
        let mut bytes = Vec::new();
        put_nat(&mut bytes, 5);
        bytes.extend_from_slice(&[1, 2, 3, 4, 5]);
        let mut cursor = TastyCursor::new(&bytes);
        let end = cursor.read_end().unwrap();
        assert_eq!(end, Addr::new(bytes.len() as u32));
    }

    #[test]
    fn fork_is_independent() {
        let bytes = [0x81u8, 0x82, 0x83];
        let mut cursor = TastyCursor::new(&bytes);
        let mut fork = cursor.fork();
        cursor.read_byte().unwrap();
        assert_eq!(fork.current_addr(), Addr::new(0));
        fork.read_byte().unwrap();
        fork.read_byte().unwrap();
        assert_eq!(cursor.current_addr(), Addr::new(1));
    }

    #[test]
    fn sub_reader_clamps_end() {
        let bytes = [0x81u8, 0x82, 0x83, 0x84];
        let cursor = TastyCursor::new(&bytes);
        let mut sub = cursor.sub_reader(Addr::new(1), Addr::new(3));
        assert_eq!(sub.read_byte().unwrap(), 0x82);
        assert_eq!(sub.read_byte().unwrap(), 0x83);
        assert!(sub.is_at_end());
        assert!(sub.read_byte().is_err());
    }

    #[test]
    fn skip_tree_by_category() {
        // TRUEconst | LAZY | INTconst 7 | THIS TYPEREFdirect 3 | TEMPLATE <len 2> ..
        let mut bytes = vec![TastyTag::TrueConst as u8, TastyTag::Lazy as u8];
        bytes.push(TastyTag::IntConst as u8);
        put_int(&mut bytes, 7);
        bytes.push(TastyTag::This as u8);
        bytes.push(TastyTag::TypeRefDirect as u8);
        put_nat(&mut bytes, 3);
        bytes.push(TastyTag::Template as u8);
        put_nat(&mut bytes, 2);
        bytes.extend_from_slice(&[0xaa, 0xbb]);

        let mut cursor = TastyCursor::new(&bytes);
        for _ in 0..5 {
            cursor.skip_tree().unwrap();
        }
        assert!(cursor.is_at_end());
    }

    #[test]
    fn truncated_read_is_an_error() {
        let mut cursor = TastyCursor::new(&[0x00]);
        // continuation byte with no stop bit ever arriving
        assert!(cursor.read_long_nat().is_err());
    }

    #[test]
    fn peek_unshared_follows_indirection() {
        // SHAREDtype -> addr 3 ; filler ; TRUEconst at addr 3
        let mut bytes = vec![TastyTag::SharedType as u8];
        put_nat(&mut bytes, 3);
        bytes.push(0); // filler so that addr 3 is the TRUEconst below
        bytes.push(TastyTag::TrueConst as u8);
        let cursor = TastyCursor::new(&bytes);
        assert_eq!(cursor.peek_unshared_tag().unwrap(), TastyTag::TrueConst);
    }
}
