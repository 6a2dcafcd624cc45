//! Bounded, seekable reader over an in-memory byte region.
//!
//! Every decoder in this crate reads through a [`ByteCursor`]. Chunk payloads get
//! their own cursor, so a bad size field inside one chunk can never read bytes
//! belonging to its neighbours: the read fails with [`CursorError::TruncatedData`]
//! instead.

use thiserror::Error;
use winnow::Parser;
use winnow::binary::{
    be_f32, be_i16, be_i32, be_u16, be_u32, le_f32, le_i16, le_i32, le_u8, le_u16, le_u32,
};
use winnow::combinator::repeat;
use winnow::error::{ContextError, ErrMode};

use crate::data::parser_utils::null_terminated_lossy;

/// Errors raised by [`ByteCursor`] reads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("truncated data: need {need} bytes at offset 0x{offset:X}, have {have}")]
    TruncatedData {
        offset: usize,
        need: usize,
        have: usize,
    },
    #[error("{len} bytes is not a whole number of {stride}-byte records")]
    UnevenRecords { len: usize, stride: usize },
    #[error("record parser does not fit its {stride}-byte stride at offset 0x{offset:X}")]
    MalformedRecord { offset: usize, stride: usize },
}

/// Byte order used for scalar reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Sequential/random-access reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> ByteCursor<'a> {
    /// Create a little-endian cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            order: ByteOrder::Little,
        }
    }

    /// Total length of the underlying region.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current position, relative to the start of the region.
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Number of bytes left between the current position and the end.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// "More data available" predicate driving the top-level decode loops.
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// The whole underlying region, independent of the current position.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The unread part of the region.
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn seek(&mut self, pos: usize) -> Result<(), CursorError> {
        if pos > self.data.len() {
            return Err(CursorError::TruncatedData {
                offset: self.data.len(),
                need: pos - self.data.len(),
                have: 0,
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), CursorError> {
        self.ensure(count)?;
        self.pos += count;
        Ok(())
    }

    /// Advance to the next multiple of `modulus`, measured from the start of the region.
    ///
    /// A no-op when already aligned or when `modulus <= 1`. Files do not always
    /// carry the padding after their final chunk, so the position is clamped to
    /// the end of the region.
    pub fn align(&mut self, modulus: usize) {
        if modulus <= 1 {
            return;
        }
        let rem = self.pos % modulus;
        if rem != 0 {
            self.pos = (self.pos + modulus - rem).min(self.data.len());
        }
    }

    fn truncated(&self, need: usize) -> CursorError {
        CursorError::TruncatedData {
            offset: self.pos,
            need,
            have: self.remaining(),
        }
    }

    fn malformed(&self, stride: usize) -> CursorError {
        CursorError::MalformedRecord {
            offset: self.pos,
            stride,
        }
    }

    fn ensure(&self, need: usize) -> Result<(), CursorError> {
        if self.remaining() < need {
            return Err(self.truncated(need));
        }
        Ok(())
    }

    /// Decode one fixed-size record of `need` bytes with a winnow parser.
    ///
    /// Bytes the parser leaves unread are still skipped. A parser that needs more
    /// than `need` bytes fails with [`CursorError::MalformedRecord`].
    pub fn read_record<O, P>(&mut self, need: usize, mut parser: P) -> Result<O, CursorError>
    where
        P: Parser<&'a [u8], O, ErrMode<ContextError>>,
    {
        self.ensure(need)?;
        let data = self.data;
        let mut input = &data[self.pos..self.pos + need];
        let value = parser
            .parse_next(&mut input)
            .map_err(|_: ErrMode<ContextError>| self.malformed(need))?;
        self.pos += need;
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        self.read_record(1, le_u8)
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        match self.order {
            ByteOrder::Little => self.read_record(2, le_u16),
            ByteOrder::Big => self.read_record(2, be_u16),
        }
    }

    pub fn read_i16(&mut self) -> Result<i16, CursorError> {
        match self.order {
            ByteOrder::Little => self.read_record(2, le_i16),
            ByteOrder::Big => self.read_record(2, be_i16),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        match self.order {
            ByteOrder::Little => self.read_record(4, le_u32),
            ByteOrder::Big => self.read_record(4, be_u32),
        }
    }

    pub fn read_i32(&mut self) -> Result<i32, CursorError> {
        match self.order {
            ByteOrder::Little => self.read_record(4, le_i32),
            ByteOrder::Big => self.read_record(4, be_i32),
        }
    }

    pub fn read_f32(&mut self) -> Result<f32, CursorError> {
        match self.order {
            ByteOrder::Little => self.read_record(4, le_f32),
            ByteOrder::Big => self.read_record(4, be_f32),
        }
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], CursorError> {
        self.ensure(count)?;
        let data = self.data;
        let bytes = &data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    /// Split off the next `count` bytes as an independent cursor with the same byte order.
    pub fn sub_cursor(&mut self, count: usize) -> Result<ByteCursor<'a>, CursorError> {
        let order = self.order;
        let bytes = self.read_bytes(count)?;
        Ok(ByteCursor {
            data: bytes,
            pos: 0,
            order,
        })
    }

    /// Read a fixed-width ASCII field. The value ends at the first NUL byte.
    pub fn read_fixed_ascii(&mut self, count: usize) -> Result<String, CursorError> {
        self.read_bytes(count).map(null_terminated_lossy)
    }

    /// Read the next 4 bytes verbatim.
    pub fn read_tag(&mut self) -> Result<[u8; 4], CursorError> {
        let bytes = self.read_bytes(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Decode `count` fixed-size records of `stride` bytes each.
    ///
    /// Record parsers are little-endian winnow parsers; the cursor's byte order
    /// does not apply to them.
    pub fn read_records<T, P>(
        &mut self,
        count: usize,
        stride: usize,
        parser: P,
    ) -> Result<Vec<T>, CursorError>
    where
        P: Parser<&'a [u8], T, ErrMode<ContextError>>,
    {
        let need = count.saturating_mul(stride);
        self.ensure(need)?;
        let data = self.data;
        let mut region = &data[self.pos..self.pos + need];
        let records: Vec<T> = repeat(count, parser)
            .parse_next(&mut region)
            .map_err(|_: ErrMode<ContextError>| self.malformed(stride))?;
        self.pos += need;
        Ok(records)
    }

    /// Reinterpret everything that is left as an array of `stride`-byte records.
    pub fn read_remaining_records<T, P>(
        &mut self,
        stride: usize,
        parser: P,
    ) -> Result<Vec<T>, CursorError>
    where
        P: Parser<&'a [u8], T, ErrMode<ContextError>>,
    {
        let len = self.remaining();
        if stride == 0 || len % stride != 0 {
            return Err(CursorError::UnevenRecords { len, stride });
        }
        self.read_records(len / stride, stride, parser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_scalars_in_both_orders() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u32().unwrap(), 0x04030201);
        cursor.set_byte_order(ByteOrder::Big);
        assert_eq!(cursor.read_u32().unwrap(), 0x01020304);
        assert!(!cursor.has_remaining());
    }

    #[test]
    fn truncated_read_does_not_advance() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(1).unwrap();
        let err = cursor.read_u32().unwrap_err();
        assert_eq!(
            err,
            CursorError::TruncatedData {
                offset: 1,
                need: 4,
                have: 2
            }
        );
        assert_eq!(cursor.tell(), 1);
        assert_eq!(cursor.read_u16().unwrap(), 0xCCBB);
    }

    #[test]
    fn align_is_relative_to_region_start() {
        let data = [0u8; 10];
        let mut cursor = ByteCursor::new(&data);
        cursor.align(4);
        assert_eq!(cursor.tell(), 0);

        cursor.skip(1).unwrap();
        cursor.align(4);
        assert_eq!(cursor.tell(), 4);

        cursor.align(1);
        cursor.align(0);
        assert_eq!(cursor.tell(), 4);

        // Missing trailing padding clamps to the end.
        cursor.skip(5).unwrap();
        cursor.align(8);
        assert_eq!(cursor.tell(), 10);
        assert!(!cursor.has_remaining());
    }

    #[test]
    fn fixed_ascii_trims_at_nul() {
        let data = *b"root\0\0\0\0Bip01\0xx";
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_fixed_ascii(8).unwrap(), "root");
        assert_eq!(cursor.read_fixed_ascii(8).unwrap(), "Bip01");
    }

    #[test]
    fn sub_cursor_is_bounded() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut cursor = ByteCursor::new(&data);
        let mut sub = cursor.sub_cursor(2).unwrap();
        assert_eq!(cursor.tell(), 2);
        assert_eq!(sub.read_u8().unwrap(), 1);
        assert_eq!(sub.read_u8().unwrap(), 2);
        assert_eq!(
            sub.read_u8().unwrap_err(),
            CursorError::TruncatedData {
                offset: 2,
                need: 1,
                have: 0
            }
        );
    }

    #[test]
    fn seek_past_end_fails() {
        let data = [0u8; 4];
        let mut cursor = ByteCursor::new(&data);
        cursor.seek(4).unwrap();
        assert!(cursor.seek(5).is_err());
        assert_eq!(cursor.tell(), 4);
    }

    #[test]
    fn remaining_records_require_whole_strides() {
        let data = [1u8, 0, 2, 0, 3];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(
            cursor.read_remaining_records(2, le_u16).unwrap_err(),
            CursorError::UnevenRecords { len: 5, stride: 2 }
        );

        let mut cursor = ByteCursor::new(&data[..4]);
        let values: Vec<u16> = cursor.read_remaining_records(2, le_u16).unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn parser_wider_than_stride_is_malformed() {
        let data = [1u8, 0, 2, 0];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(
            cursor.read_records(2, 2, le_u32).unwrap_err(),
            CursorError::MalformedRecord {
                offset: 0,
                stride: 2
            }
        );
        assert_eq!(cursor.tell(), 0);

        cursor.skip(2).unwrap();
        assert_eq!(
            cursor.read_record(2, le_u32).unwrap_err(),
            CursorError::MalformedRecord {
                offset: 2,
                stride: 2
            }
        );
        assert_eq!(cursor.tell(), 2);
        assert_eq!(cursor.read_u16().unwrap(), 2);
    }
}
