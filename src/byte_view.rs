//! [`ByteView`]: a cheap typed view over a fetched byte range, annotated with the absolute file
//! offset its first byte corresponds to.
//!
//! All reads are little-endian; this crate only supports little-endian TIFF/BigTIFF files
//! (spec: Non-goals, big-endian support is out of scope). The one-time endianness check lives in
//! [`crate::reader::TiffReader`], which fails fast before any `ByteView` is constructed from a
//! big-endian header.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;

use crate::error::{CogTiffError, Result};

/// A buffer of bytes paired with the absolute file offset its first byte lives at.
///
/// Supports primitive reads at an *absolute* file offset rather than a position relative to the
/// buffer, so callers don't need to track the translation themselves.
#[derive(Debug, Clone)]
pub struct ByteView {
    buf: Bytes,
    source_offset: u64,
}

impl ByteView {
    pub fn new(buf: Bytes, source_offset: u64) -> Self {
        Self { buf, source_offset }
    }

    /// The absolute offset of the first byte in this view.
    pub fn source_offset(&self) -> u64 {
        self.source_offset
    }

    /// The absolute offset one past the last byte in this view.
    pub fn end_offset(&self) -> u64 {
        self.source_offset + self.buf.len() as u64
    }

    /// True iff `[abs, abs+len)` is entirely contained within this view's buffer.
    pub fn has_bytes(&self, abs: u64, len: u64) -> bool {
        abs >= self.source_offset && abs + len <= self.end_offset()
    }

    fn local(&self, abs: u64, len: u64) -> Result<std::ops::Range<usize>> {
        if !self.has_bytes(abs, len) {
            return Err(CogTiffError::General(format!(
                "byte view covering [{}, {}) does not contain [{}, {})",
                self.source_offset,
                self.end_offset(),
                abs,
                abs + len
            )));
        }
        let start = (abs - self.source_offset) as usize;
        Ok(start..start + len as usize)
    }

    /// Borrow the raw bytes at an absolute offset.
    pub fn slice(&self, abs: u64, len: u64) -> Result<Bytes> {
        let range = self.local(abs, len)?;
        Ok(self.buf.slice(range))
    }

    pub fn read_u8(&self, abs: u64) -> Result<u8> {
        let r = self.local(abs, 1)?;
        Ok(self.buf[r.start])
    }

    pub fn read_i8(&self, abs: u64) -> Result<i8> {
        let r = self.local(abs, 1)?;
        Ok(Cursor::new(&self.buf[r]).read_i8().unwrap())
    }

    pub fn read_u16(&self, abs: u64) -> Result<u16> {
        let r = self.local(abs, 2)?;
        Ok(Cursor::new(&self.buf[r]).read_u16::<LittleEndian>().unwrap())
    }

    pub fn read_i16(&self, abs: u64) -> Result<i16> {
        let r = self.local(abs, 2)?;
        Ok(Cursor::new(&self.buf[r]).read_i16::<LittleEndian>().unwrap())
    }

    pub fn read_u32(&self, abs: u64) -> Result<u32> {
        let r = self.local(abs, 4)?;
        Ok(Cursor::new(&self.buf[r]).read_u32::<LittleEndian>().unwrap())
    }

    pub fn read_i32(&self, abs: u64) -> Result<i32> {
        let r = self.local(abs, 4)?;
        Ok(Cursor::new(&self.buf[r]).read_i32::<LittleEndian>().unwrap())
    }

    pub fn read_u64(&self, abs: u64) -> Result<u64> {
        let r = self.local(abs, 8)?;
        Ok(Cursor::new(&self.buf[r]).read_u64::<LittleEndian>().unwrap())
    }

    pub fn read_i64(&self, abs: u64) -> Result<i64> {
        let r = self.local(abs, 8)?;
        Ok(Cursor::new(&self.buf[r]).read_i64::<LittleEndian>().unwrap())
    }

    pub fn read_f32(&self, abs: u64) -> Result<f32> {
        let r = self.local(abs, 4)?;
        Ok(Cursor::new(&self.buf[r]).read_f32::<LittleEndian>().unwrap())
    }

    pub fn read_f64(&self, abs: u64) -> Result<f64> {
        let r = self.local(abs, 8)?;
        Ok(Cursor::new(&self.buf[r]).read_f64::<LittleEndian>().unwrap())
    }

    /// Read an unsigned integer of variable byte `width` (1, 2, 4, or 8), the generic entry
    /// point used wherever Classic (4-byte) vs. BigTIFF (8-byte) pointer widths need to be
    /// handled transparently.
    pub fn read_uint(&self, abs: u64, width: u8) -> Result<u64> {
        match width {
            1 => Ok(self.read_u8(abs)? as u64),
            2 => Ok(self.read_u16(abs)? as u64),
            4 => Ok(self.read_u32(abs)? as u64),
            8 => self.read_u64(abs),
            other => Err(CogTiffError::General(format!(
                "unsupported integer width: {other}"
            ))),
        }
    }
}
