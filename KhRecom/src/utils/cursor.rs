//! Positioned little-endian reader over an in-memory buffer.
//!
//! All positions handed to [`ByteCursor::seek`] and returned by
//! [`ByteCursor::tell`] are relative to a movable base offset, so an optional
//! platform preamble can be skipped once without touching the offset
//! arithmetic of the parsers built on top.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Bounds-checked little-endian reader with an adjustable base offset.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    /// Absolute position in `data`.
    pos: usize,
    /// Absolute offset that relative positions are measured from.
    base: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at offset 0 with no base offset.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    /// The whole underlying buffer, preamble included.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Total buffer length, preamble included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Length of the buffer as seen from the base offset.
    pub fn relative_len(&self) -> usize {
        self.data.len().saturating_sub(self.base)
    }

    /// Current base offset (absolute).
    pub fn base(&self) -> usize {
        self.base
    }

    /// Move the base offset to an absolute position.
    pub fn set_base(&mut self, base: usize) {
        self.base = base;
    }

    /// Seek to `offset`, relative to the base offset.
    ///
    /// Seeking past the end is allowed; the next read fails instead.
    pub fn seek(&mut self, offset: usize) {
        self.pos = self.base.saturating_add(offset);
    }

    /// Current position, relative to the base offset.
    pub fn tell(&self) -> usize {
        self.pos.saturating_sub(self.base)
    }

    /// Current absolute position in the buffer.
    pub fn absolute_position(&self) -> usize {
        self.pos
    }

    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.data.len().saturating_sub(self.pos);
        if n > available {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                wanted: n,
                available,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read `n` raw bytes.
    pub fn read_u8s(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16s(&mut self, n: usize) -> Result<Vec<i16>> {
        let bytes = self.take(n * 2)?;
        let mut out = vec![0i16; n];
        LittleEndian::read_i16_into(bytes, &mut out);
        Ok(out)
    }

    pub fn read_u16s(&mut self, n: usize) -> Result<Vec<u16>> {
        let bytes = self.take(n * 2)?;
        let mut out = vec![0u16; n];
        LittleEndian::read_u16_into(bytes, &mut out);
        Ok(out)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32s(&mut self, n: usize) -> Result<Vec<i32>> {
        let bytes = self.take(n * 4)?;
        let mut out = vec![0i32; n];
        LittleEndian::read_i32_into(bytes, &mut out);
        Ok(out)
    }

    pub fn read_u32s(&mut self, n: usize) -> Result<Vec<u32>> {
        let bytes = self.take(n * 4)?;
        let mut out = vec![0u32; n];
        LittleEndian::read_u32_into(bytes, &mut out);
        Ok(out)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_f32s(&mut self, n: usize) -> Result<Vec<f32>> {
        let bytes = self.take(n * 4)?;
        let mut out = vec![0f32; n];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    /// Read exactly `N` floats into an array.
    pub fn read_f32_array<const N: usize>(&mut self) -> Result<[f32; N]> {
        let bytes = self.take(N * 4)?;
        let mut out = [0f32; N];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    /// Read a fixed-width field of `max_len` bytes and return the text up to
    /// the first NUL.
    ///
    /// The cursor always advances by `max_len`. Non-ASCII content is an
    /// [`Error::InvalidString`].
    pub fn read_string(&mut self, max_len: usize) -> Result<String> {
        let offset = self.pos;
        let field = self.take(max_len)?;
        let text = field.split(|&b| b == 0).next().unwrap_or_default();
        if !text.is_ascii() {
            return Err(Error::InvalidString { offset });
        }
        Ok(text.iter().map(|&b| char::from(b)).collect())
    }
}
