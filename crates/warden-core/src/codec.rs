// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Minimal deterministic codec helpers (length-prefixed, LE scalars).
use thiserror::Error;

/// Errors produced by codec readers and writers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Attempted to read beyond the end of the buffer.
    #[error("buffer too short")]
    OutOfBounds,
    /// UTF-8 decoding failed.
    #[error("invalid utf-8")]
    InvalidUtf8,
    /// Length prefix exceeded max bound.
    #[error("length too large")]
    LengthTooLarge,
}

/// Deterministic writer for little-endian scalars and length-prefixed bytes.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create a new writer with a pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a little-endian u32.
    pub fn write_u32_le(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian u128.
    pub fn write_u128_le(&mut self, value: u128) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write length-prefixed bytes (u32 LE length).
    ///
    /// # Errors
    /// [`CodecError::LengthTooLarge`] if `bytes` exceeds `u32::MAX` bytes.
    pub fn write_len_prefixed_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let len: u32 = bytes
            .len()
            .try_into()
            .map_err(|_| CodecError::LengthTooLarge)?;
        self.write_u32_le(len);
        self.write_bytes(bytes);
        Ok(())
    }

    /// Consume the writer and return the buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Deterministic reader for little-endian scalars and length-prefixed bytes.
#[derive(Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over the provided byte slice.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(CodecError::OutOfBounds)?;
        if end > self.bytes.len() {
            return Err(CodecError::OutOfBounds);
        }
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    /// Read a single byte.
    ///
    /// # Errors
    /// [`CodecError::OutOfBounds`] if the buffer is too short.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let chunk = self.take(1)?;
        Ok(chunk[0])
    }

    /// Read a little-endian u32.
    ///
    /// # Errors
    /// [`CodecError::OutOfBounds`] if the buffer is too short.
    pub fn read_u32_le(&mut self) -> Result<u32, CodecError> {
        let chunk = self.take(4)?;
        let raw: [u8; 4] = chunk.try_into().map_err(|_| CodecError::OutOfBounds)?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Read a little-endian u128.
    ///
    /// # Errors
    /// [`CodecError::OutOfBounds`] if the buffer is too short.
    pub fn read_u128_le(&mut self) -> Result<u128, CodecError> {
        let chunk = self.take(16)?;
        let raw: [u8; 16] = chunk.try_into().map_err(|_| CodecError::OutOfBounds)?;
        Ok(u128::from_le_bytes(raw))
    }

    /// Read a fixed 32-byte word.
    ///
    /// # Errors
    /// [`CodecError::OutOfBounds`] if the buffer is too short.
    pub fn read_word(&mut self) -> Result<[u8; 32], CodecError> {
        let chunk = self.take(32)?;
        chunk.try_into().map_err(|_| CodecError::OutOfBounds)
    }

    /// Read a length-prefixed byte slice with a max bound.
    ///
    /// # Errors
    /// [`CodecError::OutOfBounds`] if the buffer is too short;
    /// [`CodecError::LengthTooLarge`] if the prefix exceeds `max_len`.
    pub fn read_len_prefixed_bytes(&mut self, max_len: usize) -> Result<&'a [u8], CodecError> {
        let len = self.read_u32_le()? as usize;
        if len > max_len {
            return Err(CodecError::LengthTooLarge);
        }
        self.take(len)
    }

    /// Read a length-prefixed UTF-8 string of at most `max_len` bytes.
    ///
    /// # Errors
    /// As [`Reader::read_len_prefixed_bytes`], plus
    /// [`CodecError::InvalidUtf8`].
    pub fn read_string(&mut self, max_len: usize) -> Result<String, CodecError> {
        let raw = self.read_len_prefixed_bytes(max_len)?;
        core::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_rejects_truncated_word() {
        let mut r = Reader::new(&[0u8; 31]);
        assert_eq!(r.read_word(), Err(CodecError::OutOfBounds));
    }

    #[test]
    fn len_prefix_respects_bound() {
        let mut w = Writer::default();
        assert!(w.write_len_prefixed_bytes(b"hello").is_ok());
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_len_prefixed_bytes(4), Err(CodecError::LengthTooLarge));
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_len_prefixed_bytes(5), Ok(&b"hello"[..]));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn read_string_rejects_invalid_utf8() {
        let mut w = Writer::default();
        assert!(w.write_len_prefixed_bytes(&[0xff, 0xfe]).is_ok());
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_string(16), Err(CodecError::InvalidUtf8));
    }
}
