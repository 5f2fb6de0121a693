//! Big-endian byte primitives used by every encoder in this crate.

use bytes::{BufMut, Bytes, BytesMut};

use crate::wire::WireError;

/// Append-only big-endian writer over a growable buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteWriter {
    buf: BytesMut,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Start from a copy of existing bytes.
    pub fn from_slice(existing: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(existing),
        }
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16(value);
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32(value);
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.put_u64(value);
        self
    }

    pub fn put_u128(&mut self, value: u128) -> &mut Self {
        self.buf.put_u128(value);
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.buf.put_u8(u8::from(value));
        self
    }

    pub fn put_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.buf.put_slice(value);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Offset-based big-endian reads that report truncation instead of panicking.
pub trait ByteReader {
    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], WireError>;

    fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(offset, N)?);
        Ok(out)
    }

    fn read_u8(&self, offset: usize) -> Result<u8, WireError> {
        Ok(self.read_slice(offset, 1)?[0])
    }

    fn read_u16(&self, offset: usize) -> Result<u16, WireError> {
        self.read_array(offset).map(u16::from_be_bytes)
    }

    fn read_u32(&self, offset: usize) -> Result<u32, WireError> {
        self.read_array(offset).map(u32::from_be_bytes)
    }

    fn read_u64(&self, offset: usize) -> Result<u64, WireError> {
        self.read_array(offset).map(u64::from_be_bytes)
    }

    fn read_u128(&self, offset: usize) -> Result<u128, WireError> {
        self.read_array(offset).map(u128::from_be_bytes)
    }
}

impl ByteReader for [u8] {
    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], WireError> {
        offset
            .checked_add(len)
            .and_then(|end| self.get(offset..end))
            .ok_or(WireError::Truncated {
                offset,
                need: len,
                have: self.len().saturating_sub(offset),
            })
    }
}
