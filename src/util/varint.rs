//! Variable-length integer encoding utilities.
//!
//! Values are written 7 bits per byte with a continuation bit. The
//! [`VarintVector`] stores a sequence of small `u32` values, such as
//! per-token byte offsets, back to back in that encoding.

use std::io::{Read, Write};

use byteorder::ReadBytesExt;

use crate::error::{Result, XiphosError};

/// Append `value` to `buf` using variable-length encoding.
///
/// Returns the number of bytes written.
pub fn encode_u32_into(buf: &mut Vec<u8>, value: u32) -> usize {
    let start = buf.len();
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80;
        }

        buf.push(byte);

        if val == 0 {
            break;
        }
    }

    buf.len() - start
}

/// Decode a u32 value from variable-length encoding.
pub fn decode_u32(bytes: &[u8]) -> Result<(u32, usize)> {
    let mut result = 0u32;
    let mut shift = 0;
    let mut bytes_read = 0;

    for &byte in bytes {
        bytes_read += 1;

        if shift >= 32 {
            return Err(XiphosError::other("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u32) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, bytes_read));
        }

        shift += 7;
    }

    Err(XiphosError::other("Incomplete VarInt"))
}

/// Write a variable-length encoded u32 to a writer.
pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<usize> {
    let mut bytes = Vec::with_capacity(5);
    encode_u32_into(&mut bytes, value);
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

/// Read a variable-length encoded u32 from a reader.
pub fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut result = 0u32;
    let mut shift = 0;

    loop {
        let byte = reader.read_u8()?;

        if shift >= 32 {
            return Err(XiphosError::other("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u32) << shift;

        if (byte & 0x80) == 0 {
            return Ok(result);
        }

        shift += 7;
    }
}

/// Varint-encoded vector of `u32` values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarintVector {
    bytes: Vec<u8>,
    len: usize,
}

impl VarintVector {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, returning the number of bytes it took.
    pub fn push(&mut self, value: u32) -> usize {
        self.len += 1;
        encode_u32_into(&mut self.bytes, value)
    }

    /// Number of values stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the vector is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Raw encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Drop all values, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.len = 0;
    }

    /// Decode all values.
    pub fn decode(&self) -> Result<Vec<u32>> {
        let mut values = Vec::with_capacity(self.len);
        let mut pos = 0;
        while pos < self.bytes.len() {
            let (value, read) = decode_u32(&self.bytes[pos..])?;
            values.push(value);
            pos += read;
        }
        Ok(values)
    }
}
