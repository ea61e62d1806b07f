//! Per-token byte offsets of full-text fields.
//!
//! Every indexed full-text field registers a range of token positions; the
//! start offset of every token is appended to one shared, varint-encoded
//! vector. Position `p` of the document maps to entry `p - 1`.
//!
//! Committed tables are kept in their serialized form: the field count and
//! every field range, then the offsets, all as varints except the
//! little-endian `u16` field ids.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, XiphosError};
use crate::util::varint::{VarintVector, read_u32, write_u32};

/// Token position range of one text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteOffsetField {
    /// Text field id.
    pub field_id: u16,
    /// First token position of the field.
    pub first_tok_pos: u32,
    /// Last token position of the field.
    pub last_tok_pos: u32,
}

/// Byte offset table of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteOffsets {
    fields: Vec<ByteOffsetField>,
    offsets: VarintVector,
}

impl ByteOffsets {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve room for `n` more fields.
    pub fn reserve_fields(&mut self, n: usize) {
        self.fields.reserve(n);
    }

    /// Start a field whose first token will get position `first_tok_pos`.
    ///
    /// Returns the slot to close with [`finish_field`](Self::finish_field).
    pub fn add_field(&mut self, field_id: u16, first_tok_pos: u32) -> usize {
        self.fields.push(ByteOffsetField {
            field_id,
            first_tok_pos,
            last_tok_pos: first_tok_pos.saturating_sub(1),
        });
        self.fields.len() - 1
    }

    /// Record the last token position of a field.
    pub fn finish_field(&mut self, slot: usize, last_tok_pos: u32) {
        if let Some(field) = self.fields.get_mut(slot) {
            field.last_tok_pos = last_tok_pos;
        }
    }

    /// Append the start offset of the next token.
    pub fn record(&mut self, start_offset: u32) {
        self.offsets.push(start_offset);
    }

    /// Registered fields.
    pub fn fields(&self) -> &[ByteOffsetField] {
        &self.fields
    }

    /// Number of recorded offsets.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Encoded offsets.
    pub fn offsets(&self) -> &VarintVector {
        &self.offsets
    }

    /// Field range containing a token position.
    pub fn field_for_position(&self, position: u32) -> Option<&ByteOffsetField> {
        self.fields
            .iter()
            .find(|f| f.first_tok_pos <= position && position <= f.last_tok_pos)
    }

    /// Serialize the table. Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = write_u32(writer, count_u32(self.fields.len())?)?;
        for field in &self.fields {
            writer.write_u16::<LittleEndian>(field.field_id)?;
            written += 2;
            written += write_u32(writer, field.first_tok_pos)?;
            written += write_u32(writer, field.last_tok_pos)?;
        }

        written += write_u32(writer, count_u32(self.offsets.len())?)?;
        writer.write_all(self.offsets.as_bytes())?;
        Ok(written + self.offsets.byte_len())
    }

    /// Read a table written by [`write_to`](Self::write_to).
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let num_fields = read_u32(reader)? as usize;
        let mut fields = Vec::with_capacity(num_fields);
        for _ in 0..num_fields {
            fields.push(ByteOffsetField {
                field_id: reader.read_u16::<LittleEndian>()?,
                first_tok_pos: read_u32(reader)?,
                last_tok_pos: read_u32(reader)?,
            });
        }

        let num_offsets = read_u32(reader)?;
        let mut offsets = VarintVector::new();
        for _ in 0..num_offsets {
            offsets.push(read_u32(reader)?);
        }
        Ok(ByteOffsets { fields, offsets })
    }
}

fn count_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| XiphosError::internal(format!("Too many byte offset entries: {n}")))
}
