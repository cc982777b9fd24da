//! Primitive Codec
//!
//! Reads and writes fixed-width values at explicit byte offsets.
//! All integers are little-endian. Every read is bounds-checked and
//! fails with [`CodecError::BufferTooShort`] instead of reading garbage.
//!
//! The free functions are the offset-level contract:
//! - `get_<T>(data, offset)` reads exactly `size_of::<T>()` bytes
//! - `write_<T>(buf, offset, value)` writes them and returns the new offset
//!
//! [`ByteReader`] and [`ByteWriter`] wrap a cursor around the same
//! functions so record codecs can advance field by field.

use super::pubkey::{Pubkey, PUBKEY_LEN};

/// Length prefix size for strings.
pub const STRING_PREFIX_LEN: usize = 4;

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Not enough bytes left for the requested field.
    #[error("buffer too short: need {needed} bytes at offset {offset}, have {len}")]
    BufferTooShort {
        /// Offset the read or write started at.
        offset: usize,
        /// Bytes required by the field.
        needed: usize,
        /// Total buffer length.
        len: usize,
    },

    /// String payload is not UTF-8.
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        /// Offset of the length prefix.
        offset: usize,
    },

    /// String is longer than a u32 length prefix can describe.
    #[error("string of {len} bytes exceeds the length prefix")]
    StringTooLong {
        /// Payload length.
        len: usize,
    },

    /// Instruction payload carries a discriminator no method uses.
    #[error("unknown instruction discriminator {}", hex::encode(.0))]
    UnknownInstruction([u8; 8]),

    /// Account envelope was not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

// =============================================================================
// OFFSET-LEVEL READS
// =============================================================================

#[inline]
fn span(len: usize, offset: usize, needed: usize) -> CodecResult<std::ops::Range<usize>> {
    match offset.checked_add(needed) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(CodecError::BufferTooShort { offset, needed, len }),
    }
}

/// Read a fixed-size byte array.
#[inline]
pub fn get_array<const N: usize>(data: &[u8], offset: usize) -> CodecResult<[u8; N]> {
    let range = span(data.len(), offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&data[range]);
    Ok(out)
}

/// Read a u8.
#[inline]
pub fn get_u8(data: &[u8], offset: usize) -> CodecResult<u8> {
    Ok(get_array::<1>(data, offset)?[0])
}

/// Read a boolean (any non-zero byte is `true`).
#[inline]
pub fn get_bool(data: &[u8], offset: usize) -> CodecResult<bool> {
    Ok(get_u8(data, offset)? != 0)
}

/// Read a u32 (little-endian).
#[inline]
pub fn get_u32(data: &[u8], offset: usize) -> CodecResult<u32> {
    get_array(data, offset).map(u32::from_le_bytes)
}

/// Read a u64 (little-endian).
#[inline]
pub fn get_u64(data: &[u8], offset: usize) -> CodecResult<u64> {
    get_array(data, offset).map(u64::from_le_bytes)
}

/// Read an i64 (little-endian).
#[inline]
pub fn get_i64(data: &[u8], offset: usize) -> CodecResult<i64> {
    get_array(data, offset).map(i64::from_le_bytes)
}

/// Read a 32-byte public key. Bytes are opaque, no endianness conversion.
#[inline]
pub fn get_pubkey(data: &[u8], offset: usize) -> CodecResult<Pubkey> {
    get_array::<PUBKEY_LEN>(data, offset).map(Pubkey::new)
}

/// Read a length-prefixed UTF-8 string.
///
/// Returns the value and the total bytes consumed (prefix + payload).
pub fn get_string(data: &[u8], offset: usize) -> CodecResult<(String, usize)> {
    let len = get_u32(data, offset)? as usize;
    let range = span(data.len(), offset + STRING_PREFIX_LEN, len)?;
    let value = std::str::from_utf8(&data[range])
        .map_err(|_| CodecError::InvalidUtf8 { offset })?
        .to_owned();
    Ok((value, STRING_PREFIX_LEN + len))
}

// =============================================================================
// OFFSET-LEVEL WRITES
// =============================================================================

/// Write raw bytes, returning the new offset.
#[inline]
pub fn write_bytes(buf: &mut [u8], offset: usize, bytes: &[u8]) -> CodecResult<usize> {
    let range = span(buf.len(), offset, bytes.len())?;
    let end = range.end;
    buf[range].copy_from_slice(bytes);
    Ok(end)
}

/// Write a u8.
#[inline]
pub fn write_u8(buf: &mut [u8], offset: usize, value: u8) -> CodecResult<usize> {
    write_bytes(buf, offset, &[value])
}

/// Write a boolean as a single byte.
#[inline]
pub fn write_bool(buf: &mut [u8], offset: usize, value: bool) -> CodecResult<usize> {
    write_u8(buf, offset, value as u8)
}

/// Write a u32 (little-endian).
#[inline]
pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) -> CodecResult<usize> {
    write_bytes(buf, offset, &value.to_le_bytes())
}

/// Write a u64 (little-endian).
#[inline]
pub fn write_u64(buf: &mut [u8], offset: usize, value: u64) -> CodecResult<usize> {
    write_bytes(buf, offset, &value.to_le_bytes())
}

/// Write an i64 (little-endian).
#[inline]
pub fn write_i64(buf: &mut [u8], offset: usize, value: i64) -> CodecResult<usize> {
    write_bytes(buf, offset, &value.to_le_bytes())
}

/// Write a 32-byte public key.
#[inline]
pub fn write_pubkey(buf: &mut [u8], offset: usize, value: &Pubkey) -> CodecResult<usize> {
    write_bytes(buf, offset, value.as_bytes())
}

/// Write a length-prefixed UTF-8 string.
pub fn write_string(buf: &mut [u8], offset: usize, value: &str) -> CodecResult<usize> {
    let len = u32::try_from(value.len())
        .map_err(|_| CodecError::StringTooLong { len: value.len() })?;
    // Check the whole field up front so a failed write leaves no partial prefix.
    span(buf.len(), offset, STRING_PREFIX_LEN + value.len())?;
    let offset = write_u32(buf, offset, len)?;
    write_bytes(buf, offset, value.as_bytes())
}

/// Encoded size of a length-prefixed string.
#[inline]
pub fn string_len(value: &str) -> usize {
    STRING_PREFIX_LEN + value.len()
}

// =============================================================================
// CURSORS
// =============================================================================

/// Read cursor over a flat buffer.
///
/// Fields are decoded in declaration order; each read advances the
/// offset by exactly the bytes consumed.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let value = get_array::<N>(self.data, self.offset)?;
        self.offset += N;
        Ok(value)
    }

    /// Read a u8.
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let value = get_u8(self.data, self.offset)?;
        self.offset += 1;
        Ok(value)
    }

    /// Read a boolean.
    pub fn read_bool(&mut self) -> CodecResult<bool> {
        let value = get_bool(self.data, self.offset)?;
        self.offset += 1;
        Ok(value)
    }

    /// Read a u64.
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        let value = get_u64(self.data, self.offset)?;
        self.offset += 8;
        Ok(value)
    }

    /// Read an i64.
    pub fn read_i64(&mut self) -> CodecResult<i64> {
        let value = get_i64(self.data, self.offset)?;
        self.offset += 8;
        Ok(value)
    }

    /// Read a public key.
    pub fn read_pubkey(&mut self) -> CodecResult<Pubkey> {
        let value = get_pubkey(self.data, self.offset)?;
        self.offset += PUBKEY_LEN;
        Ok(value)
    }

    /// Read a length-prefixed string.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let (value, consumed) = get_string(self.data, self.offset)?;
        self.offset += consumed;
        Ok(value)
    }
}

/// Write cursor over a fixed-capacity scratch buffer.
///
/// The buffer is allocated up front at `capacity` bytes; [`ByteWriter::finish`]
/// truncates it to the bytes actually written.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    offset: usize,
}

impl ByteWriter {
    /// Allocate a zeroed scratch buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            offset: 0,
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.offset = write_bytes(&mut self.buf, self.offset, bytes)?;
        Ok(())
    }

    /// Write a u8.
    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.offset = write_u8(&mut self.buf, self.offset, value)?;
        Ok(())
    }

    /// Write a boolean.
    pub fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.offset = write_bool(&mut self.buf, self.offset, value)?;
        Ok(())
    }

    /// Write a u64.
    pub fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.offset = write_u64(&mut self.buf, self.offset, value)?;
        Ok(())
    }

    /// Write an i64.
    pub fn write_i64(&mut self, value: i64) -> CodecResult<()> {
        self.offset = write_i64(&mut self.buf, self.offset, value)?;
        Ok(())
    }

    /// Write a public key.
    pub fn write_pubkey(&mut self, value: &Pubkey) -> CodecResult<()> {
        self.offset = write_pubkey(&mut self.buf, self.offset, value)?;
        Ok(())
    }

    /// Write a length-prefixed string.
    pub fn write_string(&mut self, value: &str) -> CodecResult<()> {
        self.offset = write_string(&mut self.buf, self.offset, value)?;
        Ok(())
    }

    /// Truncate to the written length and return the bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.truncate(self.offset);
        self.buf
    }
}
