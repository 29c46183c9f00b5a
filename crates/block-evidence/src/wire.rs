//! Bitcoin varints and a bounds-checked reader over serialized bytes.

use crate::error::WireError;

/// Longest varint encoding: marker byte plus a u64.
pub const MAX_VARINT_LEN: usize = 9;

/// Encode a variable-length integer (Bitcoin varint), always in its
/// shortest form.
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Encode a varint into a fresh buffer.
pub fn varint_bytes(value: u64) -> Vec<u8> {
    let mut output = Vec::with_capacity(varint_len(value));
    encode_varint(value, &mut output);
    output
}

/// Number of bytes the shortest encoding of `value` takes.
pub fn varint_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => MAX_VARINT_LEN,
    }
}

/// Decode a varint from the start of `data`.
///
/// Returns the number of bytes consumed and the value. Non-minimal
/// encodings are accepted and report their actual length.
pub fn decode_varint(data: &[u8]) -> Result<(usize, u64), WireError> {
    let mut reader = Reader::new(data);
    let (raw, value) = reader.varint("varint")?;
    Ok((raw.len(), value))
}

/// Cursor over a byte slice that reports the field and offset of any
/// short read.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes between `start` and the current position.
    pub fn since(&self, start: usize) -> &'a [u8] {
        &self.data[start.min(self.pos)..self.pos]
    }

    /// Look at the next `n` bytes without consuming them.
    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos.checked_add(n)?)
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], WireError> {
        match self.peek(n) {
            Some(bytes) => {
                self.pos += n;
                Ok(bytes)
            }
            None => Err(WireError::Truncated {
                field,
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            }),
        }
    }

    /// Consume a length given as a u64, typically a varint prefix.
    pub fn take_len(&mut self, len: u64, field: &'static str) -> Result<&'a [u8], WireError> {
        let n = usize::try_from(len).unwrap_or(usize::MAX);
        self.take(n, field)
    }

    pub fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], WireError> {
        let bytes = self.take(N, field)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8, WireError> {
        Ok(self.array::<1>(field)?[0])
    }

    pub fn u16_le(&mut self, field: &'static str) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.array(field)?))
    }

    pub fn u32_le(&mut self, field: &'static str) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.array(field)?))
    }

    pub fn i32_le(&mut self, field: &'static str) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.array(field)?))
    }

    pub fn u64_le(&mut self, field: &'static str) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.array(field)?))
    }

    /// Read a varint, returning its raw encoding alongside the value.
    pub fn varint(&mut self, field: &'static str) -> Result<(&'a [u8], u64), WireError> {
        let start = self.pos;
        let value = match self.u8(field)? {
            0xfd => self.u16_le(field)? as u64,
            0xfe => self.u32_le(field)? as u64,
            0xff => self.u64_le(field)?,
            small => small as u64,
        };
        Ok((self.since(start), value))
    }

    /// Read a varint length followed by that many bytes.
    pub fn var_bytes(&mut self, field: &'static str) -> Result<&'a [u8], WireError> {
        let (_, len) = self.varint(field)?;
        self.take_len(len, field)
    }
}
