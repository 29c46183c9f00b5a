//! Byte substitution and reversible header redaction.
//!
//! All operations return new buffers; inputs are never modified.

use log::trace;
use serde::Serialize;

use crate::constants::{HASH_SIZE, MERKLE_ROOT_OFFSET, PREV_BLOCK_HASH_OFFSET};
use crate::error::RedactError;
use crate::hash::{double_sha256, hash_to_display_hex};
use crate::header::BlockHeader;

/// What to write over a span of bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement<'a> {
    Bytes(&'a [u8]),
    Zeros(usize),
}

impl Replacement<'_> {
    pub fn len(&self) -> usize {
        match self {
            Replacement::Bytes(bytes) => bytes.len(),
            Replacement::Zeros(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write_into(&self, target: &mut [u8]) {
        match self {
            Replacement::Bytes(bytes) => target.copy_from_slice(bytes),
            Replacement::Zeros(_) => target.fill(0),
        }
    }
}

/// Replace every non-overlapping occurrence of `needle`, scanning left to
/// right. Without a replacement, matches are zeroed.
pub fn replace_found_bytes(
    buffer: &[u8],
    needle: &[u8],
    replacement: Option<&[u8]>,
) -> Result<Vec<u8>, RedactError> {
    if needle.is_empty() {
        return Err(RedactError::EmptyNeedle);
    }
    if needle.len() > buffer.len() {
        return Err(RedactError::NeedleTooLong {
            needle: needle.len(),
            haystack: buffer.len(),
        });
    }
    let replacement = match replacement {
        Some(bytes) if bytes.len() != needle.len() => {
            return Err(RedactError::LengthMismatch {
                needle: needle.len(),
                replacement: bytes.len(),
            })
        }
        Some(bytes) => Replacement::Bytes(bytes),
        None => Replacement::Zeros(needle.len()),
    };

    let mut output = buffer.to_vec();
    let mut pos = 0;
    let mut matches = 0usize;
    while pos + needle.len() <= buffer.len() {
        if &buffer[pos..pos + needle.len()] == needle {
            replacement.write_into(&mut output[pos..pos + needle.len()]);
            pos += needle.len();
            matches += 1;
        } else {
            pos += 1;
        }
    }
    trace!("replaced {} occurrence(s) of {} bytes", matches, needle.len());
    Ok(output)
}

/// Overwrite `replacement.len()` bytes starting at `offset`.
pub fn replace_at_offset(
    buffer: &[u8],
    offset: usize,
    replacement: Replacement<'_>,
) -> Result<Vec<u8>, RedactError> {
    let mut output = buffer.to_vec();
    overwrite(&mut output, offset, &replacement)?;
    Ok(output)
}

fn overwrite(buffer: &mut [u8], offset: usize, replacement: &Replacement<'_>) -> Result<(), RedactError> {
    let len = replacement.len();
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= buffer.len())
        .ok_or(RedactError::OutOfBounds {
            offset,
            len,
            size: buffer.len(),
        })?;
    replacement.write_into(&mut buffer[offset..end]);
    Ok(())
}

/// A 32-byte header field that can be redacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HeaderField {
    PrevBlockHash,
    MerkleRoot,
}

impl HeaderField {
    pub fn offset(self) -> usize {
        match self {
            HeaderField::PrevBlockHash => PREV_BLOCK_HASH_OFFSET,
            HeaderField::MerkleRoot => MERKLE_ROOT_OFFSET,
        }
    }

    /// The field's bytes in `header`, internal order.
    pub fn value(self, header: &BlockHeader) -> [u8; 32] {
        match self {
            HeaderField::PrevBlockHash => header.prev_block_hash(),
            HeaderField::MerkleRoot => header.merkle_root(),
        }
    }
}

/// One applied redaction: where it happened and what was there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    pub field: HeaderField,
    pub offset: usize,
    pub original: [u8; 32],
}

/// A header with fields zeroed, plus what is needed to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedHeader {
    bytes: [u8; 80],
    redactions: Vec<Redaction>,
}

impl RedactedHeader {
    /// Zero each field at its fixed offset, in the order given.
    pub fn redact(header: &BlockHeader, fields: &[HeaderField]) -> Result<Self, RedactError> {
        let mut bytes = header.to_bytes();
        let mut redactions = Vec::with_capacity(fields.len());
        for &field in fields {
            overwrite(&mut bytes, field.offset(), &Replacement::Zeros(HASH_SIZE))?;
            redactions.push(Redaction {
                field,
                offset: field.offset(),
                original: field.value(header),
            });
        }
        Ok(RedactedHeader { bytes, redactions })
    }

    /// Zero each field by searching the header for the field's value.
    ///
    /// Any other occurrence of the same 32 bytes is zeroed too; use
    /// [`RedactedHeader::verify_restores`] to confirm the result is reversible.
    pub fn redact_by_value(
        header: &BlockHeader,
        fields: &[HeaderField],
    ) -> Result<Self, RedactError> {
        let mut bytes = header.to_bytes();
        let mut redactions = Vec::with_capacity(fields.len());
        for &field in fields {
            let original = field.value(header);
            let replaced = replace_found_bytes(&bytes, &original, None)?;
            bytes.copy_from_slice(&replaced);
            redactions.push(Redaction {
                field,
                offset: field.offset(),
                original,
            });
        }
        Ok(RedactedHeader { bytes, redactions })
    }

    pub fn as_bytes(&self) -> &[u8; 80] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Double hash of the redacted bytes (internal order).
    pub fn hash(&self) -> [u8; 32] {
        double_sha256(&self.bytes)
    }

    pub fn hash_hex(&self) -> String {
        hash_to_display_hex(&self.hash())
    }

    pub fn redactions(&self) -> &[Redaction] {
        &self.redactions
    }

    /// Write the recorded originals back at their offsets, last redaction
    /// first.
    pub fn restore(&self) -> Result<[u8; 80], RedactError> {
        let mut bytes = self.bytes;
        for redaction in self.redactions.iter().rev() {
            overwrite(
                &mut bytes,
                redaction.offset,
                &Replacement::Bytes(&redaction.original),
            )?;
        }
        Ok(bytes)
    }

    /// Whether restoring yields exactly `header`, and the redaction
    /// actually changed the hash.
    pub fn verify_restores(&self, header: &BlockHeader) -> bool {
        match self.restore() {
            Ok(bytes) => {
                bytes == header.to_bytes()
                    && double_sha256(&bytes) == header.hash()
                    && self.hash() != header.hash()
            }
            Err(_) => false,
        }
    }
}
