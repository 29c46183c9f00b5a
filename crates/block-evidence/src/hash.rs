//! SHA256 double-hashing and hash display conversions.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::constants::HASH_SIZE;
use crate::error::WireError;

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
///
/// This is used for block header hashing, transaction IDs, and merkle trees.
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Reverse the byte order of a 32-byte array.
///
/// Bitcoin displays hashes in reverse byte order (little-endian display).
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(reverse_bytes(hash))
}

/// Parse a display-format hash (reversed hex) into internal byte order.
///
/// A leading `0x` is accepted, and 63 digits are read as if a zero had
/// been dropped from the front.
pub fn display_hex_to_hash(s: &str) -> Result<[u8; 32], WireError> {
    let mut hash = parse_hash_bytes(s)?;
    hash.reverse();
    Ok(hash)
}

/// Parse hex holding a hash already in internal byte order.
pub fn internal_hex_to_hash(s: &str) -> Result<[u8; 32], WireError> {
    parse_hash_bytes(s)
}

fn parse_hash_bytes(s: &str) -> Result<[u8; 32], WireError> {
    let bytes = decode_hex(s)?;
    if bytes.len() != HASH_SIZE {
        return Err(WireError::InvalidLength {
            field: "hash",
            expected: HASH_SIZE,
            found: bytes.len(),
        });
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Decode hex, tolerating a `0x` prefix and an odd digit count.
///
/// An odd-length string is read with an implied leading zero, so
/// `"abc"` decodes to `[0x0a, 0xbc]`.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, WireError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.len() % 2 == 1 {
        let mut padded = String::with_capacity(digits.len() + 1);
        padded.push('0');
        padded.push_str(digits);
        Ok(hex::decode(padded)?)
    } else {
        Ok(hex::decode(digits)?)
    }
}

/// Numeric value of a hash for target comparison.
///
/// The displayed hex is the big-endian form, so the internal bytes are
/// read little-endian.
pub fn hash_to_uint(hash: &[u8; 32]) -> BigUint {
    BigUint::from_bytes_le(hash)
}
