//! Compact "nBits" targets, difficulty ratios and proof-of-work checks.

use core::fmt;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::Serialize;

use crate::constants::DIFFICULTY_ADJUSTMENT_INTERVAL;
use crate::error::TargetError;
use crate::hash::hash_to_uint;

const SIGN_BIT: u32 = 0x0080_0000;
const MAGNITUDE_MASK: u32 = 0x007f_ffff;

/// A compact target as carried in the header's bits field.
///
/// The encoding is `[exponent (1 byte)][mantissa (3 bytes)]`, read as
/// `mantissa * 256^(exponent - 3)`. Bit 23 of the mantissa is a sign flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompactTarget(u32);

impl CompactTarget {
    /// From the numeric bits value, as read little-endian from a header.
    pub fn from_bits(bits: u32) -> Self {
        CompactTarget(bits)
    }

    /// From the four bytes `[exponent, m2, m1, m0]`.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        CompactTarget(u32::from_be_bytes(bytes))
    }

    pub fn to_bits(self) -> u32 {
        self.0
    }

    pub fn exponent(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Mantissa with the sign flag cleared.
    pub fn magnitude(self) -> u32 {
        self.0 & MAGNITUDE_MASK
    }

    pub fn sign_bit(self) -> bool {
        self.0 & SIGN_BIT != 0
    }

    /// Decode to a target, rejecting negative and overflowing encodings.
    ///
    /// A zero magnitude never trips either check.
    pub fn decode(self) -> Result<BigUint, TargetError> {
        let size = self.exponent() as u32;
        let word = self.magnitude();
        let overflow =
            word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));
        if overflow {
            return Err(TargetError::Overflow { bits: self.0 });
        }

        let target = self.expand();
        if self.sign_bit() && !target.is_zero() {
            return Err(TargetError::Negative { bits: self.0 });
        }
        Ok(target)
    }

    /// Decode without the sign and overflow checks.
    pub fn expand(self) -> BigUint {
        let size = self.exponent() as u32;
        let word = self.magnitude();
        if size <= 3 {
            BigUint::from(word >> (8 * (3 - size)))
        } else {
            BigUint::from(word) << (8 * (size - 3)) as usize
        }
    }

    /// Decode in either mode.
    pub fn to_target(self, strict: bool) -> Result<BigUint, TargetError> {
        if strict {
            self.decode()
        } else {
            Ok(self.expand())
        }
    }
}

impl fmt::Display for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Convert compact "bits" to a target with strict validation.
pub fn bits_to_target(bits: u32) -> Result<BigUint, TargetError> {
    CompactTarget::from_bits(bits).decode()
}

/// Highest mainnet block target, the "difficulty 1" target (bits 0x1d00ffff).
pub fn max_block_target() -> BigUint {
    BigUint::from(0xffffu32) << 208
}

/// Highest pool share target, `2^224 - 1`.
pub fn max_pool_target() -> BigUint {
    (BigUint::from(1u32) << 224) - 1u32
}

/// Highest regtest target (bits 0x207fffff).
pub fn max_regtest_target() -> BigUint {
    BigUint::from(MAGNITUDE_MASK) << 232
}

/// Difficulty of a target measured against each reference maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Difficulty {
    /// Relative to the mainnet block maximum.
    pub block: f64,
    /// Relative to the pool share maximum.
    pub pool: f64,
    /// Relative to the regtest maximum.
    pub regtest: f64,
}

impl Difficulty {
    /// A zero target yields infinite difficulty everywhere.
    pub fn from_target(target: &BigUint) -> Self {
        Difficulty {
            block: ratio(&max_block_target(), target),
            pool: ratio(&max_pool_target(), target),
            regtest: ratio(&max_regtest_target(), target),
        }
    }
}

fn ratio(max: &BigUint, target: &BigUint) -> f64 {
    if target.is_zero() {
        return f64::INFINITY;
    }
    let max = max.to_f64().unwrap_or(f64::INFINITY);
    let target = target.to_f64().unwrap_or(f64::INFINITY);
    max / target
}

/// Check if a hash meets the difficulty target.
///
/// The hash is compared by its display value; equality passes.
pub fn hash_meets_target(hash: &[u8; 32], target: &BigUint) -> bool {
    hash_to_uint(hash) <= *target
}

/// Whether blocks `start` through `end` share one difficulty period.
///
/// A reversed or empty range never qualifies.
pub fn within_difficulty_period(start: u32, end: u32) -> bool {
    if start >= end {
        return false;
    }
    (start % DIFFICULTY_ADJUSTMENT_INTERVAL) as u64 + ((end - start) as u64)
        < DIFFICULTY_ADJUSTMENT_INTERVAL as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_hex(bytes: [u8; 4]) -> String {
        CompactTarget::from_bytes(bytes).decode().unwrap().to_str_radix(16)
    }

    #[test]
    fn test_decode_known_targets() {
        assert_eq!(
            target_hex([0x18, 0x1b, 0xc3, 0x30]),
            "1bc330000000000000000000000000000000000000000000"
        );
        assert_eq!(target_hex([0x05, 0x00, 0x92, 0x34]), "92340000");
        assert_eq!(target_hex([0x01, 0x00, 0x34, 0x56]), "0");
        assert_eq!(target_hex([0x01, 0x12, 0x34, 0x56]), "12");
        assert_eq!(target_hex([0x02, 0x00, 0x80, 0x00]), "80");
        assert_eq!(target_hex([0x04, 0x12, 0x34, 0x56]), "12345600");
        assert_eq!(target_hex([0x02, 0x12, 0x34, 0x56]), "1234");
        assert_eq!(target_hex([0x03, 0x12, 0x34, 0x56]), "123456");
        assert_eq!(
            target_hex([0x20, 0x12, 0x34, 0x56]),
            format!("123456{}", "0".repeat(58))
        );
        assert_eq!(
            target_hex([0x20, 0x7f, 0xff, 0xff]),
            format!("7fffff{}", "0".repeat(58))
        );
    }

    #[test]
    fn test_decode_rejects_sign_bit() {
        let negative = CompactTarget::from_bytes([0x04, 0x92, 0x34, 0x56]);
        assert_eq!(
            negative.decode(),
            Err(TargetError::Negative { bits: 0x04923456 })
        );
        assert!(CompactTarget::from_bytes([0x01, 0xfe, 0xdc, 0xba]).decode().is_err());

        // The sign flag on a value that shifts to zero is harmless
        let zero = CompactTarget::from_bytes([0x01, 0x80, 0x34, 0x56]);
        assert_eq!(zero.decode().unwrap(), BigUint::zero());
    }

    #[test]
    fn test_decode_rejects_overflow() {
        for bits in [0x2300_0001u32, 0x2200_0100, 0x2101_0000] {
            assert_eq!(
                bits_to_target(bits),
                Err(TargetError::Overflow { bits }),
                "bits {:08x}",
                bits
            );
        }
        // Largest encodings that still fit in 256 bits
        assert!(bits_to_target(0x2200_00ff).is_ok());
        assert!(bits_to_target(0x2100_ffff).is_ok());
        // Zero magnitude with a huge exponent is just zero
        assert_eq!(bits_to_target(0xff00_0000).unwrap(), BigUint::zero());
    }

    #[test]
    fn test_lenient_decode() {
        let negative = CompactTarget::from_bits(0x04923456);
        assert_eq!(negative.to_target(false).unwrap(), BigUint::from(0x12345600u32));
        assert!(negative.to_target(true).is_err());
    }

    #[test]
    fn test_bits_to_target_genesis() {
        assert_eq!(bits_to_target(0x1d00ffff).unwrap(), max_block_target());
        assert_eq!(bits_to_target(0x207fffff).unwrap(), max_regtest_target());
    }

    #[test]
    fn test_compact_accessors() {
        let compact = CompactTarget::from_bytes([0x17, 0x03, 0x42, 0x19]);
        assert_eq!(compact.to_bits(), 0x17034219);
        assert_eq!(compact.exponent(), 0x17);
        assert_eq!(compact.magnitude(), 0x034219);
        assert!(!compact.sign_bit());
        assert_eq!(compact.to_string(), "17034219");
    }

    #[test]
    fn test_difficulty_calculation() {
        // Genesis block should have difficulty 1
        let genesis = Difficulty::from_target(&max_block_target());
        assert!((genesis.block - 1.0).abs() < 1e-12);
        assert!((genesis.pool - 1.0000152590218967).abs() < 1e-9);

        let regtest = Difficulty::from_target(&max_regtest_target());
        assert!((regtest.regtest - 1.0).abs() < 1e-12);
        assert!(regtest.block < 1.0);

        let zero = Difficulty::from_target(&BigUint::zero());
        assert!(zero.block.is_infinite());
        assert!(zero.pool.is_infinite());
        assert!(zero.regtest.is_infinite());
    }

    #[test]
    fn test_hash_meets_target() {
        let target = max_block_target();

        // Four zero bytes at the display front pass genesis difficulty
        let mut good_hash = [0xffu8; 32];
        good_hash[28..].copy_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        good_hash[27] = 0x12;
        assert!(hash_meets_target(&good_hash, &target));

        let mut bad_hash = [0u8; 32];
        bad_hash[28] = 0x01;
        assert!(!hash_meets_target(&bad_hash, &target));

        // Equal to the target counts
        let mut equal = [0u8; 32];
        equal[26] = 0xff;
        equal[27] = 0xff;
        assert!(hash_meets_target(&equal, &target));
    }

    #[test]
    fn test_within_difficulty_period() {
        assert!(within_difficulty_period(0, 2015));
        assert!(within_difficulty_period(1, 2015));
        assert!(!within_difficulty_period(0, 2016));
        assert!(!within_difficulty_period(0, 2017));
        assert!(!within_difficulty_period(2015, 2017));
        assert!(within_difficulty_period(2016, 2017));
        assert!(!within_difficulty_period(10, 10));
        assert!(!within_difficulty_period(11, 10));
    }
}
