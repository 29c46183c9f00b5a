//! Bitcoin block header parsing, construction and proof-of-work checks.

use core::fmt;

use num_bigint::BigUint;
use num_traits::One;
use serde::Serialize;

use crate::constants::{
    BITS_OFFSET, BLOCK_HEADER_SIZE, MERKLE_ROOT_OFFSET, NONCE_OFFSET, PREV_BLOCK_HASH_OFFSET,
    TIME_OFFSET, VERSION_OFFSET,
};
use crate::difficulty::{hash_meets_target, CompactTarget, Difficulty};
use crate::error::{HeaderError, TargetError, WireError};
use crate::hash::{decode_hex, display_hex_to_hash, double_sha256, hash_to_display_hex};

/// A parsed Bitcoin block header (80 bytes).
///
/// Headers are immutable once built; the raw bytes and hash are kept
/// alongside the decoded fields so they can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    raw: [u8; 80],
    hash: [u8; 32],
    version: i32,
    prev_block_hash: [u8; 32],
    merkle_root: [u8; 32],
    time: u32,
    bits: u32,
    nonce: u32,
}

impl BlockHeader {
    /// Parse a header from exactly 80 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() != BLOCK_HEADER_SIZE {
            return Err(WireError::InvalidLength {
                field: "block header",
                expected: BLOCK_HEADER_SIZE,
                found: bytes.len(),
            }
            .into());
        }
        let mut raw = [0u8; 80];
        raw.copy_from_slice(bytes);
        Ok(Self::from_raw(raw))
    }

    /// Parse a header from 160 hex digits, or 159 with the leading zero
    /// dropped. A `0x` prefix is accepted.
    pub fn from_hex(s: &str) -> Result<Self, HeaderError> {
        let bytes = decode_hex(s)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a header from its big-endian integer form.
    ///
    /// The value must lie strictly between `2^632` and `2^640`. Headers whose
    /// first byte is zero have no integer form.
    pub fn from_uint(value: &BigUint) -> Result<Self, HeaderError> {
        let floor = BigUint::one() << ((BLOCK_HEADER_SIZE - 1) * 8);
        if *value <= floor {
            return Err(HeaderError::IntegerOutOfRange);
        }
        let bytes = value.to_bytes_be();
        if bytes.len() != BLOCK_HEADER_SIZE {
            return Err(HeaderError::IntegerOutOfRange);
        }
        Self::from_bytes(&bytes)
    }

    fn from_raw(raw: [u8; 80]) -> Self {
        let mut prev_block_hash = [0u8; 32];
        prev_block_hash.copy_from_slice(&raw[PREV_BLOCK_HASH_OFFSET..MERKLE_ROOT_OFFSET]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&raw[MERKLE_ROOT_OFFSET..TIME_OFFSET]);

        BlockHeader {
            hash: double_sha256(&raw),
            version: le_u32(&raw, VERSION_OFFSET) as i32,
            prev_block_hash,
            merkle_root,
            time: le_u32(&raw, TIME_OFFSET),
            bits: le_u32(&raw, BITS_OFFSET),
            nonce: le_u32(&raw, NONCE_OFFSET),
            raw,
        }
    }

    /// Fail unless the block hash is at or below the strictly decoded target.
    pub fn check_proof_of_work(&self) -> Result<(), HeaderError> {
        let target = self.target()?;
        if hash_meets_target(&self.hash, &target) {
            Ok(())
        } else {
            Err(HeaderError::InsufficientWork {
                hash: self.hash_hex(),
                target: format!("{:064x}", target),
            })
        }
    }

    /// Serialize the block header to 80 bytes.
    pub fn to_bytes(&self) -> [u8; 80] {
        self.raw
    }

    pub fn as_bytes(&self) -> &[u8; 80] {
        &self.raw
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.raw)
    }

    /// Block hash (internal byte order).
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    /// Block hash in display format.
    pub fn hash_hex(&self) -> String {
        hash_to_display_hex(&self.hash)
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn version_raw(&self) -> [u8; 4] {
        field4(&self.raw, VERSION_OFFSET)
    }

    /// Previous block hash (internal byte order).
    pub fn prev_block_hash(&self) -> [u8; 32] {
        self.prev_block_hash
    }

    pub fn prev_block_hash_hex(&self) -> String {
        hash_to_display_hex(&self.prev_block_hash)
    }

    /// Merkle root (internal byte order).
    pub fn merkle_root(&self) -> [u8; 32] {
        self.merkle_root
    }

    pub fn merkle_root_hex(&self) -> String {
        hash_to_display_hex(&self.merkle_root)
    }

    /// Block timestamp (Unix time).
    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn time_raw(&self) -> [u8; 4] {
        field4(&self.raw, TIME_OFFSET)
    }

    /// Difficulty target in compact "bits" format.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// The bits field exactly as stored in the header (little-endian).
    pub fn bits_raw(&self) -> [u8; 4] {
        field4(&self.raw, BITS_OFFSET)
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    pub fn nonce_raw(&self) -> [u8; 4] {
        field4(&self.raw, NONCE_OFFSET)
    }

    pub fn compact_target(&self) -> CompactTarget {
        CompactTarget::from_bits(self.bits)
    }

    /// Get the target with strict validation of the bits field.
    pub fn target(&self) -> Result<BigUint, TargetError> {
        self.compact_target().decode()
    }

    pub fn difficulty(&self) -> Result<Difficulty, TargetError> {
        Ok(Difficulty::from_target(&self.target()?))
    }

    /// Whether the hash meets the target, without failing on weak work.
    pub fn meets_target(&self) -> Result<bool, TargetError> {
        Ok(hash_meets_target(&self.hash, &self.target()?))
    }

    pub fn to_display_record(&self) -> HeaderRecord {
        HeaderRecord {
            hash: self.hash_hex(),
            version: self.version,
            prev_block_hash: self.prev_block_hash_hex(),
            merkle_root: self.merkle_root_hex(),
            time: self.time,
            bits: self.bits,
            bits_hex: self.compact_target().to_string(),
            nonce: self.nonce,
        }
    }
}

impl fmt::Display for BlockHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn field4(raw: &[u8; 80], offset: usize) -> [u8; 4] {
    [raw[offset], raw[offset + 1], raw[offset + 2], raw[offset + 3]]
}

fn le_u32(raw: &[u8; 80], offset: usize) -> u32 {
    u32::from_le_bytes(field4(raw, offset))
}

/// Header fields with hashes in display format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderRecord {
    pub hash: String,
    pub version: i32,
    pub prev_block_hash: String,
    pub merkle_root: String,
    pub time: u32,
    pub bits: u32,
    pub bits_hex: String,
    pub nonce: u32,
}

/// Builds a header from individual fields.
#[derive(Debug, Clone, Default)]
pub struct HeaderBuilder {
    version: Option<i32>,
    prev_block_hash: Option<[u8; 32]>,
    merkle_root: Option<[u8; 32]>,
    time: Option<u32>,
    bits: Option<u32>,
    nonce: Option<u32>,
    strict_pow: bool,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }

    /// Previous block hash in internal byte order.
    pub fn prev_block_hash(mut self, hash: [u8; 32]) -> Self {
        self.prev_block_hash = Some(hash);
        self
    }

    /// Previous block hash in display format.
    pub fn prev_block_hash_hex(self, hash: &str) -> Result<Self, HeaderError> {
        Ok(self.prev_block_hash(display_hex_to_hash(hash)?))
    }

    /// Merkle root in internal byte order.
    pub fn merkle_root(mut self, root: [u8; 32]) -> Self {
        self.merkle_root = Some(root);
        self
    }

    /// Merkle root in display format.
    pub fn merkle_root_hex(self, root: &str) -> Result<Self, HeaderError> {
        Ok(self.merkle_root(display_hex_to_hash(root)?))
    }

    pub fn time(mut self, time: u32) -> Self {
        self.time = Some(time);
        self
    }

    pub fn bits(mut self, bits: u32) -> Self {
        self.bits = Some(bits);
        self
    }

    /// Bits as the four bytes `[exponent, m2, m1, m0]`.
    pub fn compact_target(self, target: CompactTarget) -> Self {
        self.bits(target.to_bits())
    }

    pub fn nonce(mut self, nonce: u32) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Reject the header in `build` if its hash misses the target.
    pub fn strict_pow(mut self, strict: bool) -> Self {
        self.strict_pow = strict;
        self
    }

    pub fn build(self) -> Result<BlockHeader, HeaderError> {
        let version = self.version.ok_or(HeaderError::MissingField("version"))?;
        let prev_block_hash = self
            .prev_block_hash
            .ok_or(HeaderError::MissingField("prev_block_hash"))?;
        let merkle_root = self
            .merkle_root
            .ok_or(HeaderError::MissingField("merkle_root"))?;
        let time = self.time.ok_or(HeaderError::MissingField("time"))?;
        let bits = self.bits.ok_or(HeaderError::MissingField("bits"))?;
        let nonce = self.nonce.ok_or(HeaderError::MissingField("nonce"))?;

        let mut raw = [0u8; 80];
        raw[VERSION_OFFSET..PREV_BLOCK_HASH_OFFSET].copy_from_slice(&version.to_le_bytes());
        raw[PREV_BLOCK_HASH_OFFSET..MERKLE_ROOT_OFFSET].copy_from_slice(&prev_block_hash);
        raw[MERKLE_ROOT_OFFSET..TIME_OFFSET].copy_from_slice(&merkle_root);
        raw[TIME_OFFSET..BITS_OFFSET].copy_from_slice(&time.to_le_bytes());
        raw[BITS_OFFSET..NONCE_OFFSET].copy_from_slice(&bits.to_le_bytes());
        raw[NONCE_OFFSET..].copy_from_slice(&nonce.to_le_bytes());

        let header = BlockHeader::from_raw(raw);
        if self.strict_pow {
            header.check_proof_of_work()?;
        }
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mainnet block 300000
    const HEADER_300000: &str = "020000007ef055e1674d2e6551dba41cd214debbee34aeb544c7ec670000000000000000d3998963f80c5bab43fe8c26228e98d030edf4dcbe48a666f5c39e2d7a885c9102c86d536c890019593a470d";
    const HASH_300000: &str = "000000000000000082ccf8f1557c5d40b21edabb18d2d691cfbf87118bac7254";

    #[test]
    fn test_parse_header_fields() {
        let header = BlockHeader::from_hex(HEADER_300000).unwrap();

        assert_eq!(header.hash_hex(), HASH_300000);
        assert_eq!(header.version(), 2);
        assert_eq!(
            header.prev_block_hash_hex(),
            "000000000000000067ecc744b5ae34eebbde14d21ca4db51652e4d67e155f07e"
        );
        assert_eq!(
            header.merkle_root_hex(),
            "915c887a2d9ec3f566a648bedcf4ed30d0988e22268cfe43ab5b0cf8638999d3"
        );
        assert_eq!(header.time(), 1399703554);
        assert_eq!(header.bits(), 419465580);
        assert_eq!(header.nonce(), 222771801);
        assert_eq!(header.bits_raw(), [0x6c, 0x89, 0x00, 0x19]);
        assert_eq!(header.version_raw(), [0x02, 0x00, 0x00, 0x00]);
        assert_eq!(header.to_hex(), HEADER_300000);
        assert_eq!(header.to_string(), HEADER_300000);
    }

    #[test]
    fn test_header_input_forms_agree() {
        let from_hex = BlockHeader::from_hex(HEADER_300000).unwrap();
        let bytes = hex::decode(HEADER_300000).unwrap();

        assert_eq!(BlockHeader::from_bytes(&bytes).unwrap(), from_hex);
        assert_eq!(
            BlockHeader::from_hex(&format!("0x{}", HEADER_300000)).unwrap(),
            from_hex
        );
        assert_eq!(
            BlockHeader::from_uint(&BigUint::from_bytes_be(&bytes)).unwrap(),
            from_hex
        );
        // Leading zero dropped
        assert_eq!(BlockHeader::from_hex(&HEADER_300000[1..]).unwrap(), from_hex);
    }

    #[test]
    fn test_header_wrong_length() {
        let err = BlockHeader::from_bytes(&[0u8; 79]).unwrap_err();
        assert_eq!(
            err,
            HeaderError::Wire(WireError::InvalidLength {
                field: "block header",
                expected: 80,
                found: 79
            })
        );
        assert!(BlockHeader::from_hex(&HEADER_300000[..158]).is_err());
        assert!(BlockHeader::from_hex("zz").is_err());
    }

    #[test]
    fn test_header_uint_range() {
        let floor = BigUint::one() << 632;
        assert_eq!(
            BlockHeader::from_uint(&floor),
            Err(HeaderError::IntegerOutOfRange)
        );
        assert_eq!(
            BlockHeader::from_uint(&(BigUint::one() << 640)),
            Err(HeaderError::IntegerOutOfRange)
        );
        assert!(BlockHeader::from_uint(&(floor + 1u32)).is_ok());
    }

    #[test]
    fn test_block_header_serialization() {
        let prev_hash = [0x12u8; 32];
        let merkle_root = [0x34u8; 32];

        let header = HeaderBuilder::new()
            .version(0x20000000)
            .prev_block_hash(prev_hash)
            .merkle_root(merkle_root)
            .time(1700000000)
            .bits(0x17034219)
            .nonce(0xDEADBEEF)
            .build()
            .unwrap();

        let serialized = header.to_bytes();

        // Verify version (0x20000000 in little-endian)
        assert_eq!(&serialized[0..4], &[0x00, 0x00, 0x00, 0x20]);
        assert_eq!(&serialized[4..36], &prev_hash[..]);
        assert_eq!(&serialized[36..68], &merkle_root[..]);
        // Verify nonce (0xDEADBEEF in little-endian)
        assert_eq!(&serialized[76..80], &[0xEF, 0xBE, 0xAD, 0xDE]);

        // Building and reparsing agree byte for byte
        assert_eq!(BlockHeader::from_bytes(&serialized).unwrap(), header);
    }

    #[test]
    fn test_builder_reproduces_mainnet_header() {
        let header = HeaderBuilder::new()
            .version(2)
            .prev_block_hash_hex("000000000000000067ecc744b5ae34eebbde14d21ca4db51652e4d67e155f07e")
            .unwrap()
            .merkle_root_hex("915c887a2d9ec3f566a648bedcf4ed30d0988e22268cfe43ab5b0cf8638999d3")
            .unwrap()
            .time(1399703554)
            .compact_target(CompactTarget::from_bytes([0x19, 0x00, 0x89, 0x6c]))
            .nonce(222771801)
            .strict_pow(true)
            .build()
            .unwrap();

        assert_eq!(header.to_hex(), HEADER_300000);
    }

    #[test]
    fn test_builder_missing_field() {
        let err = HeaderBuilder::new().version(1).build().unwrap_err();
        assert_eq!(err, HeaderError::MissingField("prev_block_hash"));
    }

    #[test]
    fn test_proof_of_work() {
        let header = BlockHeader::from_hex(HEADER_300000).unwrap();
        assert!(header.check_proof_of_work().is_ok());
        assert_eq!(header.meets_target(), Ok(true));

        let difficulty = header.difficulty().unwrap();
        assert!(difficulty.block > 8.0e9 && difficulty.block < 8.1e9);

        // Same header with a different nonce misses the mainnet target
        let weak = HeaderBuilder::new()
            .version(2)
            .prev_block_hash(header.prev_block_hash())
            .merkle_root(header.merkle_root())
            .time(header.time())
            .bits(header.bits())
            .nonce(0)
            .strict_pow(true)
            .build();
        assert!(matches!(weak, Err(HeaderError::InsufficientWork { .. })));
    }

    #[test]
    fn test_proof_of_work_rejects_bad_bits() {
        let mut bytes = hex::decode(HEADER_300000).unwrap();
        bytes[72..76].copy_from_slice(&0x0492_3456u32.to_le_bytes());
        let header = BlockHeader::from_bytes(&bytes).unwrap();

        assert!(matches!(
            header.check_proof_of_work(),
            Err(HeaderError::Target(TargetError::Negative { .. }))
        ));
    }

    #[test]
    fn test_display_record() {
        let record = BlockHeader::from_hex(HEADER_300000).unwrap().to_display_record();
        assert_eq!(record.hash, HASH_300000);
        assert_eq!(record.bits_hex, "1900896c");
        assert_eq!(record.nonce, 222771801);
    }
}
