//! Bitcoin block evidence extraction and verification.
//!
//! This crate provides pure Rust implementations of:
//! - Varint and hash display-format primitives
//! - Compact "nBits" target decoding with strict validation
//! - Block header and legacy transaction parsing
//! - Coinbase decomposition with BIP34 height extraction
//! - Merkle roots, inclusion proofs and BIP37 merkle-block verification
//! - Reversible header redaction
//! - Evidence bundles cross-checked against block explorer JSON
//!
//! Hashes are stored in internal byte order; `*_hex` accessors return the
//! reversed display form.

pub mod block;
pub mod coinbase;
pub mod constants;
pub mod difficulty;
pub mod error;
pub mod evidence;
pub mod hash;
pub mod header;
pub mod merkle;
pub mod redact;
pub mod transaction;
pub mod wire;

pub use block::Block;
pub use coinbase::CoinbaseEvidence;
pub use difficulty::{
    bits_to_target, hash_meets_target, within_difficulty_period, CompactTarget, Difficulty,
};
pub use error::{
    CoinbaseError, Error, HeaderError, MerkleError, RedactError, Result, TargetError, TxError,
    WireError,
};
pub use evidence::{BlockJson, EvidenceBuilder, EvidenceBundle, EvidenceRecord};
pub use hash::{display_hex_to_hash, double_sha256, hash_to_display_hex};
pub use header::{BlockHeader, HeaderBuilder};
pub use merkle::{compute_merkle_root, flag_bits_from_bytes, MerkleBlock, MerkleProof};
pub use redact::{replace_at_offset, replace_found_bytes, HeaderField, RedactedHeader, Replacement};
pub use transaction::{parse_transactions, Transaction, TxCount, TxInput, TxOutput};
pub use wire::{decode_varint, encode_varint};
