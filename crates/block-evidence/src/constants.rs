//! Bitcoin wire-format and consensus constants.

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Size of a double-SHA256 hash in bytes.
pub const HASH_SIZE: usize = 32;

// Header field layout: (offset, length).
pub const VERSION_OFFSET: usize = 0;
pub const VERSION_LEN: usize = 4;
pub const PREV_BLOCK_HASH_OFFSET: usize = VERSION_OFFSET + VERSION_LEN;
pub const PREV_BLOCK_HASH_LEN: usize = HASH_SIZE;
pub const MERKLE_ROOT_OFFSET: usize = PREV_BLOCK_HASH_OFFSET + PREV_BLOCK_HASH_LEN;
pub const MERKLE_ROOT_LEN: usize = HASH_SIZE;
pub const TIME_OFFSET: usize = MERKLE_ROOT_OFFSET + MERKLE_ROOT_LEN;
pub const TIME_LEN: usize = 4;
pub const BITS_OFFSET: usize = TIME_OFFSET + TIME_LEN;
pub const BITS_LEN: usize = 4;
pub const NONCE_OFFSET: usize = BITS_OFFSET + BITS_LEN;
pub const NONCE_LEN: usize = 4;

const _: () = assert!(NONCE_OFFSET + NONCE_LEN == BLOCK_HEADER_SIZE);

/// Previous-output txid of a coinbase input.
pub const COINBASE_PREV_TXID: [u8; 32] = [0u8; 32];

/// Previous-output index of a coinbase input.
pub const COINBASE_PREV_INDEX: u32 = 0xFFFF_FFFF;

/// Maximum size of coinbase scriptSig.
pub const MAX_COINBASE_SCRIPTSIG_SIZE: usize = 100;

/// Minimum size of coinbase scriptSig (BIP34 requires at least height).
pub const MIN_COINBASE_SCRIPTSIG_SIZE: usize = 2;

/// Segwit serialization marker byte, found where the input count would be.
pub const SEGWIT_MARKER: u8 = 0x00;

/// Segwit serialization flag byte following the marker.
pub const SEGWIT_FLAG: u8 = 0x01;

/// Blocks between two difficulty adjustments.
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u32 = 2016;
