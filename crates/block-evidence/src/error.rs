//! Error types for block evidence extraction.
//!
//! Each component reports its own error kind; [`Error`] wraps them so the
//! evidence assembler can propagate any of them with `?`.

use thiserror::Error;

/// Framing and encoding failures while reading wire-format bytes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    #[error("truncated {field} at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid {field} length: expected {expected} bytes, found {found}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Compact "nBits" decoding failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TargetError {
    #[error("compact target {bits:#010x} is negative")]
    Negative { bits: u32 },

    #[error("compact target {bits:#010x} overflows 256 bits")]
    Overflow { bits: u32 },
}

/// Block header construction failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeaderError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("header integer is not an 80-byte value")]
    IntegerOutOfRange,

    #[error("header field {0} was not set")]
    MissingField(&'static str),

    #[error("block hash {hash} is above target {target}")]
    InsufficientWork { hash: String, target: String },
}

/// Transaction parsing failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TxError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("unsupported: witness transaction at offset {offset}")]
    UnsupportedWitness { offset: usize },
}

/// Coinbase structure violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoinbaseError {
    #[error("coinbase must have exactly one input, found {0}")]
    InputCount(usize),

    #[error("coinbase input does not spend the null outpoint")]
    NotNullPrevout,

    #[error("coinbase scriptSig is {0} bytes, must be between 2 and 100")]
    ScriptSigLength(usize),
}

/// Merkle tree and proof failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MerkleError {
    #[error("merkle tree needs at least one leaf")]
    EmptyLeafSet,

    #[error("leaf {0} is not part of the tree")]
    LeafNotFound(String),

    #[error("merkle proof has {path} hashes but {flags} flags")]
    FlagCountMismatch { path: usize, flags: usize },

    #[error("invalid merkle proof flag {0}, must be 0 or 1")]
    InvalidFlag(u8),

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Byte substitution failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RedactError {
    #[error("search bytes must not be empty")]
    EmptyNeedle,

    #[error("search bytes ({needle}) longer than buffer ({haystack})")]
    NeedleTooLong { needle: usize, haystack: usize },

    #[error("replacement of {replacement} bytes for a {needle}-byte search")]
    LengthMismatch { needle: usize, replacement: usize },

    #[error("replacing {len} bytes at offset {offset} runs past buffer of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },
}

/// Crate-level error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Transaction(#[from] TxError),

    #[error(transparent)]
    Coinbase(#[from] CoinbaseError),

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error(transparent)]
    Redact(#[from] RedactError),

    #[error("block has {available} transactions, {requested} requested")]
    TxCountExceeded { requested: usize, available: u64 },

    #[error("parsed {parsed} of {declared} transactions")]
    IncompleteBlock { parsed: usize, declared: u64 },

    #[error("block has no transactions")]
    NoTransactions,

    #[error("block json is missing {0}")]
    MissingJson(&'static str),

    #[error("{what} mismatch: expected {expected}, found {found}")]
    Mismatch {
        what: &'static str,
        expected: String,
        found: String,
    },

    #[error("merkle proof for {txid} does not reach root {root}")]
    ProofRejected { txid: String, root: String },

    #[error("redacted header does not restore to block {0}")]
    RedactionNotReversible(String),
}

pub type Result<T> = core::result::Result<T, Error>;
