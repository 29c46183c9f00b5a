//! Evidence assembly from block explorer JSON.
//!
//! A block record is parsed, every claim in the JSON is checked against the
//! raw bytes, and the result is flattened into an [`EvidenceBundle`]: the
//! header, the coinbase split around its scriptSig, a merkle proof for the
//! coinbase and a redacted copy of the header.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::error::{Error, Result};
use crate::hash::{decode_hex, display_hex_to_hash, hash_to_display_hex};
use crate::merkle::{compute_merkle_root, MerkleProof};
use crate::redact::{HeaderField, RedactedHeader};
use crate::transaction::TxCount;

/// A block record as served by block explorers. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlockJson {
    pub height: u32,
    /// Block hash, display format.
    pub hash: String,
    /// Merkle root, display format.
    pub mrkl_root: String,
    /// The serialized block as hex.
    pub rawblock: String,
    #[serde(default)]
    pub tx: Vec<TxJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TxJson {
    /// Txid, display format.
    pub hash: String,
    #[serde(default)]
    pub inputs: Vec<InputJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputJson {
    /// scriptSig as hex.
    pub script: String,
}

/// Options for evidence assembly.
#[derive(Debug, Clone)]
pub struct EvidenceBuilder {
    strict_pow: bool,
    redact: Vec<HeaderField>,
    expected_prev_hash: Option<[u8; 32]>,
}

impl Default for EvidenceBuilder {
    fn default() -> Self {
        EvidenceBuilder {
            strict_pow: true,
            redact: vec![HeaderField::MerkleRoot, HeaderField::PrevBlockHash],
            expected_prev_hash: None,
        }
    }
}

impl EvidenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the header hash to meet its own target.
    pub fn strict_pow(mut self, strict: bool) -> Self {
        self.strict_pow = strict;
        self
    }

    /// Header fields to zero, applied in order. Must not be empty.
    pub fn redact(mut self, fields: &[HeaderField]) -> Self {
        self.redact = fields.to_vec();
        self
    }

    /// Require the header to build on this block (internal byte order).
    pub fn expected_prev_hash(mut self, hash: [u8; 32]) -> Self {
        self.expected_prev_hash = Some(hash);
        self
    }

    /// Like [`EvidenceBuilder::expected_prev_hash`], from display hex.
    pub fn expected_prev_hash_hex(self, hash: &str) -> Result<Self> {
        Ok(self.expected_prev_hash(display_hex_to_hash(hash)?))
    }

    /// Check one block record and build its evidence.
    pub fn assemble(&self, json: &BlockJson) -> Result<EvidenceBundle> {
        let raw = decode_hex(&json.rawblock)?;
        let block = Block::parse(&raw, TxCount::All)?;
        let header = block.header();
        if self.strict_pow {
            header.check_proof_of_work()?;
        }
        expect_hash("block hash", &json.hash, &header.hash())?;

        // Coinbase
        let coinbase = block.coinbase_evidence()?;
        if coinbase.block_height() != json.height {
            return Err(Error::Mismatch {
                what: "block height",
                expected: json.height.to_string(),
                found: coinbase.block_height().to_string(),
            });
        }
        let coinbase_json = json.tx.first().ok_or(Error::MissingJson("tx[0]"))?;
        let script = coinbase_json
            .inputs
            .first()
            .ok_or(Error::MissingJson("tx[0].inputs[0]"))?;
        if decode_hex(&script.script)? != coinbase.script_sig() {
            return Err(Error::Mismatch {
                what: "coinbase scriptSig",
                expected: script.script.to_lowercase(),
                found: hex::encode(coinbase.script_sig()),
            });
        }
        if coinbase.reassembled_txid() != coinbase.txid() {
            return Err(Error::Mismatch {
                what: "reassembled coinbase txid",
                expected: coinbase.txid_hex(),
                found: hash_to_display_hex(&coinbase.reassembled_txid()),
            });
        }
        expect_hash("coinbase txid", &coinbase_json.hash, &coinbase.txid())?;

        // Merkle root
        expect_hash("merkle root", &json.mrkl_root, &header.merkle_root())?;
        let txids = block.txids();
        let computed = compute_merkle_root(&txids)?;
        if computed != header.merkle_root() {
            return Err(Error::Mismatch {
                what: "computed merkle root",
                expected: header.merkle_root_hex(),
                found: hash_to_display_hex(&computed),
            });
        }

        let proof = MerkleProof::generate(&txids, &coinbase.txid())?;
        if !proof.verify(&coinbase.txid(), &header.merkle_root_hex()) {
            return Err(Error::ProofRejected {
                txid: coinbase.txid_hex(),
                root: header.merkle_root_hex(),
            });
        }

        let redacted = RedactedHeader::redact_by_value(header, &self.redact)?;
        if !redacted.verify_restores(header) {
            return Err(Error::RedactionNotReversible(header.hash_hex()));
        }

        if let Some(prev) = self.expected_prev_hash {
            if prev != header.prev_block_hash() {
                return Err(Error::Mismatch {
                    what: "previous block hash",
                    expected: hash_to_display_hex(&prev),
                    found: header.prev_block_hash_hex(),
                });
            }
        }

        debug!(
            "evidence for block {} at height {}: {} txs, {} proof hashes",
            header.hash_hex(),
            coinbase.block_height(),
            txids.len(),
            proof.len()
        );

        Ok(EvidenceBundle {
            block_hash: header.hash(),
            block_height: coinbase.block_height(),
            header_bytes: header.to_bytes(),
            coinbase_prefix: coinbase.prefix().to_vec(),
            coinbase_payload: coinbase.script_sig().to_vec(),
            coinbase_suffix: coinbase.suffix().to_vec(),
            coinbase_txid: coinbase.txid(),
            merkle_proof_hashes: proof.concatenated_path(),
            merkle_proof_flags: proof.flag_bytes(),
            redacted_header_bytes: *redacted.as_bytes(),
            redacted_header_hash: redacted.hash(),
        })
    }

    /// Assemble consecutive blocks, each required to build on the one
    /// before it. The first block is checked against this builder's
    /// expected previous hash, if any.
    pub fn assemble_range(&self, blocks: &[BlockJson]) -> Result<Vec<EvidenceBundle>> {
        let mut bundles: Vec<EvidenceBundle> = Vec::with_capacity(blocks.len());
        for json in blocks {
            let bundle = match bundles.last() {
                Some(prev) => {
                    if json.height != prev.block_height.wrapping_add(1) {
                        warn!(
                            "block {} follows height {} but claims height {}",
                            json.hash, prev.block_height, json.height
                        );
                    }
                    self.clone()
                        .expected_prev_hash(prev.block_hash)
                        .assemble(json)?
                }
                None => self.assemble(json)?,
            };
            bundles.push(bundle);
        }
        Ok(bundles)
    }
}

/// Compare a display-format hash from JSON with a computed one.
fn expect_hash(what: &'static str, claimed: &str, actual: &[u8; 32]) -> Result<()> {
    let claimed_hash = display_hex_to_hash(claimed)?;
    if claimed_hash != *actual {
        return Err(Error::Mismatch {
            what,
            expected: claimed.to_lowercase(),
            found: hash_to_display_hex(actual),
        });
    }
    Ok(())
}

/// Everything needed to prove a block's coinbase to a remote verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceBundle {
    /// Block hash (internal byte order).
    pub block_hash: [u8; 32],
    pub block_height: u32,
    pub header_bytes: [u8; 80],
    pub coinbase_prefix: Vec<u8>,
    /// The coinbase scriptSig.
    pub coinbase_payload: Vec<u8>,
    pub coinbase_suffix: Vec<u8>,
    pub coinbase_txid: [u8; 32],
    /// Sibling hashes joined leaf first.
    pub merkle_proof_hashes: Vec<u8>,
    /// One 0/1 byte per sibling.
    pub merkle_proof_flags: Vec<u8>,
    pub redacted_header_bytes: [u8; 80],
    pub redacted_header_hash: [u8; 32],
}

impl EvidenceBundle {
    /// The coinbase merkle proof in structured form.
    pub fn merkle_proof(&self) -> Result<MerkleProof> {
        Ok(MerkleProof::from_bytes(
            &self.merkle_proof_hashes,
            &self.merkle_proof_flags,
        )?)
    }

    pub fn to_display_record(&self) -> EvidenceRecord {
        EvidenceRecord {
            block_hash: hash_to_display_hex(&self.block_hash),
            block_height: self.block_height,
            header: hex::encode(self.header_bytes),
            coinbase_prefix: hex::encode(&self.coinbase_prefix),
            coinbase_payload: hex::encode(&self.coinbase_payload),
            coinbase_suffix: hex::encode(&self.coinbase_suffix),
            coinbase_txid: hash_to_display_hex(&self.coinbase_txid),
            merkle_proof_hashes: hex::encode(&self.merkle_proof_hashes),
            merkle_proof_flags: self.merkle_proof_flags.clone(),
            redacted_header: hex::encode(self.redacted_header_bytes),
            redacted_header_hash: hash_to_display_hex(&self.redacted_header_hash),
        }
    }
}

/// An [`EvidenceBundle`] with hashes in display format and bytes as hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceRecord {
    pub block_hash: String,
    pub block_height: u32,
    pub header: String,
    pub coinbase_prefix: String,
    pub coinbase_payload: String,
    pub coinbase_suffix: String,
    pub coinbase_txid: String,
    pub merkle_proof_hashes: String,
    pub merkle_proof_flags: Vec<u8>,
    pub redacted_header: String,
    pub redacted_header_hash: String,
}
