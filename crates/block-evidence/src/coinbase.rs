//! Coinbase transaction decomposition with BIP34 height extraction.
//!
//! The coinbase is split around its scriptSig so a verifier can rebuild
//! the exact transaction bytes from `prefix ++ script_sig ++ suffix`.

use log::debug;
use serde::Serialize;

use crate::constants::{MAX_COINBASE_SCRIPTSIG_SIZE, MIN_COINBASE_SCRIPTSIG_SIZE};
use crate::error::CoinbaseError;
use crate::hash::{double_sha256, hash_to_display_hex};
use crate::transaction::Transaction;

/// Most height bytes that fit a u32.
const MAX_HEIGHT_PUSH: usize = 4;

/// A coinbase split into the pieces needed to prove its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseEvidence {
    block_height: u32,
    prefix: Vec<u8>,
    script_sig: Vec<u8>,
    suffix: Vec<u8>,
    extra_data: Vec<u8>,
    txid: [u8; 32],
}

impl CoinbaseEvidence {
    /// Extract evidence from a parsed coinbase transaction.
    pub fn extract(tx: &Transaction) -> Result<Self, CoinbaseError> {
        let inputs = tx.inputs();
        if inputs.len() != 1 {
            return Err(CoinbaseError::InputCount(inputs.len()));
        }
        let input = &inputs[0];
        if !input.is_coinbase() {
            return Err(CoinbaseError::NotNullPrevout);
        }

        let script_sig = &input.script_sig;
        if !(MIN_COINBASE_SCRIPTSIG_SIZE..=MAX_COINBASE_SCRIPTSIG_SIZE).contains(&script_sig.len())
        {
            return Err(CoinbaseError::ScriptSigLength(script_sig.len()));
        }

        // BIP34: the first push is the height, little-endian. Pre-BIP34
        // coinbases still split; their height is whatever the bytes read as.
        let push = script_sig[0] as usize;
        let height_len = push.min(MAX_HEIGHT_PUSH).min(script_sig.len() - 1);
        if height_len != push {
            debug!(
                "coinbase first push of {} bytes is not a height, reading {}",
                push, height_len
            );
        }
        let mut height_bytes = [0u8; 4];
        height_bytes[..height_len].copy_from_slice(&script_sig[1..1 + height_len]);
        let block_height = u32::from_le_bytes(height_bytes);
        let extra_start = (1 + push).min(script_sig.len());

        // Split the raw bytes so non-minimal varints survive untouched
        let span = tx
            .script_sig_span(0)
            .ok_or(CoinbaseError::InputCount(0))?;
        let raw = tx.raw();

        Ok(CoinbaseEvidence {
            block_height,
            prefix: raw[..span.start].to_vec(),
            script_sig: script_sig.clone(),
            suffix: raw[span.end..].to_vec(),
            extra_data: script_sig[extra_start..].to_vec(),
            txid: tx.txid(),
        })
    }

    pub fn block_height(&self) -> u32 {
        self.block_height
    }

    /// Version, input count, outpoint and scriptSig length.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// The full scriptSig, height push included.
    pub fn script_sig(&self) -> &[u8] {
        &self.script_sig
    }

    /// Sequence, outputs and lock time.
    pub fn suffix(&self) -> &[u8] {
        &self.suffix
    }

    /// scriptSig bytes after the height push.
    pub fn extra_data(&self) -> &[u8] {
        &self.extra_data
    }

    /// Transaction ID (internal byte order).
    pub fn txid(&self) -> [u8; 32] {
        self.txid
    }

    pub fn txid_hex(&self) -> String {
        hash_to_display_hex(&self.txid)
    }

    /// Concatenate the pieces back into the transaction.
    pub fn reassemble(&self) -> Vec<u8> {
        let mut raw =
            Vec::with_capacity(self.prefix.len() + self.script_sig.len() + self.suffix.len());
        raw.extend_from_slice(&self.prefix);
        raw.extend_from_slice(&self.script_sig);
        raw.extend_from_slice(&self.suffix);
        raw
    }

    /// Txid recomputed from the reassembled bytes.
    pub fn reassembled_txid(&self) -> [u8; 32] {
        double_sha256(&self.reassemble())
    }

    pub fn to_display_record(&self) -> CoinbaseRecord {
        CoinbaseRecord {
            txid: self.txid_hex(),
            block_height: self.block_height,
            prefix: hex::encode(&self.prefix),
            script_sig: hex::encode(&self.script_sig),
            extra_data: hex::encode(&self.extra_data),
            suffix: hex::encode(&self.suffix),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoinbaseRecord {
    pub txid: String,
    pub block_height: u32,
    pub prefix: String,
    pub script_sig: String,
    pub extra_data: String,
    pub suffix: String,
}
