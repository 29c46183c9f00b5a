//! JavaScript entry points for header, target, proof and evidence handling.
//!
//! Each export wraps a plain Rust function returning `Result<_, String>`,
//! so the logic can be tested off-wasm.

use block_evidence::hash::decode_hex;
use block_evidence::{
    BlockHeader, BlockJson, CompactTarget, EvidenceBuilder, EvidenceRecord, MerkleProof,
};
use wasm_bindgen::prelude::*;

use crate::state::{to_js, HeaderInfo, TargetInfo};

/// Parse an 80-byte header given as hex.
#[wasm_bindgen]
pub fn parse_header(header_hex: &str) -> Result<JsValue, JsValue> {
    header_info(header_hex)
        .map_err(|e| JsValue::from_str(&e))?
        .to_js()
}

/// Decode compact bits given as 8 hex digits, exponent first.
#[wasm_bindgen]
pub fn decode_target(bits_hex: &str, strict: bool) -> Result<JsValue, JsValue> {
    target_info(bits_hex, strict)
        .map_err(|e| JsValue::from_str(&e))?
        .to_js()
}

/// Check a merkle path from `leaf` to `root`, both display-format hex.
///
/// `path_hex` holds the concatenated sibling hashes; `flags` has one 0/1
/// byte per sibling.
#[wasm_bindgen]
pub fn verify_merkle_proof(
    root: &str,
    leaf: &str,
    path_hex: &str,
    flags: Vec<u8>,
) -> Result<bool, JsValue> {
    check_merkle_proof(root, leaf, path_hex, &flags).map_err(|e| JsValue::from_str(&e))
}

/// Build the evidence record for one block explorer JSON document.
#[wasm_bindgen]
pub fn build_evidence(block_json: &str, strict: bool) -> Result<JsValue, JsValue> {
    let record = evidence_record(block_json, strict).map_err(|e| JsValue::from_str(&e))?;
    to_js(&record)
}

pub fn header_info(header_hex: &str) -> Result<HeaderInfo, String> {
    let header =
        BlockHeader::from_hex(header_hex).map_err(|e| format!("Invalid header: {}", e))?;
    Ok(HeaderInfo::new(&header))
}

pub fn target_info(bits_hex: &str, strict: bool) -> Result<TargetInfo, String> {
    let bytes = decode_hex(bits_hex).map_err(|e| format!("Invalid bits: {}", e))?;
    let bits: [u8; 4] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("Invalid bits: expected 4 bytes, found {}", bytes.len()))?;
    TargetInfo::new(CompactTarget::from_bytes(bits), strict)
}

pub fn check_merkle_proof(
    root: &str,
    leaf: &str,
    path_hex: &str,
    flags: &[u8],
) -> Result<bool, String> {
    let leaf = block_evidence::display_hex_to_hash(leaf)
        .map_err(|e| format!("Invalid leaf: {}", e))?;
    let path = decode_hex(path_hex).map_err(|e| format!("Invalid path: {}", e))?;
    let proof =
        MerkleProof::from_bytes(&path, flags).map_err(|e| format!("Invalid proof: {}", e))?;
    Ok(proof.verify(&leaf, root))
}

pub fn evidence_record(block_json: &str, strict: bool) -> Result<EvidenceRecord, String> {
    let json: BlockJson = serde_json::from_str(block_json)
        .map_err(|e| format!("Failed to parse block json: {}", e))?;
    let bundle = EvidenceBuilder::new()
        .strict_pow(strict)
        .assemble(&json)
        .map_err(|e| e.to_string())?;
    Ok(bundle.to_display_record())
}
