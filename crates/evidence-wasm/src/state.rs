//! Serializable views handed across the JS boundary.

use block_evidence::header::HeaderRecord;
use block_evidence::{BlockHeader, CompactTarget, Difficulty};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Decoded compact target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetInfo {
    /// The bits as `[exponent, m2, m1, m0]` hex.
    pub bits: String,
    /// Target as 64 hex digits, big-endian.
    pub target: String,
    pub difficulty: Difficulty,
}

impl TargetInfo {
    pub fn new(compact: CompactTarget, strict: bool) -> Result<Self, String> {
        let target = compact.to_target(strict).map_err(|e| e.to_string())?;
        Ok(TargetInfo {
            bits: compact.to_string(),
            target: format!("{:064x}", target),
            difficulty: Difficulty::from_target(&target),
        })
    }

    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

/// Parsed header with its proof-of-work status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderInfo {
    #[serde(flatten)]
    pub header: HeaderRecord,
    /// Absent when the bits field does not decode strictly.
    pub target: Option<TargetInfo>,
    pub meets_target: bool,
}

impl HeaderInfo {
    pub fn new(header: &BlockHeader) -> Self {
        let target = TargetInfo::new(header.compact_target(), true).ok();
        HeaderInfo {
            header: header.to_display_record(),
            meets_target: header.meets_target().unwrap_or(false),
            target,
        }
    }

    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
}
