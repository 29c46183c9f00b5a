//! WebAssembly bindings for Bitcoin block evidence.
//!
//! This crate provides JavaScript-accessible APIs for:
//! - Parsing block headers and checking proof of work
//! - Decoding compact difficulty targets
//! - Verifying merkle inclusion proofs
//! - Assembling coinbase evidence from block explorer JSON

use wasm_bindgen::prelude::*;

pub mod api;
pub mod state;

// Re-export main entry points for JS access
pub use api::{build_evidence, decode_target, parse_header, verify_merkle_proof};

/// Initialize the WASM module with better panic messages.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
