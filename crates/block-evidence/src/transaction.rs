//! Legacy (non-witness) transaction parsing and serialization.

use core::ops::Range;

use serde::Serialize;

use crate::constants::{COINBASE_PREV_INDEX, COINBASE_PREV_TXID, SEGWIT_FLAG, SEGWIT_MARKER};
use crate::error::TxError;
use crate::hash::{decode_hex, double_sha256, hash_to_display_hex};
use crate::wire::{encode_varint, Reader};

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Txid of the spent output (internal byte order).
    pub prev_txid: [u8; 32],
    pub prev_index: u32,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    /// Whether this input spends the null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.prev_txid == COINBASE_PREV_TXID && self.prev_index == COINBASE_PREV_INDEX
    }

    fn serialize_into(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.prev_txid);
        output.extend_from_slice(&self.prev_index.to_le_bytes());
        encode_varint(self.script_sig.len() as u64, output);
        output.extend_from_slice(&self.script_sig);
        output.extend_from_slice(&self.sequence.to_le_bytes());
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Value in satoshis.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    fn serialize_into(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.value.to_le_bytes());
        encode_varint(self.script_pubkey.len() as u64, output);
        output.extend_from_slice(&self.script_pubkey);
    }
}

/// How many transactions to read from a block body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxCount {
    Exactly(usize),
    All,
}

/// A parsed transaction.
///
/// The exact bytes consumed are retained; the txid is their double hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    version: i32,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
    lock_time: u32,
    raw: Vec<u8>,
    txid: [u8; 32],
    // Position of each scriptSig within `raw`
    script_sig_spans: Vec<Range<usize>>,
}

impl Transaction {
    /// Build a transaction from its fields, encoding varints minimally.
    pub fn new(
        version: i32,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
        lock_time: u32,
    ) -> Self {
        let (raw, script_sig_spans) = encode(version, &inputs, &outputs, lock_time);
        Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            txid: double_sha256(&raw),
            raw,
            script_sig_spans,
        }
    }

    /// Parse one transaction from the start of `data`.
    ///
    /// Bytes after the transaction are ignored; see [`Transaction::size`].
    pub fn parse(data: &[u8]) -> Result<Self, TxError> {
        let mut reader = Reader::new(data);
        Self::read(&mut reader)
    }

    pub fn from_hex(s: &str) -> Result<Self, TxError> {
        let bytes = decode_hex(s)?;
        Self::parse(&bytes)
    }

    /// Parse one transaction at the reader's position.
    ///
    /// Offsets in errors are relative to the reader's underlying buffer.
    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self, TxError> {
        let start = reader.position();
        let version = reader.i32_le("tx version")?;

        if reader.peek(2) == Some(&[SEGWIT_MARKER, SEGWIT_FLAG][..]) {
            return Err(TxError::UnsupportedWitness {
                offset: reader.position(),
            });
        }

        let (_, input_count) = reader.varint("input count")?;
        let mut inputs = Vec::new();
        let mut script_sig_spans = Vec::new();
        for _ in 0..input_count {
            let prev_txid = reader.array::<32>("prev txid")?;
            let prev_index = reader.u32_le("prev index")?;
            let (_, script_len) = reader.varint("scriptSig length")?;
            let script_start = reader.position() - start;
            let script_sig = reader.take_len(script_len, "scriptSig")?.to_vec();
            script_sig_spans.push(script_start..script_start + script_sig.len());
            let sequence = reader.u32_le("sequence")?;
            inputs.push(TxInput {
                prev_txid,
                prev_index,
                script_sig,
                sequence,
            });
        }

        let (_, output_count) = reader.varint("output count")?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let value = reader.u64_le("output value")?;
            let script_pubkey = reader.var_bytes("scriptPubKey")?.to_vec();
            outputs.push(TxOutput {
                value,
                script_pubkey,
            });
        }

        let lock_time = reader.u32_le("lock time")?;
        let raw = reader.since(start).to_vec();

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            txid: double_sha256(&raw),
            raw,
            script_sig_spans,
        })
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }

    /// The exact bytes this transaction was parsed from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Number of bytes consumed while parsing.
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// Transaction ID (internal byte order).
    pub fn txid(&self) -> [u8; 32] {
        self.txid
    }

    pub fn txid_hex(&self) -> String {
        hash_to_display_hex(&self.txid)
    }

    /// Byte range of input `index`'s scriptSig within [`Transaction::raw`].
    pub fn script_sig_span(&self, index: usize) -> Option<Range<usize>> {
        self.script_sig_spans.get(index).cloned()
    }

    /// Re-encode from the decoded fields using minimal varints.
    ///
    /// Equals [`Transaction::raw`] unless the source used non-minimal
    /// varints.
    pub fn serialize(&self) -> Vec<u8> {
        encode(self.version, &self.inputs, &self.outputs, self.lock_time).0
    }

    pub fn to_display_record(&self) -> TransactionRecord {
        TransactionRecord {
            txid: self.txid_hex(),
            version: self.version,
            size: self.size(),
            inputs: self
                .inputs
                .iter()
                .map(|input| InputRecord {
                    prev_txid: hash_to_display_hex(&input.prev_txid),
                    prev_index: input.prev_index,
                    script_sig: hex::encode(&input.script_sig),
                    sequence: input.sequence,
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|out| OutputRecord {
                    value: out.value,
                    script_pubkey: hex::encode(&out.script_pubkey),
                })
                .collect(),
            lock_time: self.lock_time,
        }
    }
}

/// Encode transaction fields, returning the bytes and each scriptSig's span.
fn encode(
    version: i32,
    inputs: &[TxInput],
    outputs: &[TxOutput],
    lock_time: u32,
) -> (Vec<u8>, Vec<Range<usize>>) {
    let mut output = Vec::new();
    let mut spans = Vec::with_capacity(inputs.len());
    output.extend_from_slice(&version.to_le_bytes());
    encode_varint(inputs.len() as u64, &mut output);
    for input in inputs {
        input.serialize_into(&mut output);
        // scriptSig is followed only by the 4-byte sequence
        let end = output.len() - 4;
        spans.push(end - input.script_sig.len()..end);
    }
    encode_varint(outputs.len() as u64, &mut output);
    for out in outputs {
        out.serialize_into(&mut output);
    }
    output.extend_from_slice(&lock_time.to_le_bytes());
    (output, spans)
}

/// Parse consecutive transactions from `data`.
///
/// `TxCount::All` reads until the buffer is exhausted.
pub fn parse_transactions(data: &[u8], count: TxCount) -> Result<Vec<Transaction>, TxError> {
    let mut reader = Reader::new(data);
    read_transactions(&mut reader, count)
}

pub(crate) fn read_transactions(
    reader: &mut Reader<'_>,
    count: TxCount,
) -> Result<Vec<Transaction>, TxError> {
    let mut transactions = Vec::new();
    match count {
        TxCount::Exactly(n) => {
            for _ in 0..n {
                transactions.push(Transaction::read(reader)?);
            }
        }
        TxCount::All => {
            while !reader.is_empty() {
                transactions.push(Transaction::read(reader)?);
            }
        }
    }
    Ok(transactions)
}

/// Transaction fields with hashes and scripts as hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub txid: String,
    pub version: i32,
    pub size: usize,
    pub inputs: Vec<InputRecord>,
    pub outputs: Vec<OutputRecord>,
    pub lock_time: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputRecord {
    pub prev_txid: String,
    pub prev_index: u32,
    pub script_sig: String,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    pub value: u64,
    pub script_pubkey: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::WireError;

    // Coinbase of mainnet block 603268
    pub(crate) const COINBASE_603268: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff5f0384340904d30dc95d2f706f6f6c696e2e636f6d2ffabe6d6d97e21604204ac2a8e72201137d16c82253498af55de5432ff9cbde84d5e63ba20100000000000000b578094a09af6006dbcc9db78000f0c20e8b0f355a003a0000fe00000000ffffffff034845d54b0000000017a914b111f00eed1a8123dd0a1fed50b0793229ed47e7870000000000000000266a24b9e11b6db0bac66f0f2a2714d384501c639ce147d1c61f482e5c98e43c9a6168d507aecc0000000000000000266a24aa21a9ed6b6dd1678f89692e705ec9de8c06a2a0a9fd58d437a39c2878433248aeee7a6572a98c43";
    pub(crate) const COINBASE_603268_TXID: &str =
        "de612b874b23a78805ed022f55befbc94d12e2e78208d1d6d560df1d998451cb";

    #[test]
    fn test_parse_coinbase_transaction() {
        let tx = Transaction::from_hex(COINBASE_603268).unwrap();

        assert_eq!(tx.version(), 1);
        assert_eq!(tx.size(), 272);
        assert_eq!(tx.txid_hex(), COINBASE_603268_TXID);

        assert_eq!(tx.inputs().len(), 1);
        let input = &tx.inputs()[0];
        assert!(input.is_coinbase());
        assert_eq!(input.script_sig.len(), 95);
        assert_eq!(input.sequence, 0xffffffff);
        assert_eq!(tx.script_sig_span(0), Some(42..137));

        assert_eq!(tx.outputs().len(), 3);
        assert_eq!(tx.outputs()[0].value, 1272268104);
        assert_eq!(
            hex::encode(&tx.outputs()[0].script_pubkey),
            "a914b111f00eed1a8123dd0a1fed50b0793229ed47e787"
        );
        assert_eq!(tx.outputs()[1].value, 0);
        assert_eq!(tx.outputs()[1].script_pubkey.len(), 38);
        assert_eq!(tx.lock_time(), 1133291890);
    }

    #[test]
    fn test_serialize_matches_raw() {
        let tx = Transaction::from_hex(COINBASE_603268).unwrap();
        assert_eq!(hex::encode(tx.serialize()), COINBASE_603268);
        assert_eq!(tx.raw(), tx.serialize().as_slice());
    }

    #[test]
    fn test_new_matches_parse() {
        let parsed = Transaction::from_hex(COINBASE_603268).unwrap();
        let built = Transaction::new(
            parsed.version(),
            parsed.inputs().to_vec(),
            parsed.outputs().to_vec(),
            parsed.lock_time(),
        );

        assert_eq!(built, parsed);
        assert_eq!(built.txid_hex(), COINBASE_603268_TXID);
        assert_eq!(built.script_sig_span(0), Some(42..137));
    }

    #[test]
    fn test_new_from_fields() {
        let inputs = vec![
            TxInput {
                prev_txid: [0x11; 32],
                prev_index: 3,
                script_sig: vec![0x51; 300],
                sequence: 0xfffffffe,
            },
            TxInput {
                prev_txid: [0x22; 32],
                prev_index: 0,
                script_sig: Vec::new(),
                sequence: 0xffffffff,
            },
        ];
        let outputs = vec![TxOutput {
            value: 12_345,
            script_pubkey: vec![0x6a],
        }];
        let tx = Transaction::new(2, inputs, outputs, 500_000);

        // 300-byte script needs a 3-byte varint
        assert_eq!(tx.script_sig_span(0), Some(44..344));
        assert_eq!(tx.script_sig_span(1), Some(385..385));
        assert_eq!(tx.size(), 4 + 1 + 343 + 41 + 1 + 10 + 4);
        assert_eq!(tx.serialize(), tx.raw());
        assert_eq!(tx.txid(), double_sha256(tx.raw()));

        let reparsed = Transaction::parse(tx.raw()).unwrap();
        assert_eq!(reparsed, tx);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = hex::decode(COINBASE_603268).unwrap();
        bytes.extend_from_slice(&[0xde, 0xad]);

        let tx = Transaction::parse(&bytes).unwrap();
        assert_eq!(tx.size(), 272);
        assert_eq!(tx.txid_hex(), COINBASE_603268_TXID);
    }

    #[test]
    fn test_non_minimal_varint_keeps_raw() {
        // version 1, one input with a 3-byte encoded script length
        let mut bytes = vec![0x01, 0x00, 0x00, 0x00, 0x01];
        bytes.extend_from_slice(&[0x11; 36]);
        bytes.extend_from_slice(&[0xfd, 0x01, 0x00, 0x51]);
        bytes.extend_from_slice(&[0xff; 4]);
        bytes.extend_from_slice(&[0x00]); // no outputs
        bytes.extend_from_slice(&[0x00; 4]);

        let tx = Transaction::parse(&bytes).unwrap();
        assert_eq!(tx.raw(), bytes.as_slice());
        assert_eq!(tx.txid(), double_sha256(&bytes));
        assert_eq!(tx.inputs()[0].script_sig, vec![0x51]);
        assert_eq!(tx.script_sig_span(0), Some(44..45));
        // Re-encoding shortens the length prefix
        assert_eq!(tx.serialize().len(), bytes.len() - 2);
    }

    #[test]
    fn test_witness_rejected() {
        let mut bytes = vec![0x02, 0x00, 0x00, 0x00, SEGWIT_MARKER, SEGWIT_FLAG, 0x01];
        bytes.extend_from_slice(&[0u8; 64]);

        assert_eq!(
            Transaction::parse(&bytes),
            Err(TxError::UnsupportedWitness { offset: 4 })
        );
    }

    #[test]
    fn test_truncated_transaction() {
        let bytes = hex::decode(COINBASE_603268).unwrap();
        let err = Transaction::parse(&bytes[..100]).unwrap_err();

        assert_eq!(
            err,
            TxError::Wire(WireError::Truncated {
                field: "scriptSig",
                offset: 42,
                needed: 95,
                available: 58
            })
        );
        assert!(matches!(
            Transaction::parse(&bytes[..270]),
            Err(TxError::Wire(WireError::Truncated { field: "lock time", .. }))
        ));
    }

    #[test]
    fn test_parse_transactions_counts() {
        let one = hex::decode(COINBASE_603268).unwrap();
        let mut two = one.clone();
        two.extend_from_slice(&one);

        let all = parse_transactions(&two, TxCount::All).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], all[1]);

        let first = parse_transactions(&two, TxCount::Exactly(1)).unwrap();
        assert_eq!(first.len(), 1);

        // Offsets in errors are relative to the whole buffer
        let err = parse_transactions(&two[..300], TxCount::All).unwrap_err();
        assert!(matches!(
            err,
            TxError::Wire(WireError::Truncated { offset, .. }) if offset >= 272
        ));
    }

    #[test]
    fn test_display_record() {
        let record = Transaction::from_hex(COINBASE_603268)
            .unwrap()
            .to_display_record();
        assert_eq!(record.txid, COINBASE_603268_TXID);
        assert_eq!(record.inputs[0].prev_index, 0xffffffff);
        assert_eq!(record.inputs[0].prev_txid, "0".repeat(64));
        assert_eq!(record.outputs.len(), 3);
    }
}
