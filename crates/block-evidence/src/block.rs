//! Full and partial block parsing.

use log::debug;

use crate::coinbase::CoinbaseEvidence;
use crate::constants::BLOCK_HEADER_SIZE;
use crate::error::{Error, Result};
use crate::hash::decode_hex;
use crate::header::BlockHeader;
use crate::merkle::compute_merkle_root;
use crate::transaction::{read_transactions, Transaction, TxCount};
use crate::wire::Reader;

/// A block header with some or all of its transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    header: BlockHeader,
    tx_count: u64,
    tx_count_raw: Vec<u8>,
    transactions: Vec<Transaction>,
}

impl Block {
    /// Parse a serialized block.
    ///
    /// `TxCount::All` reads every transaction the block declares;
    /// `TxCount::Exactly(n)` stops after the first `n`, which is enough to
    /// reach the coinbase without parsing the rest.
    pub fn parse(bytes: &[u8], count: TxCount) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let header = BlockHeader::from_bytes(reader.take(BLOCK_HEADER_SIZE, "block header")?)?;
        let (tx_count_raw, tx_count) = reader.varint("transaction count")?;

        let wanted = match count {
            TxCount::All => usize::try_from(tx_count).map_err(|_| Error::TxCountExceeded {
                requested: usize::MAX,
                available: tx_count,
            })?,
            TxCount::Exactly(n) if n as u64 > tx_count => {
                return Err(Error::TxCountExceeded {
                    requested: n,
                    available: tx_count,
                })
            }
            TxCount::Exactly(n) => n,
        };
        let transactions = read_transactions(&mut reader, TxCount::Exactly(wanted))?;

        if wanted as u64 == tx_count && !reader.is_empty() {
            debug!(
                "block {} has {} trailing bytes",
                header.hash_hex(),
                reader.remaining()
            );
        }

        Ok(Block {
            header,
            tx_count,
            tx_count_raw: tx_count_raw.to_vec(),
            transactions,
        })
    }

    pub fn from_hex(s: &str, count: TxCount) -> Result<Self> {
        let bytes = decode_hex(s)?;
        Self::parse(&bytes, count)
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Transaction count declared by the block.
    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    /// The count varint exactly as encoded.
    pub fn tx_count_raw(&self) -> &[u8] {
        &self.tx_count_raw
    }

    /// Parsed transactions, possibly fewer than declared.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_complete(&self) -> bool {
        self.transactions.len() as u64 == self.tx_count
    }

    pub fn txids(&self) -> Vec<[u8; 32]> {
        self.transactions.iter().map(Transaction::txid).collect()
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    pub fn coinbase_evidence(&self) -> Result<CoinbaseEvidence> {
        let coinbase = self.coinbase().ok_or(Error::NoTransactions)?;
        Ok(CoinbaseEvidence::extract(coinbase)?)
    }

    /// Whether the transactions hash to the header's merkle root.
    ///
    /// Fails if the block was only partly parsed.
    pub fn verify_merkle_root(&self) -> Result<bool> {
        if !self.is_complete() {
            return Err(Error::IncompleteBlock {
                parsed: self.transactions.len(),
                declared: self.tx_count,
            });
        }
        let root = compute_merkle_root(&self.txids())?;
        Ok(root == self.header.merkle_root())
    }
}
