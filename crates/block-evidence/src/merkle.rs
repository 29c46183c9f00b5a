//! Merkle tree computation, inclusion proofs and BIP37 merkle blocks.

use log::{debug, trace};

use crate::error::{MerkleError, WireError};
use crate::hash::{display_hex_to_hash, double_sha256, hash_to_display_hex};

/// Hash two nodes into their parent.
fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    double_sha256(&combined)
}

/// Compute the merkle root from a list of transaction IDs.
///
/// A single transaction is its own root. Odd levels duplicate their last
/// node before pairing.
pub fn compute_merkle_root(txids: &[[u8; 32]]) -> Result<[u8; 32], MerkleError> {
    if txids.is_empty() {
        return Err(MerkleError::EmptyLeafSet);
    }

    let mut current_level: Vec<[u8; 32]> = txids.to_vec();

    while current_level.len() > 1 {
        let mut next_level = Vec::with_capacity((current_level.len() + 1) / 2);

        for pair in current_level.chunks(2) {
            let left = &pair[0];
            // If odd number of elements, duplicate the last one
            let right = pair.get(1).unwrap_or(left);
            next_level.push(hash_pair(left, right));
        }

        current_level = next_level;
    }

    Ok(current_level[0])
}

/// Merkle root in display format.
pub fn merkle_root_hex(txids: &[[u8; 32]]) -> Result<String, MerkleError> {
    Ok(hash_to_display_hex(&compute_merkle_root(txids)?))
}

/// Whether `txids` hash to the display-format root `expected`.
pub fn verify_merkle_root(txids: &[[u8; 32]], expected: &str) -> bool {
    match (compute_merkle_root(txids), display_hex_to_hash(expected)) {
        (Ok(root), Ok(expected)) => root == expected,
        _ => false,
    }
}

/// A sibling path from one leaf to the root.
///
/// Each flag tells how the sibling combines with the running hash:
/// `true` hashes `running ++ sibling`, `false` hashes `sibling ++ running`.
/// Siblings are ordered leaf first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MerkleProof {
    path: Vec<[u8; 32]>,
    flags: Vec<bool>,
}

impl MerkleProof {
    pub fn new(path: Vec<[u8; 32]>, flags: Vec<bool>) -> Result<Self, MerkleError> {
        if path.len() != flags.len() {
            return Err(MerkleError::FlagCountMismatch {
                path: path.len(),
                flags: flags.len(),
            });
        }
        Ok(MerkleProof { path, flags })
    }

    /// Rebuild a proof from concatenated sibling hashes and one byte per
    /// flag, as produced by [`MerkleProof::concatenated_path`] and
    /// [`MerkleProof::flag_bytes`].
    pub fn from_bytes(path: &[u8], flags: &[u8]) -> Result<Self, MerkleError> {
        if path.len() % 32 != 0 {
            return Err(WireError::InvalidLength {
                field: "merkle path",
                expected: (path.len() / 32 + 1) * 32,
                found: path.len(),
            }
            .into());
        }
        let path = path
            .chunks_exact(32)
            .map(|chunk| {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(chunk);
                hash
            })
            .collect();
        let flags = flags
            .iter()
            .map(|&flag| match flag {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(MerkleError::InvalidFlag(other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(path, flags)
    }

    /// Build the proof for `target` among `leaves`.
    ///
    /// Leaves are matched by value, so when a hash appears more than once
    /// every occurrence contributes siblings to the path.
    pub fn generate(leaves: &[[u8; 32]], target: &[u8; 32]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyLeafSet);
        }
        if !leaves.contains(target) {
            return Err(MerkleError::LeafNotFound(hash_to_display_hex(target)));
        }

        // (hash, on the path from the target to the root)
        let mut level: Vec<([u8; 32], bool)> = leaves.iter().map(|leaf| (*leaf, false)).collect();
        let mut path = Vec::new();
        let mut flags = Vec::new();

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                if let Some(&(last, _)) = level.last() {
                    level.push((last, false));
                }
            }

            let mut next_level = Vec::with_capacity(level.len() / 2);
            for pair in level.chunks_exact(2) {
                let (left, left_on_path) = pair[0];
                let (right, right_on_path) = pair[1];

                let sibling = if left == *target {
                    Some((right, true))
                } else if right == *target {
                    Some((left, false))
                } else if left_on_path {
                    Some((right, true))
                } else if right_on_path {
                    Some((left, false))
                } else {
                    None
                };

                if let Some((hash, flag)) = sibling {
                    path.push(hash);
                    flags.push(flag);
                }
                next_level.push((hash_pair(&left, &right), sibling.is_some()));
            }
            level = next_level;
        }

        trace!(
            "merkle proof for {} has {} siblings",
            hash_to_display_hex(target),
            path.len()
        );
        Ok(MerkleProof { path, flags })
    }

    pub fn path(&self) -> &[[u8; 32]] {
        &self.path
    }

    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// All sibling hashes joined in path order.
    pub fn concatenated_path(&self) -> Vec<u8> {
        self.path.concat()
    }

    /// One byte per flag, 0 or 1.
    pub fn flag_bytes(&self) -> Vec<u8> {
        self.flags.iter().map(|&flag| flag as u8).collect()
    }

    /// Fold the path over `leaf`, yielding the implied root.
    pub fn compute_root(&self, leaf: &[u8; 32]) -> [u8; 32] {
        self.path
            .iter()
            .zip(&self.flags)
            .fold(*leaf, |acc, (sibling, &leaf_on_left)| {
                if leaf_on_left {
                    hash_pair(&acc, sibling)
                } else {
                    hash_pair(sibling, &acc)
                }
            })
    }

    /// Whether the path leads from `leaf` to the display-format `root`.
    pub fn verify(&self, leaf: &[u8; 32], root: &str) -> bool {
        match display_hex_to_hash(root) {
            Ok(root) => self.compute_root(leaf) == root,
            Err(err) => {
                debug!("unreadable merkle root {:?}: {}", root, err);
                false
            }
        }
    }
}

/// Expand flag bytes into bits, least significant bit of each byte first.
pub fn flag_bits_from_bytes(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8u32).map(move |bit| (byte >> bit) & 1 == 1))
        .collect()
}

/// A compressed partial merkle tree as carried in a BIP37 merkle block.
///
/// Hashes and the root are in internal byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleBlock {
    root: [u8; 32],
    tx_count: u32,
    hashes: Vec<[u8; 32]>,
    flags: Vec<bool>,
}

/// A node of a rebuilt partial tree.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PartialNode {
    Leaf([u8; 32]),
    Internal(Box<PartialNode>, Box<PartialNode>),
}

impl PartialNode {
    fn hash(&self) -> [u8; 32] {
        match self {
            PartialNode::Leaf(hash) => *hash,
            PartialNode::Internal(left, right) => hash_pair(&left.hash(), &right.hash()),
        }
    }
}

/// Depth-first consumer of flags and hashes.
struct TreeBuilder<'a> {
    hashes: &'a [[u8; 32]],
    flags: &'a [bool],
    next_hash: usize,
    next_flag: usize,
    depth: u32,
    expected_leaf: Option<&'a [u8; 32]>,
}

impl<'a> TreeBuilder<'a> {
    fn flag(&mut self) -> Result<bool, &'static str> {
        let flag = *self.flags.get(self.next_flag).ok_or("ran out of flags")?;
        self.next_flag += 1;
        Ok(flag)
    }

    fn hash(&mut self) -> Result<[u8; 32], &'static str> {
        let hash = *self.hashes.get(self.next_hash).ok_or("ran out of hashes")?;
        self.next_hash += 1;
        Ok(hash)
    }

    fn node(&mut self, height: u32) -> Result<PartialNode, &'static str> {
        let flag = self.flag()?;
        if height < self.depth {
            if flag {
                let left = self.node(height + 1)?;
                let right = self.node(height + 1)?;
                Ok(PartialNode::Internal(Box::new(left), Box::new(right)))
            } else {
                Ok(PartialNode::Leaf(self.hash()?))
            }
        } else {
            let hash = self.hash()?;
            if flag {
                if let Some(expected) = self.expected_leaf {
                    if hash != *expected {
                        return Err("matched leaf differs from expected hash");
                    }
                }
            }
            Ok(PartialNode::Leaf(hash))
        }
    }
}

impl MerkleBlock {
    pub fn new(root: [u8; 32], tx_count: u32, hashes: Vec<[u8; 32]>, flags: Vec<bool>) -> Self {
        MerkleBlock {
            root,
            tx_count,
            hashes,
            flags,
        }
    }

    /// Build from the wire form, where flags are packed eight to a byte.
    pub fn from_flag_bytes(
        root: [u8; 32],
        tx_count: u32,
        hashes: Vec<[u8; 32]>,
        flag_bytes: &[u8],
    ) -> Self {
        Self::new(root, tx_count, hashes, flag_bits_from_bytes(flag_bytes))
    }

    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    pub fn tx_count(&self) -> u32 {
        self.tx_count
    }

    /// Tree depth, `ceil(log2(tx_count))`.
    pub fn depth(&self) -> u32 {
        match self.tx_count {
            0 | 1 => 0,
            n => u32::BITS - (n - 1).leading_zeros(),
        }
    }

    /// Rebuild the partial tree and compare its root.
    ///
    /// With `expected_leaf`, every flagged leaf at full depth must equal
    /// it. Malformed input verifies as false.
    pub fn verify(&self, expected_leaf: Option<&[u8; 32]>) -> bool {
        match self.rebuild(expected_leaf) {
            Ok(tree) => tree.hash() == self.root,
            Err(reason) => {
                debug!("invalid merkle block: {}", reason);
                false
            }
        }
    }

    fn rebuild(&self, expected_leaf: Option<&[u8; 32]>) -> Result<PartialNode, &'static str> {
        if self.tx_count == 0 {
            return Err("no transactions");
        }
        if self.flags.first() != Some(&true) {
            return Err("root flag not set");
        }

        let mut builder = TreeBuilder {
            hashes: &self.hashes,
            flags: &self.flags,
            next_hash: 0,
            next_flag: 0,
            depth: self.depth(),
            expected_leaf,
        };
        let tree = builder.node(0)?;
        trace!(
            "merkle block used {}/{} hashes and {}/{} flags",
            builder.next_hash,
            self.hashes.len(),
            builder.next_flag,
            self.flags.len()
        );
        Ok(tree)
    }
}
