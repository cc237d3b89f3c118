//! Merge-mining commitments in parent coinbase scripts.
//!
//! The coinbase input script of the parent block carries
//! `[marker][chain merkle root][tree size][nonce]`, with the root in display byte order and
//! the two integers little-endian.

use crate::error::StructuralError;
use crate::network::MERGED_MINING_HEADER;
use crate::transaction::{OutPoint, Transaction, TxIn, TxOut};

/// Bytes that must follow the marker: root, tree size, nonce.
pub const COMMITMENT_SIZE: usize = 32 + 4 + 4;

/// Commitment parsed out of a parent coinbase script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeMiningCommitment {
    /// Root of the chain merkle tree (internal byte order).
    pub chain_merkle_root: [u8; 32],
    /// Number of leaves in the chain merkle tree.
    pub tree_size: u32,
    /// Nonce feeding the slot assignment.
    pub nonce: u32,
    /// Offset of the marker in the script.
    pub marker_offset: usize,
}

impl MergeMiningCommitment {
    /// Height of the chain merkle tree; the size must be a power of two.
    pub fn tree_height(&self) -> Result<u32, StructuralError> {
        if !self.tree_size.is_power_of_two() {
            return Err(StructuralError::TreeSizeNotPowerOfTwo(self.tree_size));
        }
        Ok(self.tree_size.trailing_zeros())
    }
}

/// Locate and parse the merge-mining commitment in a coinbase input script.
///
/// The marker must occur exactly once and be followed by a full commitment. The root bytes
/// must not occur anywhere in the script before the position right after the marker.
pub fn scan_commitment(script: &[u8]) -> Result<MergeMiningCommitment, StructuralError> {
    let mut markers = script
        .windows(MERGED_MINING_HEADER.len())
        .enumerate()
        .filter(|(_, window)| *window == MERGED_MINING_HEADER)
        .map(|(offset, _)| offset);

    let marker_offset = markers.next().ok_or(StructuralError::MissingMarker)?;
    if markers.next().is_some() {
        return Err(StructuralError::DuplicateMarker);
    }

    let start = marker_offset + MERGED_MINING_HEADER.len();
    let available = script.len() - start;
    if available < COMMITMENT_SIZE {
        return Err(StructuralError::TruncatedCommitment {
            available,
            required: COMMITMENT_SIZE,
        });
    }

    let root_display = &script[start..start + 32];
    let found = script
        .windows(32)
        .position(|window| window == root_display)
        .unwrap_or(start);
    if found != start {
        return Err(StructuralError::CollidingCommitment {
            found,
            expected: start,
        });
    }

    let mut chain_merkle_root = [0u8; 32];
    chain_merkle_root.copy_from_slice(root_display);
    chain_merkle_root.reverse();

    let mut word = [0u8; 4];
    word.copy_from_slice(&script[start + 32..start + 36]);
    let tree_size = u32::from_le_bytes(word);
    word.copy_from_slice(&script[start + 36..start + 40]);
    let nonce = u32::from_le_bytes(word);

    Ok(MergeMiningCommitment {
        chain_merkle_root,
        tree_size,
        nonce,
        marker_offset,
    })
}

/// Serialize a commitment: marker, root in display order, tree size, nonce.
pub fn commitment_bytes(chain_merkle_root: &[u8; 32], tree_size: u32, nonce: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MERGED_MINING_HEADER.len() + COMMITMENT_SIZE);
    bytes.extend_from_slice(&MERGED_MINING_HEADER);
    bytes.extend(chain_merkle_root.iter().rev());
    bytes.extend_from_slice(&tree_size.to_le_bytes());
    bytes.extend_from_slice(&nonce.to_le_bytes());
    bytes
}

/// Builder for parent-chain coinbase transactions carrying a merge-mining commitment.
#[derive(Debug, Clone)]
pub struct CoinbaseBuilder {
    /// The parent block height (required by BIP34).
    block_height: u32,
    /// Extra nonce data for merkle root variation (8 bytes).
    extra_nonce: [u8; 8],
    /// Serialized commitment, if any.
    commitment: Option<Vec<u8>>,
    /// Script receiving the block reward.
    payout_script: Vec<u8>,
}

impl CoinbaseBuilder {
    /// Create a new coinbase builder.
    pub fn new(block_height: u32, payout_script: Vec<u8>) -> Self {
        CoinbaseBuilder {
            block_height,
            extra_nonce: [0u8; 8],
            commitment: None,
            payout_script,
        }
    }

    /// Set the extra nonce (used to vary the merkle root).
    pub fn with_extra_nonce(mut self, extra_nonce: [u8; 8]) -> Self {
        self.extra_nonce = extra_nonce;
        self
    }

    /// Commit to a chain merkle tree.
    pub fn with_commitment(mut self, chain_merkle_root: [u8; 32], tree_size: u32, nonce: u32) -> Self {
        self.commitment = Some(commitment_bytes(&chain_merkle_root, tree_size, nonce));
        self
    }

    /// Build the coinbase transaction paying `total_reward`.
    pub fn build(&self, total_reward: u64) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxIn {
                previous_output: OutPoint::NULL,
                script_sig: self.build_script_sig(),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            }],
            outputs: vec![TxOut {
                value: total_reward,
                script_pubkey: self.payout_script.clone(),
            }],
            lock_time: 0,
        }
    }

    /// Build the scriptSig: BIP34 height push, extra nonce, commitment.
    fn build_script_sig(&self) -> Vec<u8> {
        let mut script_sig = Vec::with_capacity(64);

        let height_bytes = encode_block_height(self.block_height);
        script_sig.push(height_bytes.len() as u8); // Push opcode
        script_sig.extend_from_slice(&height_bytes);

        script_sig.extend_from_slice(&self.extra_nonce);

        if let Some(commitment) = &self.commitment {
            script_sig.extend_from_slice(commitment);
        }

        script_sig
    }
}

/// Encode a block height according to BIP34.
///
/// The height is minimally encoded as a little-endian integer with proper handling
/// of the sign bit.
fn encode_block_height(height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut n = height;

    while n > 0 {
        bytes.push((n & 0xFF) as u8);
        n >>= 8;
    }

    // If the high bit is set, append a 0x00 byte to prevent it being
    // interpreted as negative
    if let Some(&last) = bytes.last() {
        if last & 0x80 != 0 {
            bytes.push(0x00);
        }
    }

    bytes
}
