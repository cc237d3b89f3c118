//! Transactions linked to a block by a merkle branch.
//!
//! Depth is derived from the caller's view of the best chain on every query and never
//! cached, so a reorganization is reflected immediately. The caller must hold whatever
//! lock protects its chain index for the duration of a query.

use thiserror::Error;
use tracing::trace;

use crate::encode::{encode_hashes, Decodable, Encodable, Reader};
use crate::error::DecodeError;
use crate::merkle::{merkle_branch, reconstruct_root, MAX_MERKLE_BRANCH_LENGTH};
use crate::transaction::Transaction;
use crate::validation::ValidationSink;

/// `block_hash` value marking a transaction the wallet gave up on.
pub const ABANDON_HASH: [u8; 32] = {
    let mut hash = [0u8; 32];
    hash[0] = 1;
    hash
};

/// Where a block sits relative to the best chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLocation {
    pub height: u32,
    pub merkle_root: [u8; 32],
    /// Whether the block is an ancestor of the current tip.
    pub in_best_chain: bool,
}

/// Read-only view of the block index and the current best chain.
pub trait ChainView {
    /// Look up a known block.
    fn block(&self, hash: &[u8; 32]) -> Option<BlockLocation>;

    /// Height of the current tip.
    fn tip_height(&self) -> u32;
}

/// Policy knobs forwarded to mempool admission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionPolicy {
    /// Apply the free-transaction rate limit.
    pub limit_free: bool,
    /// Reject if the fee exceeds this many base units.
    pub absurd_fee: Option<u64>,
}

/// Mempool refused a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mempool rejected transaction: {reason}")]
pub struct MempoolRejection {
    pub reason: String,
    /// Zero for policy rejections of otherwise valid transactions.
    pub dos_score: u32,
}

impl MempoolRejection {
    pub fn report(&self, sink: &mut dyn ValidationSink) {
        if self.dos_score > 0 {
            sink.invalid(self.dos_score, &self.to_string());
        } else {
            sink.discard(&self.to_string());
        }
    }
}

/// Mempool admission.
pub trait MempoolAdmission {
    fn accept(&self, tx: &Transaction, policy: &AdmissionPolicy) -> Result<(), MempoolRejection>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleTxError {
    #[error("position {position} out of range for block with {len} transactions")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("transaction not found in block")]
    NotInBlock,
}

/// A transaction plus an optional claim of membership in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTx {
    pub tx: Transaction,
    /// Zero while unconfirmed, [`ABANDON_HASH`] once abandoned.
    pub block_hash: [u8; 32],
    pub merkle_branch: Vec<[u8; 32]>,
    /// Position in the block, -1 while unset.
    pub index: i32,
}

impl MerkleTx {
    /// A fresh, unconfirmed transaction.
    pub fn new(tx: Transaction) -> Self {
        MerkleTx {
            tx,
            block_hash: [0u8; 32],
            merkle_branch: Vec::new(),
            index: -1,
        }
    }

    pub fn txid(&self) -> [u8; 32] {
        self.tx.txid()
    }

    /// True while no block is recorded, including after abandonment.
    pub fn hash_unset(&self) -> bool {
        self.block_hash == [0u8; 32] || self.block_hash == ABANDON_HASH
    }

    pub fn is_abandoned(&self) -> bool {
        self.block_hash == ABANDON_HASH
    }

    pub fn set_abandoned(&mut self) {
        self.block_hash = ABANDON_HASH;
    }

    /// Record membership at `position` in a block whose transactions are `txids`.
    pub fn set_merkle_branch(
        &mut self,
        block_hash: [u8; 32],
        txids: &[[u8; 32]],
        position: usize,
    ) -> Result<(), MerkleTxError> {
        let branch = merkle_branch(txids, position).ok_or(MerkleTxError::PositionOutOfRange {
            position,
            len: txids.len(),
        })?;
        self.block_hash = block_hash;
        self.merkle_branch = branch;
        self.index = position as i32;
        Ok(())
    }

    /// Find this transaction in a block and record membership.
    pub fn locate_in_block(
        &mut self,
        block_hash: [u8; 32],
        txids: &[[u8; 32]],
    ) -> Result<usize, MerkleTxError> {
        let txid = self.txid();
        let position = txids
            .iter()
            .position(|id| *id == txid)
            .ok_or(MerkleTxError::NotInBlock)?;
        self.set_merkle_branch(block_hash, txids, position)?;
        Ok(position)
    }

    /// Confirmations in the best chain of `view`.
    ///
    /// 0 when no block is recorded, the block is unknown, or the branch does not match the
    /// block's merkle root; -1 when the block is known but off the best chain.
    pub fn depth_in_main_chain(&self, view: &dyn ChainView) -> i32 {
        if self.hash_unset() {
            return 0;
        }
        let Some(location) = view.block(&self.block_hash) else {
            return 0;
        };
        if !location.in_best_chain {
            trace!(height = location.height, "recording block is off the best chain");
            return -1;
        }
        if !self.branch_matches(&location.merkle_root) {
            return 0;
        }
        let depth = view.tip_height().saturating_sub(location.height) as i64 + 1;
        depth.min(i32::MAX as i64) as i32
    }

    pub fn is_in_main_chain(&self, view: &dyn ChainView) -> bool {
        self.depth_in_main_chain(view) > 0
    }

    /// Blocks left until a coinbase may be spent; always 0 for other transactions.
    ///
    /// The window is `maturity + 1` confirmations.
    pub fn blocks_to_maturity(&self, view: &dyn ChainView, maturity: u32) -> u32 {
        if !self.tx.is_coinbase() {
            return 0;
        }
        let window = maturity as i64 + 1;
        (window - self.depth_in_main_chain(view) as i64).max(0) as u32
    }

    /// Forward to mempool admission.
    pub fn accept_to_pool(
        &self,
        pool: &dyn MempoolAdmission,
        policy: &AdmissionPolicy,
    ) -> Result<(), MempoolRejection> {
        pool.accept(&self.tx, policy)
    }

    fn branch_matches(&self, merkle_root: &[u8; 32]) -> bool {
        if self.index < 0 {
            return false;
        }
        matches!(
            reconstruct_root(self.txid(), &self.merkle_branch, self.index as u32),
            Ok(root) if root == *merkle_root
        )
    }
}

impl Encodable for MerkleTx {
    fn consensus_encode(&self, out: &mut Vec<u8>) {
        self.tx.consensus_encode(out);
        out.extend_from_slice(&self.block_hash);
        encode_hashes(&self.merkle_branch, out);
        out.extend_from_slice(&self.index.to_le_bytes());
    }
}

impl Decodable for MerkleTx {
    fn consensus_decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let tx = Transaction::consensus_decode(reader)?;
        let block_hash = reader.read_array()?;
        let merkle_branch = reader.read_hashes(MAX_MERKLE_BRANCH_LENGTH)?;
        let index = reader.read_i32_le()?;
        Ok(MerkleTx {
            tx,
            block_hash,
            merkle_branch,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::coinbase::CoinbaseBuilder;
    use crate::encode::{deserialize, serialize};
    use crate::hash::double_sha256;
    use crate::merkle::compute_merkle_root;
    use crate::network::COINBASE_MATURITY;
    use crate::validation::ValidationState;

    #[derive(Default)]
    struct TestChain {
        blocks: HashMap<[u8; 32], BlockLocation>,
        tip: u32,
    }

    impl ChainView for TestChain {
        fn block(&self, hash: &[u8; 32]) -> Option<BlockLocation> {
            self.blocks.get(hash).copied()
        }

        fn tip_height(&self) -> u32 {
            self.tip
        }
    }

    fn confirmed_coinbase(chain: &mut TestChain, height: u32) -> MerkleTx {
        let coinbase = CoinbaseBuilder::new(height, vec![0x51]).build(50);
        let txids = [coinbase.txid(), double_sha256(b"tx1"), double_sha256(b"tx2")];
        let block_hash = double_sha256(&height.to_le_bytes());

        chain.blocks.insert(
            block_hash,
            BlockLocation {
                height,
                merkle_root: compute_merkle_root(&txids),
                in_best_chain: true,
            },
        );

        let mut mtx = MerkleTx::new(coinbase);
        assert_eq!(mtx.locate_in_block(block_hash, &txids), Ok(0));
        mtx
    }

    #[test]
    fn test_unconfirmed_depth_is_zero() {
        let chain = TestChain::default();
        let mtx = MerkleTx::new(CoinbaseBuilder::new(1, vec![0x51]).build(50));

        assert!(mtx.hash_unset());
        assert_eq!(mtx.index, -1);
        assert_eq!(mtx.depth_in_main_chain(&chain), 0);
        assert!(!mtx.is_in_main_chain(&chain));
    }

    #[test]
    fn test_depth_follows_tip() {
        let mut chain = TestChain::default();
        let mtx = confirmed_coinbase(&mut chain, 10);

        chain.tip = 10;
        assert_eq!(mtx.depth_in_main_chain(&chain), 1);

        chain.tip = 15;
        assert_eq!(mtx.depth_in_main_chain(&chain), 6);
        assert!(mtx.is_in_main_chain(&chain));
    }

    #[test]
    fn test_reorg_reports_orphaned() {
        let mut chain = TestChain::default();
        let mtx = confirmed_coinbase(&mut chain, 10);
        chain.tip = 20;
        assert_eq!(mtx.depth_in_main_chain(&chain), 11);

        // The recording block drops off the best chain; stored branch data is unchanged.
        for location in chain.blocks.values_mut() {
            location.in_best_chain = false;
        }
        assert_eq!(mtx.depth_in_main_chain(&chain), -1);
        assert!(!mtx.is_in_main_chain(&chain));
    }

    #[test]
    fn test_unknown_block_and_bad_branch() {
        let mut chain = TestChain::default();
        let mut mtx = confirmed_coinbase(&mut chain, 3);
        chain.tip = 3;

        let mut tampered = mtx.clone();
        tampered.merkle_branch[0][0] ^= 1;
        assert_eq!(tampered.depth_in_main_chain(&chain), 0);

        mtx.block_hash = [0x99; 32];
        assert_eq!(mtx.depth_in_main_chain(&chain), 0);
    }

    #[test]
    fn test_abandoned() {
        let mut chain = TestChain::default();
        let mut mtx = confirmed_coinbase(&mut chain, 3);
        chain.tip = 3;

        mtx.set_abandoned();
        assert!(mtx.is_abandoned());
        assert!(mtx.hash_unset());
        assert_eq!(mtx.depth_in_main_chain(&chain), 0);
    }

    #[test]
    fn test_blocks_to_maturity() {
        let mut chain = TestChain::default();
        let mtx = confirmed_coinbase(&mut chain, 100);

        chain.tip = 100;
        assert_eq!(mtx.blocks_to_maturity(&chain, COINBASE_MATURITY), 100);

        chain.tip = 200;
        assert_eq!(mtx.blocks_to_maturity(&chain, COINBASE_MATURITY), 0);

        chain.tip = 500;
        assert_eq!(mtx.blocks_to_maturity(&chain, COINBASE_MATURITY), 0);

        for location in chain.blocks.values_mut() {
            location.in_best_chain = false;
        }
        assert_eq!(mtx.blocks_to_maturity(&chain, COINBASE_MATURITY), 102);
    }

    #[test]
    fn test_non_coinbase_is_mature() {
        let chain = TestChain::default();
        let mut tx = CoinbaseBuilder::new(1, vec![0x51]).build(50);
        tx.inputs[0].previous_output.vout = 0;
        assert_eq!(MerkleTx::new(tx).blocks_to_maturity(&chain, COINBASE_MATURITY), 0);
    }

    #[test]
    fn test_set_merkle_branch_out_of_range() {
        let mut mtx = MerkleTx::new(CoinbaseBuilder::new(1, vec![0x51]).build(50));
        assert_eq!(
            mtx.set_merkle_branch([1; 32], &[[0; 32]], 1),
            Err(MerkleTxError::PositionOutOfRange { position: 1, len: 1 })
        );
        assert_eq!(mtx.locate_in_block([1; 32], &[[0; 32]]), Err(MerkleTxError::NotInBlock));
        assert!(mtx.hash_unset());
    }

    #[test]
    fn test_wire_format() {
        let mut chain = TestChain::default();
        let mtx = confirmed_coinbase(&mut chain, 7);

        let raw = serialize(&mtx);
        let tx_len = serialize(&mtx.tx).len();
        assert_eq!(&raw[tx_len..tx_len + 32], &mtx.block_hash);
        assert_eq!(raw[tx_len + 32], 2);
        assert_eq!(&raw[raw.len() - 4..], &0i32.to_le_bytes());

        assert_eq!(deserialize::<MerkleTx>(&raw), Ok(mtx));
    }

    struct RecordingPool {
        seen: RefCell<Vec<AdmissionPolicy>>,
        verdict: Result<(), MempoolRejection>,
    }

    impl MempoolAdmission for RecordingPool {
        fn accept(&self, _tx: &Transaction, policy: &AdmissionPolicy) -> Result<(), MempoolRejection> {
            self.seen.borrow_mut().push(*policy);
            self.verdict.clone()
        }
    }

    #[test]
    fn test_accept_to_pool_forwards() {
        let mtx = MerkleTx::new(CoinbaseBuilder::new(1, vec![0x51]).build(50));
        let rejection = MempoolRejection {
            reason: "insufficient fee".to_string(),
            dos_score: 0,
        };
        let pool = RecordingPool {
            seen: RefCell::new(Vec::new()),
            verdict: Err(rejection.clone()),
        };
        let policy = AdmissionPolicy {
            limit_free: true,
            absurd_fee: Some(10_000),
        };

        assert_eq!(mtx.accept_to_pool(&pool, &policy), Err(rejection.clone()));
        assert_eq!(pool.seen.borrow().as_slice(), &[policy]);

        let mut state = ValidationState::default();
        rejection.report(&mut state);
        assert!(matches!(state, ValidationState::Discarded { .. }));
    }
}
