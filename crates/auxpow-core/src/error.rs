//! Error types for decoding and verifying merged-mining proofs.
//!
//! Every verification failure is an ordinary value. [`AuxPowError::kind`] collapses the
//! detailed variants onto the five reported outcomes callers branch on.

use thiserror::Error;

use crate::validation::ValidationSink;

/// Wire-format decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("non-canonical compact size encoding")]
    NonCanonicalVarInt,

    #[error("vector of {len} items exceeds limit of {max}")]
    OversizedVector { len: u64, max: u64 },

    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),

    #[error("invalid segwit flag byte {0:#04x}")]
    InvalidSegwitFlag(u8),

    #[error("segwit encoding with no witness data")]
    SuperfluousWitness,

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),
}

/// Malformed proof data: lengths, markers, and placement rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("embedding transaction is not a coinbase")]
    NotCoinbase,

    #[error("embedding transaction claims index {0}, the coinbase must be at index 0")]
    NotFirstTransaction(i32),

    #[error("merge-mining marker not found in coinbase script")]
    MissingMarker,

    #[error("more than one merge-mining marker in coinbase script")]
    DuplicateMarker,

    #[error("coinbase script has {available} bytes after the marker, {required} required")]
    TruncatedCommitment { available: usize, required: usize },

    #[error("chain merkle root first appears at offset {found}, expected right after the marker at {expected}")]
    CollidingCommitment { found: usize, expected: usize },

    #[error("merkle branch of {len} hashes exceeds limit of {max}")]
    BranchTooLong { len: usize, max: usize },

    #[error("chain merkle tree size {0} is not a power of two")]
    TreeSizeNotPowerOfTwo(u32),

    #[error("chain merkle tree height {height} exceeds limit of {max}")]
    TreeTooTall { height: u32, max: u32 },

    #[error("chain merkle branch has {branch_len} hashes, tree height is {height}")]
    BranchHeightMismatch { branch_len: usize, height: u32 },

    #[error("negative merkle index {0}")]
    NegativeIndex(i32),

    #[error("block version {0:#x} has the auxpow flag but no proof is attached")]
    MissingAuxPow(i32),

    #[error("block version {0:#x} lacks the auxpow flag but a proof is attached")]
    UnexpectedAuxPow(i32),

    #[error("block chain id {actual} does not match expected chain id {expected}")]
    WrongChainId { expected: i32, actual: i32 },
}

/// Why a header hash failed its declared target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowError {
    #[error("compact target {0:#010x} is negative")]
    NegativeTarget(u32),

    #[error("compact target {0:#010x} overflows 256 bits")]
    TargetOverflow(u32),

    #[error("compact target {0:#010x} is zero")]
    ZeroTarget(u32),

    #[error("compact target {bits:#010x} is easier than the network limit {limit:#010x}")]
    AboveLimit { bits: u32, limit: u32 },

    #[error("hash {hash} does not meet target {bits:#010x}")]
    HighHash { hash: String, bits: u32 },

    #[error("pow hasher failed: {0}")]
    Hasher(String),
}

/// Which merkle tree failed to reconstruct to its expected root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerkleTree {
    /// The parent block's transaction tree.
    Transaction,
    /// The multi-chain tree committed to in the coinbase.
    Chain,
}

impl core::fmt::Display for MerkleTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MerkleTree::Transaction => write!(f, "transaction"),
            MerkleTree::Chain => write!(f, "chain"),
        }
    }
}

/// Reported outcome of a failed proof check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Structural,
    CommitmentMismatch,
    SlotMismatch,
    PowInsufficient,
    SelfReferential,
}

/// A merged-mining proof was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuxPowError {
    #[error("parent block hash equals the auxiliary block hash")]
    SelfReferential,

    #[error("parent block carries our own chain id {0}")]
    ParentHasOurChainId(i32),

    #[error("malformed aux proof: {0}")]
    Structural(#[from] StructuralError),

    #[error("{0} merkle root mismatch")]
    CommitmentMismatch(MerkleTree),

    #[error("chain index {actual} does not match expected slot {expected}")]
    SlotMismatch { expected: u32, actual: i32 },

    #[error("parent proof of work insufficient: {0}")]
    PowInsufficient(#[from] PowError),
}

impl AuxPowError {
    /// Collapse onto the reported failure kind.
    pub fn kind(&self) -> FailureKind {
        match self {
            AuxPowError::SelfReferential | AuxPowError::ParentHasOurChainId(_) => {
                FailureKind::SelfReferential
            }
            AuxPowError::Structural(_) => FailureKind::Structural,
            AuxPowError::CommitmentMismatch(_) => FailureKind::CommitmentMismatch,
            AuxPowError::SlotMismatch { .. } => FailureKind::SlotMismatch,
            AuxPowError::PowInsufficient(_) => FailureKind::PowInsufficient,
        }
    }

    /// Misbehavior score attributed to the peer that relayed the proof.
    pub fn dos_score(&self) -> u32 {
        match self.kind() {
            FailureKind::PowInsufficient => 50,
            _ => 100,
        }
    }

    /// Every rejected proof invalidates the candidate block.
    pub fn report(&self, sink: &mut dyn ValidationSink) {
        sink.invalid(self.dos_score(), &self.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(AuxPowError::SelfReferential.kind(), FailureKind::SelfReferential);
        assert_eq!(AuxPowError::ParentHasOurChainId(7).kind(), FailureKind::SelfReferential);
        assert_eq!(
            AuxPowError::from(StructuralError::MissingMarker).kind(),
            FailureKind::Structural
        );
        assert_eq!(
            AuxPowError::CommitmentMismatch(MerkleTree::Chain).kind(),
            FailureKind::CommitmentMismatch
        );
        assert_eq!(
            AuxPowError::SlotMismatch { expected: 0, actual: 1 }.kind(),
            FailureKind::SlotMismatch
        );
        assert_eq!(
            AuxPowError::from(PowError::ZeroTarget(0)).kind(),
            FailureKind::PowInsufficient
        );
    }

    #[test]
    fn test_dos_scores() {
        assert_eq!(AuxPowError::SelfReferential.dos_score(), 100);
        assert_eq!(AuxPowError::from(PowError::ZeroTarget(0)).dos_score(), 50);
    }

    #[test]
    fn test_display() {
        let err = AuxPowError::CommitmentMismatch(MerkleTree::Transaction);
        assert_eq!(err.to_string(), "transaction merkle root mismatch");

        let err = AuxPowError::from(StructuralError::DuplicateMarker);
        assert_eq!(
            err.to_string(),
            "malformed aux proof: more than one merge-mining marker in coinbase script"
        );
    }
}
