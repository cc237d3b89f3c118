//! Merged-mining (AuxPoW) proof verification.
//!
//! This crate provides pure Rust implementations of:
//! - Parsing the merge-mining commitment from a parent coinbase script
//! - Verifying aux proofs against an auxiliary block hash and chain id
//! - Deterministic chain-slot assignment in the chain merkle tree
//! - Merkle branch construction and root reconstruction
//! - Transaction and block header wire codecs, with scrypt and SHA256d proof-of-work
//! - Chain membership, depth and maturity queries for transactions

pub mod auxpow;
pub mod block;
pub mod coinbase;
pub mod difficulty;
pub mod encode;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod merkle_tx;
pub mod network;
pub mod slot;
pub mod transaction;
pub mod validation;

pub use auxpow::{check_block_proof_of_work, stamp_merge_mining_capable, verify, AuxPow};
pub use block::{AuxBlockHeader, BlockHeader};
pub use coinbase::{scan_commitment, CoinbaseBuilder, MergeMiningCommitment};
pub use difficulty::{bits_to_difficulty, check_proof_of_work, decode_compact};
pub use encode::{deserialize, serialize, Decodable, Encodable};
pub use error::{AuxPowError, DecodeError, FailureKind, MerkleTree, PowError, StructuralError};
pub use hash::{double_sha256, hash_from_display_hex, hash_to_display_hex};
pub use merkle::{compute_merkle_root, merkle_branch, reconstruct_root};
pub use merkle_tx::{ChainView, MempoolAdmission, MerkleTx};
pub use network::{ConsensusParams, Network, PowAlgorithm};
pub use slot::expected_index;
pub use transaction::Transaction;
pub use validation::{ValidationSink, ValidationState};
