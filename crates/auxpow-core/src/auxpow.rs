//! Merged-mining proofs.
//!
//! An [`AuxPow`] shows that work done on a parent chain commits to an auxiliary block:
//! the parent coinbase sits in the parent's transaction tree, its script commits to a chain
//! merkle tree, the auxiliary block hash is a leaf of that tree at the slot assigned to its
//! chain id, and the parent header meets its own target.

use tracing::{debug, trace};

use crate::block::{AuxBlockHeader, BlockHeader};
use crate::coinbase::{scan_commitment, CoinbaseBuilder};
use crate::difficulty::check_proof_of_work;
use crate::encode::{encode_hashes, Decodable, Encodable, Reader};
use crate::error::{AuxPowError, DecodeError, MerkleTree, PowError, StructuralError};
use crate::hash::hash_to_display_hex;
use crate::merkle::{reconstruct_root, MAX_MERKLE_BRANCH_LENGTH};
use crate::merkle_tx::MerkleTx;
use crate::network::{ConsensusParams, PowAlgorithm, MAX_CHAIN_MERKLE_HEIGHT};
use crate::slot::expected_index;

/// Proof that a parent-chain block's work commits to an auxiliary block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxPow {
    /// Parent coinbase with its branch into the parent's transaction tree.
    pub coinbase_tx: MerkleTx,
    /// Branch from the auxiliary block hash to the committed chain merkle root.
    pub chain_merkle_branch: Vec<[u8; 32]>,
    /// Leaf position of the auxiliary block hash in the chain merkle tree.
    pub chain_index: i32,
    /// Parent header carrying the actual proof of work.
    pub parent_block: BlockHeader,
}

impl AuxPow {
    pub fn new(
        coinbase_tx: MerkleTx,
        chain_merkle_branch: Vec<[u8; 32]>,
        chain_index: i32,
        parent_block: BlockHeader,
    ) -> Self {
        AuxPow {
            coinbase_tx,
            chain_merkle_branch,
            chain_index,
            parent_block,
        }
    }

    /// Single-chain proof for `aux_block_hash`: a coinbase committing to a height-0 chain tree
    /// as the only transaction of an unmined parent block.
    pub fn placeholder(aux_block_hash: [u8; 32], bits: u32, timestamp: u32) -> Self {
        let coinbase = CoinbaseBuilder::new(0, Vec::new())
            .with_commitment(aux_block_hash, 1, 0)
            .build(0);
        let txid = coinbase.txid();

        let mut coinbase_tx = MerkleTx::new(coinbase);
        coinbase_tx.index = 0;

        AuxPow {
            coinbase_tx,
            chain_merkle_branch: Vec::new(),
            chain_index: 0,
            parent_block: BlockHeader::new([0u8; 32], txid, timestamp, bits),
        }
    }

    pub fn parent_hash(&self) -> [u8; 32] {
        self.parent_block.hash()
    }

    pub fn parent_pow_hash(&self, algorithm: PowAlgorithm) -> Result<[u8; 32], PowError> {
        self.parent_block.pow_hash(algorithm)
    }

    /// Verify this proof for `aux_block_hash` on chain `chain_id`.
    ///
    /// Checks run in a fixed order and stop at the first failure.
    pub fn check(
        &self,
        aux_block_hash: &[u8; 32],
        chain_id: i32,
        params: &ConsensusParams,
    ) -> Result<(), AuxPowError> {
        let result = self.check_steps(aux_block_hash, chain_id, params);
        if let Err(err) = &result {
            debug!(
                chain_id,
                aux_block = %hash_to_display_hex(aux_block_hash),
                %err,
                "aux proof rejected"
            );
        }
        result
    }

    fn check_steps(
        &self,
        aux_block_hash: &[u8; 32],
        chain_id: i32,
        params: &ConsensusParams,
    ) -> Result<(), AuxPowError> {
        // Size caps come before any hashing.
        check_branch_length(&self.coinbase_tx.merkle_branch)?;
        check_branch_length(&self.chain_merkle_branch)?;

        let parent_hash = self.parent_block.hash();
        if parent_hash == *aux_block_hash {
            return Err(AuxPowError::SelfReferential);
        }
        if params.strict_chain_id && self.parent_block.chain_id() == chain_id {
            return Err(AuxPowError::ParentHasOurChainId(chain_id));
        }

        let coinbase = &self.coinbase_tx.tx;
        let script = coinbase
            .coinbase_script()
            .ok_or(StructuralError::NotCoinbase)?;
        if self.coinbase_tx.index != 0 {
            return Err(StructuralError::NotFirstTransaction(self.coinbase_tx.index).into());
        }

        let tx_root = reconstruct_root(coinbase.txid(), &self.coinbase_tx.merkle_branch, 0)?;
        if tx_root != self.parent_block.merkle_root {
            return Err(AuxPowError::CommitmentMismatch(MerkleTree::Transaction));
        }
        trace!(parent = %hash_to_display_hex(&parent_hash), "coinbase is in parent block");

        let commitment = scan_commitment(script)?;

        let height = commitment.tree_height()?;
        if height > MAX_CHAIN_MERKLE_HEIGHT {
            return Err(StructuralError::TreeTooTall {
                height,
                max: MAX_CHAIN_MERKLE_HEIGHT,
            }
            .into());
        }
        if self.chain_merkle_branch.len() != height as usize {
            return Err(StructuralError::BranchHeightMismatch {
                branch_len: self.chain_merkle_branch.len(),
                height,
            }
            .into());
        }
        if self.chain_index < 0 {
            return Err(StructuralError::NegativeIndex(self.chain_index).into());
        }
        let chain_index = self.chain_index as u32;

        let chain_root = reconstruct_root(*aux_block_hash, &self.chain_merkle_branch, chain_index)?;
        if chain_root != commitment.chain_merkle_root {
            return Err(AuxPowError::CommitmentMismatch(MerkleTree::Chain));
        }

        let expected = expected_index(commitment.nonce, chain_id, height);
        if chain_index != expected {
            return Err(AuxPowError::SlotMismatch {
                expected,
                actual: self.chain_index,
            });
        }
        trace!(height, slot = expected, "chain commitment verified");

        let pow_hash = self.parent_pow_hash(params.pow_algorithm)?;
        check_proof_of_work(&pow_hash, self.parent_block.bits, params)?;

        Ok(())
    }
}

fn check_branch_length(branch: &[[u8; 32]]) -> Result<(), StructuralError> {
    if branch.len() > MAX_MERKLE_BRANCH_LENGTH {
        return Err(StructuralError::BranchTooLong {
            len: branch.len(),
            max: MAX_MERKLE_BRANCH_LENGTH,
        });
    }
    Ok(())
}

/// Verify `proof` for `aux_block_hash` on chain `chain_id`.
pub fn verify(
    proof: &AuxPow,
    aux_block_hash: &[u8; 32],
    chain_id: i32,
    params: &ConsensusParams,
) -> Result<(), AuxPowError> {
    proof.check(aux_block_hash, chain_id, params)
}

/// Mark a freshly built header as merge-mined and attach a placeholder proof.
///
/// The flag is set first, so the placeholder commits to the final header hash. The parent
/// header inherits the auxiliary header's bits and timestamp, ready to be ground.
pub fn stamp_merge_mining_capable(header: &mut AuxBlockHeader) {
    header.header.set_auxpow_flag(true);
    let block_hash = header.hash();
    header.auxpow = Some(Box::new(AuxPow::placeholder(
        block_hash,
        header.header.bits,
        header.header.timestamp,
    )));
}

/// Full proof-of-work check of an auxiliary-chain header.
///
/// Headers without a proof must meet their own target. Headers with a proof must carry the
/// version flag, pass [`AuxPow::check`], and the parent's work must also meet the auxiliary
/// header's target.
pub fn check_block_proof_of_work(
    header: &AuxBlockHeader,
    params: &ConsensusParams,
) -> Result<(), AuxPowError> {
    let block = &header.header;
    if !block.is_legacy() && params.strict_chain_id && block.chain_id() != params.auxpow_chain_id {
        return Err(StructuralError::WrongChainId {
            expected: params.auxpow_chain_id,
            actual: block.chain_id(),
        }
        .into());
    }

    match &header.auxpow {
        None => {
            if block.is_auxpow() {
                return Err(StructuralError::MissingAuxPow(block.version).into());
            }
            let pow_hash = block.pow_hash(params.pow_algorithm)?;
            check_proof_of_work(&pow_hash, block.bits, params)?;
        }
        Some(auxpow) => {
            if !block.is_auxpow() {
                return Err(StructuralError::UnexpectedAuxPow(block.version).into());
            }
            auxpow.check(&block.hash(), block.chain_id(), params)?;
            let pow_hash = auxpow.parent_pow_hash(params.pow_algorithm)?;
            check_proof_of_work(&pow_hash, block.bits, params)?;
        }
    }
    Ok(())
}

impl Encodable for AuxPow {
    fn consensus_encode(&self, out: &mut Vec<u8>) {
        self.coinbase_tx.consensus_encode(out);
        encode_hashes(&self.chain_merkle_branch, out);
        out.extend_from_slice(&self.chain_index.to_le_bytes());
        self.parent_block.consensus_encode(out);
    }
}

impl Decodable for AuxPow {
    fn consensus_decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let coinbase_tx = MerkleTx::consensus_decode(reader)?;
        let chain_merkle_branch = reader.read_hashes(MAX_MERKLE_BRANCH_LENGTH)?;
        let chain_index = reader.read_i32_le()?;
        let parent_block = BlockHeader::consensus_decode(reader)?;
        Ok(AuxPow {
            coinbase_tx,
            chain_merkle_branch,
            chain_index,
            parent_block,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{deserialize, serialize};
    use crate::error::FailureKind;
    use crate::hash::double_sha256;
    use crate::network::{REGTEST_POW_LIMIT_BITS, VERSION_AUXPOW};

    const CHAIN_ID: i32 = 1;

    fn regtest() -> ConsensusParams {
        ConsensusParams {
            pow_algorithm: PowAlgorithm::Sha256d,
            pow_limit_bits: REGTEST_POW_LIMIT_BITS,
            ..ConsensusParams::default()
        }
    }

    fn grind(parent: &mut BlockHeader, params: &ConsensusParams) {
        while check_proof_of_work(
            &parent.pow_hash(params.pow_algorithm).unwrap(),
            parent.bits,
            params,
        )
        .is_err()
        {
            parent.nonce += 1;
        }
    }

    fn single_chain_proof(aux_hash: [u8; 32], params: &ConsensusParams) -> AuxPow {
        let mut proof = AuxPow::placeholder(aux_hash, REGTEST_POW_LIMIT_BITS, 1_700_000_000);
        grind(&mut proof.parent_block, params);
        proof
    }

    #[test]
    fn test_single_chain_proof_verifies() {
        let params = regtest();
        let aux_hash = double_sha256(b"aux block");
        let proof = single_chain_proof(aux_hash, &params);

        assert_eq!(verify(&proof, &aux_hash, CHAIN_ID, &params), Ok(()));
    }

    #[test]
    fn test_self_referential() {
        let params = regtest();
        let proof = single_chain_proof([0x11; 32], &params);
        let parent_hash = proof.parent_hash();

        let err = proof.check(&parent_hash, CHAIN_ID, &params).unwrap_err();
        assert_eq!(err, AuxPowError::SelfReferential);
    }

    #[test]
    fn test_parent_with_our_chain_id() {
        let params = regtest();
        let aux_hash = [0x11; 32];
        let mut proof = single_chain_proof(aux_hash, &params);
        proof.parent_block.set_chain_id(CHAIN_ID);
        grind(&mut proof.parent_block, &params);

        let err = proof.check(&aux_hash, CHAIN_ID, &params).unwrap_err();
        assert_eq!(err, AuxPowError::ParentHasOurChainId(CHAIN_ID));
        assert_eq!(err.kind(), FailureKind::SelfReferential);

        let relaxed = ConsensusParams {
            strict_chain_id: false,
            ..regtest()
        };
        assert_eq!(proof.check(&aux_hash, CHAIN_ID, &relaxed), Ok(()));
    }

    #[test]
    fn test_non_coinbase_rejected() {
        let params = regtest();
        let aux_hash = [0x11; 32];
        let mut proof = single_chain_proof(aux_hash, &params);
        proof.coinbase_tx.tx.inputs[0].previous_output.vout = 0;

        assert_eq!(
            proof.check(&aux_hash, CHAIN_ID, &params),
            Err(StructuralError::NotCoinbase.into())
        );

        let mut proof = single_chain_proof(aux_hash, &params);
        proof.coinbase_tx.index = 1;
        assert_eq!(
            proof.check(&aux_hash, CHAIN_ID, &params),
            Err(StructuralError::NotFirstTransaction(1).into())
        );
    }

    #[test]
    fn test_oversized_branch_rejected_first() {
        let params = regtest();
        let aux_hash = [0x11; 32];
        let mut proof = single_chain_proof(aux_hash, &params);
        proof.chain_merkle_branch = vec![[0u8; 32]; MAX_MERKLE_BRANCH_LENGTH + 1];
        let parent_hash = proof.parent_hash();

        // Reported even though the proof is also self-referential.
        assert_eq!(
            proof.check(&parent_hash, CHAIN_ID, &params),
            Err(StructuralError::BranchTooLong {
                len: MAX_MERKLE_BRANCH_LENGTH + 1,
                max: MAX_MERKLE_BRANCH_LENGTH,
            }
            .into())
        );
    }

    #[test]
    fn test_branch_height_mismatch() {
        let params = regtest();
        let aux_hash = [0x11; 32];
        let mut proof = single_chain_proof(aux_hash, &params);
        proof.chain_merkle_branch.push([0x22; 32]);

        assert_eq!(
            proof.check(&aux_hash, CHAIN_ID, &params),
            Err(StructuralError::BranchHeightMismatch {
                branch_len: 1,
                height: 0,
            }
            .into())
        );
    }

    #[test]
    fn test_negative_chain_index() {
        let params = regtest();
        let aux_hash = [0x11; 32];
        let mut proof = single_chain_proof(aux_hash, &params);
        proof.chain_index = -1;

        assert_eq!(
            proof.check(&aux_hash, CHAIN_ID, &params),
            Err(StructuralError::NegativeIndex(-1).into())
        );
    }

    #[test]
    fn test_insufficient_parent_work() {
        let params = regtest();
        let aux_hash = [0x11; 32];
        let mut proof = single_chain_proof(aux_hash, &params);
        // Target of 1: no real hash meets it.
        proof.parent_block.bits = 0x03000001;

        let err = proof.check(&aux_hash, CHAIN_ID, &params).unwrap_err();
        assert_eq!(err.kind(), FailureKind::PowInsufficient);
    }

    #[test]
    fn test_wire_format() {
        let params = regtest();
        let proof = single_chain_proof([0x11; 32], &params);
        let raw = serialize(&proof);

        let merkle_tx_len = serialize(&proof.coinbase_tx).len();
        assert_eq!(raw[merkle_tx_len], 0); // empty chain branch
        assert_eq!(&raw[merkle_tx_len + 1..merkle_tx_len + 5], &0i32.to_le_bytes());
        assert_eq!(&raw[merkle_tx_len + 5..], &proof.parent_block.serialize()[..]);

        assert_eq!(deserialize::<AuxPow>(&raw), Ok(proof));
    }

    #[test]
    fn test_stamp_merge_mining_capable() {
        let params = regtest();
        let mut header = AuxBlockHeader::new(BlockHeader::new(
            [0x01; 32],
            [0x02; 32],
            1_700_000_000,
            REGTEST_POW_LIMIT_BITS,
        ));
        header.header.set_chain_id(CHAIN_ID);

        stamp_merge_mining_capable(&mut header);
        assert!(header.header.is_auxpow());
        assert_eq!(header.header.version & VERSION_AUXPOW, VERSION_AUXPOW);

        let auxpow = header.auxpow.as_mut().unwrap();
        assert_eq!(auxpow.parent_block.bits, REGTEST_POW_LIMIT_BITS);
        grind(&mut auxpow.parent_block, &params);

        assert_eq!(check_block_proof_of_work(&header, &params), Ok(()));

        let raw = serialize(&header);
        assert_eq!(deserialize::<AuxBlockHeader>(&raw), Ok(header));
    }

    #[test]
    fn test_block_proof_flag_mismatch() {
        let params = regtest();
        let mut header = AuxBlockHeader::new(BlockHeader::new(
            [0x01; 32],
            [0x02; 32],
            1_700_000_000,
            REGTEST_POW_LIMIT_BITS,
        ));
        header.header.set_chain_id(CHAIN_ID);

        header.header.set_auxpow_flag(true);
        assert_eq!(
            check_block_proof_of_work(&header, &params),
            Err(StructuralError::MissingAuxPow(header.header.version).into())
        );

        stamp_merge_mining_capable(&mut header);
        header.header.set_auxpow_flag(false);
        assert_eq!(
            check_block_proof_of_work(&header, &params),
            Err(StructuralError::UnexpectedAuxPow(header.header.version).into())
        );
    }

    #[test]
    fn test_block_wrong_chain_id() {
        let params = regtest();
        let mut header = AuxBlockHeader::new(BlockHeader::new(
            [0x01; 32],
            [0x02; 32],
            1_700_000_000,
            REGTEST_POW_LIMIT_BITS,
        ));
        header.header.set_chain_id(CHAIN_ID + 1);

        assert_eq!(
            check_block_proof_of_work(&header, &params),
            Err(StructuralError::WrongChainId {
                expected: CHAIN_ID,
                actual: CHAIN_ID + 1,
            }
            .into())
        );
    }

    #[test]
    fn test_plain_block_pow() {
        let params = regtest();
        let mut header = AuxBlockHeader::new(BlockHeader::new(
            [0x01; 32],
            [0x02; 32],
            1_700_000_000,
            REGTEST_POW_LIMIT_BITS,
        ));
        header.header.set_chain_id(CHAIN_ID);
        grind(&mut header.header, &params);

        assert_eq!(check_block_proof_of_work(&header, &params), Ok(()));
    }
}
