//! Block headers: the pure 80-byte header and the merge-mined header carrying an aux proof.

use crate::auxpow::AuxPow;
use crate::encode::{Decodable, Encodable, Reader};
use crate::error::{DecodeError, PowError};
use crate::hash::{double_sha256, scrypt_1024_1_1};
use crate::network::{
    PowAlgorithm, BLOCK_HEADER_SIZE, BLOCK_VERSION, VERSION_AUXPOW, VERSION_CHAIN_START,
};

/// A pure block header (80 bytes), as found on both the parent and the auxiliary chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Base version, auxpow flag and chain id.
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions.
    pub merkle_root: [u8; 32],
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a new block header.
    pub fn new(
        prev_block_hash: [u8; 32],
        merkle_root: [u8; 32],
        timestamp: u32,
        bits: u32,
    ) -> Self {
        BlockHeader {
            version: BLOCK_VERSION,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce: 0,
        }
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];
        header[0..4].copy_from_slice(&self.version.to_le_bytes());
        header[4..36].copy_from_slice(&self.prev_block_hash);
        header[36..68].copy_from_slice(&self.merkle_root);
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        header[72..76].copy_from_slice(&self.bits.to_le_bytes());
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        header
    }

    /// Parse a header from its 80-byte serialization.
    pub fn from_bytes(bytes: &[u8; BLOCK_HEADER_SIZE]) -> Self {
        let word = |at: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[at..at + 4]);
            buf
        };
        let mut prev_block_hash = [0u8; 32];
        prev_block_hash.copy_from_slice(&bytes[4..36]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&bytes[36..68]);

        BlockHeader {
            version: i32::from_le_bytes(word(0)),
            prev_block_hash,
            merkle_root,
            timestamp: u32::from_le_bytes(word(68)),
            bits: u32::from_le_bytes(word(72)),
            nonce: u32::from_le_bytes(word(76)),
        }
    }

    /// Identity hash (double SHA256).
    pub fn hash(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// Proof-of-work hash under the chain's algorithm.
    pub fn pow_hash(&self, algorithm: PowAlgorithm) -> Result<[u8; 32], PowError> {
        let header = self.serialize();
        match algorithm {
            PowAlgorithm::Sha256d => Ok(double_sha256(&header)),
            PowAlgorithm::Scrypt => scrypt_1024_1_1(&header),
        }
    }

    /// Version without the auxpow flag and chain id.
    pub fn base_version(&self) -> i32 {
        self.version % VERSION_AUXPOW
    }

    /// Chain id carried in the upper version bits.
    pub fn chain_id(&self) -> i32 {
        self.version / VERSION_CHAIN_START
    }

    pub fn set_chain_id(&mut self, chain_id: i32) {
        self.version %= VERSION_CHAIN_START;
        self.version |= chain_id.wrapping_mul(VERSION_CHAIN_START);
    }

    pub fn is_auxpow(&self) -> bool {
        self.version & VERSION_AUXPOW != 0
    }

    pub fn set_auxpow_flag(&mut self, auxpow: bool) {
        if auxpow {
            self.version |= VERSION_AUXPOW;
        } else {
            self.version &= !VERSION_AUXPOW;
        }
    }

    /// Pre-merge-mining versions carry neither flag nor chain id.
    pub fn is_legacy(&self) -> bool {
        self.version == 1
    }
}

impl Encodable for BlockHeader {
    fn consensus_encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.serialize());
    }
}

impl Decodable for BlockHeader {
    fn consensus_decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(BlockHeader::from_bytes(&reader.read_array()?))
    }
}

/// A header on the auxiliary chain, optionally carrying a merged-mining proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxBlockHeader {
    pub header: BlockHeader,
    pub auxpow: Option<Box<AuxPow>>,
}

impl AuxBlockHeader {
    pub fn new(header: BlockHeader) -> Self {
        AuxBlockHeader {
            header,
            auxpow: None,
        }
    }

    pub fn hash(&self) -> [u8; 32] {
        self.header.hash()
    }
}

impl Encodable for AuxBlockHeader {
    /// The proof follows the header only when the version flag says so.
    fn consensus_encode(&self, out: &mut Vec<u8>) {
        self.header.consensus_encode(out);
        if self.header.is_auxpow() {
            if let Some(auxpow) = &self.auxpow {
                auxpow.consensus_encode(out);
            }
        }
    }
}

impl Decodable for AuxBlockHeader {
    fn consensus_decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let header = BlockHeader::consensus_decode(reader)?;
        let auxpow = if header.is_auxpow() {
            Some(Box::new(AuxPow::consensus_decode(reader)?))
        } else {
            None
        };
        Ok(AuxBlockHeader { header, auxpow })
    }
}
