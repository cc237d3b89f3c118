//! Transactions in legacy and segwit wire form.

use crate::encode::{encode_var_bytes, encode_varint, Decodable, Encodable, Reader};
use crate::error::DecodeError;
use crate::hash::double_sha256;

/// Smallest possible serialized input: outpoint, empty script, sequence.
const MIN_TXIN_SIZE: usize = 32 + 4 + 1 + 4;

/// Smallest possible serialized output: value and empty script.
const MIN_TXOUT_SIZE: usize = 8 + 1;

/// Reference to an output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    /// The outpoint a coinbase input spends: zero txid, all-ones index.
    pub const NULL: OutPoint = OutPoint {
        txid: [0u8; 32],
        vout: u32::MAX,
    };

    pub fn is_null(&self) -> bool {
        *self == OutPoint::NULL
    }
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// Witness stack; empty for legacy inputs.
    pub witness: Vec<Vec<u8>>,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// Transaction ID: double SHA256 of the non-witness serialization.
    pub fn txid(&self) -> [u8; 32] {
        let mut raw = Vec::with_capacity(200);
        self.encode_legacy(&mut raw);
        double_sha256(&raw)
    }

    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// A coinbase has exactly one input, and that input spends the null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    /// The coinbase input script, if this is a coinbase.
    pub fn coinbase_script(&self) -> Option<&[u8]> {
        if self.is_coinbase() {
            Some(&self.inputs[0].script_sig)
        } else {
            None
        }
    }

    /// Serialize without witness data.
    pub fn encode_legacy(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_le_bytes());
        self.encode_inputs(out);
        self.encode_outputs(out);
        out.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    fn encode_inputs(&self, out: &mut Vec<u8>) {
        encode_varint(self.inputs.len() as u64, out);
        for input in &self.inputs {
            out.extend_from_slice(&input.previous_output.txid);
            out.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            encode_var_bytes(&input.script_sig, out);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
    }

    fn encode_outputs(&self, out: &mut Vec<u8>) {
        encode_varint(self.outputs.len() as u64, out);
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            encode_var_bytes(&output.script_pubkey, out);
        }
    }
}

impl Encodable for Transaction {
    /// Segwit form when any input carries a witness, legacy form otherwise.
    fn consensus_encode(&self, out: &mut Vec<u8>) {
        if !self.has_witness() {
            self.encode_legacy(out);
            return;
        }

        out.extend_from_slice(&self.version.to_le_bytes());
        // Marker and flag
        out.push(0x00);
        out.push(0x01);
        self.encode_inputs(out);
        self.encode_outputs(out);
        for input in &self.inputs {
            encode_varint(input.witness.len() as u64, out);
            for item in &input.witness {
                encode_var_bytes(item, out);
            }
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
    }
}

impl Decodable for Transaction {
    fn consensus_decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version = reader.read_i32_le()?;

        let segwit = reader.peek_u8(0) == Some(0x00);
        if segwit {
            reader.read_u8()?;
            let flag = reader.read_u8()?;
            if flag != 0x01 {
                return Err(DecodeError::InvalidSegwitFlag(flag));
            }
        }

        let input_count = reader.read_length(MIN_TXIN_SIZE, u32::MAX as u64)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let txid = reader.read_array::<32>()?;
            let vout = reader.read_u32_le()?;
            let script_sig = reader.read_var_bytes()?;
            let sequence = reader.read_u32_le()?;
            inputs.push(TxIn {
                previous_output: OutPoint { txid, vout },
                script_sig,
                sequence,
                witness: Vec::new(),
            });
        }

        let output_count = reader.read_length(MIN_TXOUT_SIZE, u32::MAX as u64)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let value = reader.read_u64_le()?;
            let script_pubkey = reader.read_var_bytes()?;
            outputs.push(TxOut {
                value,
                script_pubkey,
            });
        }

        if segwit {
            for input in &mut inputs {
                let items = reader.read_length(1, u32::MAX as u64)?;
                for _ in 0..items {
                    input.witness.push(reader.read_var_bytes()?);
                }
            }
        }

        let lock_time = reader.read_u32_le()?;

        let tx = Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        };
        if segwit && !tx.has_witness() {
            return Err(DecodeError::SuperfluousWitness);
        }
        Ok(tx)
    }
}
