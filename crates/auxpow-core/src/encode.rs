//! Consensus wire encoding.
//!
//! Little-endian integers, Bitcoin compact-size length prefixes, and length-prefixed
//! sequences of 32-byte hashes. Vector lengths are bounded before anything is allocated.

use crate::error::DecodeError;

/// Types with a consensus wire encoding.
pub trait Encodable {
    fn consensus_encode(&self, out: &mut Vec<u8>);
}

/// Types decodable from their consensus wire encoding.
pub trait Decodable: Sized {
    fn consensus_decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError>;
}

/// Encode a value to a fresh buffer.
pub fn serialize<T: Encodable>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.consensus_encode(&mut out);
    out
}

/// Decode a value that must span the whole input.
pub fn deserialize<T: Decodable>(bytes: &[u8]) -> Result<T, DecodeError> {
    let mut reader = Reader::new(bytes);
    let value = T::consensus_decode(&mut reader)?;
    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes(reader.remaining()));
    }
    Ok(value)
}

/// Cursor over an input buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn peek_u8(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a compact-size integer, rejecting non-minimal encodings.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let value = match self.read_u8()? {
            0xff => {
                let v = self.read_u64_le()?;
                if v <= 0xffff_ffff {
                    return Err(DecodeError::NonCanonicalVarInt);
                }
                v
            }
            0xfe => {
                let v = self.read_u32_le()? as u64;
                if v <= 0xffff {
                    return Err(DecodeError::NonCanonicalVarInt);
                }
                v
            }
            0xfd => {
                let v = self.read_u16_le()? as u64;
                if v < 0xfd {
                    return Err(DecodeError::NonCanonicalVarInt);
                }
                v
            }
            small => small as u64,
        };
        Ok(value)
    }

    /// Read a vector length whose items take at least `min_item_size` bytes each.
    ///
    /// Fails if the declared length exceeds `max` or cannot fit in the remaining input.
    pub fn read_length(&mut self, min_item_size: usize, max: u64) -> Result<usize, DecodeError> {
        let len = self.read_varint()?;
        let fits = (self.remaining() / min_item_size.max(1)) as u64;
        if len > max || len > fits {
            return Err(DecodeError::OversizedVector {
                len,
                max: max.min(fits),
            });
        }
        Ok(len as usize)
    }

    /// Read a length-prefixed byte string.
    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_length(1, u32::MAX as u64)?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Read a length-prefixed sequence of 32-byte hashes holding at most `max` entries.
    pub fn read_hashes(&mut self, max: usize) -> Result<Vec<[u8; 32]>, DecodeError> {
        let len = self.read_length(32, max as u64)?;
        let mut hashes = Vec::with_capacity(len);
        for _ in 0..len {
            hashes.push(self.read_array::<32>()?);
        }
        Ok(hashes)
    }
}

/// Encode a variable-length integer (Bitcoin compact size).
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Encode a length-prefixed byte string.
pub fn encode_var_bytes(bytes: &[u8], output: &mut Vec<u8>) {
    encode_varint(bytes.len() as u64, output);
    output.extend_from_slice(bytes);
}

/// Encode a length-prefixed sequence of 32-byte hashes.
pub fn encode_hashes(hashes: &[[u8; 32]], output: &mut Vec<u8>) {
    encode_varint(hashes.len() as u64, output);
    for hash in hashes {
        output.extend_from_slice(hash);
    }
}
