//! SHA256 double-hashing and hash byte-order helpers.

use sha2::{Digest, Sha256};

use crate::error::{DecodeError, PowError};

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
///
/// This is the identity hash for headers and transactions and the node hash of merkle trees.
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// scrypt with N=1024, r=1, p=1 and a 32-byte output, using the input as both password and salt.
///
/// This is the proof-of-work hash of scrypt-mined parent headers.
pub fn scrypt_1024_1_1(data: &[u8]) -> Result<[u8; 32], PowError> {
    let params =
        scrypt::Params::new(10, 1, 1, 32).map_err(|e| PowError::Hasher(e.to_string()))?;
    let mut result = [0u8; 32];
    scrypt::scrypt(data, data, &params, &mut result).map_err(|e| PowError::Hasher(e.to_string()))?;
    Ok(result)
}

/// Hash the concatenation of two 32-byte nodes.
#[inline]
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    double_sha256(&combined)
}

/// Reverse the byte order of a 32-byte array.
///
/// Hashes are stored in internal (little-endian) order and displayed reversed.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(reverse_bytes(hash))
}

/// Parse a hash given in display format back to internal byte order.
pub fn hash_from_display_hex(s: &str) -> Result<[u8; 32], DecodeError> {
    let bytes = hex::decode(s).map_err(|e| DecodeError::InvalidHashHex(e.to_string()))?;
    let display: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| DecodeError::InvalidHashHex(format!("expected 32 bytes, got {}", b.len())))?;
    Ok(reverse_bytes(&display))
}

/// Interpret a hash as a 256-bit little-endian number and return it big-endian,
/// ready for comparison against a target.
#[inline]
pub fn hash_to_be(hash: &[u8; 32]) -> [u8; 32] {
    reverse_bytes(hash)
}
