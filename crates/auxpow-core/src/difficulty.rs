//! Difficulty target decoding and proof-of-work checks.

use crate::error::PowError;
use crate::hash::{hash_to_be, hash_to_display_hex};
use crate::network::ConsensusParams;

/// Decode compact "bits" into a 256-bit big-endian target.
///
/// The bits format is: [exponent (1 byte)][sign (1 bit)][mantissa (23 bits)],
/// target = mantissa * 256^(exponent - 3). Negative, overflowing and zero targets are errors.
pub fn decode_compact(bits: u32) -> Result<[u8; 32], PowError> {
    let exponent = bits >> 24;
    let mut mantissa = bits & 0x007f_ffff;

    if mantissa != 0 && bits & 0x0080_0000 != 0 {
        return Err(PowError::NegativeTarget(bits));
    }
    if mantissa != 0
        && (exponent > 34
            || (mantissa > 0xff && exponent > 33)
            || (mantissa > 0xffff && exponent > 32))
    {
        return Err(PowError::TargetOverflow(bits));
    }

    let mut target = [0u8; 32];
    let shift = if exponent <= 3 {
        mantissa >>= 8 * (3 - exponent);
        0
    } else {
        exponent - 3
    };

    // Byte k of the mantissa has significance k + shift; the overflow check above
    // guarantees bytes landing past the top are zero.
    for k in 0..3u32 {
        let significance = k + shift;
        if significance < 32 {
            target[31 - significance as usize] = ((mantissa >> (8 * k)) & 0xff) as u8;
        }
    }

    if target == [0u8; 32] {
        return Err(PowError::ZeroTarget(bits));
    }
    Ok(target)
}

/// Check if a big-endian hash value meets a big-endian target (hash <= target).
#[inline]
pub fn hash_meets_target(hash_be: &[u8; 32], target: &[u8; 32]) -> bool {
    // Both are 32-byte big-endian numbers
    for i in 0..32 {
        if hash_be[i] < target[i] {
            return true;
        }
        if hash_be[i] > target[i] {
            return false;
        }
    }
    true
}

/// Check that `pow_hash` (internal byte order) satisfies the compact target `bits`
/// under the network's limit.
pub fn check_proof_of_work(
    pow_hash: &[u8; 32],
    bits: u32,
    params: &ConsensusParams,
) -> Result<(), PowError> {
    if params.skip_pow_check {
        return Ok(());
    }

    let target = decode_compact(bits)?;
    let limit = decode_compact(params.pow_limit_bits)?;
    if target > limit {
        return Err(PowError::AboveLimit {
            bits,
            limit: params.pow_limit_bits,
        });
    }

    if !hash_meets_target(&hash_to_be(pow_hash), &target) {
        return Err(PowError::HighHash {
            hash: hash_to_display_hex(pow_hash),
            bits,
        });
    }
    Ok(())
}

/// Difficulty as a multiple of the minimum difficulty (bits 0x1d00ffff).
pub fn bits_to_difficulty(bits: u32) -> f64 {
    let mantissa = bits & 0x00ff_ffff;
    if mantissa == 0 {
        return f64::INFINITY;
    }

    let mut shift = (bits >> 24) & 0xff;
    let mut difficulty = 0x0000_ffff as f64 / mantissa as f64;
    while shift < 29 {
        difficulty *= 256.0;
        shift += 1;
    }
    while shift > 29 {
        difficulty /= 256.0;
        shift -= 1;
    }
    difficulty
}
