//! Deterministic placement of a chain's commitment in the shared chain merkle tree.
//!
//! Each auxiliary chain may only occupy the slot derived from the coinbase nonce and its
//! chain id, so a single commitment cannot be replayed under another chain identity.

/// Linear congruential generator multiplier.
const LCG_MULTIPLIER: u32 = 1_103_515_245;

/// Linear congruential generator increment.
const LCG_INCREMENT: u32 = 12_345;

/// Expected leaf slot for `chain_id` in a chain merkle tree of height `tree_height`.
///
/// Arithmetic wraps at 32 bits. `tree_height` must be at most 31; callers enforce the
/// consensus bound before calling.
pub fn expected_index(nonce: u32, chain_id: i32, tree_height: u32) -> u32 {
    let mut rand = nonce;
    rand = rand.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
    rand = rand.wrapping_add(chain_id as u32);
    rand = rand.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
    rand % (1u32 << tree_height)
}
