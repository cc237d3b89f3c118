//! Merkle trees: root computation, authentication paths, and root reconstruction.

use crate::error::StructuralError;
use crate::hash::hash_pair;

/// Longest authentication path accepted. Checked before any hashing.
pub const MAX_MERKLE_BRANCH_LENGTH: usize = 32;

/// Compute the merkle root from a list of leaf hashes.
///
/// For a single leaf (like a coinbase-only block), the merkle root is the leaf itself.
/// Levels with an odd number of nodes pair the last node with itself.
pub fn compute_merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut current_level: Vec<[u8; 32]> = leaves.to_vec();

    while current_level.len() > 1 {
        current_level = next_level(&current_level);
    }

    current_level[0]
}

/// Extract the authentication path for the leaf at `index`.
///
/// Returns `None` if `index` is out of range.
pub fn merkle_branch(leaves: &[[u8; 32]], index: usize) -> Option<Vec<[u8; 32]>> {
    if index >= leaves.len() {
        return None;
    }

    let mut branch = Vec::new();
    let mut current_level: Vec<[u8; 32]> = leaves.to_vec();
    let mut current_index = index;

    while current_level.len() > 1 {
        let sibling_index = if current_index % 2 == 1 {
            current_index - 1
        } else {
            // A missing right sibling is the node itself.
            (current_index + 1).min(current_level.len() - 1)
        };
        branch.push(current_level[sibling_index]);

        current_level = next_level(&current_level);
        current_index /= 2;
    }

    Some(branch)
}

/// Rebuild the root reached by walking `branch` up from `leaf`.
///
/// Bit `i` of `index` selects the operand order at step `i`: when set, the sibling is the
/// left operand. Branches longer than [`MAX_MERKLE_BRANCH_LENGTH`] are rejected outright.
pub fn reconstruct_root(
    leaf: [u8; 32],
    branch: &[[u8; 32]],
    index: u32,
) -> Result<[u8; 32], StructuralError> {
    if branch.len() > MAX_MERKLE_BRANCH_LENGTH {
        return Err(StructuralError::BranchTooLong {
            len: branch.len(),
            max: MAX_MERKLE_BRANCH_LENGTH,
        });
    }

    let mut hash = leaf;
    let mut index = index;
    for sibling in branch {
        hash = if index & 1 == 1 {
            hash_pair(sibling, &hash)
        } else {
            hash_pair(&hash, sibling)
        };
        index >>= 1;
    }
    Ok(hash)
}

fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [single] => hash_pair(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}
