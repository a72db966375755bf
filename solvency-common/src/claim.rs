//! A single account's inclusion claim against a published account-tree root.

use serde::{Deserialize, Serialize};

use crate::{assets::AccountAsset, digest::Digest};

/// Sibling path from a leaf up to the root.
///
/// Bit `d` of `leaf_index` tells whether the running hash is the left (0) or
/// right (1) operand at level `d`; `siblings[0]` is the leaf's own sibling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: u64,
    pub siblings: Vec<Digest>,
}

impl MerkleProof {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

/// Everything a user discloses to check their own account against the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInclusionClaim {
    pub account_id_hash: Digest,
    pub total_equity: u128,
    pub total_debt: u128,
    /// Sparse: only the assets the account actually holds.
    pub assets: Vec<AccountAsset>,
    pub proof: MerkleProof,
    pub root: Digest,
}
