//! Single-account inclusion against a published account-tree root.

use solvency_common::{
    digest_hex, AccountAsset, CommitmentScheme, Digest, UserInclusionClaim, UserLeafInputs,
};
use tracing::{info, warn};

use crate::error::AssetError;

/// Longest sibling path a `u64` leaf index can address.
pub const MAX_PATH_DEPTH: usize = u64::BITS as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InclusionOutcome {
    pub leaf_hash: Digest,
    pub included: bool,
}

/// Expands a sparse asset list into `asset_count` slots, unset slots holding
/// zero balances. `asset_count` must be non-zero.
pub fn pad_user_assets(
    asset_count: usize,
    sparse: &[AccountAsset],
) -> Result<Vec<AccountAsset>, AssetError> {
    if asset_count == 0 {
        return Err(AssetError::EmptyAssetList);
    }
    let mut padded: Vec<Option<AccountAsset>> = vec![None; asset_count];
    for asset in sparse {
        let slot = padded
            .get_mut(usize::from(asset.index))
            .ok_or(AssetError::InvalidAssetIndex {
                index: asset.index,
                asset_count,
            })?;
        if slot.replace(*asset).is_some() {
            return Err(AssetError::DuplicateAssetIndex(asset.index));
        }
    }
    Ok(padded
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.unwrap_or_else(|| AccountAsset::empty(index as u16)))
        .collect())
}

pub fn account_leaf_hash<S: CommitmentScheme>(
    scheme: &S,
    claim: &UserInclusionClaim,
    asset_count: usize,
) -> Result<Digest, AssetError> {
    let assets = pad_user_assets(asset_count, &claim.assets)?;
    Ok(scheme.account_leaf(&UserLeafInputs {
        account_id_hash: claim.account_id_hash,
        total_equity: claim.total_equity,
        total_debt: claim.total_debt,
        asset_commitment: scheme.commit_user_assets(&assets),
    }))
}

/// Folds `leaf` up the sibling path. `None` when `leaf_index` has bits set at or
/// above the path depth, since such an index names no leaf of this tree, and
/// for paths longer than the 64 levels a `u64` index can address.
pub fn merkle_root<S: CommitmentScheme>(
    scheme: &S,
    leaf: &Digest,
    leaf_index: u64,
    siblings: &[Digest],
) -> Option<Digest> {
    let depth = siblings.len();
    if depth > MAX_PATH_DEPTH || (depth < MAX_PATH_DEPTH && leaf_index >> depth != 0) {
        return None;
    }
    let root = siblings
        .iter()
        .enumerate()
        .fold(*leaf, |node, (level, sibling)| {
            if (leaf_index >> level) & 1 == 0 {
                scheme.hash_nodes(&node, sibling)
            } else {
                scheme.hash_nodes(sibling, &node)
            }
        });
    Some(root)
}

pub fn verify_merkle_path<S: CommitmentScheme>(
    scheme: &S,
    leaf: &Digest,
    leaf_index: u64,
    siblings: &[Digest],
    root: &Digest,
) -> bool {
    merkle_root(scheme, leaf, leaf_index, siblings).is_some_and(|computed| &computed == root)
}

/// Recomputes the claimed account's leaf and checks it against the root. A path
/// that does not reach the root is a negative outcome, not an error.
pub fn verify_user_inclusion<S: CommitmentScheme>(
    scheme: &S,
    claim: &UserInclusionClaim,
    asset_count: usize,
) -> Result<InclusionOutcome, AssetError> {
    let leaf_hash = account_leaf_hash(scheme, claim, asset_count)?;
    let included = verify_merkle_path(
        scheme,
        &leaf_hash,
        claim.proof.leaf_index,
        &claim.proof.siblings,
        &claim.root,
    );
    if included {
        info!(
            account_index = claim.proof.leaf_index,
            root = %digest_hex(&claim.root),
            "verify pass"
        );
    } else {
        warn!(
            account_index = claim.proof.leaf_index,
            leaf = %digest_hex(&leaf_hash),
            "verify failed: merkle path does not reach root"
        );
    }
    Ok(InclusionOutcome {
        leaf_hash,
        included,
    })
}
