//! Hash and commitment capability used by every verifier.
//!
//! The verifiers only ever see [`CommitmentScheme`]; [`PoseidonScheme`] is the
//! BN254 Poseidon instantiation. Whatever scheme is plugged in must be the one
//! that produced the trees and commitments being checked, otherwise every
//! comparison fails.

use halo2curves_axiom::{bn256::Fr, ff::Field};
use poseidon_primitives::poseidon::primitives::{Hash as PoseidonHash, Spec, VariableLengthIden3};
use serde::{Deserialize, Serialize};

use crate::{
    assets::{AccountAsset, AssetInfo},
    digest::Digest,
    field::{amount_to_fr, digest_to_fr, fr_to_bytes, reduce_be_bytes_to_fr},
};

pub const POSEIDON_T: usize = 6;
pub const POSEIDON_RATE: usize = 5;
pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;
const POSEIDON_CAPACITY: u128 = 1u128 << 64;

/// Everything hashed into an account's Merkle leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLeafInputs {
    pub account_id_hash: Digest,
    pub total_equity: u128,
    pub total_debt: u128,
    pub asset_commitment: Digest,
}

pub trait CommitmentScheme: Send + Sync {
    /// Parent of two Merkle nodes. Operand order is significant.
    fn hash_nodes(&self, left: &Digest, right: &Digest) -> Digest;

    /// Public input binding a batch's start and end states:
    /// `Hash(root_prev, root_new, ledger_prev, ledger_new)`.
    fn batch_commitment(&self, tree_roots: &[Digest; 2], ledger_commitments: &[Digest; 2])
        -> Digest;

    fn account_leaf(&self, leaf: &UserLeafInputs) -> Digest;

    /// Commitment to the exchange ledger, assets ordered by index.
    fn commit_asset_list(&self, assets: &[AssetInfo]) -> Digest;

    /// Commitment to one account's dense asset vector.
    fn commit_user_assets(&self, assets: &[AccountAsset]) -> Digest;
}

/// Poseidon over the BN254 scalar field.
#[derive(Clone, Copy, Debug, Default)]
pub struct PoseidonScheme;

impl PoseidonScheme {
    pub fn new() -> Self {
        Self
    }
}

impl CommitmentScheme for PoseidonScheme {
    fn hash_nodes(&self, left: &Digest, right: &Digest) -> Digest {
        fr_to_bytes(&poseidon_hash(&[digest_to_fr(left), digest_to_fr(right)]))
    }

    fn batch_commitment(
        &self,
        tree_roots: &[Digest; 2],
        ledger_commitments: &[Digest; 2],
    ) -> Digest {
        fr_to_bytes(&poseidon_hash(&[
            digest_to_fr(&tree_roots[0]),
            digest_to_fr(&tree_roots[1]),
            digest_to_fr(&ledger_commitments[0]),
            digest_to_fr(&ledger_commitments[1]),
        ]))
    }

    fn account_leaf(&self, leaf: &UserLeafInputs) -> Digest {
        fr_to_bytes(&poseidon_hash(&[
            reduce_be_bytes_to_fr(&leaf.account_id_hash),
            amount_to_fr(leaf.total_equity),
            amount_to_fr(leaf.total_debt),
            digest_to_fr(&leaf.asset_commitment),
        ]))
    }

    fn commit_asset_list(&self, assets: &[AssetInfo]) -> Digest {
        let elements: Vec<Fr> = assets
            .iter()
            .flat_map(|asset| {
                [
                    amount_to_fr(asset.total_equity),
                    amount_to_fr(asset.total_debt),
                    Fr::from(asset.base_price),
                ]
            })
            .collect();
        fr_to_bytes(&poseidon_hash(&elements))
    }

    fn commit_user_assets(&self, assets: &[AccountAsset]) -> Digest {
        let elements: Vec<Fr> = assets
            .iter()
            .flat_map(|asset| [amount_to_fr(asset.equity), amount_to_fr(asset.debt)])
            .collect();
        fr_to_bytes(&poseidon_hash(&elements))
    }
}

fn poseidon_hash(inputs: &[Fr]) -> Fr {
    PoseidonHash::<Fr, ZkPoseidonSpec, VariableLengthIden3, POSEIDON_T, POSEIDON_RATE>::init()
        .hash_with_cap(inputs, POSEIDON_CAPACITY)
}

#[derive(Debug)]
struct ZkPoseidonSpec;

impl Spec<Fr, POSEIDON_T, POSEIDON_RATE> for ZkPoseidonSpec {
    fn full_rounds() -> usize {
        POSEIDON_FULL_ROUNDS
    }

    fn partial_rounds() -> usize {
        POSEIDON_PARTIAL_ROUNDS
    }

    fn sbox(val: Fr) -> Fr {
        val.pow_vartime([5])
    }

    fn secure_mds() -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::fr_from_bytes;

    fn leaf() -> UserLeafInputs {
        UserLeafInputs {
            account_id_hash: [7u8; 32],
            total_equity: 1_000,
            total_debt: 250,
            asset_commitment: fr_to_bytes(&Fr::from(42u64)),
        }
    }

    #[test]
    fn node_hash_is_order_sensitive() {
        let scheme = PoseidonScheme::new();
        let a = fr_to_bytes(&Fr::from(1u64));
        let b = fr_to_bytes(&Fr::from(2u64));
        assert_ne!(scheme.hash_nodes(&a, &b), scheme.hash_nodes(&b, &a));
        assert_eq!(scheme.hash_nodes(&a, &b), scheme.hash_nodes(&a, &b));
    }

    #[test]
    fn outputs_are_canonical_field_encodings() {
        let scheme = PoseidonScheme::new();
        let digest = scheme.account_leaf(&leaf());
        assert!(fr_from_bytes(&digest).is_ok());
    }

    #[test]
    fn leaf_binds_every_input() {
        let scheme = PoseidonScheme::new();
        let base = scheme.account_leaf(&leaf());

        let mut changed = leaf();
        changed.total_debt += 1;
        assert_ne!(scheme.account_leaf(&changed), base);

        let mut changed = leaf();
        changed.account_id_hash[0] ^= 1;
        assert_ne!(scheme.account_leaf(&changed), base);
    }

    #[test]
    fn batch_commitment_binds_pair_positions() {
        let scheme = PoseidonScheme::new();
        let roots = [[1u8; 32], [2u8; 32]];
        let ledgers = [[3u8; 32], [4u8; 32]];
        let swapped = [[2u8; 32], [1u8; 32]];
        assert_ne!(
            scheme.batch_commitment(&roots, &ledgers),
            scheme.batch_commitment(&swapped, &ledgers)
        );
        assert_ne!(
            scheme.batch_commitment(&roots, &ledgers),
            scheme.batch_commitment(&ledgers, &roots)
        );
    }

    #[test]
    fn asset_list_commitment_depends_on_balances() {
        let scheme = PoseidonScheme::new();
        let assets = vec![
            AssetInfo {
                index: 0,
                symbol: "btc".into(),
                total_equity: 10,
                total_debt: 1,
                base_price: 30_000,
            },
            AssetInfo {
                index: 1,
                symbol: "eth".into(),
                total_equity: 0,
                total_debt: 0,
                base_price: 2_000,
            },
        ];
        let zeroed = crate::assets::zeroed_ledger(&assets);
        assert_ne!(
            scheme.commit_asset_list(&assets),
            scheme.commit_asset_list(&zeroed)
        );
    }

    #[test]
    fn user_asset_commitment_is_position_sensitive() {
        let scheme = PoseidonScheme::new();
        let mut first = vec![AccountAsset::empty(0), AccountAsset::empty(1)];
        let mut second = first.clone();
        first[0].equity = 5;
        second[1].equity = 5;
        assert_ne!(
            scheme.commit_user_assets(&first),
            scheme.commit_user_assets(&second)
        );
    }
}
