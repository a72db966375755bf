//! Terminal asset-ledger check against independently sourced asset totals.

use solvency_common::{digest_hex, AssetInfo, CommitmentScheme, Digest};
use tracing::{info, warn};

use crate::error::{AssetError, ChainVerificationError};

/// Orders `assets` by index and enforces solvency per asset and a dense,
/// duplicate-free index range starting at zero. At least one asset is required.
pub fn validate_asset_infos(assets: &[AssetInfo]) -> Result<Vec<AssetInfo>, AssetError> {
    if assets.is_empty() {
        return Err(AssetError::EmptyAssetList);
    }
    let mut ordered = assets.to_vec();
    ordered.sort_by_key(|asset| asset.index);

    for (position, asset) in ordered.iter().enumerate() {
        if !asset.is_solvent() {
            warn!(
                symbol = %asset.symbol,
                equity = %asset.total_equity,
                debt = %asset.total_debt,
                "asset equity less than debt"
            );
            return Err(AssetError::InvalidAssetInfo {
                symbol: asset.symbol.clone(),
                equity: asset.total_equity,
                debt: asset.total_debt,
            });
        }
        let index = usize::from(asset.index);
        if index < position {
            return Err(AssetError::DuplicateAssetIndex(asset.index));
        }
        if index > position {
            return Err(AssetError::MissingAssetIndex(position as u16));
        }
    }
    Ok(ordered)
}

/// Commitment the last batch must end on for `assets`.
pub fn expected_final_commitment<S: CommitmentScheme>(scheme: &S, assets: &[AssetInfo]) -> Digest {
    scheme.commit_asset_list(assets)
}

pub fn check_final_commitment<S: CommitmentScheme>(
    scheme: &S,
    assets: &[AssetInfo],
    final_commitment: &Digest,
) -> Result<(), ChainVerificationError> {
    let expected = expected_final_commitment(scheme, assets);
    if &expected != final_commitment {
        warn!(
            expected = %digest_hex(&expected),
            actual = %digest_hex(final_commitment),
            "final cex asset list commitment mismatch"
        );
        return Err(ChainVerificationError::FinalCommitmentMismatch {
            expected,
            actual: *final_commitment,
        });
    }
    info!(commitment = %digest_hex(&expected), "final cex asset list commitment matches");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvency_common::PoseidonScheme;

    fn asset(index: u16, equity: u128, debt: u128) -> AssetInfo {
        AssetInfo {
            index,
            symbol: format!("asset{index}"),
            total_equity: equity,
            total_debt: debt,
            base_price: 100,
        }
    }

    #[test]
    fn sorts_by_index() {
        let ordered = validate_asset_infos(&[asset(1, 5, 5), asset(0, 3, 1)]).unwrap();
        assert_eq!(ordered[0].index, 0);
        assert_eq!(ordered[1].index, 1);
    }

    #[test]
    fn equity_equal_to_debt_is_solvent() {
        assert!(validate_asset_infos(&[asset(0, 7, 7)]).is_ok());
    }

    #[test]
    fn rejects_insolvent_asset() {
        assert_eq!(
            validate_asset_infos(&[asset(0, 10, 1), asset(1, 4, 9)]),
            Err(AssetError::InvalidAssetInfo {
                symbol: "asset1".into(),
                equity: 4,
                debt: 9,
            })
        );
    }

    #[test]
    fn rejects_index_gaps_and_repeats() {
        assert_eq!(
            validate_asset_infos(&[asset(0, 1, 0), asset(2, 1, 0)]),
            Err(AssetError::MissingAssetIndex(1))
        );
        assert_eq!(
            validate_asset_infos(&[asset(0, 1, 0), asset(0, 2, 0)]),
            Err(AssetError::DuplicateAssetIndex(0))
        );
    }

    #[test]
    fn rejects_empty_asset_list() {
        assert_eq!(validate_asset_infos(&[]), Err(AssetError::EmptyAssetList));
    }

    #[test]
    fn final_commitment_mismatch_carries_both_digests() {
        let scheme = PoseidonScheme::new();
        let assets = vec![asset(0, 10, 2)];
        let expected = expected_final_commitment(&scheme, &assets);
        assert!(check_final_commitment(&scheme, &assets, &expected).is_ok());

        let wrong = [9u8; 32];
        assert_eq!(
            check_final_commitment(&scheme, &assets, &wrong),
            Err(ChainVerificationError::FinalCommitmentMismatch {
                expected,
                actual: wrong,
            })
        );
    }
}
