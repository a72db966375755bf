use solvency_common::{AssetInfo, BatchRecord, CommitmentScheme};
use solvency_test_fixtures::{
    build_chain, sample_assets, Blake3Scheme, RecordingProofSystem, SparseMerkleTree,
};
use solvency_verifier::{
    AssetError, ChainVerificationError, ChainVerifierOptions, SolvencyVerifier,
};

fn empty_root() -> [u8; 32] {
    SparseMerkleTree::new(&Blake3Scheme, 4).empty_root()
}

#[test]
fn full_attestation_verifies_against_asset_data() {
    let assets = sample_assets(5);
    let chain = build_chain(&Blake3Scheme, &assets, empty_root(), 3);
    let stub = RecordingProofSystem::accepting();

    for parallel in [false, true] {
        let report = SolvencyVerifier::new(&Blake3Scheme, &stub, &())
            .with_options(ChainVerifierOptions {
                parallel,
                threads: Some(3),
            })
            .verify(&assets, empty_root(), chain.records.clone())
            .expect("attestation verifies");
        assert_eq!(report.chain.batches_verified, 3);
        assert_eq!(report.account_tree_root(), &chain.records[2].tree_roots[1]);
        assert_eq!(
            report.genesis.empty_ledger_commitment,
            chain.genesis.empty_ledger_commitment
        );
    }
}

#[test]
fn unordered_asset_data_is_accepted() {
    let assets = sample_assets(4);
    let chain = build_chain(&Blake3Scheme, &assets, empty_root(), 2);
    let mut shuffled = assets.clone();
    shuffled.reverse();

    let stub = RecordingProofSystem::accepting();
    let report = SolvencyVerifier::new(&Blake3Scheme, &stub, &())
        .verify(&shuffled, empty_root(), chain.records)
        .expect("asset order does not matter");
    assert_eq!(report.assets, assets);
}

#[test]
fn insolvent_asset_is_rejected_before_any_batch() {
    let mut assets = sample_assets(3);
    let chain = build_chain(&Blake3Scheme, &assets, empty_root(), 2);
    assets[1].total_debt = assets[1].total_equity + 1;

    let stub = RecordingProofSystem::accepting();
    let err = SolvencyVerifier::new(&Blake3Scheme, &stub, &())
        .verify(&assets, empty_root(), chain.records)
        .unwrap_err();
    assert_eq!(
        err,
        ChainVerificationError::Asset(AssetError::InvalidAssetInfo {
            symbol: assets[1].symbol.clone(),
            equity: assets[1].total_equity,
            debt: assets[1].total_debt,
        })
    );
    assert_eq!(stub.call_count(), 0);
}

#[test]
fn insolvent_asset_is_rejected_whatever_the_chain_holds() {
    let mut assets = sample_assets(3);
    let chain = build_chain(&Blake3Scheme, &assets, empty_root(), 3);
    assets[0].total_debt = assets[0].total_equity + 5;
    let expected = ChainVerificationError::Asset(AssetError::InvalidAssetInfo {
        symbol: assets[0].symbol.clone(),
        equity: assets[0].total_equity,
        debt: assets[0].total_debt,
    });

    let mut tampered = chain.records.clone();
    tampered[1].public_input[0] ^= 0x01;
    let gap: Vec<BatchRecord> = chain
        .records
        .iter()
        .filter(|record| record.batch_number != 1)
        .cloned()
        .collect();

    for records in [tampered, gap, Vec::new()] {
        for parallel in [false, true] {
            let stub = RecordingProofSystem::accepting();
            let err = SolvencyVerifier::new(&Blake3Scheme, &stub, &())
                .with_options(ChainVerifierOptions {
                    parallel,
                    threads: Some(2),
                })
                .verify(&assets, empty_root(), records.clone())
                .unwrap_err();
            assert_eq!(err, expected);
            assert_eq!(stub.call_count(), 0);
        }
    }
}

#[test]
fn empty_asset_data_is_rejected() {
    let chain = build_chain(&Blake3Scheme, &sample_assets(2), empty_root(), 1);
    let stub = RecordingProofSystem::accepting();
    assert_eq!(
        SolvencyVerifier::new(&Blake3Scheme, &stub, &())
            .verify(&[], empty_root(), chain.records)
            .unwrap_err(),
        ChainVerificationError::Asset(AssetError::EmptyAssetList)
    );
    assert_eq!(stub.call_count(), 0);
}

#[test]
fn final_ledger_must_match_published_totals() {
    let assets = sample_assets(3);
    let chain = build_chain(&Blake3Scheme, &assets, empty_root(), 2);

    let mut published = assets.clone();
    published[2].total_equity += 1;

    let stub = RecordingProofSystem::accepting();
    let err = SolvencyVerifier::new(&Blake3Scheme, &stub, &())
        .verify(&published, empty_root(), chain.records.clone())
        .unwrap_err();
    assert_eq!(
        err,
        ChainVerificationError::FinalCommitmentMismatch {
            expected: Blake3Scheme.commit_asset_list(&published),
            actual: chain.records[1].ledger_commitments[1],
        }
    );
    assert_eq!(stub.call_count(), 2);
}

#[test]
fn genesis_follows_asset_prices() {
    let assets = sample_assets(2);
    let chain = build_chain(&Blake3Scheme, &assets, empty_root(), 2);

    // A different price changes the zeroed genesis ledger, so batch 0 no longer
    // starts where the verifier expects.
    let repriced: Vec<AssetInfo> = assets
        .iter()
        .map(|asset| AssetInfo {
            base_price: asset.base_price + 1,
            ..asset.clone()
        })
        .collect();
    let stub = RecordingProofSystem::accepting();
    assert_eq!(
        SolvencyVerifier::new(&Blake3Scheme, &stub, &())
            .verify(&repriced, empty_root(), chain.records)
            .unwrap_err(),
        ChainVerificationError::DiscontinuousState(0)
    );
}

#[test]
fn wrong_empty_tree_root_breaks_batch_zero() {
    let assets = sample_assets(2);
    let chain = build_chain(&Blake3Scheme, &assets, empty_root(), 1);
    let stub = RecordingProofSystem::accepting();
    assert_eq!(
        SolvencyVerifier::new(&Blake3Scheme, &stub, &())
            .verify(&assets, [0u8; 32], chain.records)
            .unwrap_err(),
        ChainVerificationError::DiscontinuousState(0)
    );
}
