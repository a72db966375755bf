// solvency/solvency-verifier/src/lib.rs

//! Proof-of-solvency verification: batch-chain replay, terminal asset-ledger
//! check and single-account Merkle inclusion.

pub mod chain;
pub mod error;
pub mod inclusion;
pub mod ledger;
pub mod proof_system;
pub mod solvency;

pub use chain::{
    order_batches, verify_chain, verify_chain_parallel, ChainOutcome, ChainState, ChainVerifier,
    ChainVerifierOptions, Genesis,
};
pub use error::{AssetError, ChainVerificationError, VerificationFailure};
pub use inclusion::{
    account_leaf_hash, merkle_root, pad_user_assets, verify_merkle_path, verify_user_inclusion,
    InclusionOutcome, MAX_PATH_DEPTH,
};
pub use ledger::{check_final_commitment, expected_final_commitment, validate_asset_infos};
pub use proof_system::{Halo2KzgVerifier, Halo2VerifyingKey, ProofSystem};
pub use solvency::{SolvencyReport, SolvencyVerifier};
