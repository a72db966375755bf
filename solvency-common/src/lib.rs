//! Shared building blocks for proof-of-solvency verification: digests, asset
//! types, batch-record decoding, the commitment scheme and verifier artifacts.

pub mod artifacts;
pub mod assets;
pub mod batch;
pub mod claim;
pub mod config;
pub mod digest;
pub mod error;
pub mod field;
pub mod scheme;

pub use artifacts::{
    load_verifier_artifacts, ArtifactFile, ArtifactManifest, CircuitShape, VerifierArtifacts,
};
pub use assets::{zeroed_ledger, AccountAsset, AssetInfo, DEFAULT_ASSET_COUNT};
pub use batch::{
    decode_batch_table, read_batch_table, write_batch_table, BatchRecord, RawBatchRecord,
    TableFormat,
};
pub use claim::{MerkleProof, UserInclusionClaim};
pub use config::{
    read_chain_config, read_user_config, ChainConfig, UserConfig, ACCOUNT_TREE_DEPTH,
    EMPTY_ACCOUNT_TREE_ROOT,
};
pub use digest::{digest_hex, Digest};
pub use error::DecodeError;
pub use scheme::{CommitmentScheme, PoseidonScheme, UserLeafInputs};
