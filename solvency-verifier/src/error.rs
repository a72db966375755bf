//! Error taxonomy for chain, ledger and inclusion verification.
//!
//! Every chain-mode error is fatal and names the first offending batch; nothing
//! here is transient, so callers never retry.

use solvency_common::{digest::digest_hex, DecodeError};
use thiserror::Error;

/// Why the proving-system backend refused a proof.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("public input is not a canonical field element")]
    InvalidPublicInput,

    #[error("proof does not verify against the verifying key: {0}")]
    Rejected(String),
}

/// Problems with authoritative asset data or a user's disclosed asset list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("asset list is empty")]
    EmptyAssetList,

    #[error("{symbol} asset equity {equity} less than debt {debt}")]
    InvalidAssetInfo {
        symbol: String,
        equity: u128,
        debt: u128,
    },

    #[error("asset index {index} out of range for {asset_count} assets")]
    InvalidAssetIndex { index: u16, asset_count: usize },

    #[error("asset index {0} appears more than once")]
    DuplicateAssetIndex(u16),

    #[error("asset index {0} is missing from the asset list")]
    MissingAssetIndex(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainVerificationError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("proof table holds no batches")]
    EmptyChain,

    #[error("batch number {0} appears more than once")]
    DuplicateBatch(i64),

    #[error("the batch number is not monotonically increasing by 1: expected batch {0}")]
    NonContiguousBatch(i64),

    #[error("batch {0}: mismatch account tree root or cex asset list commitment")]
    DiscontinuousState(i64),

    #[error("batch {0}: public input does not match the batch commitments")]
    PublicInputMismatch(i64),

    #[error("batch {batch}: {reason}")]
    ProofRejected {
        batch: i64,
        reason: VerificationFailure,
    },

    #[error(
        "final cex asset list commitment {} does not match expected {}",
        digest_hex(.actual),
        digest_hex(.expected)
    )]
    FinalCommitmentMismatch {
        expected: solvency_common::Digest,
        actual: solvency_common::Digest,
    },

    #[error("failed to start verification workers: {0}")]
    WorkerPool(String),
}

impl ChainVerificationError {
    /// Batch the error is attributed to, if it concerns a single batch.
    pub fn batch(&self) -> Option<i64> {
        match self {
            Self::DuplicateBatch(batch)
            | Self::NonContiguousBatch(batch)
            | Self::DiscontinuousState(batch)
            | Self::PublicInputMismatch(batch)
            | Self::ProofRejected { batch, .. } => Some(*batch),
            _ => None,
        }
    }
}
