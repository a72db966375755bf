//! Batch-chain replay.
//!
//! Each batch must start exactly where the previous one ended, declare the
//! public input its four commitments hash to, and carry a proof the proving
//! system accepts. The cheap local checks always run before the proof check, so
//! a tampered record is rejected without paying for proof verification.

use rayon::prelude::*;
use solvency_common::{
    assets::zeroed_ledger, digest_hex, AssetInfo, BatchRecord, CommitmentScheme, Digest,
};
use tracing::{debug, info, warn};

use crate::{error::ChainVerificationError, proof_system::ProofSystem};

/// State the first batch must start from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Genesis {
    pub empty_tree_root: Digest,
    pub empty_ledger_commitment: Digest,
}

impl Genesis {
    pub fn new(empty_tree_root: Digest, empty_ledger_commitment: Digest) -> Self {
        Self {
            empty_tree_root,
            empty_ledger_commitment,
        }
    }

    /// Genesis for a ledger holding `assets`: the same assets with zero balances.
    pub fn for_assets<S: CommitmentScheme>(
        scheme: &S,
        assets: &[AssetInfo],
        empty_tree_root: Digest,
    ) -> Self {
        Self::new(empty_tree_root, scheme.commit_asset_list(&zeroed_ledger(assets)))
    }
}

/// Running state threaded through the sequential pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainState {
    pub prev_ledger_commitment: Digest,
    pub prev_tree_root: Digest,
    pub next_expected_batch: i64,
}

impl ChainState {
    pub fn genesis(genesis: &Genesis) -> Self {
        Self {
            prev_ledger_commitment: genesis.empty_ledger_commitment,
            prev_tree_root: genesis.empty_tree_root,
            next_expected_batch: 0,
        }
    }

    /// Monotonicity, continuity and public-input checks for the next batch.
    pub fn check<S: CommitmentScheme>(
        &self,
        scheme: &S,
        record: &BatchRecord,
    ) -> Result<(), ChainVerificationError> {
        let batch = self.next_expected_batch;
        if record.batch_number != batch {
            warn!(expected = batch, found = record.batch_number, "batch out of sequence");
            return Err(ChainVerificationError::NonContiguousBatch(batch));
        }

        if record.tree_roots[0] != self.prev_tree_root
            || record.ledger_commitments[0] != self.prev_ledger_commitment
        {
            warn!(
                batch,
                expected_root = %digest_hex(&self.prev_tree_root),
                found_root = %digest_hex(&record.tree_roots[0]),
                "mismatch account tree root or cex asset list commitment"
            );
            return Err(ChainVerificationError::DiscontinuousState(batch));
        }

        let expected = scheme.batch_commitment(&record.tree_roots, &record.ledger_commitments);
        if expected != record.public_input {
            warn!(
                batch,
                expected = %digest_hex(&expected),
                found = %digest_hex(&record.public_input),
                "public input verify failed"
            );
            return Err(ChainVerificationError::PublicInputMismatch(batch));
        }

        Ok(())
    }

    /// State after `record` has been accepted.
    pub fn advance(self, record: &BatchRecord) -> Self {
        Self {
            prev_ledger_commitment: record.ledger_commitments[1],
            prev_tree_root: record.tree_roots[1],
            next_expected_batch: self.next_expected_batch + 1,
        }
    }

    fn into_outcome(self) -> ChainOutcome {
        ChainOutcome {
            final_tree_root: self.prev_tree_root,
            final_ledger_commitment: self.prev_ledger_commitment,
            batches_verified: self.next_expected_batch as usize,
        }
    }
}

/// Terminal state of a fully verified chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainOutcome {
    pub final_tree_root: Digest,
    pub final_ledger_commitment: Digest,
    pub batches_verified: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainVerifierOptions {
    /// Dispatch proof checks onto a worker pool once the sequential pass is done.
    pub parallel: bool,
    /// Worker count; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

/// Sorts records by batch number and rejects duplicates and gaps.
///
/// Runs before any verification work so a malformed table never costs a proof
/// check.
pub fn order_batches(
    mut records: Vec<BatchRecord>,
) -> Result<Vec<BatchRecord>, ChainVerificationError> {
    if records.is_empty() {
        return Err(ChainVerificationError::EmptyChain);
    }
    records.sort_by_key(|record| record.batch_number);

    if let Some(pair) = records
        .windows(2)
        .find(|pair| pair[0].batch_number == pair[1].batch_number)
    {
        return Err(ChainVerificationError::DuplicateBatch(pair[0].batch_number));
    }
    for (position, record) in records.iter().enumerate() {
        if record.batch_number != position as i64 {
            return Err(ChainVerificationError::NonContiguousBatch(position as i64));
        }
    }
    Ok(records)
}

pub struct ChainVerifier<'a, S, P: ProofSystem> {
    scheme: &'a S,
    proof_system: &'a P,
    vk: &'a P::VerifyingKey,
    genesis: Genesis,
    options: ChainVerifierOptions,
}

impl<'a, S, P> ChainVerifier<'a, S, P>
where
    S: CommitmentScheme,
    P: ProofSystem,
{
    pub fn new(
        scheme: &'a S,
        proof_system: &'a P,
        vk: &'a P::VerifyingKey,
        genesis: Genesis,
    ) -> Self {
        Self {
            scheme,
            proof_system,
            vk,
            genesis,
            options: ChainVerifierOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChainVerifierOptions) -> Self {
        self.options = options;
        self
    }

    /// Replays `records` (in any order) from genesis.
    pub fn verify(
        &self,
        records: Vec<BatchRecord>,
    ) -> Result<ChainOutcome, ChainVerificationError> {
        let batches = order_batches(records)?;
        info!(
            batches = batches.len(),
            parallel = self.options.parallel,
            "verifying batch chain"
        );

        let outcome = if self.options.parallel {
            self.verify_parallel(&batches)?
        } else {
            self.verify_sequential(&batches)?
        };

        info!(
            root = %digest_hex(&outcome.final_tree_root),
            batches = outcome.batches_verified,
            "all proofs verify passed"
        );
        Ok(outcome)
    }

    fn verify_sequential(
        &self,
        batches: &[BatchRecord],
    ) -> Result<ChainOutcome, ChainVerificationError> {
        let mut state = ChainState::genesis(&self.genesis);
        for record in batches {
            state.check(self.scheme, record)?;
            self.check_proof(record)?;
            state = state.advance(record);
            info!(batch = record.batch_number, "proof verify success");
        }
        Ok(state.into_outcome())
    }

    /// Sequential consistency pass, then concurrent proof checks for every batch
    /// ahead of the first inconsistency. The lowest-numbered failure wins, which
    /// makes the result identical to the sequential mode.
    fn verify_parallel(
        &self,
        batches: &[BatchRecord],
    ) -> Result<ChainOutcome, ChainVerificationError> {
        let mut state = ChainState::genesis(&self.genesis);
        let mut inconsistency = None;
        let mut consistent = 0;
        for record in batches {
            if let Err(err) = state.check(self.scheme, record) {
                inconsistency = Some(err);
                break;
            }
            state = state.advance(record);
            consistent += 1;
        }
        debug!(consistent, "consistency pass finished");

        let prefix = &batches[..consistent];
        let rejection = self.in_pool(|| {
            prefix
                .par_iter()
                .find_map_first(|record| self.check_proof(record).err())
        })?;

        if let Some(err) = rejection.or(inconsistency) {
            return Err(err);
        }
        for record in prefix {
            info!(batch = record.batch_number, "proof verify success");
        }
        Ok(state.into_outcome())
    }

    fn in_pool<R, F>(&self, work: F) -> Result<R, ChainVerificationError>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self.options.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map(|pool| pool.install(work))
                .map_err(|err| ChainVerificationError::WorkerPool(err.to_string())),
            None => Ok(work()),
        }
    }

    fn check_proof(&self, record: &BatchRecord) -> Result<(), ChainVerificationError> {
        self.proof_system
            .verify(self.vk, &record.proof, &record.public_input)
            .map_err(|reason| {
                warn!(batch = record.batch_number, %reason, "proof verify failed");
                ChainVerificationError::ProofRejected {
                    batch: record.batch_number,
                    reason,
                }
            })
    }
}

/// Verifies the chain one batch at a time.
pub fn verify_chain<S, P>(
    scheme: &S,
    proof_system: &P,
    vk: &P::VerifyingKey,
    genesis: Genesis,
    records: Vec<BatchRecord>,
) -> Result<ChainOutcome, ChainVerificationError>
where
    S: CommitmentScheme,
    P: ProofSystem,
{
    ChainVerifier::new(scheme, proof_system, vk, genesis).verify(records)
}

/// Same result as [`verify_chain`], with proof checks spread over `threads`
/// workers (or the global rayon pool).
pub fn verify_chain_parallel<S, P>(
    scheme: &S,
    proof_system: &P,
    vk: &P::VerifyingKey,
    genesis: Genesis,
    records: Vec<BatchRecord>,
    threads: Option<usize>,
) -> Result<ChainOutcome, ChainVerificationError>
where
    S: CommitmentScheme,
    P: ProofSystem,
{
    ChainVerifier::new(scheme, proof_system, vk, genesis)
        .with_options(ChainVerifierOptions {
            parallel: true,
            threads,
        })
        .verify(records)
}
