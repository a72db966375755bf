//! End-to-end chain-mode verification: asset data, batch chain, final ledger.

use solvency_common::{AssetInfo, BatchRecord, CommitmentScheme, Digest};
use tracing::info;

use crate::{
    chain::{ChainOutcome, ChainVerifier, ChainVerifierOptions, Genesis},
    error::ChainVerificationError,
    ledger::{check_final_commitment, validate_asset_infos},
    proof_system::ProofSystem,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolvencyReport {
    pub chain: ChainOutcome,
    pub genesis: Genesis,
    pub assets: Vec<AssetInfo>,
}

impl SolvencyReport {
    pub fn account_tree_root(&self) -> &Digest {
        &self.chain.final_tree_root
    }
}

pub struct SolvencyVerifier<'a, S, P: ProofSystem> {
    scheme: &'a S,
    proof_system: &'a P,
    vk: &'a P::VerifyingKey,
    options: ChainVerifierOptions,
}

impl<'a, S, P> SolvencyVerifier<'a, S, P>
where
    S: CommitmentScheme,
    P: ProofSystem,
{
    pub fn new(scheme: &'a S, proof_system: &'a P, vk: &'a P::VerifyingKey) -> Self {
        Self {
            scheme,
            proof_system,
            vk,
            options: ChainVerifierOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChainVerifierOptions) -> Self {
        self.options = options;
        self
    }

    /// Asset data is validated before any batch is looked at; the chain must then
    /// start from the empty tree and zeroed ledger and end on the commitment of
    /// `assets`.
    pub fn verify(
        &self,
        assets: &[AssetInfo],
        empty_tree_root: Digest,
        records: Vec<BatchRecord>,
    ) -> Result<SolvencyReport, ChainVerificationError> {
        let assets = validate_asset_infos(assets)?;
        info!(assets = assets.len(), "asset data validated");

        let genesis = Genesis::for_assets(self.scheme, &assets, empty_tree_root);
        let chain = ChainVerifier::new(self.scheme, self.proof_system, self.vk, genesis)
            .with_options(self.options)
            .verify(records)?;

        check_final_commitment(self.scheme, &assets, &chain.final_ledger_commitment)?;

        Ok(SolvencyReport {
            chain,
            genesis,
            assets,
        })
    }
}
