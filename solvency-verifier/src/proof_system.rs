//! Zero-knowledge verification capability and its halo2 KZG backend.

use halo2_proofs_axiom::{
    plonk::{verify_proof, VerifyingKey},
    poly::kzg::{
        commitment::{KZGCommitmentScheme, ParamsKZG},
        multiopen::VerifierGWC,
        strategy::SingleStrategy,
    },
    transcript::{Blake2bRead, Challenge255, TranscriptReadBuffer},
};
use halo2curves_axiom::bn256::{Bn256, Fr, G1Affine};
use solvency_common::{field::fr_from_bytes, Digest, VerifierArtifacts};

use crate::error::VerificationFailure;

/// Checks one batch proof against its public input.
///
/// The verifying key is loaded once and shared read-only by every check,
/// including checks running concurrently.
pub trait ProofSystem: Send + Sync {
    type VerifyingKey: Send + Sync;

    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &[u8],
        public_input: &Digest,
    ) -> Result<(), VerificationFailure>;
}

pub struct Halo2VerifyingKey {
    pub params: ParamsKZG<Bn256>,
    pub vk: VerifyingKey<G1Affine>,
}

impl From<VerifierArtifacts> for Halo2VerifyingKey {
    fn from(artifacts: VerifierArtifacts) -> Self {
        Self {
            params: artifacts.params,
            vk: artifacts.vk,
        }
    }
}

/// KZG over BN256 with GWC multi-open and a Blake2b transcript.
#[derive(Clone, Copy, Debug, Default)]
pub struct Halo2KzgVerifier;

impl ProofSystem for Halo2KzgVerifier {
    type VerifyingKey = Halo2VerifyingKey;

    fn verify(
        &self,
        key: &Halo2VerifyingKey,
        proof: &[u8],
        public_input: &Digest,
    ) -> Result<(), VerificationFailure> {
        if proof.is_empty() {
            return Err(VerificationFailure::MalformedProof("empty proof".into()));
        }
        let instances = public_input_instances(public_input)?;
        verify(&key.params, &key.vk, proof, &instances)
    }
}

/// The batch circuit exposes its public input as a single instance cell.
pub fn public_input_instances(public_input: &Digest) -> Result<Vec<Vec<Fr>>, VerificationFailure> {
    let value = fr_from_bytes(public_input).map_err(|_| VerificationFailure::InvalidPublicInput)?;
    Ok(vec![vec![value]])
}

pub fn verify(
    params: &ParamsKZG<Bn256>,
    vk: &VerifyingKey<G1Affine>,
    proof_bytes: &[u8],
    instances: &[Vec<Fr>],
) -> Result<(), VerificationFailure> {
    let mut transcript = Blake2bRead::<_, G1Affine, Challenge255<_>>::init(proof_bytes);

    let instance_columns: Vec<&[Fr]> = instances.iter().map(|col| col.as_slice()).collect();
    let prepared_instances = vec![instance_columns.as_slice()];

    verify_proof::<KZGCommitmentScheme<Bn256>, VerifierGWC<'_, Bn256>, _, _, _>(
        params,
        vk,
        SingleStrategy::new(params),
        &prepared_instances,
        &mut transcript,
    )
    .map(|_| ())
    .map_err(|err| VerificationFailure::Rejected(format!("{err:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvency_common::field::fr_to_bytes;

    #[test]
    fn public_input_becomes_single_instance_cell() {
        let digest = fr_to_bytes(&Fr::from(77u64));
        let instances = public_input_instances(&digest).unwrap();
        assert_eq!(instances, vec![vec![Fr::from(77u64)]]);
    }

    #[test]
    fn non_canonical_public_input_is_rejected() {
        assert_eq!(
            public_input_instances(&[0xff; 32]),
            Err(VerificationFailure::InvalidPublicInput)
        );
    }
}
