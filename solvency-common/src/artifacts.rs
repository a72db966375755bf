//! Verifying-key artifacts: manifest, integrity checks and halo2 deserialization.
//!
//! Batch proofs come from a halo2-lib circuit. Reading its verifying key only
//! needs the circuit's column layout, which the manifest records; the witness
//! side of the circuit never runs here.

use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use halo2_base::gates::circuit::{BaseCircuitParams, BaseConfig};
use halo2_proofs_axiom::{
    circuit::{Layouter, SimpleFloorPlanner},
    plonk::{self, Circuit, ConstraintSystem, Error},
    poly::{commitment::Params, kzg::commitment::ParamsKZG},
    SerdeFormat,
};
use halo2curves_axiom::bn256::{Bn256, Fr, G1Affine};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MANIFEST_VERSION: u32 = 1;
/// Layout version of the batch circuit's public input (one instance column, one row).
pub const CIRCUIT_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub path: String,
    pub blake3: String,
    pub size: u64,
}

impl ArtifactFile {
    pub fn from_bytes(path: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            blake3: hash_bytes_hex(bytes),
            size: bytes.len() as u64,
        }
    }

    fn resolve_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.path)
    }
}

/// Column layout of the batch circuit, as configured by the proving side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitShape {
    pub k: usize,
    pub num_advice_per_phase: Vec<usize>,
    pub num_fixed: usize,
    pub num_lookup_advice_per_phase: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_bits: Option<usize>,
    pub num_instance_columns: usize,
}

impl CircuitShape {
    pub fn to_params(&self) -> BaseCircuitParams {
        BaseCircuitParams {
            k: self.k,
            num_advice_per_phase: self.num_advice_per_phase.clone(),
            num_fixed: self.num_fixed,
            num_lookup_advice_per_phase: self.num_lookup_advice_per_phase.clone(),
            lookup_bits: self.lookup_bits,
            num_instance_columns: self.num_instance_columns,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub manifest_version: u32,
    pub circuit_version: u32,
    pub created_at_unix: u64,
    pub circuit: CircuitShape,
    pub params: ArtifactFile,
    pub vk: ArtifactFile,
}

#[derive(Clone, Debug)]
pub struct VerifierArtifacts {
    pub manifest: ArtifactManifest,
    pub params: ParamsKZG<Bn256>,
    pub vk: plonk::VerifyingKey<G1Affine>,
}

/// Verifier-side stand-in for the batch circuit: configures the same columns so
/// a verifying key can be read, but cannot synthesize a witness.
#[derive(Clone, Debug)]
pub struct BatchCircuitShape {
    params: BaseCircuitParams,
}

impl BatchCircuitShape {
    pub fn new(shape: &CircuitShape) -> Self {
        Self {
            params: shape.to_params(),
        }
    }
}

impl Circuit<Fr> for BatchCircuitShape {
    type Config = BaseConfig<Fr>;
    type FloorPlanner = SimpleFloorPlanner;
    type Params = BaseCircuitParams;

    fn params(&self) -> Self::Params {
        self.params.clone()
    }

    fn without_witnesses(&self) -> Self {
        self.clone()
    }

    fn configure_with_params(
        meta: &mut ConstraintSystem<Fr>,
        params: Self::Params,
    ) -> Self::Config {
        BaseConfig::configure(meta, params)
    }

    fn configure(_: &mut ConstraintSystem<Fr>) -> Self::Config {
        unreachable!("BatchCircuitShape must be configured with explicit parameters")
    }

    fn synthesize(&self, _: Self::Config, _: impl Layouter<Fr>) -> Result<(), Error> {
        Err(Error::Synthesis)
    }
}

pub fn deserialize_params(bytes: &[u8]) -> Result<ParamsKZG<Bn256>> {
    let mut reader = Cursor::new(bytes);
    ParamsKZG::<Bn256>::read(&mut reader).context("failed to deserialize KZG params")
}

pub fn deserialize_verifying_key(
    bytes: &[u8],
    shape: &CircuitShape,
) -> Result<plonk::VerifyingKey<G1Affine>> {
    let mut reader = Cursor::new(bytes);
    plonk::VerifyingKey::read::<_, BatchCircuitShape>(
        &mut reader,
        SerdeFormat::Processed,
        shape.to_params(),
    )
    .context("failed to deserialize verifying key")
}

pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn write_manifest(path: impl AsRef<Path>, manifest: &ArtifactManifest) -> Result<()> {
    let json = serde_json::to_vec_pretty(manifest).context("failed to serialize manifest")?;
    fs::write(path.as_ref(), json).context("failed to write manifest")
}

pub fn read_manifest(path: impl AsRef<Path>) -> Result<ArtifactManifest> {
    let bytes = fs::read(path.as_ref()).context("failed to read manifest file")?;
    serde_json::from_slice(&bytes).context("failed to parse manifest json")
}

/// Raw params and verifying-key bytes after size and blake3 checks.
pub fn load_artifact_bytes(manifest_path: &Path) -> Result<(ArtifactManifest, Vec<u8>, Vec<u8>)> {
    let manifest = read_manifest(manifest_path)?;
    ensure_manifest_compat(&manifest)?;
    let base_dir = manifest_dir(manifest_path);

    let params_bytes = read_artifact_file(&base_dir, &manifest.params, "params")?;
    let vk_bytes = read_artifact_file(&base_dir, &manifest.vk, "verifying key")?;
    debug!(
        params_bytes = params_bytes.len(),
        vk_bytes = vk_bytes.len(),
        "artifact integrity checks passed"
    );

    Ok((manifest, params_bytes, vk_bytes))
}

pub fn load_verifier_artifacts(path: impl AsRef<Path>) -> Result<VerifierArtifacts> {
    let (manifest, params_bytes, vk_bytes) = load_artifact_bytes(path.as_ref())?;
    let params = deserialize_params(&params_bytes)?;
    let vk = deserialize_verifying_key(&vk_bytes, &manifest.circuit)?;
    Ok(VerifierArtifacts {
        manifest,
        params,
        vk,
    })
}

fn read_artifact_file(base_dir: &Path, entry: &ArtifactFile, label: &str) -> Result<Vec<u8>> {
    let path = entry.resolve_path(base_dir);
    let bytes = fs::read(&path)
        .with_context(|| format!("failed to read {} at {}", label, path.display()))?;
    ensure!(
        bytes.len() as u64 == entry.size,
        "{} size mismatch, manifest recorded {} bytes but found {}",
        label,
        entry.size,
        bytes.len(),
    );
    ensure_hash(&bytes, &entry.blake3, label)?;
    Ok(bytes)
}

fn ensure_hash(bytes: &[u8], expected_hex: &str, label: &str) -> Result<()> {
    let actual = hash_bytes_hex(bytes);
    ensure!(
        actual == expected_hex,
        "{} hash mismatch, expected {} but computed {}",
        label,
        expected_hex,
        actual
    );
    Ok(())
}

fn manifest_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn ensure_manifest_compat(manifest: &ArtifactManifest) -> Result<()> {
    ensure!(
        manifest.manifest_version == MANIFEST_VERSION,
        "unsupported manifest version {}, expected {}",
        manifest.manifest_version,
        MANIFEST_VERSION
    );
    ensure!(
        manifest.circuit_version == CIRCUIT_VERSION,
        "circuit version mismatch: manifest {} vs crate {}",
        manifest.circuit_version,
        CIRCUIT_VERSION
    );
    ensure!(
        manifest.circuit.num_instance_columns == 1,
        "batch circuit exposes one instance column, manifest declares {}",
        manifest.circuit.num_instance_columns
    );
    Ok(())
}
