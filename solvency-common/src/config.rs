//! JSON configuration for chain mode and user mode.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use hex_literal::hex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    assets::{AccountAsset, AssetInfo, DEFAULT_ASSET_COUNT},
    claim::{MerkleProof, UserInclusionClaim},
    digest::{decode_digest_hex, decode_field_base64, Digest},
    error::DecodeError,
};

pub const DEFAULT_CHAIN_CONFIG: &str = "config/config.json";
pub const DEFAULT_USER_CONFIG: &str = "config/user_config.json";

/// Root of the empty depth-28 account tree the first batch starts from.
pub const EMPTY_ACCOUNT_TREE_ROOT: Digest =
    hex!("0e85b74bfd43747cb5e18ecb067727243f2e919a91ef69d86b5a27ed74bea7c2");

/// Depth of the production account tree.
pub const ACCOUNT_TREE_DEPTH: usize = 28;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON proof table, one record per batch.
    #[serde(alias = "ProofTable")]
    pub proof_table: PathBuf,
    /// Artifact manifest describing the verifying key.
    #[serde(alias = "ZkKeyName")]
    pub verifier_manifest: PathBuf,
    /// Authoritative per-asset totals the final ledger commitment must match.
    #[serde(alias = "CexAssetsInfo")]
    pub cex_assets_info: Vec<AssetInfo>,
    /// Hex override for the empty account-tree root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_account_tree_root: Option<String>,
}

impl ChainConfig {
    pub fn empty_tree_root(&self) -> Result<Digest, DecodeError> {
        match self.empty_account_tree_root.as_deref() {
            Some(value) => decode_digest_hex("empty_account_tree_root", value),
            None => Ok(EMPTY_ACCOUNT_TREE_ROOT),
        }
    }

    /// Resolves relative table and manifest paths against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        if self.proof_table.is_relative() {
            self.proof_table = base_dir.join(&self.proof_table);
        }
        if self.verifier_manifest.is_relative() {
            self.verifier_manifest = base_dir.join(&self.verifier_manifest);
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(alias = "AccountIndex")]
    pub account_index: u64,
    /// Hex encoded.
    #[serde(alias = "AccountIdHash")]
    pub account_id_hash: String,
    #[serde(alias = "TotalEquity")]
    pub total_equity: u128,
    #[serde(alias = "TotalDebt")]
    pub total_debt: u128,
    /// Hex encoded account-tree root.
    #[serde(alias = "Root")]
    pub root: String,
    /// Base64 sibling digests, leaf level first.
    #[serde(alias = "Proof")]
    pub proof: Vec<String>,
    #[serde(alias = "Assets", default)]
    pub assets: Vec<AccountAsset>,
    #[serde(default = "default_asset_count")]
    pub asset_count: usize,
}

fn default_asset_count() -> usize {
    DEFAULT_ASSET_COUNT
}

impl UserConfig {
    pub fn to_claim(&self) -> Result<UserInclusionClaim, DecodeError> {
        let siblings = self
            .proof
            .iter()
            .map(|sibling| decode_field_base64("proof", sibling))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(UserInclusionClaim {
            account_id_hash: decode_digest_hex("account_id_hash", &self.account_id_hash)?,
            total_equity: self.total_equity,
            total_debt: self.total_debt,
            assets: self.assets.clone(),
            proof: MerkleProof {
                leaf_index: self.account_index,
                siblings,
            },
            root: decode_digest_hex("root", &self.root)?,
        })
    }
}

/// Reads a chain config; relative paths inside it are taken relative to the
/// directory holding the config file.
pub fn read_chain_config(path: impl AsRef<Path>) -> Result<ChainConfig> {
    let path = path.as_ref();
    let mut config: ChainConfig = read_json(path, "chain config")?;
    config.resolve_paths(&config_dir(path));
    Ok(config)
}

pub fn read_user_config(path: impl AsRef<Path>) -> Result<UserConfig> {
    read_json(path.as_ref(), "user config")
}

fn read_json<T: DeserializeOwned>(path: &Path, label: &str) -> Result<T> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {} {}", label, path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse {} {}", label, path.display()))
}

fn config_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
