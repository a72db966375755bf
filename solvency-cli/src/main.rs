// solvency/solvency-cli/src/main.rs

use std::{fmt, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use solvency_common::{
    config::{DEFAULT_CHAIN_CONFIG, DEFAULT_USER_CONFIG},
    decode_batch_table, digest_hex, load_verifier_artifacts, read_batch_table, read_chain_config,
    read_user_config, PoseidonScheme, VerifierArtifacts,
};
use solvency_verifier::{
    verify_user_inclusion, ChainVerificationError, ChainVerifierOptions, Halo2KzgVerifier,
    Halo2VerifyingKey, SolvencyReport, SolvencyVerifier,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "solvency=info,solvency_verifier=info,solvency_common=info";

#[derive(Parser)]
#[command(name = "solvency", about = "Verify proof-of-solvency attestations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay every batch proof and check the final asset ledger.
    Chain(ChainArgs),
    /// Check a single account's inclusion in the published account tree.
    User(UserArgs),
    /// Print metadata about the verifying key referenced by a manifest.
    DumpVk(DumpArgs),
}

#[derive(Args)]
struct ChainArgs {
    #[arg(long, default_value = DEFAULT_CHAIN_CONFIG)]
    config: PathBuf,
    /// Check batch proofs concurrently after the sequential consistency pass.
    #[arg(long)]
    parallel: bool,
    /// Worker threads for --parallel; defaults to one per core.
    #[arg(long, requires = "parallel")]
    threads: Option<usize>,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct UserArgs {
    #[arg(long, default_value = DEFAULT_USER_CONFIG)]
    config: PathBuf,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DumpArgs {
    #[arg(long)]
    manifest: PathBuf,
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Chain(args) => verify_chain(args),
        Commands::User(args) => verify_user(args),
        Commands::DumpVk(args) => dump_vk(args),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn verify_chain(args: ChainArgs) -> Result<()> {
    let config = read_chain_config(&args.config)?;
    let empty_tree_root = config.empty_tree_root()?;

    let rows = read_batch_table(&config.proof_table)?;
    let records = decode_batch_table(&rows)
        .with_context(|| format!("malformed proof table {}", config.proof_table.display()))?;
    info!(rows = records.len(), "proof table decoded");

    let artifacts = load_artifacts(&config.verifier_manifest)?;
    let vk = Halo2VerifyingKey::from(artifacts);

    let scheme = PoseidonScheme::new();
    let proof_system = Halo2KzgVerifier;
    let result = SolvencyVerifier::new(&scheme, &proof_system, &vk)
        .with_options(ChainVerifierOptions {
            parallel: args.parallel,
            threads: args.threads,
        })
        .verify(&config.cex_assets_info, empty_tree_root, records);

    output_summary(&ChainSummary::new(&result), args.json)?;
    result.context("chain verification failed")?;
    Ok(())
}

fn verify_user(args: UserArgs) -> Result<()> {
    let config = read_user_config(&args.config)?;
    let claim = config
        .to_claim()
        .with_context(|| format!("malformed user config {}", args.config.display()))?;

    let outcome = verify_user_inclusion(&PoseidonScheme::new(), &claim, config.asset_count)
        .context("invalid asset list in user config")?;

    let summary = UserSummary {
        account_index: claim.proof.leaf_index,
        leaf_hash: digest_hex(&outcome.leaf_hash),
        root: digest_hex(&claim.root),
        included: outcome.included,
    };
    output_summary(&summary, args.json)?;
    if !outcome.included {
        bail!("verify failed: account is not included under the published root");
    }
    Ok(())
}

fn dump_vk(args: DumpArgs) -> Result<()> {
    let artifacts = load_artifacts(&args.manifest)?;
    let cs = artifacts.vk.cs();
    let summary = VkSummary {
        manifest_path: args.manifest.display().to_string(),
        circuit_version: artifacts.manifest.circuit_version,
        manifest_version: artifacts.manifest.manifest_version,
        k: artifacts.manifest.circuit.k,
        vk_hash: artifacts.manifest.vk.blake3.clone(),
        vk_size: artifacts.manifest.vk.size,
        num_instance_columns: cs.num_instance_columns(),
        num_advice_columns: cs.num_advice_columns(),
        num_fixed_columns: cs.num_fixed_columns(),
        num_gates: cs.gates().len(),
    };
    output_summary(&summary, args.json)
}

fn load_artifacts(path: &PathBuf) -> Result<VerifierArtifacts> {
    load_verifier_artifacts(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))
}

fn output_summary<T>(summary: &T, json: bool) -> Result<()>
where
    T: Serialize + fmt::Display,
{
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}

#[derive(Serialize)]
struct ChainSummary {
    verified: bool,
    batches_verified: Option<usize>,
    account_tree_root: Option<String>,
    failed_batch: Option<i64>,
    error: Option<String>,
}

impl ChainSummary {
    fn new(result: &Result<SolvencyReport, ChainVerificationError>) -> Self {
        match result {
            Ok(report) => Self {
                verified: true,
                batches_verified: Some(report.chain.batches_verified),
                account_tree_root: Some(digest_hex(report.account_tree_root())),
                failed_batch: None,
                error: None,
            },
            Err(err) => Self {
                verified: false,
                batches_verified: None,
                account_tree_root: None,
                failed_batch: err.batch(),
                error: Some(err.to_string()),
            },
        }
    }
}

impl fmt::Display for ChainSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            return writeln!(f, "verify failed: {}", error);
        }
        if let Some(root) = &self.account_tree_root {
            writeln!(f, "account merkle tree root is {}", root)?;
        }
        if let Some(batches) = self.batches_verified {
            writeln!(f, "batches verified: {}", batches)?;
        }
        writeln!(f, "All proofs verify passed!!!")
    }
}

#[derive(Serialize)]
struct UserSummary {
    account_index: u64,
    leaf_hash: String,
    root: String,
    included: bool,
}

impl fmt::Display for UserSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "account index: {}", self.account_index)?;
        writeln!(f, "leaf hash: {}", self.leaf_hash)?;
        writeln!(f, "root: {}", self.root)?;
        if self.included {
            writeln!(f, "verify pass!!!")
        } else {
            writeln!(f, "verify failed")
        }
    }
}

#[derive(Serialize)]
struct VkSummary {
    manifest_path: String,
    circuit_version: u32,
    manifest_version: u32,
    k: usize,
    vk_hash: String,
    vk_size: u64,
    num_instance_columns: usize,
    num_advice_columns: usize,
    num_fixed_columns: usize,
    num_gates: usize,
}

impl fmt::Display for VkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "manifest: {}", self.manifest_path)?;
        writeln!(f, "circuit_version: {}", self.circuit_version)?;
        writeln!(f, "manifest_version: {}", self.manifest_version)?;
        writeln!(f, "k: {}", self.k)?;
        writeln!(f, "vk_hash: {}", self.vk_hash)?;
        writeln!(f, "vk_size: {} bytes", self.vk_size)?;
        writeln!(f, "instance columns: {}", self.num_instance_columns)?;
        writeln!(f, "advice columns: {}", self.num_advice_columns)?;
        writeln!(f, "fixed columns: {}", self.num_fixed_columns)?;
        writeln!(f, "gates: {}", self.num_gates)
    }
}
