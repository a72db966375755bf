//! Deterministic fixtures for verifier tests: a fast commitment scheme, a sparse
//! account tree, consistent batch chains and a proof-system stub that records
//! every proof it is asked to check.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use once_cell::sync::OnceCell;
use solvency_common::{
    AccountAsset, AssetInfo, BatchRecord, CommitmentScheme, Digest, MerkleProof,
    UserInclusionClaim, UserLeafInputs,
};
use solvency_verifier::{account_leaf_hash, Genesis, ProofSystem, VerificationFailure};

const TAG_NODE: u8 = 0x01;
const TAG_BATCH: u8 = 0x02;
const TAG_LEAF: u8 = 0x03;
const TAG_ASSET_LIST: u8 = 0x04;
const TAG_USER_ASSETS: u8 = 0x05;
const TAG_TREE_UPDATE: u8 = 0x06;

pub const SAMPLE_BATCHES: usize = 4;
pub const SAMPLE_TREE_DEPTH: usize = 8;

static SAMPLE_CHAIN: OnceCell<ChainFixture> = OnceCell::new();

/// Domain-separated blake3. Much cheaper than Poseidon, which keeps exhaustive
/// tree and chain tests fast.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Scheme;

impl Blake3Scheme {
    fn hash(tag: u8, parts: &[&[u8]]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[tag]);
        for part in parts {
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }
}

impl CommitmentScheme for Blake3Scheme {
    fn hash_nodes(&self, left: &Digest, right: &Digest) -> Digest {
        Self::hash(TAG_NODE, &[left, right])
    }

    fn batch_commitment(
        &self,
        tree_roots: &[Digest; 2],
        ledger_commitments: &[Digest; 2],
    ) -> Digest {
        Self::hash(
            TAG_BATCH,
            &[
                &tree_roots[0],
                &tree_roots[1],
                &ledger_commitments[0],
                &ledger_commitments[1],
            ],
        )
    }

    fn account_leaf(&self, leaf: &UserLeafInputs) -> Digest {
        Self::hash(
            TAG_LEAF,
            &[
                &leaf.account_id_hash,
                &leaf.total_equity.to_le_bytes(),
                &leaf.total_debt.to_le_bytes(),
                &leaf.asset_commitment,
            ],
        )
    }

    fn commit_asset_list(&self, assets: &[AssetInfo]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[TAG_ASSET_LIST]);
        for asset in assets {
            hasher.update(&asset.total_equity.to_le_bytes());
            hasher.update(&asset.total_debt.to_le_bytes());
            hasher.update(&asset.base_price.to_le_bytes());
        }
        *hasher.finalize().as_bytes()
    }

    fn commit_user_assets(&self, assets: &[AccountAsset]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[TAG_USER_ASSETS]);
        for asset in assets {
            hasher.update(&asset.equity.to_le_bytes());
            hasher.update(&asset.debt.to_le_bytes());
        }
        *hasher.finalize().as_bytes()
    }
}

/// Fixed-depth Merkle tree that only stores non-empty nodes.
pub struct SparseMerkleTree<'a, S> {
    scheme: &'a S,
    depth: usize,
    /// `empty[level]` is the root of an all-empty subtree of height `level`.
    empty: Vec<Digest>,
    nodes: HashMap<(usize, u64), Digest>,
}

impl<'a, S: CommitmentScheme> SparseMerkleTree<'a, S> {
    pub fn new(scheme: &'a S, depth: usize) -> Self {
        let mut empty = Vec::with_capacity(depth + 1);
        empty.push([0u8; 32]);
        for level in 0..depth {
            let below = empty[level];
            empty.push(scheme.hash_nodes(&below, &below));
        }
        Self {
            scheme,
            depth,
            empty,
            nodes: HashMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn root(&self) -> Digest {
        self.node(self.depth, 0)
    }

    pub fn empty_root(&self) -> Digest {
        self.empty[self.depth]
    }

    pub fn insert(&mut self, index: u64, leaf: Digest) {
        assert!(
            self.depth >= 64 || index >> self.depth == 0,
            "leaf index {index} outside depth {}",
            self.depth
        );
        self.nodes.insert((0, index), leaf);
        let mut position = index;
        for level in 0..self.depth {
            let (left, right) = if position & 1 == 0 {
                (self.node(level, position), self.node(level, position ^ 1))
            } else {
                (self.node(level, position ^ 1), self.node(level, position))
            };
            position >>= 1;
            let parent = self.scheme.hash_nodes(&left, &right);
            self.nodes.insert((level + 1, position), parent);
        }
    }

    pub fn proof(&self, index: u64) -> MerkleProof {
        let siblings = (0..self.depth)
            .map(|level| self.node(level, (index >> level) ^ 1))
            .collect();
        MerkleProof {
            leaf_index: index,
            siblings,
        }
    }

    fn node(&self, level: usize, position: u64) -> Digest {
        self.nodes
            .get(&(level, position))
            .copied()
            .unwrap_or(self.empty[level])
    }
}

/// An account to place in a fixture tree.
#[derive(Clone, Debug)]
pub struct AccountSpec {
    pub index: u64,
    pub account_id_hash: Digest,
    pub assets: Vec<AccountAsset>,
}

impl AccountSpec {
    pub fn new(index: u64, assets: Vec<AccountAsset>) -> Self {
        let account_id_hash = *blake3::hash(&index.to_le_bytes()).as_bytes();
        Self {
            index,
            account_id_hash,
            assets,
        }
    }
}

/// Builds a tree holding `accounts` and returns a valid inclusion claim for each.
pub fn build_account_tree<'a, S: CommitmentScheme>(
    scheme: &'a S,
    depth: usize,
    asset_count: usize,
    accounts: &[AccountSpec],
) -> (SparseMerkleTree<'a, S>, Vec<UserInclusionClaim>) {
    let mut tree = SparseMerkleTree::new(scheme, depth);
    let mut claims: Vec<UserInclusionClaim> = accounts
        .iter()
        .map(|account| UserInclusionClaim {
            account_id_hash: account.account_id_hash,
            total_equity: account.assets.iter().map(|asset| asset.equity).sum(),
            total_debt: account.assets.iter().map(|asset| asset.debt).sum(),
            assets: account.assets.clone(),
            proof: MerkleProof {
                leaf_index: account.index,
                siblings: Vec::new(),
            },
            root: [0u8; 32],
        })
        .collect();

    for claim in &claims {
        let leaf = account_leaf_hash(scheme, claim, asset_count).expect("fixture asset indices");
        tree.insert(claim.proof.leaf_index, leaf);
    }
    let root = tree.root();
    for claim in &mut claims {
        claim.proof = tree.proof(claim.proof.leaf_index);
        claim.root = root;
    }
    (tree, claims)
}

/// A chain whose records satisfy every local check.
#[derive(Clone, Debug)]
pub struct ChainFixture {
    pub genesis: Genesis,
    pub records: Vec<BatchRecord>,
    /// Ledger the last batch ends on.
    pub assets: Vec<AssetInfo>,
}

impl ChainFixture {
    pub fn proofs(&self) -> Vec<Vec<u8>> {
        self.records.iter().map(|record| record.proof.clone()).collect()
    }
}

pub fn sample_assets(count: u16) -> Vec<AssetInfo> {
    (0..count)
        .map(|index| {
            let equity = 1_000 * u128::from(index + 1);
            AssetInfo {
                index,
                symbol: format!("asset{index}"),
                total_equity: equity,
                total_debt: equity / 4,
                base_price: 10 + u64::from(index),
            }
        })
        .collect()
}

/// `batches` records moving the ledger from zero to `assets` in equal steps.
/// Each batch's proof bytes are `proof-<n>`.
pub fn build_chain<S: CommitmentScheme>(
    scheme: &S,
    assets: &[AssetInfo],
    empty_tree_root: Digest,
    batches: usize,
) -> ChainFixture {
    let genesis = Genesis::for_assets(scheme, assets, empty_tree_root);
    let mut prev_root = genesis.empty_tree_root;
    let mut prev_ledger = genesis.empty_ledger_commitment;
    let mut records = Vec::with_capacity(batches);

    for batch in 0..batches {
        let step = (batch + 1) as u128;
        let ledger: Vec<AssetInfo> = assets
            .iter()
            .map(|asset| AssetInfo {
                total_equity: asset.total_equity * step / batches as u128,
                total_debt: asset.total_debt * step / batches as u128,
                ..asset.clone()
            })
            .collect();
        let next_ledger = scheme.commit_asset_list(&ledger);
        let next_root = scheme.hash_nodes(&prev_root, &batch_tag(batch));

        let tree_roots = [prev_root, next_root];
        let ledger_commitments = [prev_ledger, next_ledger];
        records.push(BatchRecord {
            batch_number: batch as i64,
            proof: format!("proof-{batch}").into_bytes(),
            ledger_commitments,
            tree_roots,
            public_input: scheme.batch_commitment(&tree_roots, &ledger_commitments),
        });
        prev_root = next_root;
        prev_ledger = next_ledger;
    }

    ChainFixture {
        genesis,
        records,
        assets: assets.to_vec(),
    }
}

/// Shared four-batch chain over three assets, built once per test binary.
pub fn sample_chain() -> &'static ChainFixture {
    SAMPLE_CHAIN.get_or_init(|| {
        let scheme = Blake3Scheme;
        let empty = SparseMerkleTree::new(&scheme, SAMPLE_TREE_DEPTH).empty_root();
        build_chain(&scheme, &sample_assets(3), empty, SAMPLE_BATCHES)
    })
}

fn batch_tag(batch: usize) -> Digest {
    let mut tag = [0u8; 32];
    tag[0] = TAG_TREE_UPDATE;
    tag[24..].copy_from_slice(&(batch as u64).to_be_bytes());
    tag
}

/// Proof-system stub: accepts every proof except the ones it was told to reject
/// and remembers every call.
#[derive(Debug, Default)]
pub struct RecordingProofSystem {
    rejected: HashSet<Vec<u8>>,
    calls: Mutex<Vec<Vec<u8>>>,
}

impl RecordingProofSystem {
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn rejecting<I>(proofs: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            rejected: proofs.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Proofs checked so far, sorted so concurrent runs compare equal.
    pub fn calls(&self) -> Vec<Vec<u8>> {
        let mut calls = self.calls.lock().expect("calls lock").clone();
        calls.sort();
        calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    pub fn was_called_with(&self, proof: &[u8]) -> bool {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .any(|call| call == proof)
    }
}

impl ProofSystem for RecordingProofSystem {
    type VerifyingKey = ();

    fn verify(
        &self,
        _vk: &(),
        proof: &[u8],
        _public_input: &Digest,
    ) -> Result<(), VerificationFailure> {
        self.calls.lock().expect("calls lock").push(proof.to_vec());
        if self.rejected.contains(proof) {
            return Err(VerificationFailure::Rejected("stub rejection".into()));
        }
        Ok(())
    }
}
