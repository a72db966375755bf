//! Exchange-wide asset ledger entries and per-account asset balances.

use serde::{Deserialize, Serialize};

/// Number of asset slots in every account leaf and in the exchange ledger.
pub const DEFAULT_ASSET_COUNT: usize = 350;

/// Exchange-wide totals for one asset, from trusted pricing and balance data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    #[serde(alias = "Index")]
    pub index: u16,
    #[serde(alias = "Symbol")]
    pub symbol: String,
    #[serde(alias = "TotalEquity")]
    pub total_equity: u128,
    #[serde(alias = "TotalDebt")]
    pub total_debt: u128,
    /// Price in the ledger's quote unit. Absent in older configurations.
    #[serde(alias = "BasePrice", default)]
    pub base_price: u64,
}

impl AssetInfo {
    pub fn is_solvent(&self) -> bool {
        self.total_equity >= self.total_debt
    }

    /// Same asset with equity and debt cleared, as it stands before the first batch.
    pub fn zeroed(&self) -> Self {
        Self {
            total_equity: 0,
            total_debt: 0,
            ..self.clone()
        }
    }
}

/// One asset balance held by a single account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAsset {
    #[serde(alias = "Index")]
    pub index: u16,
    #[serde(alias = "Equity", default)]
    pub equity: u128,
    #[serde(alias = "Debt", default)]
    pub debt: u128,
}

impl AccountAsset {
    pub fn empty(index: u16) -> Self {
        Self {
            index,
            equity: 0,
            debt: 0,
        }
    }
}

/// The ledger state committed by the genesis batch: every asset with zero balances.
pub fn zeroed_ledger(assets: &[AssetInfo]) -> Vec<AssetInfo> {
    assets.iter().map(AssetInfo::zeroed).collect()
}
