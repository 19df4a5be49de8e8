use crate::domain::ChainId;
use serde::{Deserialize, Serialize};

/// Flattened, serializable view of an imported account, carried inside
/// account-scoped subscription tasks and events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedAccount {
    pub address: String,
    pub chain_id: ChainId,
    pub name: String,
    pub source: AccountSource,
    #[serde(default)]
    pub nomination_pool_data: Option<NominationPoolData>,
    #[serde(default)]
    pub nominating_data: Option<NominatingData>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AccountSource {
    Vault,
    Ledger,
    ReadOnly,
    WalletConnect,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NominationPoolData {
    pub pool_id: u32,
    pub pool_state: String,
    pub pool_name: String,
    pub pool_roles: PoolRoles,
    pub pool_commission: PoolCommission,
    /// Planck-denominated string, same encoding the chain returns.
    pub pending_rewards: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoolRoles {
    pub depositor: String,
    pub root: Option<String>,
    pub nominator: Option<String>,
    pub bouncer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoolCommission {
    pub current: Option<(String, String)>,
    pub max: Option<String>,
    pub change_rate: Option<String>,
    pub throttle_from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NominatingData {
    pub exposed: bool,
    pub last_checked_era: u32,
    pub submitted_in: u32,
    pub validators: Vec<String>,
}
