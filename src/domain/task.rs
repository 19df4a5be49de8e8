use crate::domain::{ChainId, FlattenedAccount};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// What a subscription task watches. Doubles as the dispatch key for query
/// resolution and for deduplication, so the enum is closed: adding a variant
/// without extending every match over it is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskAction {
    // account: balances
    BalanceFree,
    BalanceFrozen,
    BalanceReserved,
    BalanceSpendable,
    // account: nomination pools
    PoolRewards,
    PoolState,
    PoolRenamed,
    PoolRoles,
    PoolCommission,
    // account: nominating
    NominatingPendingPayouts,
    NominatingExposure,
    NominatingCommission,
    NominatingNominations,
    // chain-scoped (debugging)
    ChainTimestamp,
    ChainCurrentSlot,
    // interval-polled openGov
    ReferendumVotes,
    DecisionPeriod,
    ReferendumThresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskScope {
    Chain,
    Account,
    Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskCategory {
    Balances,
    NominationPools,
    Nominating,
    OpenGov,
    Debugging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Enabled,
    Disabled,
}

impl TaskAction {
    pub fn scope(self) -> TaskScope {
        match self {
            TaskAction::BalanceFree
            | TaskAction::BalanceFrozen
            | TaskAction::BalanceReserved
            | TaskAction::BalanceSpendable
            | TaskAction::PoolRewards
            | TaskAction::PoolState
            | TaskAction::PoolRenamed
            | TaskAction::PoolRoles
            | TaskAction::PoolCommission
            | TaskAction::NominatingPendingPayouts
            | TaskAction::NominatingExposure
            | TaskAction::NominatingCommission
            | TaskAction::NominatingNominations => TaskScope::Account,
            TaskAction::ChainTimestamp | TaskAction::ChainCurrentSlot => TaskScope::Chain,
            TaskAction::ReferendumVotes
            | TaskAction::DecisionPeriod
            | TaskAction::ReferendumThresholds => TaskScope::Interval,
        }
    }

    pub fn category(self) -> TaskCategory {
        match self {
            TaskAction::BalanceFree
            | TaskAction::BalanceFrozen
            | TaskAction::BalanceReserved
            | TaskAction::BalanceSpendable => TaskCategory::Balances,
            TaskAction::PoolRewards
            | TaskAction::PoolState
            | TaskAction::PoolRenamed
            | TaskAction::PoolRoles
            | TaskAction::PoolCommission => TaskCategory::NominationPools,
            TaskAction::NominatingPendingPayouts
            | TaskAction::NominatingExposure
            | TaskAction::NominatingCommission
            | TaskAction::NominatingNominations => TaskCategory::Nominating,
            TaskAction::ChainTimestamp | TaskAction::ChainCurrentSlot => TaskCategory::Debugging,
            TaskAction::ReferendumVotes
            | TaskAction::DecisionPeriod
            | TaskAction::ReferendumThresholds => TaskCategory::OpenGov,
        }
    }
}

impl Display for TaskAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskAction::BalanceFree => "account:balance:free",
            TaskAction::BalanceFrozen => "account:balance:frozen",
            TaskAction::BalanceReserved => "account:balance:reserved",
            TaskAction::BalanceSpendable => "account:balance:spendable",
            TaskAction::PoolRewards => "account:nominationPools:rewards",
            TaskAction::PoolState => "account:nominationPools:state",
            TaskAction::PoolRenamed => "account:nominationPools:renamed",
            TaskAction::PoolRoles => "account:nominationPools:roles",
            TaskAction::PoolCommission => "account:nominationPools:commission",
            TaskAction::NominatingPendingPayouts => "account:nominating:pendingPayouts",
            TaskAction::NominatingExposure => "account:nominating:exposure",
            TaskAction::NominatingCommission => "account:nominating:commission",
            TaskAction::NominatingNominations => "account:nominating:nominations",
            TaskAction::ChainTimestamp => "chain:timestamp",
            TaskAction::ChainCurrentSlot => "chain:currentSlot",
            TaskAction::ReferendumVotes => "interval:openGov:referendumVotes",
            TaskAction::DecisionPeriod => "interval:openGov:decisionPeriod",
            TaskAction::ReferendumThresholds => "interval:openGov:referendumThresholds",
        };
        write!(f, "{s}")
    }
}

/// Identity of a task inside the registry and the per-chain query set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub chain_id: ChainId,
    pub action: TaskAction,
    pub address: Option<String>,
}

/// A request to watch one remote value, scoped to a chain or to one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionTask {
    pub chain_id: ChainId,
    pub action: TaskAction,
    pub status: TaskStatus,
    #[serde(default)]
    pub account: Option<FlattenedAccount>,
}

impl SubscriptionTask {
    pub fn chain_task(chain_id: ChainId, action: TaskAction, status: TaskStatus) -> Self {
        Self {
            chain_id,
            action,
            status,
            account: None,
        }
    }

    pub fn account_task(
        action: TaskAction,
        status: TaskStatus,
        account: FlattenedAccount,
    ) -> Self {
        Self {
            chain_id: account.chain_id,
            action,
            status,
            account: Some(account),
        }
    }

    pub fn key(&self) -> TaskKey {
        TaskKey {
            chain_id: self.chain_id,
            action: self.action,
            address: self.account.as_ref().map(|a| a.address.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status == TaskStatus::Enabled
    }
}

/// A task polled on a timer instead of pushed by the chain. OpenGov tasks are
/// the only interval-scoped tasks today.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntervalSubscription {
    pub chain_id: ChainId,
    pub action: TaskAction,
    pub status: TaskStatus,
    pub referendum_id: u32,
    /// Number of base ticks between evaluations.
    pub interval_setting: u32,
    /// Ticks remaining until the next evaluation.
    #[serde(default)]
    pub ticks_to_wait: u32,
}

impl IntervalSubscription {
    pub fn key(&self) -> (ChainId, TaskAction, u32) {
        (self.chain_id, self.action, self.referendum_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_follows_action_prefix() {
        assert_eq!(TaskAction::BalanceFree.scope(), TaskScope::Account);
        assert_eq!(TaskAction::ChainTimestamp.scope(), TaskScope::Chain);
        assert_eq!(TaskAction::ReferendumVotes.scope(), TaskScope::Interval);
    }

    #[test]
    fn category_follows_action() {
        assert_eq!(TaskAction::PoolRewards.category(), TaskCategory::NominationPools);
        assert_eq!(
            TaskAction::NominatingExposure.category(),
            TaskCategory::Nominating
        );
        assert_eq!(TaskAction::ChainCurrentSlot.category(), TaskCategory::Debugging);
    }
}
