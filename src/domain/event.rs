use crate::domain::errors::EventError;
use crate::domain::{
    ChainId, IntervalSubscription, PoolCommission, PoolRoles, SubscriptionTask, TaskAction,
    TaskCategory,
};
use serde::{Deserialize, Serialize};

/// Origin of a notification: the chain itself, one account, or an interval
/// task tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "origin", content = "data", rename_all = "camelCase")]
pub enum EventWho {
    #[serde(rename_all = "camelCase")]
    Chain { chain_id: ChainId },
    #[serde(rename_all = "camelCase")]
    Account {
        chain_id: ChainId,
        address: String,
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    Interval { chain_id: ChainId },
}

impl EventWho {
    pub fn chain_id(&self) -> ChainId {
        match self {
            EventWho::Chain { chain_id }
            | EventWho::Account { chain_id, .. }
            | EventWho::Interval { chain_id } => *chain_id,
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            EventWho::Account { address, .. } => Some(address),
            EventWho::Chain { .. } | EventWho::Interval { .. } => None,
        }
    }
}

/// Action-specific payload of a notification. One variant per task action, so
/// the deduplication table over it is exhaustive by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventData {
    #[serde(rename_all = "camelCase")]
    BalanceFree { free: String },
    #[serde(rename_all = "camelCase")]
    BalanceFrozen { frozen: String },
    #[serde(rename_all = "camelCase")]
    BalanceReserved { reserved: String },
    #[serde(rename_all = "camelCase")]
    BalanceSpendable { spendable: String },
    #[serde(rename_all = "camelCase")]
    PoolRewards { pending_rewards: String },
    #[serde(rename_all = "camelCase")]
    PoolState { pool_state: String },
    #[serde(rename_all = "camelCase")]
    PoolRenamed { pool_name: String },
    #[serde(rename_all = "camelCase")]
    PoolRoles { roles: PoolRoles },
    #[serde(rename_all = "camelCase")]
    PoolCommission { commission: PoolCommission },
    #[serde(rename_all = "camelCase")]
    NominatingPendingPayouts { pending_payouts: String, era: u32 },
    #[serde(rename_all = "camelCase")]
    NominatingExposure { era: u32, exposed: bool },
    #[serde(rename_all = "camelCase")]
    NominatingCommission { era: u32, has_changed: bool },
    #[serde(rename_all = "camelCase")]
    NominatingNominations { era: u32, has_changed: bool },
    #[serde(rename_all = "camelCase")]
    ChainTimestamp { timestamp: u64 },
    #[serde(rename_all = "camelCase")]
    ChainCurrentSlot { slot: u64 },
    #[serde(rename_all = "camelCase")]
    ReferendumVotes {
        referendum_id: u32,
        aye_votes: String,
        nay_votes: String,
    },
    #[serde(rename_all = "camelCase")]
    DecisionPeriod {
        referendum_id: u32,
        formatted_time: String,
    },
    #[serde(rename_all = "camelCase")]
    ReferendumThresholds {
        referendum_id: u32,
        formatted_approval: String,
        formatted_support: String,
    },
}

impl EventData {
    /// Parse a raw push result for the given action. Every action has exactly
    /// one expected payload shape; anything else is a malformed push.
    pub fn from_raw(action: TaskAction, raw: &serde_json::Value) -> Result<Self, EventError> {
        let str_field = |name: &str| -> Result<String, EventError> {
            raw.get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| EventError::MalformedResult(action, name.to_string()))
        };
        let u64_field = |name: &str| -> Result<u64, EventError> {
            raw.get(name)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| EventError::MalformedResult(action, name.to_string()))
        };
        let u32_field = |name: &str| -> Result<u32, EventError> {
            u32::try_from(u64_field(name)?)
                .map_err(|_| EventError::MalformedResult(action, name.to_string()))
        };
        let bool_field = |name: &str| -> Result<bool, EventError> {
            raw.get(name)
                .and_then(|v| v.as_bool())
                .ok_or_else(|| EventError::MalformedResult(action, name.to_string()))
        };

        match action {
            TaskAction::BalanceFree => Ok(EventData::BalanceFree {
                free: str_field("free")?,
            }),
            TaskAction::BalanceFrozen => Ok(EventData::BalanceFrozen {
                frozen: str_field("frozen")?,
            }),
            TaskAction::BalanceReserved => Ok(EventData::BalanceReserved {
                reserved: str_field("reserved")?,
            }),
            TaskAction::BalanceSpendable => Ok(EventData::BalanceSpendable {
                spendable: str_field("spendable")?,
            }),
            TaskAction::PoolRewards => Ok(EventData::PoolRewards {
                pending_rewards: str_field("pendingRewards")?,
            }),
            TaskAction::PoolState => Ok(EventData::PoolState {
                pool_state: str_field("poolState")?,
            }),
            TaskAction::PoolRenamed => Ok(EventData::PoolRenamed {
                pool_name: str_field("poolName")?,
            }),
            TaskAction::PoolRoles => {
                let roles = raw
                    .get("roles")
                    .cloned()
                    .ok_or_else(|| EventError::MalformedResult(action, "roles".to_string()))?;
                let roles: PoolRoles = serde_json::from_value(roles)
                    .map_err(|_| EventError::MalformedResult(action, "roles".to_string()))?;
                Ok(EventData::PoolRoles { roles })
            }
            TaskAction::PoolCommission => {
                let commission = raw.get("commission").cloned().ok_or_else(|| {
                    EventError::MalformedResult(action, "commission".to_string())
                })?;
                let commission: PoolCommission = serde_json::from_value(commission)
                    .map_err(|_| EventError::MalformedResult(action, "commission".to_string()))?;
                Ok(EventData::PoolCommission { commission })
            }
            TaskAction::NominatingPendingPayouts => Ok(EventData::NominatingPendingPayouts {
                pending_payouts: str_field("pendingPayouts")?,
                era: u32_field("era")?,
            }),
            TaskAction::NominatingExposure => Ok(EventData::NominatingExposure {
                era: u32_field("era")?,
                exposed: bool_field("exposed")?,
            }),
            TaskAction::NominatingCommission => Ok(EventData::NominatingCommission {
                era: u32_field("era")?,
                has_changed: bool_field("hasChanged")?,
            }),
            TaskAction::NominatingNominations => Ok(EventData::NominatingNominations {
                era: u32_field("era")?,
                has_changed: bool_field("hasChanged")?,
            }),
            TaskAction::ChainTimestamp => Ok(EventData::ChainTimestamp {
                timestamp: u64_field("timestamp")?,
            }),
            TaskAction::ChainCurrentSlot => Ok(EventData::ChainCurrentSlot {
                slot: u64_field("slot")?,
            }),
            TaskAction::ReferendumVotes => Ok(EventData::ReferendumVotes {
                referendum_id: u32_field("referendumId")?,
                aye_votes: str_field("ayeVotes")?,
                nay_votes: str_field("nayVotes")?,
            }),
            TaskAction::DecisionPeriod => Ok(EventData::DecisionPeriod {
                referendum_id: u32_field("referendumId")?,
                formatted_time: str_field("formattedTime")?,
            }),
            TaskAction::ReferendumThresholds => Ok(EventData::ReferendumThresholds {
                referendum_id: u32_field("referendumId")?,
                formatted_approval: str_field("formattedApproval")?,
                formatted_support: str_field("formattedSupport")?,
            }),
        }
    }

    pub fn referendum_id(&self) -> Option<u32> {
        match self {
            EventData::ReferendumVotes { referendum_id, .. }
            | EventData::DecisionPeriod { referendum_id, .. }
            | EventData::ReferendumThresholds { referendum_id, .. } => Some(*referendum_id),
            _ => None,
        }
    }
}

/// A notification produced from a subscription result, subject to
/// deduplication before being stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventCallback {
    /// Empty until the event store assigns it.
    pub uid: String,
    pub task_action: TaskAction,
    pub who: EventWho,
    pub category: TaskCategory,
    pub title: String,
    pub subtitle: String,
    pub data: EventData,
    pub stale: bool,
    pub timestamp: i64,
}

impl EventCallback {
    /// Build a notification from a push result for an account- or
    /// chain-scoped task.
    pub fn from_task(task: &SubscriptionTask, data: EventData) -> Self {
        let who = match &task.account {
            Some(account) => EventWho::Account {
                chain_id: task.chain_id,
                address: account.address.clone(),
                name: account.name.clone(),
            },
            None => EventWho::Chain {
                chain_id: task.chain_id,
            },
        };
        let (title, subtitle) = presentation(task.chain_id, &data);
        Self {
            uid: String::new(),
            task_action: task.action,
            who,
            category: task.action.category(),
            title,
            subtitle,
            data,
            stale: false,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Build a notification from an interval task evaluation.
    pub fn from_interval(sub: &IntervalSubscription, data: EventData) -> Self {
        let (title, subtitle) = presentation(sub.chain_id, &data);
        Self {
            uid: String::new(),
            task_action: sub.action,
            who: EventWho::Interval {
                chain_id: sub.chain_id,
            },
            category: sub.action.category(),
            title,
            subtitle,
            data,
            stale: false,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.who.chain_id()
    }

    pub fn address(&self) -> Option<&str> {
        self.who.address()
    }

    pub fn referendum_id(&self) -> Option<u32> {
        self.data.referendum_id()
    }
}

fn presentation(chain_id: ChainId, data: &EventData) -> (String, String) {
    let ticker = chain_id.ticker();
    match data {
        EventData::BalanceFree { free } => {
            ("Free Balance".to_string(), format!("{free} {ticker}"))
        }
        EventData::BalanceFrozen { frozen } => {
            ("Frozen Balance".to_string(), format!("{frozen} {ticker}"))
        }
        EventData::BalanceReserved { reserved } => {
            ("Reserved Balance".to_string(), format!("{reserved} {ticker}"))
        }
        EventData::BalanceSpendable { spendable } => (
            "Spendable Balance".to_string(),
            format!("{spendable} {ticker}"),
        ),
        EventData::PoolRewards { pending_rewards } => (
            "Unclaimed Pool Rewards".to_string(),
            format!("{pending_rewards} {ticker}"),
        ),
        EventData::PoolState { pool_state } => (
            "Pool State Changed".to_string(),
            format!("Pool is now {pool_state}"),
        ),
        EventData::PoolRenamed { pool_name } => {
            ("Pool Renamed".to_string(), pool_name.clone())
        }
        EventData::PoolRoles { .. } => (
            "Pool Roles Changed".to_string(),
            "The pool's roles were updated".to_string(),
        ),
        EventData::PoolCommission { .. } => (
            "Pool Commission Changed".to_string(),
            "The pool's commission was updated".to_string(),
        ),
        EventData::NominatingPendingPayouts {
            pending_payouts,
            era,
        } => (
            "Pending Payouts".to_string(),
            format!("{pending_payouts} {ticker} (era {era})"),
        ),
        EventData::NominatingExposure { era, exposed } => (
            "Era Exposure".to_string(),
            if *exposed {
                format!("Actively nominating in era {era}")
            } else {
                format!("Not exposed in era {era}")
            },
        ),
        EventData::NominatingCommission { era, .. } => (
            "Commission Changed".to_string(),
            format!("A watched validator changed commission in era {era}"),
        ),
        EventData::NominatingNominations { era, .. } => (
            "Nominations Changed".to_string(),
            format!("Nominated validator set changed in era {era}"),
        ),
        EventData::ChainTimestamp { timestamp } => {
            ("Timestamp".to_string(), timestamp.to_string())
        }
        EventData::ChainCurrentSlot { slot } => ("Current Slot".to_string(), slot.to_string()),
        EventData::ReferendumVotes {
            referendum_id,
            aye_votes,
            nay_votes,
        } => (
            format!("Referendum {referendum_id}"),
            format!("Ayes: {aye_votes}% Nays: {nay_votes}%"),
        ),
        EventData::DecisionPeriod {
            referendum_id,
            formatted_time,
        } => (
            format!("Referendum {referendum_id}"),
            format!("{formatted_time} remaining"),
        ),
        EventData::ReferendumThresholds {
            referendum_id,
            formatted_approval,
            formatted_support,
        } => (
            format!("Referendum {referendum_id}"),
            format!("Approval: {formatted_approval}% Support: {formatted_support}%"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_balance_push() {
        let raw = json!({ "free": "100" });
        let data = EventData::from_raw(TaskAction::BalanceFree, &raw).unwrap();
        assert_eq!(
            data,
            EventData::BalanceFree {
                free: "100".to_string()
            }
        );
    }

    #[test]
    fn rejects_malformed_push() {
        let raw = json!({ "fre": "100" });
        let err = EventData::from_raw(TaskAction::BalanceFree, &raw).unwrap_err();
        assert!(matches!(err, EventError::MalformedResult(_, _)));
    }

    #[test]
    fn rejects_out_of_range_referendum_id() {
        let raw = json!({
            "referendumId": u64::from(u32::MAX) + 1,
            "ayeVotes": "55.1",
            "nayVotes": "44.9",
        });
        let err = EventData::from_raw(TaskAction::ReferendumVotes, &raw).unwrap_err();
        assert!(matches!(err, EventError::MalformedResult(TaskAction::ReferendumVotes, field) if field == "referendumId"));
    }

    #[test]
    fn referendum_id_only_on_interval_payloads() {
        let votes = EventData::ReferendumVotes {
            referendum_id: 42,
            aye_votes: "55.1".to_string(),
            nay_votes: "44.9".to_string(),
        };
        assert_eq!(votes.referendum_id(), Some(42));
        let free = EventData::BalanceFree {
            free: "1".to_string(),
        };
        assert_eq!(free.referendum_id(), None);
    }
}
