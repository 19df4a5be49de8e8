use crate::domain::{EventCallback, EventData, EventWho, TaskAction};

/// Outcome of considering one incoming notification against the event log.
/// `updated` is the full post-verdict log: identical to the input when the
/// candidate is rejected, otherwise the input with outdated entries removed,
/// stale flags applied, and the candidate appended last.
#[derive(Debug)]
pub struct DedupVerdict {
    pub accept: bool,
    pub updated: Vec<EventCallback>,
    /// Uids flipped to stale by this verdict.
    pub stale_marked: Vec<String>,
}

/// Decide whether an incoming notification is genuinely new.
///
/// Two passes run over the log. The outdated-removal pass drops existing
/// entries that the candidate supersedes, keyed purely on identity fields.
/// The uniqueness pass compares values through the per-action predicate
/// against the original log. A duplicate leaves the log untouched; the
/// removal pass only commits together with an accepted candidate, so a
/// rejected duplicate cannot shrink the log.
pub fn consider_event(candidate: &EventCallback, existing: &[EventCallback]) -> DedupVerdict {
    let duplicate = existing
        .iter()
        .any(|event| is_duplicate(candidate, event));

    if duplicate {
        return DedupVerdict {
            accept: false,
            updated: existing.to_vec(),
            stale_marked: Vec::new(),
        };
    }

    let mut updated: Vec<EventCallback> = existing
        .iter()
        .filter(|event| !is_outdated(candidate, event))
        .cloned()
        .collect();

    let mut stale_marked = Vec::new();
    if candidate.task_action == TaskAction::PoolRewards {
        // A newer rewards reading supersedes every stored claim prompt for
        // the same account; they stay in the log but lose their actions.
        for event in updated.iter_mut() {
            if event.task_action == TaskAction::PoolRewards
                && event.address() == candidate.address()
                && event.chain_id() == candidate.chain_id()
                && !event.stale
            {
                event.stale = true;
                stale_marked.push(event.uid.clone());
            }
        }
    }

    updated.push(candidate.clone());

    DedupVerdict {
        accept: true,
        updated,
        stale_marked,
    }
}

/// Identity-keyed removal test: does the candidate supersede this stored
/// event outright? No value comparison here, that is the uniqueness pass.
fn is_outdated(candidate: &EventCallback, existing: &EventCallback) -> bool {
    // Rewards history survives removal; it is marked stale instead.
    if existing.task_action == TaskAction::PoolRewards {
        return false;
    }
    match &existing.who {
        EventWho::Chain { .. } => false,
        EventWho::Interval { .. } => {
            existing.task_action == candidate.task_action
                && existing.chain_id() == candidate.chain_id()
                && existing.referendum_id().is_some()
                && existing.referendum_id() == candidate.referendum_id()
        }
        EventWho::Account { .. } => {
            existing.task_action == candidate.task_action
                && existing.chain_id() == candidate.chain_id()
                && existing.address() == candidate.address()
        }
    }
}

/// Per-action equality predicate. The outer match is exhaustive over the
/// candidate payload, so an action without a predicate fails to compile.
fn is_duplicate(candidate: &EventCallback, existing: &EventCallback) -> bool {
    if existing.task_action != candidate.task_action
        || existing.chain_id() != candidate.chain_id()
        || existing.address() != candidate.address()
    {
        return false;
    }

    match &candidate.data {
        EventData::BalanceFree { free } => {
            matches!(&existing.data, EventData::BalanceFree { free: f } if f == free)
        }
        EventData::BalanceFrozen { frozen } => {
            matches!(&existing.data, EventData::BalanceFrozen { frozen: f } if f == frozen)
        }
        EventData::BalanceReserved { reserved } => {
            matches!(&existing.data, EventData::BalanceReserved { reserved: r } if r == reserved)
        }
        EventData::BalanceSpendable { spendable } => {
            matches!(&existing.data, EventData::BalanceSpendable { spendable: s } if s == spendable)
        }
        EventData::PoolRewards { pending_rewards } => matches!(
            &existing.data,
            EventData::PoolRewards { pending_rewards: p } if p == pending_rewards
        ),
        EventData::PoolState { pool_state } => {
            matches!(&existing.data, EventData::PoolState { pool_state: s } if s == pool_state)
        }
        EventData::PoolRenamed { pool_name } => {
            matches!(&existing.data, EventData::PoolRenamed { pool_name: n } if n == pool_name)
        }
        EventData::PoolRoles { roles } => {
            matches!(&existing.data, EventData::PoolRoles { roles: r } if r == roles)
        }
        EventData::PoolCommission { commission } => matches!(
            &existing.data,
            EventData::PoolCommission { commission: c } if c == commission
        ),
        EventData::NominatingPendingPayouts {
            pending_payouts,
            era,
        } => matches!(
            &existing.data,
            EventData::NominatingPendingPayouts { pending_payouts: p, era: e }
                if p == pending_payouts && e == era
        ),
        EventData::NominatingExposure { era, exposed } => matches!(
            &existing.data,
            EventData::NominatingExposure { era: e, exposed: x } if e == era && x == exposed
        ),
        EventData::NominatingCommission { era, has_changed } => matches!(
            &existing.data,
            EventData::NominatingCommission { era: e, has_changed: h }
                if e == era && h == has_changed
        ),
        EventData::NominatingNominations { era, has_changed } => matches!(
            &existing.data,
            EventData::NominatingNominations { era: e, has_changed: h }
                if e == era && h == has_changed
        ),
        EventData::ChainTimestamp { timestamp } => {
            matches!(&existing.data, EventData::ChainTimestamp { timestamp: t } if t == timestamp)
        }
        EventData::ChainCurrentSlot { slot } => {
            matches!(&existing.data, EventData::ChainCurrentSlot { slot: s } if s == slot)
        }
        EventData::ReferendumVotes {
            referendum_id,
            aye_votes,
            nay_votes,
        } => matches!(
            &existing.data,
            EventData::ReferendumVotes { referendum_id: r, aye_votes: a, nay_votes: n }
                if r == referendum_id && a == aye_votes && n == nay_votes
        ),
        EventData::DecisionPeriod {
            referendum_id,
            formatted_time,
        } => matches!(
            &existing.data,
            EventData::DecisionPeriod { referendum_id: r, formatted_time: t }
                if r == referendum_id && t == formatted_time
        ),
        EventData::ReferendumThresholds {
            referendum_id,
            formatted_approval,
            formatted_support,
        } => matches!(
            &existing.data,
            EventData::ReferendumThresholds {
                referendum_id: r,
                formatted_approval: a,
                formatted_support: s,
            } if r == referendum_id && a == formatted_approval && s == formatted_support
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChainId, TaskCategory};

    fn account_event(
        uid: &str,
        action: TaskAction,
        address: &str,
        data: EventData,
    ) -> EventCallback {
        EventCallback {
            uid: uid.to_string(),
            task_action: action,
            who: EventWho::Account {
                chain_id: ChainId::Polkadot,
                address: address.to_string(),
                name: "Test".to_string(),
            },
            category: action.category(),
            title: String::new(),
            subtitle: String::new(),
            data,
            stale: false,
            timestamp: 0,
        }
    }

    fn interval_event(uid: &str, action: TaskAction, data: EventData) -> EventCallback {
        EventCallback {
            uid: uid.to_string(),
            task_action: action,
            who: EventWho::Interval {
                chain_id: ChainId::Polkadot,
            },
            category: action.category(),
            title: String::new(),
            subtitle: String::new(),
            data,
            stale: false,
            timestamp: 0,
        }
    }

    fn free(v: &str) -> EventData {
        EventData::BalanceFree { free: v.to_string() }
    }

    #[test]
    fn same_value_twice_is_rejected_once() {
        let addr = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
        let first = account_event("", TaskAction::BalanceFree, addr, free("100"));
        let v1 = consider_event(&first, &[]);
        assert!(v1.accept);
        assert_eq!(v1.updated.len(), 1);

        let second = account_event("", TaskAction::BalanceFree, addr, free("100"));
        let v2 = consider_event(&second, &v1.updated);
        assert!(!v2.accept);
        assert_eq!(v2.updated.len(), 1);
    }

    #[test]
    fn changed_value_is_accepted() {
        let addr = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
        let first = account_event("", TaskAction::BalanceFree, addr, free("100"));
        let v1 = consider_event(&first, &[]);
        assert!(v1.accept);

        let second = account_event("", TaskAction::BalanceFree, addr, free("150"));
        let v2 = consider_event(&second, &v1.updated);
        assert!(v2.accept);
        // The old reading is superseded outright, not kept alongside.
        assert_eq!(v2.updated.len(), 1);
        assert_eq!(v2.updated[0].data, free("150"));
    }

    #[test]
    fn rewards_cascade_marks_older_events_stale() {
        let addr = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
        let e1 = account_event(
            "event_1",
            TaskAction::PoolRewards,
            addr,
            EventData::PoolRewards {
                pending_rewards: "10".to_string(),
            },
        );
        let v1 = consider_event(&e1, &[]);
        assert!(v1.accept);

        let e2 = account_event(
            "",
            TaskAction::PoolRewards,
            addr,
            EventData::PoolRewards {
                pending_rewards: "20".to_string(),
            },
        );
        let v2 = consider_event(&e2, &v1.updated);
        assert!(v2.accept);
        assert_eq!(v2.updated.len(), 2);
        assert!(v2.updated[0].stale);
        assert!(!v2.updated[1].stale);
        assert_eq!(v2.stale_marked, vec!["event_1".to_string()]);
    }

    #[test]
    fn rewards_cascade_skips_other_accounts() {
        let e1 = account_event(
            "event_1",
            TaskAction::PoolRewards,
            "addr-a",
            EventData::PoolRewards {
                pending_rewards: "10".to_string(),
            },
        );
        let v1 = consider_event(&e1, &[]);

        let e2 = account_event(
            "",
            TaskAction::PoolRewards,
            "addr-b",
            EventData::PoolRewards {
                pending_rewards: "20".to_string(),
            },
        );
        let v2 = consider_event(&e2, &v1.updated);
        assert!(v2.accept);
        assert!(!v2.updated[0].stale);
    }

    #[test]
    fn account_identity_removal_ignores_values() {
        let addr = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
        let stored = account_event("event_1", TaskAction::BalanceFrozen, addr, {
            EventData::BalanceFrozen {
                frozen: "5".to_string(),
            }
        });
        let incoming = account_event("", TaskAction::BalanceFrozen, addr, {
            EventData::BalanceFrozen {
                frozen: "9999".to_string(),
            }
        });
        let verdict = consider_event(&incoming, &[stored]);
        assert!(verdict.accept);
        assert_eq!(verdict.updated.len(), 1);
        assert_eq!(verdict.updated[0].uid, "");
    }

    #[test]
    fn interval_removal_matches_referendum_identity() {
        let stored = interval_event(
            "event_1",
            TaskAction::ReferendumVotes,
            EventData::ReferendumVotes {
                referendum_id: 100,
                aye_votes: "40".to_string(),
                nay_votes: "60".to_string(),
            },
        );
        let other = interval_event(
            "event_2",
            TaskAction::ReferendumVotes,
            EventData::ReferendumVotes {
                referendum_id: 101,
                aye_votes: "40".to_string(),
                nay_votes: "60".to_string(),
            },
        );
        let incoming = interval_event(
            "",
            TaskAction::ReferendumVotes,
            EventData::ReferendumVotes {
                referendum_id: 100,
                aye_votes: "55".to_string(),
                nay_votes: "45".to_string(),
            },
        );
        let verdict = consider_event(&incoming, &[stored, other]);
        assert!(verdict.accept);
        let uids: Vec<&str> = verdict.updated.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["event_2", ""]);
    }

    #[test]
    fn chain_scoped_events_survive_removal() {
        let stored = EventCallback {
            uid: "event_1".to_string(),
            task_action: TaskAction::ChainTimestamp,
            who: EventWho::Chain {
                chain_id: ChainId::Polkadot,
            },
            category: TaskCategory::Debugging,
            title: String::new(),
            subtitle: String::new(),
            data: EventData::ChainTimestamp { timestamp: 1 },
            stale: false,
            timestamp: 0,
        };
        let mut incoming = stored.clone();
        incoming.uid = String::new();
        incoming.data = EventData::ChainTimestamp { timestamp: 2 };
        let verdict = consider_event(&incoming, &[stored]);
        assert!(verdict.accept);
        assert_eq!(verdict.updated.len(), 2);
    }

    #[test]
    fn different_actions_never_collide() {
        let addr = "addr";
        let stored = account_event("event_1", TaskAction::BalanceFree, addr, free("100"));
        let incoming = account_event(
            "",
            TaskAction::BalanceReserved,
            addr,
            EventData::BalanceReserved {
                reserved: "100".to_string(),
            },
        );
        let verdict = consider_event(&incoming, &[stored]);
        assert!(verdict.accept);
        assert_eq!(verdict.updated.len(), 2);
    }
}
