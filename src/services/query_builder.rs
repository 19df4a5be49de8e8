use crate::domain::{ChainId, EventCallback, EventData, SubscriptionTask, TaskAction, TaskKey};
use crate::ports::chain_api::{ChainApi, PushCallback, RemoteQuery, SubscriptionHandle};
use crate::services::errors::ChainApiError;
use crate::services::event_log::EventLog;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Resolve a task action to the concrete remote query backing it. The match
/// is exhaustive: a new action without a query resolution fails to compile.
pub fn resolve_query(
    action: TaskAction,
    address: Option<&str>,
    referendum_id: Option<u32>,
) -> RemoteQuery {
    let addr_args = || address.map(str::to_string).into_iter().collect::<Vec<_>>();
    let ref_args = || {
        referendum_id
            .map(|id| id.to_string())
            .into_iter()
            .collect::<Vec<_>>()
    };
    match action {
        TaskAction::BalanceFree
        | TaskAction::BalanceFrozen
        | TaskAction::BalanceReserved
        | TaskAction::BalanceSpendable => RemoteQuery::new("system", "account", addr_args()),
        TaskAction::PoolRewards => {
            RemoteQuery::new("nominationPools", "pendingRewards", addr_args())
        }
        TaskAction::PoolState | TaskAction::PoolRenamed | TaskAction::PoolRoles => {
            RemoteQuery::new("nominationPools", "bondedPools", addr_args())
        }
        TaskAction::PoolCommission => {
            RemoteQuery::new("nominationPools", "commission", addr_args())
        }
        TaskAction::NominatingPendingPayouts
        | TaskAction::NominatingExposure
        | TaskAction::NominatingCommission
        | TaskAction::NominatingNominations => {
            RemoteQuery::new("staking", "activeEra", addr_args())
        }
        TaskAction::ChainTimestamp => RemoteQuery::new("timestamp", "now", Vec::new()),
        TaskAction::ChainCurrentSlot => RemoteQuery::new("babe", "currentSlot", Vec::new()),
        TaskAction::ReferendumVotes
        | TaskAction::DecisionPeriod
        | TaskAction::ReferendumThresholds => {
            RemoteQuery::new("referenda", "referendumInfoFor", ref_args())
        }
    }
}

/// A task paired with its resolved remote query, owned by the chain's query
/// set from insert to remove.
#[derive(Debug, Clone)]
pub struct ApiCallEntry {
    pub task: SubscriptionTask,
    pub query: RemoteQuery,
}

struct QuerySetInner {
    entries: HashMap<TaskKey, ApiCallEntry>,
    handle: Option<SubscriptionHandle>,
}

/// Per-chain wrapper around the one multiplexed subscription. The transport
/// cannot add or remove queries from a live batch, so every insert/remove is
/// followed by a rebuild that replaces the handle. The inner mutex is held
/// across a rebuild, which serializes rebuilds for the same chain; different
/// chains rebuild independently.
pub struct ChainQuerySet {
    chain_id: ChainId,
    inner: Mutex<QuerySetInner>,
}

impl ChainQuerySet {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            inner: Mutex::new(QuerySetInner {
                entries: HashMap::new(),
                handle: None,
            }),
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub async fn insert(&self, task: SubscriptionTask) {
        let address = task.account.as_ref().map(|a| a.address.clone());
        let query = resolve_query(task.action, address.as_deref(), None);
        let mut inner = self.inner.lock().await;
        inner.entries.insert(task.key(), ApiCallEntry { task, query });
    }

    pub async fn remove(&self, key: &TaskKey) -> bool {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(key).is_some()
    }

    pub async fn entry_count(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn has_live_handle(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.handle.as_ref().is_some_and(|h| !h.is_cancelled())
    }

    /// Cancel the active handle without rebuilding, used on disconnect. The
    /// entries stay recorded so the next rebuild restores them.
    pub async fn cancel_active(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.handle.take() {
            handle.cancel();
        }
    }

    /// Reissue the chain's multiplexed subscription over the current entry
    /// set: cancel the old handle, snapshot the entries, subscribe to all of
    /// them in one batch with a demultiplexing push callback.
    pub async fn rebuild(
        &self,
        api: Arc<dyn ChainApi>,
        event_log: Arc<EventLog>,
    ) -> Result<(), ChainApiError> {
        let mut inner = self.inner.lock().await;

        if let Some(handle) = inner.handle.take() {
            handle.cancel();
        }

        if inner.entries.is_empty() {
            tracing::info!(chain = %self.chain_id, "query set empty, no subscription");
            return Ok(());
        }

        let mut entries: Vec<ApiCallEntry> = inner.entries.values().cloned().collect();
        entries.sort_by_key(|e| (e.task.key().address, e.task.action.to_string()));
        let queries: Vec<RemoteQuery> = entries.iter().map(|e| e.query.clone()).collect();
        let tasks: Arc<Vec<SubscriptionTask>> =
            Arc::new(entries.into_iter().map(|e| e.task).collect());

        let chain_id = self.chain_id;
        let on_push: PushCallback = Arc::new(move |index, raw| {
            let Some(task) = tasks.get(index).cloned() else {
                tracing::warn!(chain = %chain_id, index, "push for unknown batch position");
                return;
            };
            match EventData::from_raw(task.action, &raw) {
                Ok(data) => {
                    let event = EventCallback::from_task(&task, data);
                    let event_log = Arc::clone(&event_log);
                    tokio::spawn(async move {
                        event_log.process(event).await;
                    });
                }
                Err(err) => {
                    tracing::warn!(chain = %chain_id, error = %err, "dropping malformed push");
                }
            }
        });

        let handle = api.subscribe_many(queries, on_push).await?;
        tracing::info!(
            chain = %self.chain_id,
            sub = handle.id(),
            entries = inner.entries.len(),
            "rebuilt multiplexed subscription"
        );
        inner.handle = Some(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountSource, FlattenedAccount, TaskStatus};
    use crate::ports::chain_api::InMemoryChainApi;
    use crate::ports::persistence::InMemoryEventStore;
    use crate::ports::sink::NotificationSink;
    use serde_json::json;

    fn account_task(action: TaskAction, address: &str) -> SubscriptionTask {
        SubscriptionTask::account_task(
            action,
            TaskStatus::Enabled,
            FlattenedAccount {
                address: address.to_string(),
                chain_id: ChainId::Polkadot,
                name: "Alice".to_string(),
                source: AccountSource::Vault,
                nomination_pool_data: None,
                nominating_data: None,
            },
        )
    }

    fn new_log() -> Arc<EventLog> {
        Arc::new(EventLog::new(
            Arc::new(InMemoryEventStore::new()),
            NotificationSink::new(),
        ))
    }

    #[tokio::test]
    async fn at_most_one_live_handle_per_chain() {
        let api = Arc::new(InMemoryChainApi::new(ChainId::Polkadot));
        let set = ChainQuerySet::new(ChainId::Polkadot);
        let log = new_log();

        for (i, action) in [
            TaskAction::BalanceFree,
            TaskAction::BalanceFrozen,
            TaskAction::BalanceReserved,
        ]
        .into_iter()
        .enumerate()
        {
            set.insert(account_task(action, "addr")).await;
            set.rebuild(Arc::clone(&api) as Arc<dyn ChainApi>, Arc::clone(&log))
                .await
                .unwrap();
            assert_eq!(api.live_subscriptions().await, 1, "after rebuild {i}");
        }
        assert_eq!(api.subscribe_calls(), 3);
    }

    #[tokio::test]
    async fn empty_set_rebuild_leaves_no_handle() {
        let api = Arc::new(InMemoryChainApi::new(ChainId::Polkadot));
        let set = ChainQuerySet::new(ChainId::Polkadot);
        let log = new_log();

        let task = account_task(TaskAction::BalanceFree, "addr");
        set.insert(task.clone()).await;
        set.rebuild(Arc::clone(&api) as Arc<dyn ChainApi>, Arc::clone(&log))
            .await
            .unwrap();
        assert!(set.has_live_handle().await);

        set.remove(&task.key()).await;
        set.rebuild(Arc::clone(&api) as Arc<dyn ChainApi>, Arc::clone(&log))
            .await
            .unwrap();
        assert!(!set.has_live_handle().await);
        assert_eq!(api.live_subscriptions().await, 0);
    }

    #[tokio::test]
    async fn push_demultiplexes_to_originating_task() {
        let api = Arc::new(InMemoryChainApi::new(ChainId::Polkadot));
        let set = ChainQuerySet::new(ChainId::Polkadot);
        let log = new_log();

        set.insert(account_task(TaskAction::BalanceFree, "addr-a")).await;
        set.insert(account_task(TaskAction::BalanceFree, "addr-b")).await;
        set.rebuild(Arc::clone(&api) as Arc<dyn ChainApi>, Arc::clone(&log))
            .await
            .unwrap();

        // Entries are ordered by address within the batch.
        api.push(1, json!({ "free": "250" })).await;
        tokio::task::yield_now().await;

        let events = log.all().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].address(), Some("addr-b"));
    }

    #[tokio::test]
    async fn malformed_push_produces_no_event() {
        let api = Arc::new(InMemoryChainApi::new(ChainId::Polkadot));
        let set = ChainQuerySet::new(ChainId::Polkadot);
        let log = new_log();

        set.insert(account_task(TaskAction::BalanceFree, "addr")).await;
        set.rebuild(Arc::clone(&api) as Arc<dyn ChainApi>, Arc::clone(&log))
            .await
            .unwrap();

        api.push(0, json!({ "unexpected": true })).await;
        tokio::task::yield_now().await;
        assert!(log.all().await.is_empty());
    }
}
