use crate::domain::{
    ChainId, IntervalSubscription, SubscriptionTask, TaskCategory, TaskScope, TaskStatus,
};
use crate::ports::chain_api::ChainPool;
use crate::ports::sink::{AppNotification, NotificationSink};
use crate::services::event_log::EventLog;
use crate::services::query_builder::ChainQuerySet;
use crate::services::registry::TaskRegistry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Entry point for enabling, disabling and building subscription tasks.
/// Validates eligibility, keeps the registry authoritative, and drives the
/// per-chain query sets. Eligibility and remote-unavailability failures are
/// absorbed here: the task's recorded status always reflects the request,
/// whether or not a remote subscription could be built.
pub struct TaskOrchestrator {
    registry: Arc<TaskRegistry>,
    pool: Arc<dyn ChainPool>,
    event_log: Arc<EventLog>,
    sink: NotificationSink,
    query_sets: RwLock<HashMap<ChainId, Arc<ChainQuerySet>>>,
    online: AtomicBool,
}

impl TaskOrchestrator {
    pub fn new(
        registry: Arc<TaskRegistry>,
        pool: Arc<dyn ChainPool>,
        event_log: Arc<EventLog>,
        sink: NotificationSink,
    ) -> Self {
        Self {
            registry,
            pool,
            event_log,
            sink,
            query_sets: RwLock::new(HashMap::new()),
            online: AtomicBool::new(false),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub async fn query_set(&self, chain_id: ChainId) -> Arc<ChainQuerySet> {
        let mut sets = self.query_sets.write().await;
        Arc::clone(
            sets.entry(chain_id)
                .or_insert_with(|| Arc::new(ChainQuerySet::new(chain_id))),
        )
    }

    /// Enable one task: record it, insert its query if eligible, and rebuild
    /// the chain's subscription when online.
    pub async fn enable_task(&self, mut task: SubscriptionTask) {
        if task.action.scope() == TaskScope::Interval {
            tracing::error!(action = %task.action, "interval actions go through enable_interval");
            return;
        }
        task.status = TaskStatus::Enabled;
        self.registry.upsert(task.clone()).await;

        let built = if Self::eligible(&task) {
            let set = self.query_set(task.chain_id).await;
            set.insert(task.clone()).await;
            self.rebuild_chain(task.chain_id).await;
            true
        } else {
            // Stale persisted state can request this; skip the build but keep
            // the recorded status visible.
            tracing::warn!(
                action = %task.action,
                address = task.account.as_ref().map(|a| a.address.as_str()).unwrap_or(""),
                "task ineligible, subscription not built"
            );
            let set = self.query_set(task.chain_id).await;
            set.remove(&task.key()).await;
            false
        };

        self.sink.send(AppNotification::TaskUpdated { task, built });
    }

    /// Disable one task and rebuild its chain without it.
    pub async fn disable_task(&self, mut task: SubscriptionTask) {
        task.status = TaskStatus::Disabled;
        self.registry.upsert(task.clone()).await;

        let set = self.query_set(task.chain_id).await;
        set.remove(&task.key()).await;
        self.rebuild_chain(task.chain_id).await;

        self.sink
            .send(AppNotification::TaskUpdated { task, built: false });
    }

    /// Batch enable: group by chain and rebuild each affected chain once,
    /// concurrently across chains.
    pub async fn enable_tasks(&self, tasks: Vec<SubscriptionTask>) {
        let mut chains: Vec<ChainId> = Vec::new();

        for mut task in tasks {
            if task.action.scope() == TaskScope::Interval {
                tracing::error!(action = %task.action, "interval actions go through enable_interval");
                continue;
            }
            task.status = TaskStatus::Enabled;
            self.registry.upsert(task.clone()).await;

            let built = if Self::eligible(&task) {
                let set = self.query_set(task.chain_id).await;
                set.insert(task.clone()).await;
                if !chains.contains(&task.chain_id) {
                    chains.push(task.chain_id);
                }
                true
            } else {
                tracing::warn!(action = %task.action, "task ineligible, skipped in batch");
                // An earlier enable may have recorded this query while the
                // task was still eligible; drop it so the rebuild excludes it.
                let set = self.query_set(task.chain_id).await;
                if set.remove(&task.key()).await && !chains.contains(&task.chain_id) {
                    chains.push(task.chain_id);
                }
                false
            };
            self.sink.send(AppNotification::TaskUpdated { task, built });
        }

        let mut rebuilds = Vec::new();
        for chain_id in chains {
            let set = self.query_set(chain_id).await;
            let pool = Arc::clone(&self.pool);
            let event_log = Arc::clone(&self.event_log);
            let online = self.is_online();
            rebuilds.push(tokio::spawn(async move {
                rebuild_set(online, set, pool, event_log).await;
            }));
        }
        for rebuild in rebuilds {
            let _ = rebuild.await;
        }
    }

    /// Delete a task outright, as opposed to disabling it.
    pub async fn remove_task(&self, task: SubscriptionTask) {
        let key = task.key();
        let removed = self.registry.remove(&key).await;
        let set = self.query_set(task.chain_id).await;
        if set.remove(&key).await {
            self.rebuild_chain(task.chain_id).await;
        }
        if let Some(mut task) = removed {
            task.status = TaskStatus::Disabled;
            self.sink
                .send(AppNotification::TaskUpdated { task, built: false });
        }
    }

    pub async fn enable_interval(&self, mut sub: IntervalSubscription) {
        sub.status = TaskStatus::Enabled;
        sub.ticks_to_wait = 0;
        self.registry.upsert_interval(sub.clone()).await;
        self.sink.send(AppNotification::IntervalUpdated { sub });
    }

    pub async fn disable_interval(&self, mut sub: IntervalSubscription) {
        sub.status = TaskStatus::Disabled;
        self.registry.upsert_interval(sub.clone()).await;
        self.sink.send(AppNotification::IntervalUpdated { sub });
    }

    /// Delete an interval subscription outright.
    pub async fn remove_interval(&self, mut sub: IntervalSubscription) {
        let (chain_id, action, referendum_id) = sub.key();
        self.registry
            .remove_interval(chain_id, action, referendum_id)
            .await;
        sub.status = TaskStatus::Disabled;
        self.sink.send(AppNotification::IntervalUpdated { sub });
    }

    /// Insert every enabled, eligible registry task into its chain's query
    /// set and rebuild all affected chains. Used when coming online: tasks
    /// enabled while offline are built here.
    pub async fn build_enabled(&self) {
        let mut chains: Vec<ChainId> = Vec::new();
        for task in self.registry.all().await {
            if !task.is_enabled() || task.action.scope() == TaskScope::Interval {
                continue;
            }
            if !Self::eligible(&task) {
                tracing::warn!(action = %task.action, "enabled task no longer eligible");
                // Entries survive disconnects, so a query recorded before the
                // account data went away must be dropped here or the rebuild
                // resubscribes it.
                let set = self.query_set(task.chain_id).await;
                if set.remove(&task.key()).await && !chains.contains(&task.chain_id) {
                    chains.push(task.chain_id);
                }
                continue;
            }
            let set = self.query_set(task.chain_id).await;
            set.insert(task.clone()).await;
            if !chains.contains(&task.chain_id) {
                chains.push(task.chain_id);
            }
        }
        for chain_id in chains {
            self.rebuild_chain(chain_id).await;
        }
    }

    /// Cancel every live subscription handle. Entries stay recorded for the
    /// next connect.
    pub async fn cancel_all(&self) {
        let sets = self.query_sets.read().await;
        for set in sets.values() {
            set.cancel_active().await;
        }
    }

    /// Remove an account: its tasks, query entries and events, then rebuild
    /// the chain.
    pub async fn remove_account(&self, chain_id: ChainId, address: &str) {
        let keys = self.registry.remove_account_tasks(chain_id, address).await;
        let set = self.query_set(chain_id).await;
        for key in &keys {
            set.remove(key).await;
        }
        self.event_log.remove_account_events(chain_id, address).await;
        if !keys.is_empty() {
            self.rebuild_chain(chain_id).await;
        }
    }

    pub async fn rename_account(&self, chain_id: ChainId, address: &str, name: &str) {
        self.registry.rename_account(chain_id, address, name).await;
        self.sink.send(AppNotification::AccountRenamed {
            chain_id,
            address: address.to_string(),
            name: name.to_string(),
        });
    }

    /// Category-specific eligibility: pool and nominating tasks need the
    /// matching account-derived data.
    fn eligible(task: &SubscriptionTask) -> bool {
        let Some(account) = task.account.as_ref() else {
            return task.action.scope() == TaskScope::Chain;
        };
        match task.action.category() {
            TaskCategory::NominationPools => account.nomination_pool_data.is_some(),
            TaskCategory::Nominating => account.nominating_data.is_some(),
            TaskCategory::Balances | TaskCategory::OpenGov | TaskCategory::Debugging => true,
        }
    }

    async fn rebuild_chain(&self, chain_id: ChainId) {
        let set = self.query_set(chain_id).await;
        rebuild_set(
            self.is_online(),
            set,
            Arc::clone(&self.pool),
            Arc::clone(&self.event_log),
        )
        .await;
    }
}

async fn rebuild_set(
    online: bool,
    set: Arc<ChainQuerySet>,
    pool: Arc<dyn ChainPool>,
    event_log: Arc<EventLog>,
) {
    if !online {
        tracing::debug!(chain = %set.chain_id(), "offline, rebuild deferred");
        return;
    }
    match pool.get_connected(set.chain_id()).await {
        Ok(api) => {
            if let Err(err) = set.rebuild(api, event_log).await {
                tracing::error!(chain = %set.chain_id(), error = %err, "rebuild failed");
            }
        }
        Err(err) => {
            // Task state is not rolled back; the build happens lazily on the
            // next successful connect.
            tracing::info!(chain = %set.chain_id(), error = %err, "rebuild deferred");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AccountSource, FlattenedAccount, NominationPoolData, PoolCommission, PoolRoles, TaskAction,
    };
    use crate::ports::chain_api::InMemoryChainPool;
    use crate::ports::persistence::{InMemoryEventStore, InMemoryTaskStore};

    fn pool_data() -> NominationPoolData {
        NominationPoolData {
            pool_id: 1,
            pool_state: "Open".to_string(),
            pool_name: "Pool One".to_string(),
            pool_roles: PoolRoles {
                depositor: "dep".to_string(),
                root: None,
                nominator: None,
                bouncer: None,
            },
            pool_commission: PoolCommission {
                current: None,
                max: None,
                change_rate: None,
                throttle_from: None,
            },
            pending_rewards: "0".to_string(),
        }
    }

    fn account(chain_id: ChainId, address: &str) -> FlattenedAccount {
        FlattenedAccount {
            address: address.to_string(),
            chain_id,
            name: "Alice".to_string(),
            source: AccountSource::Vault,
            nomination_pool_data: None,
            nominating_data: None,
        }
    }

    struct Fixture {
        pool: Arc<InMemoryChainPool>,
        orchestrator: TaskOrchestrator,
        registry: Arc<TaskRegistry>,
    }

    async fn fixture(online_chains: &[ChainId]) -> Fixture {
        let pool = Arc::new(InMemoryChainPool::new());
        for chain in online_chains {
            pool.connect(*chain).await.unwrap();
        }
        let registry = Arc::new(TaskRegistry::new(Arc::new(InMemoryTaskStore::new())));
        let sink = NotificationSink::new();
        let event_log = Arc::new(EventLog::new(
            Arc::new(InMemoryEventStore::new()),
            sink.clone(),
        ));
        let orchestrator = TaskOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&pool) as Arc<dyn ChainPool>,
            event_log,
            sink,
        );
        orchestrator.set_online(!online_chains.is_empty());
        Fixture {
            pool,
            orchestrator,
            registry,
        }
    }

    #[tokio::test]
    async fn ineligible_pool_task_updates_status_but_builds_nothing() {
        let fx = fixture(&[ChainId::Polkadot]).await;
        let task = SubscriptionTask::account_task(
            TaskAction::PoolRewards,
            TaskStatus::Disabled,
            account(ChainId::Polkadot, "addr"),
        );

        fx.orchestrator.enable_task(task.clone()).await;

        let stored = fx.registry.get(&task.key()).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Enabled);

        let set = fx.orchestrator.query_set(ChainId::Polkadot).await;
        assert_eq!(set.entry_count().await, 0);
        let api = fx.pool.fake(ChainId::Polkadot).await.unwrap();
        assert_eq!(api.subscribe_calls(), 0);
    }

    #[tokio::test]
    async fn batch_enable_rebuilds_once_per_chain() {
        let fx = fixture(&[ChainId::Polkadot, ChainId::Kusama]).await;

        let tasks = vec![
            SubscriptionTask::chain_task(
                ChainId::Polkadot,
                TaskAction::ChainTimestamp,
                TaskStatus::Disabled,
            ),
            SubscriptionTask::chain_task(
                ChainId::Polkadot,
                TaskAction::ChainCurrentSlot,
                TaskStatus::Disabled,
            ),
            SubscriptionTask::chain_task(
                ChainId::Kusama,
                TaskAction::ChainTimestamp,
                TaskStatus::Disabled,
            ),
            SubscriptionTask::account_task(
                TaskAction::BalanceFree,
                TaskStatus::Disabled,
                account(ChainId::Polkadot, "addr-a"),
            ),
            SubscriptionTask::account_task(
                TaskAction::BalanceFrozen,
                TaskStatus::Disabled,
                account(ChainId::Kusama, "addr-b"),
            ),
        ];

        fx.orchestrator.enable_tasks(tasks).await;

        let polkadot = fx.pool.fake(ChainId::Polkadot).await.unwrap();
        let kusama = fx.pool.fake(ChainId::Kusama).await.unwrap();
        assert_eq!(polkadot.subscribe_calls(), 1);
        assert_eq!(kusama.subscribe_calls(), 1);
        assert_eq!(polkadot.subscribed_queries().await.len(), 3);
        assert_eq!(kusama.subscribed_queries().await.len(), 2);
    }

    #[tokio::test]
    async fn batch_enable_drops_previously_recorded_ineligible_query() {
        let fx = fixture(&[ChainId::Polkadot]).await;
        let mut member = account(ChainId::Polkadot, "addr");
        member.nomination_pool_data = Some(pool_data());
        let task =
            SubscriptionTask::account_task(TaskAction::PoolRewards, TaskStatus::Disabled, member);
        fx.orchestrator.enable_task(task.clone()).await;

        let api = fx.pool.fake(ChainId::Polkadot).await.unwrap();
        assert_eq!(api.subscribed_queries().await.len(), 1);

        // Re-enable after the account left the pool: the query recorded while
        // the task was eligible must disappear from the batch.
        let mut task = task;
        task.account.as_mut().unwrap().nomination_pool_data = None;
        fx.orchestrator.enable_tasks(vec![task.clone()]).await;

        let set = fx.orchestrator.query_set(ChainId::Polkadot).await;
        assert_eq!(set.entry_count().await, 0);
        assert_eq!(api.live_subscriptions().await, 0);
    }

    #[tokio::test]
    async fn build_enabled_drops_queries_for_newly_ineligible_tasks() {
        let fx = fixture(&[ChainId::Polkadot]).await;
        let mut member = account(ChainId::Polkadot, "addr");
        member.nomination_pool_data = Some(pool_data());
        fx.orchestrator
            .enable_tasks(vec![
                SubscriptionTask::account_task(
                    TaskAction::BalanceFree,
                    TaskStatus::Disabled,
                    member.clone(),
                ),
                SubscriptionTask::account_task(
                    TaskAction::PoolRewards,
                    TaskStatus::Disabled,
                    member,
                ),
            ])
            .await;

        // Going offline keeps the recorded queries; the pool membership is
        // gone by the time the tasks are rebuilt.
        fx.orchestrator.set_online(false);
        fx.orchestrator.cancel_all().await;
        fx.registry
            .apply_account_state(
                ChainId::Polkadot,
                "addr",
                &crate::ports::chain_api::AccountState::default(),
            )
            .await;
        fx.orchestrator.set_online(true);
        fx.orchestrator.build_enabled().await;

        let api = fx.pool.fake(ChainId::Polkadot).await.unwrap();
        let queries = api.subscribed_queries().await;
        assert_eq!(queries.len(), 1);
        assert!(queries.iter().all(|q| q.entry != "pendingRewards"));
    }

    #[tokio::test]
    async fn enable_while_offline_records_without_building() {
        let fx = fixture(&[]).await;
        let task = SubscriptionTask::account_task(
            TaskAction::BalanceFree,
            TaskStatus::Disabled,
            account(ChainId::Polkadot, "addr"),
        );

        fx.orchestrator.enable_task(task.clone()).await;

        assert!(fx.registry.get(&task.key()).await.unwrap().is_enabled());
        let set = fx.orchestrator.query_set(ChainId::Polkadot).await;
        assert_eq!(set.entry_count().await, 1);
        assert!(!set.has_live_handle().await);
    }

    #[tokio::test]
    async fn disable_rebuilds_without_the_task() {
        let fx = fixture(&[ChainId::Polkadot]).await;
        let keep = SubscriptionTask::account_task(
            TaskAction::BalanceFree,
            TaskStatus::Disabled,
            account(ChainId::Polkadot, "addr"),
        );
        let drop = SubscriptionTask::account_task(
            TaskAction::BalanceFrozen,
            TaskStatus::Disabled,
            account(ChainId::Polkadot, "addr"),
        );
        fx.orchestrator
            .enable_tasks(vec![keep.clone(), drop.clone()])
            .await;

        fx.orchestrator.disable_task(drop).await;

        let api = fx.pool.fake(ChainId::Polkadot).await.unwrap();
        assert_eq!(api.subscribed_queries().await.len(), 1);
        assert_eq!(api.live_subscriptions().await, 1);
    }

    #[tokio::test]
    async fn remove_interval_deletes_the_subscription() {
        let fx = fixture(&[ChainId::Polkadot]).await;
        let sub = IntervalSubscription {
            chain_id: ChainId::Polkadot,
            action: TaskAction::ReferendumVotes,
            status: TaskStatus::Disabled,
            referendum_id: 42,
            interval_setting: 3,
            ticks_to_wait: 0,
        };
        fx.orchestrator.enable_interval(sub.clone()).await;
        assert_eq!(fx.registry.intervals().await.len(), 1);

        fx.orchestrator.remove_interval(sub).await;
        assert!(fx.registry.intervals().await.is_empty());
    }

    #[tokio::test]
    async fn remove_account_drops_tasks_and_rebuilds() {
        let fx = fixture(&[ChainId::Polkadot]).await;
        fx.orchestrator
            .enable_tasks(vec![
                SubscriptionTask::account_task(
                    TaskAction::BalanceFree,
                    TaskStatus::Disabled,
                    account(ChainId::Polkadot, "addr"),
                ),
                SubscriptionTask::account_task(
                    TaskAction::BalanceFrozen,
                    TaskStatus::Disabled,
                    account(ChainId::Polkadot, "addr"),
                ),
            ])
            .await;

        fx.orchestrator
            .remove_account(ChainId::Polkadot, "addr")
            .await;

        assert!(fx.registry.all().await.is_empty());
        let api = fx.pool.fake(ChainId::Polkadot).await.unwrap();
        assert_eq!(api.live_subscriptions().await, 0);
    }
}
