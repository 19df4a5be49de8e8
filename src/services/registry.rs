use crate::domain::{
    ChainId, IntervalSubscription, SubscriptionTask, TaskAction, TaskCategory, TaskKey, TaskStatus,
};
use crate::ports::chain_api::AccountState;
use crate::ports::persistence::TaskStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory catalog of every subscription task, mirrored to the task store
/// on each mutation. Shared-read by the presentation layer; mutated only
/// through the orchestrator.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskKey, SubscriptionTask>>,
    intervals: RwLock<Vec<IntervalSubscription>>,
    store: Arc<dyn TaskStore>,
}

impl TaskRegistry {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            intervals: RwLock::new(Vec::new()),
            store,
        }
    }

    /// Rehydrate from the store at startup.
    pub async fn load(&self) {
        let tasks = self.store.load_tasks().await;
        let intervals = self.store.load_intervals().await;
        let mut map = self.tasks.write().await;
        for task in tasks {
            map.insert(task.key(), task);
        }
        *self.intervals.write().await = intervals;
    }

    pub async fn upsert(&self, task: SubscriptionTask) {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.key(), task);
        self.persist_tasks(&tasks).await;
    }

    pub async fn remove(&self, key: &TaskKey) -> Option<SubscriptionTask> {
        let mut tasks = self.tasks.write().await;
        let removed = tasks.remove(key);
        if removed.is_some() {
            self.persist_tasks(&tasks).await;
        }
        removed
    }

    pub async fn get(&self, key: &TaskKey) -> Option<SubscriptionTask> {
        self.tasks.read().await.get(key).cloned()
    }

    pub async fn all(&self) -> Vec<SubscriptionTask> {
        let mut tasks: Vec<SubscriptionTask> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by_key(|t| (t.chain_id, t.account.as_ref().map(|a| a.address.clone())));
        tasks
    }

    /// Task listing for the presentation layer. Debugging tasks are hidden
    /// unless the flag is set.
    pub async fn visible(&self, show_debugging: bool) -> Vec<SubscriptionTask> {
        self.all()
            .await
            .into_iter()
            .filter(|t| show_debugging || t.action.category() != TaskCategory::Debugging)
            .collect()
    }

    pub async fn enabled_for_chain(&self, chain_id: ChainId) -> Vec<SubscriptionTask> {
        self.tasks
            .read()
            .await
            .values()
            .filter(|t| t.chain_id == chain_id && t.is_enabled())
            .cloned()
            .collect()
    }

    /// Chains that need a live connection: at least one enabled task or one
    /// enabled interval subscription references them.
    pub async fn chains_in_use(&self) -> Vec<ChainId> {
        let tasks = self.tasks.read().await;
        let intervals = self.intervals.read().await;
        let mut chains: Vec<ChainId> = tasks
            .values()
            .filter(|t| t.is_enabled())
            .map(|t| t.chain_id)
            .chain(
                intervals
                    .iter()
                    .filter(|s| s.status == TaskStatus::Enabled)
                    .map(|s| s.chain_id),
            )
            .collect();
        chains.sort();
        chains.dedup();
        chains
    }

    /// Update an account's display name everywhere it appears.
    pub async fn rename_account(&self, chain_id: ChainId, address: &str, name: &str) {
        let mut tasks = self.tasks.write().await;
        let mut touched = false;
        for task in tasks.values_mut() {
            if let Some(account) = task.account.as_mut() {
                if task.chain_id == chain_id && account.address == address {
                    account.name = name.to_string();
                    touched = true;
                }
            }
        }
        if touched {
            self.persist_tasks(&tasks).await;
        }
    }

    /// Fold freshly-fetched account-derived data into every task owned by
    /// the account. Run after each successful connect, before rebuilds.
    pub async fn apply_account_state(&self, chain_id: ChainId, address: &str, state: &AccountState) {
        let mut tasks = self.tasks.write().await;
        let mut touched = false;
        for task in tasks.values_mut() {
            if let Some(account) = task.account.as_mut() {
                if task.chain_id == chain_id && account.address == address {
                    account.nomination_pool_data = state.nomination_pool_data.clone();
                    account.nominating_data = state.nominating_data.clone();
                    touched = true;
                }
            }
        }
        if touched {
            self.persist_tasks(&tasks).await;
        }
    }

    /// Remove all tasks owned by an account, returning their keys so the
    /// caller can rebuild the affected chain.
    pub async fn remove_account_tasks(&self, chain_id: ChainId, address: &str) -> Vec<TaskKey> {
        let mut tasks = self.tasks.write().await;
        let keys: Vec<TaskKey> = tasks
            .values()
            .filter(|t| {
                t.chain_id == chain_id
                    && t.account.as_ref().is_some_and(|a| a.address == address)
            })
            .map(|t| t.key())
            .collect();
        for key in &keys {
            tasks.remove(key);
        }
        if !keys.is_empty() {
            self.persist_tasks(&tasks).await;
        }
        keys
    }

    pub async fn upsert_interval(&self, sub: IntervalSubscription) {
        let mut intervals = self.intervals.write().await;
        match intervals.iter_mut().find(|s| s.key() == sub.key()) {
            Some(existing) => *existing = sub,
            None => intervals.push(sub),
        }
        self.store.save_intervals(&intervals).await;
    }

    pub async fn remove_interval(&self, chain_id: ChainId, action: TaskAction, referendum_id: u32) {
        let mut intervals = self.intervals.write().await;
        intervals.retain(|s| s.key() != (chain_id, action, referendum_id));
        self.store.save_intervals(&intervals).await;
    }

    pub async fn intervals(&self) -> Vec<IntervalSubscription> {
        self.intervals.read().await.clone()
    }

    /// Tick bookkeeping for the interval clock: decrement waits, return the
    /// subscriptions due this tick with their counters reset.
    pub async fn take_due_intervals(&self) -> Vec<IntervalSubscription> {
        let mut intervals = self.intervals.write().await;
        let mut due = Vec::new();
        for sub in intervals.iter_mut() {
            if sub.status != TaskStatus::Enabled {
                continue;
            }
            if sub.ticks_to_wait == 0 {
                sub.ticks_to_wait = sub.interval_setting;
                due.push(sub.clone());
            } else {
                sub.ticks_to_wait -= 1;
            }
        }
        if !due.is_empty() {
            self.store.save_intervals(&intervals).await;
        }
        due
    }

    async fn persist_tasks(&self, tasks: &HashMap<TaskKey, SubscriptionTask>) {
        let snapshot: Vec<SubscriptionTask> = tasks.values().cloned().collect();
        self.store.save_tasks(&snapshot).await;
    }
}
