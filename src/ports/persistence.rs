use crate::domain::{EventCallback, IntervalSubscription, SubscriptionTask};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Durable storage for subscription tasks, written on every registry change
/// and read back at startup.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load_tasks(&self) -> Vec<SubscriptionTask>;
    async fn save_tasks(&self, tasks: &[SubscriptionTask]);
    async fn load_intervals(&self) -> Vec<IntervalSubscription>;
    async fn save_intervals(&self, subs: &[IntervalSubscription]);
}

/// Durable storage for accepted events. Assigns uids at the persistence
/// boundary; events arrive with an empty uid and leave with a stable one.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn next_uid(&self) -> String;
    async fn load_all(&self) -> Vec<EventCallback>;
    /// Commit the full post-verdict log. The caller computes one verdict and
    /// writes the same result here and to its in-memory mirror, so the two
    /// cannot drift.
    async fn replace_all(&self, events: &[EventCallback]);
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<Vec<SubscriptionTask>>,
    intervals: RwLock<Vec<IntervalSubscription>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load_tasks(&self) -> Vec<SubscriptionTask> {
        self.tasks.read().await.clone()
    }

    async fn save_tasks(&self, tasks: &[SubscriptionTask]) {
        *self.tasks.write().await = tasks.to_vec();
    }

    async fn load_intervals(&self) -> Vec<IntervalSubscription> {
        self.intervals.read().await.clone()
    }

    async fn save_intervals(&self, subs: &[IntervalSubscription]) {
        *self.intervals.write().await = subs.to_vec();
    }
}

#[derive(Default)]
pub struct InMemoryEventStore {
    next_id: AtomicU64,
    events: RwLock<Vec<EventCallback>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn next_uid(&self) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("event_{id}")
    }

    async fn load_all(&self) -> Vec<EventCallback> {
        self.events.read().await.clone()
    }

    async fn replace_all(&self, events: &[EventCallback]) {
        *self.events.write().await = events.to_vec();
    }
}
