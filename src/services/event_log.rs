use crate::domain::{ChainId, EventCallback};
use crate::ports::persistence::EventStore;
use crate::ports::sink::{AppNotification, NotificationSink};
use crate::services::dedup;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered event log: in-memory mirror plus durable store, both mutated only
/// through deduplication verdicts. The write lock is held across verdict and
/// persistence, so the log has a single writer and the mirror and the store
/// always see the same verdict.
pub struct EventLog {
    events: RwLock<Vec<EventCallback>>,
    store: Arc<dyn EventStore>,
    sink: NotificationSink,
}

impl EventLog {
    pub fn new(store: Arc<dyn EventStore>, sink: NotificationSink) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            store,
            sink,
        }
    }

    pub async fn load(&self) {
        *self.events.write().await = self.store.load_all().await;
    }

    pub async fn all(&self) -> Vec<EventCallback> {
        self.events.read().await.clone()
    }

    /// Run one incoming notification through the deduplication engine and
    /// commit the verdict. Returns whether the event was accepted. Accepted
    /// events are durable before the sink is notified.
    pub async fn process(&self, candidate: EventCallback) -> bool {
        let mut events = self.events.write().await;
        let verdict = dedup::consider_event(&candidate, &events);

        if !verdict.accept {
            tracing::debug!(action = %candidate.task_action, "duplicate event discarded");
            self.sink
                .send(AppNotification::EventRejected { event: candidate });
            return false;
        }

        let mut updated = verdict.updated;
        let uid = self.store.next_uid().await;
        let accepted = match updated.last_mut() {
            Some(last) => {
                last.uid = uid;
                last.clone()
            }
            // consider_event always appends the accepted candidate.
            None => return false,
        };

        self.store.replace_all(&updated).await;
        *events = updated;

        if !verdict.stale_marked.is_empty() {
            tracing::info!(
                action = %accepted.task_action,
                count = verdict.stale_marked.len(),
                "marked superseded events stale"
            );
        }
        self.sink
            .send(AppNotification::EventAccepted { event: accepted });
        true
    }

    /// Explicit user dismissal of one event.
    pub async fn dismiss(&self, uid: &str) -> bool {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| e.uid != uid);
        if events.len() == before {
            return false;
        }
        self.store.replace_all(&events).await;
        self.sink.send(AppNotification::EventDismissed {
            uid: uid.to_string(),
        });
        true
    }

    /// Drop every event owned by an account, used when the account or its
    /// tasks are removed.
    pub async fn remove_account_events(&self, chain_id: ChainId, address: &str) {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| !(e.chain_id() == chain_id && e.address() == Some(address)));
        if events.len() != before {
            self.store.replace_all(&events).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventData, EventWho, TaskAction};
    use crate::ports::persistence::InMemoryEventStore;

    fn balance_event(address: &str, free: &str) -> EventCallback {
        EventCallback {
            uid: String::new(),
            task_action: TaskAction::BalanceFree,
            who: EventWho::Account {
                chain_id: ChainId::Polkadot,
                address: address.to_string(),
                name: "Alice".to_string(),
            },
            category: TaskAction::BalanceFree.category(),
            title: String::new(),
            subtitle: String::new(),
            data: EventData::BalanceFree {
                free: free.to_string(),
            },
            stale: false,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn accepted_event_gets_a_uid_and_is_persisted() {
        let store = Arc::new(InMemoryEventStore::new());
        let log = EventLog::new(Arc::clone(&store) as Arc<dyn EventStore>, NotificationSink::new());

        assert!(log.process(balance_event("addr", "100")).await);

        let in_memory = log.all().await;
        let persisted = store.load_all().await;
        assert_eq!(in_memory.len(), 1);
        assert!(!in_memory[0].uid.is_empty());
        assert_eq!(in_memory, persisted);
    }

    #[tokio::test]
    async fn duplicate_leaves_both_copies_untouched() {
        let store = Arc::new(InMemoryEventStore::new());
        let log = EventLog::new(Arc::clone(&store) as Arc<dyn EventStore>, NotificationSink::new());

        assert!(log.process(balance_event("addr", "100")).await);
        assert!(!log.process(balance_event("addr", "100")).await);

        assert_eq!(log.all().await.len(), 1);
        assert_eq!(store.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn dismiss_removes_by_uid() {
        let store = Arc::new(InMemoryEventStore::new());
        let log = EventLog::new(store, NotificationSink::new());

        log.process(balance_event("addr", "100")).await;
        let uid = log.all().await[0].uid.clone();

        assert!(log.dismiss(&uid).await);
        assert!(!log.dismiss(&uid).await);
        assert!(log.all().await.is_empty());
    }
}
