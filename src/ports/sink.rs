use crate::config::constants::BROADCAST_CHANNEL_CAPACITY;
use crate::domain::{
    ChainId, ConnectivityState, EventCallback, IntervalSubscription, SubscriptionTask,
};
use serde::Serialize;
use tokio::sync::broadcast;

/// Everything the presentation layer can observe: task toggles, connectivity
/// transitions, and event log verdicts.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AppNotification {
    #[serde(rename_all = "camelCase")]
    TaskUpdated {
        task: SubscriptionTask,
        /// Whether a remote subscription backs the task right now. False for
        /// ineligible tasks and while the chain is unreachable.
        built: bool,
    },
    #[serde(rename_all = "camelCase")]
    IntervalUpdated { sub: IntervalSubscription },
    #[serde(rename_all = "camelCase")]
    ConnectivityChanged { state: ConnectivityState },
    #[serde(rename_all = "camelCase")]
    EventAccepted { event: EventCallback },
    #[serde(rename_all = "camelCase")]
    EventRejected { event: EventCallback },
    #[serde(rename_all = "camelCase")]
    EventDismissed { uid: String },
    #[serde(rename_all = "camelCase")]
    AccountRenamed {
        chain_id: ChainId,
        address: String,
        name: String,
    },
}

/// Broadcast fan-out to presentation-layer subscribers.
#[derive(Clone)]
pub struct NotificationSink {
    tx: broadcast::Sender<AppNotification>,
}

impl NotificationSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppNotification> {
        self.tx.subscribe()
    }

    pub fn send(&self, notification: AppNotification) {
        // No receivers is fine; the core does not depend on the UI listening.
        let _ = self.tx.send(notification);
    }
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::new()
    }
}
