use crate::args::Args;
use crate::ports::chain_api::{ChainPool, InMemoryChainPool};
use crate::ports::persistence::{InMemoryEventStore, InMemoryTaskStore};
use crate::ports::sink::NotificationSink;
use crate::services::connectivity::ConnectivityStateMachine;
use crate::services::event_log::EventLog;
use crate::services::intervals::IntervalRunner;
use crate::services::orchestrator::TaskOrchestrator;
use crate::services::registry::TaskRegistry;
use std::sync::Arc;

pub struct AppState {
    pub registry: Arc<TaskRegistry>,
    pub orchestrator: Arc<TaskOrchestrator>,
    pub connectivity: Arc<ConnectivityStateMachine>,
    pub event_log: Arc<EventLog>,
    pub sink: NotificationSink,
    pub show_debugging_subscriptions: bool,
}

impl AppState {
    pub async fn build(args: &Args) -> Arc<Self> {
        let pool: Arc<dyn ChainPool> = Arc::new(InMemoryChainPool::new());
        let sink = NotificationSink::new();

        let registry = Arc::new(TaskRegistry::new(Arc::new(InMemoryTaskStore::new())));
        registry.load().await;

        let event_log = Arc::new(EventLog::new(
            Arc::new(InMemoryEventStore::new()),
            sink.clone(),
        ));
        event_log.load().await;

        let orchestrator = Arc::new(TaskOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&pool),
            Arc::clone(&event_log),
            sink.clone(),
        ));
        let intervals = Arc::new(IntervalRunner::new(
            Arc::clone(&registry),
            Arc::clone(&pool),
            Arc::clone(&event_log),
        ));
        let connectivity = Arc::new(ConnectivityStateMachine::new(
            pool,
            Arc::clone(&registry),
            Arc::clone(&orchestrator),
            intervals,
            sink.clone(),
        ));

        Arc::new(Self {
            registry,
            orchestrator,
            connectivity,
            event_log,
            sink,
            show_debugging_subscriptions: args.show_debugging_subscriptions,
        })
    }
}
