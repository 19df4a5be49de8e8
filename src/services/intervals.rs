use crate::config::constants::INTERVAL_TICK_SECS;
use crate::domain::{EventCallback, EventData};
use crate::ports::chain_api::ChainPool;
use crate::services::event_log::EventLog;
use crate::services::query_builder::resolve_query;
use crate::services::registry::TaskRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

/// Timer loop behind interval subscriptions. One base clock ticks for all of
/// them; each subscription fires when its own tick counter runs out.
pub struct IntervalRunner {
    registry: Arc<TaskRegistry>,
    pool: Arc<dyn ChainPool>,
    event_log: Arc<EventLog>,
    running: Mutex<Option<CancellationToken>>,
    tick_period: Duration,
}

impl IntervalRunner {
    pub fn new(
        registry: Arc<TaskRegistry>,
        pool: Arc<dyn ChainPool>,
        event_log: Arc<EventLog>,
    ) -> Self {
        Self {
            registry,
            pool,
            event_log,
            running: Mutex::new(None),
            tick_period: Duration::from_secs(INTERVAL_TICK_SECS),
        }
    }

    /// Start (or restart) the clock. Idempotent while running.
    pub async fn start(self: &Arc<Self>) {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|t| !t.is_cancelled()) {
            return;
        }
        let token = CancellationToken::new();
        *running = Some(token.clone());

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(runner.tick_period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => { break; }
                    _ = ticker.tick() => {
                        runner.run_tick().await;
                    }
                }
            }
        });
        tracing::info!("interval clock started");
    }

    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if let Some(token) = running.take() {
            token.cancel();
            tracing::info!("interval clock stopped");
        }
    }

    /// Evaluate every due subscription once. Split out so tests can tick
    /// without waiting on the clock.
    pub async fn run_tick(&self) {
        for sub in self.registry.take_due_intervals().await {
            let api = match self.pool.get_connected(sub.chain_id).await {
                Ok(api) => api,
                Err(err) => {
                    tracing::debug!(chain = %sub.chain_id, error = %err, "interval tick skipped");
                    continue;
                }
            };
            let query = resolve_query(sub.action, None, Some(sub.referendum_id));
            let raw = match api.query_once(query).await {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(
                        chain = %sub.chain_id,
                        action = %sub.action,
                        error = %err,
                        "interval query failed"
                    );
                    continue;
                }
            };
            match EventData::from_raw(sub.action, &raw) {
                Ok(data) => {
                    let event = EventCallback::from_interval(&sub, data);
                    self.event_log.process(event).await;
                }
                Err(err) => {
                    tracing::warn!(action = %sub.action, error = %err, "malformed interval result");
                }
            }
        }
    }
}
