use crate::domain::{ChainId, ConnectivityState};
use crate::ports::chain_api::ChainPool;
use crate::ports::sink::{AppNotification, NotificationSink};
use crate::services::errors::ConnectivityError;
use crate::services::intervals::IntervalRunner;
use crate::services::orchestrator::TaskOrchestrator;
use crate::services::registry::TaskRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Owns the offline/online transitions. Connecting runs three steps, each
/// separated by an abort checkpoint: connect the chains in use, fetch
/// account-derived data, rebuild subscriptions and start the interval clock.
/// The abort token is polled at step boundaries only; in-flight remote calls
/// always finish.
pub struct ConnectivityStateMachine {
    state: RwLock<ConnectivityState>,
    switching_to_online: AtomicBool,
    abort: RwLock<CancellationToken>,
    pool: Arc<dyn ChainPool>,
    registry: Arc<TaskRegistry>,
    orchestrator: Arc<TaskOrchestrator>,
    intervals: Arc<IntervalRunner>,
    sink: NotificationSink,
}

/// Clears the switching guard on every exit path. A leaked guard would block
/// reconnection for the rest of the process lifetime.
struct SwitchGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl ConnectivityStateMachine {
    pub fn new(
        pool: Arc<dyn ChainPool>,
        registry: Arc<TaskRegistry>,
        orchestrator: Arc<TaskOrchestrator>,
        intervals: Arc<IntervalRunner>,
        sink: NotificationSink,
    ) -> Self {
        Self {
            state: RwLock::new(ConnectivityState::Offline),
            switching_to_online: AtomicBool::new(false),
            abort: RwLock::new(CancellationToken::new()),
            pool,
            registry,
            orchestrator,
            intervals,
            sink,
        }
    }

    pub async fn state(&self) -> ConnectivityState {
        *self.state.read().await
    }

    /// Request cooperative cancellation of a connect. The request latches on
    /// the current token: an in-flight transition observes it at its next
    /// checkpoint, and with nothing in flight the next `connect` attempt
    /// observes it immediately and settles back to Offline.
    pub async fn abort_connecting(&self) {
        self.abort.read().await.cancel();
        tracing::info!("abort requested");
    }

    /// Offline → Connecting → Online. Returns Ok(()) for both the online
    /// outcome and a clean abort back to Offline.
    pub async fn connect(&self) -> Result<(), ConnectivityError> {
        if self
            .switching_to_online
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ConnectivityError::AlreadySwitching);
        }
        let _guard = SwitchGuard {
            flag: &self.switching_to_online,
        };

        let abort = self.abort.read().await.clone();
        self.set_state(ConnectivityState::Connecting).await;

        if abort.is_cancelled() {
            return self.abort_to_offline(Vec::new()).await;
        }

        // Step 1: connect every chain referenced by an account or an enabled
        // task. One chain failing does not block the others.
        let mut opened: Vec<ChainId> = Vec::new();
        for chain_id in self.registry.chains_in_use().await {
            if self.pool.get_connected(chain_id).await.is_ok() {
                continue;
            }
            match self.pool.connect(chain_id).await {
                Ok(_) => opened.push(chain_id),
                Err(err) => {
                    tracing::warn!(chain = %chain_id, error = %err, "chain connect failed");
                }
            }
        }

        if abort.is_cancelled() {
            return self.abort_to_offline(opened).await;
        }

        // Step 2: fetch account-derived data needed before subscriptions are
        // meaningful. Best-effort; partial failures do not stop the
        // transition.
        for chain_id in self.pool.connected_chains().await {
            let api = match self.pool.get_connected(chain_id).await {
                Ok(api) => api,
                Err(_) => continue,
            };
            let mut addresses: Vec<String> = self
                .registry
                .enabled_for_chain(chain_id)
                .await
                .into_iter()
                .filter_map(|t| t.account.map(|a| a.address))
                .collect();
            addresses.sort();
            addresses.dedup();
            for address in addresses {
                match api.fetch_account_state(&address).await {
                    Ok(state) => {
                        self.registry
                            .apply_account_state(chain_id, &address, &state)
                            .await;
                    }
                    Err(err) => {
                        tracing::warn!(
                            chain = %chain_id,
                            address = %address,
                            error = %err,
                            "account state fetch failed"
                        );
                    }
                }
            }
        }

        if abort.is_cancelled() {
            return self.abort_to_offline(opened).await;
        }

        // Step 3: rebuild every enabled task set and start the interval
        // clock.
        self.orchestrator.set_online(true);
        self.orchestrator.build_enabled().await;
        self.intervals.start().await;

        if abort.is_cancelled() {
            self.orchestrator.set_online(false);
            self.orchestrator.cancel_all().await;
            self.intervals.stop().await;
            return self.abort_to_offline(opened).await;
        }

        self.set_state(ConnectivityState::Online).await;
        Ok(())
    }

    /// Online → Disconnecting → Offline.
    pub async fn disconnect(&self) -> Result<(), ConnectivityError> {
        {
            let state = self.state.read().await;
            if *state != ConnectivityState::Online {
                return Err(ConnectivityError::NotOnline(*state));
            }
        }
        self.set_state(ConnectivityState::Disconnecting).await;

        self.intervals.stop().await;
        self.orchestrator.set_online(false);
        self.orchestrator.cancel_all().await;
        for chain_id in self.pool.connected_chains().await {
            self.pool.close(chain_id).await;
        }

        self.switching_to_online.store(false, Ordering::SeqCst);
        self.set_state(ConnectivityState::Offline).await;
        Ok(())
    }

    /// Abort path shared by all checkpoints: tear down connections opened in
    /// this attempt, return to Offline, reset the abort token so the next
    /// attempt starts clean.
    async fn abort_to_offline(&self, opened: Vec<ChainId>) -> Result<(), ConnectivityError> {
        tracing::info!("connect aborted, returning to offline");
        for chain_id in opened {
            self.pool.close(chain_id).await;
        }
        *self.abort.write().await = CancellationToken::new();
        self.set_state(ConnectivityState::Offline).await;
        Ok(())
    }

    async fn set_state(&self, next: ConnectivityState) {
        let mut state = self.state.write().await;
        if *state != next {
            tracing::info!(from = %*state, to = %next, "connectivity transition");
            *state = next;
            self.sink
                .send(AppNotification::ConnectivityChanged { state: next });
        }
    }
}
