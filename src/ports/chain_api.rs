use crate::domain::{ChainId, NominatingData, NominationPoolData};
use crate::services::errors::ChainApiError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// One concrete remote storage query, resolved from a task action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteQuery {
    pub pallet: &'static str,
    pub entry: &'static str,
    pub args: Vec<String>,
}

impl RemoteQuery {
    pub fn new(pallet: &'static str, entry: &'static str, args: Vec<String>) -> Self {
        Self { pallet, entry, args }
    }
}

/// Account-derived data fetched from a chain before subscriptions are
/// meaningful.
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    pub nomination_pool_data: Option<NominationPoolData>,
    pub nominating_data: Option<NominatingData>,
}

/// Callback invoked on every push: the position of the query in the
/// subscribed batch plus the raw result value.
pub type PushCallback = Arc<dyn Fn(usize, serde_json::Value) + Send + Sync>;

/// Handle to one live multiplexed subscription. Cancelling it stops pushes;
/// the handle slot owner is responsible for calling `cancel` before opening
/// a replacement.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: u64,
    token: CancellationToken,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Connection to one chain: a multiplexed batch subscription plus one-shot
/// queries and account state reads.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Open one multiplexed subscription over a fixed batch of queries. The
    /// transport has no incremental add/remove; changing the batch means
    /// cancelling the handle and subscribing again.
    async fn subscribe_many(
        &self,
        queries: Vec<RemoteQuery>,
        on_push: PushCallback,
    ) -> Result<SubscriptionHandle, ChainApiError>;

    async fn query_once(&self, query: RemoteQuery) -> Result<serde_json::Value, ChainApiError>;

    async fn fetch_account_state(&self, address: &str) -> Result<AccountState, ChainApiError>;
}

/// Pool of connected chain APIs, reference-counted by callers.
#[async_trait]
pub trait ChainPool: Send + Sync {
    async fn connect(&self, chain_id: ChainId) -> Result<Arc<dyn ChainApi>, ChainApiError>;

    /// Drop one reference; the connection closes when the count reaches zero.
    async fn close(&self, chain_id: ChainId);

    async fn get_connected(&self, chain_id: ChainId) -> Result<Arc<dyn ChainApi>, ChainApiError>;

    async fn connected_chains(&self) -> Vec<ChainId>;
}

struct ActiveSub {
    queries: Vec<RemoteQuery>,
    on_push: PushCallback,
    token: CancellationToken,
}

/// Test hook for pausing `fetch_account_state` mid-call: the fetch signals
/// `entered` and then waits for `release`.
#[derive(Default)]
pub struct FetchGate {
    pub entered: tokio::sync::Notify,
    pub release: tokio::sync::Notify,
}

/// In-memory chain transport. Stands in for the real RPC client, which lives
/// outside this crate; tests and the demo binary drive pushes through it.
pub struct InMemoryChainApi {
    chain_id: ChainId,
    next_sub_id: AtomicU64,
    subs: Mutex<HashMap<u64, ActiveSub>>,
    query_results: Mutex<HashMap<(&'static str, &'static str), serde_json::Value>>,
    account_states: Mutex<HashMap<String, AccountState>>,
    fetch_gate: std::sync::Mutex<Option<Arc<FetchGate>>>,
}

impl InMemoryChainApi {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            next_sub_id: AtomicU64::new(1),
            subs: Mutex::new(HashMap::new()),
            query_results: Mutex::new(HashMap::new()),
            account_states: Mutex::new(HashMap::new()),
            fetch_gate: std::sync::Mutex::new(None),
        }
    }

    pub fn set_fetch_gate(&self, gate: Option<Arc<FetchGate>>) {
        if let Ok(mut slot) = self.fetch_gate.lock() {
            *slot = gate;
        }
    }

    /// Number of `subscribe_many` calls issued so far.
    pub fn subscribe_calls(&self) -> u64 {
        self.next_sub_id.load(Ordering::SeqCst) - 1
    }

    /// Handles opened and not yet cancelled.
    pub async fn live_subscriptions(&self) -> usize {
        let subs = self.subs.lock().await;
        subs.values().filter(|s| !s.token.is_cancelled()).count()
    }

    /// Queries carried by the newest live subscription, if any.
    pub async fn subscribed_queries(&self) -> Vec<RemoteQuery> {
        let subs = self.subs.lock().await;
        subs.iter()
            .filter(|(_, s)| !s.token.is_cancelled())
            .max_by_key(|(id, _)| **id)
            .map(|(_, s)| s.queries.clone())
            .unwrap_or_default()
    }

    /// Push a raw result into the live subscription at the given batch
    /// position, as the remote side would.
    pub async fn push(&self, index: usize, value: serde_json::Value) {
        let subs = self.subs.lock().await;
        let Some((_, sub)) = subs
            .iter()
            .filter(|(_, s)| !s.token.is_cancelled())
            .max_by_key(|(id, _)| **id)
        else {
            return;
        };
        if index < sub.queries.len() {
            (sub.on_push)(index, value);
        }
    }

    pub async fn set_query_result(
        &self,
        pallet: &'static str,
        entry: &'static str,
        value: serde_json::Value,
    ) {
        self.query_results.lock().await.insert((pallet, entry), value);
    }

    pub async fn set_account_state(&self, address: &str, state: AccountState) {
        self.account_states
            .lock()
            .await
            .insert(address.to_string(), state);
    }
}

#[async_trait]
impl ChainApi for InMemoryChainApi {
    async fn subscribe_many(
        &self,
        queries: Vec<RemoteQuery>,
        on_push: PushCallback,
    ) -> Result<SubscriptionHandle, ChainApiError> {
        let id = self.next_sub_id.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(chain = %self.chain_id, sub = id, queries = queries.len(), "fake subscription opened");
        let token = CancellationToken::new();
        let handle = SubscriptionHandle {
            id,
            token: token.clone(),
        };
        self.subs.lock().await.insert(
            id,
            ActiveSub {
                queries,
                on_push,
                token,
            },
        );
        Ok(handle)
    }

    async fn query_once(&self, query: RemoteQuery) -> Result<serde_json::Value, ChainApiError> {
        let results = self.query_results.lock().await;
        results
            .get(&(query.pallet, query.entry))
            .cloned()
            .ok_or_else(|| {
                ChainApiError::QueryFailed(format!("{}.{} not available", query.pallet, query.entry))
            })
    }

    async fn fetch_account_state(&self, address: &str) -> Result<AccountState, ChainApiError> {
        let gate = self.fetch_gate.lock().ok().and_then(|g| g.clone());
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let states = self.account_states.lock().await;
        Ok(states.get(address).cloned().unwrap_or_default())
    }
}

struct PoolEntry {
    refs: u32,
    api: Arc<InMemoryChainApi>,
}

/// In-memory stand-in for the connected-chain-API pool.
#[derive(Default)]
pub struct InMemoryChainPool {
    entries: RwLock<HashMap<ChainId, PoolEntry>>,
    unreachable: RwLock<Vec<ChainId>>,
    fetch_gate: std::sync::Mutex<Option<Arc<FetchGate>>>,
}

impl InMemoryChainPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future connect attempts for a chain fail, simulating an
    /// unreachable endpoint.
    pub async fn set_unreachable(&self, chain_id: ChainId, unreachable: bool) {
        let mut list = self.unreachable.write().await;
        if unreachable {
            if !list.contains(&chain_id) {
                list.push(chain_id);
            }
        } else {
            list.retain(|c| *c != chain_id);
        }
    }

    /// Install a [`FetchGate`] on every API this pool hands out from now on.
    pub fn set_fetch_gate(&self, gate: Option<Arc<FetchGate>>) {
        if let Ok(mut slot) = self.fetch_gate.lock() {
            *slot = gate;
        }
    }

    /// Concrete API for test inspection and push driving.
    pub async fn fake(&self, chain_id: ChainId) -> Option<Arc<InMemoryChainApi>> {
        let entries = self.entries.read().await;
        entries.get(&chain_id).map(|e| Arc::clone(&e.api))
    }
}

#[async_trait]
impl ChainPool for InMemoryChainPool {
    async fn connect(&self, chain_id: ChainId) -> Result<Arc<dyn ChainApi>, ChainApiError> {
        if self.unreachable.read().await.contains(&chain_id) {
            return Err(ChainApiError::ConnectFailed(chain_id));
        }
        let gate = self.fetch_gate.lock().ok().and_then(|g| g.clone());
        let mut entries = self.entries.write().await;
        let entry = entries.entry(chain_id).or_insert_with(|| {
            let api = InMemoryChainApi::new(chain_id);
            api.set_fetch_gate(gate);
            PoolEntry {
                refs: 0,
                api: Arc::new(api),
            }
        });
        entry.refs += 1;
        Ok(Arc::clone(&entry.api) as Arc<dyn ChainApi>)
    }

    async fn close(&self, chain_id: ChainId) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(&chain_id) {
            entry.refs = entry.refs.saturating_sub(1);
            if entry.refs == 0 {
                entries.remove(&chain_id);
                tracing::info!(chain = %chain_id, "closed chain connection");
            }
        }
    }

    async fn get_connected(&self, chain_id: ChainId) -> Result<Arc<dyn ChainApi>, ChainApiError> {
        let entries = self.entries.read().await;
        entries
            .get(&chain_id)
            .map(|e| Arc::clone(&e.api) as Arc<dyn ChainApi>)
            .ok_or(ChainApiError::NotConnected(chain_id))
    }

    async fn connected_chains(&self) -> Vec<ChainId> {
        let entries = self.entries.read().await;
        let mut chains: Vec<ChainId> = entries.keys().copied().collect();
        chains.sort();
        chains
    }
}
