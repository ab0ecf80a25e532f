use crate::executor;
use crate::registry::ToolRegistry;
use crate::validator::validate_graph;
use graphcore::{
    EngineError, GraphDefinition, GraphId, LogBroadcaster, RunId, RunRecord, RunStatus,
    StateMap, Store, DEFAULT_CHANNEL_CAPACITY,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Configuration for a [`GraphEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-run capacity of the log broadcast channels.
    pub log_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// The run engine: owns the run state machine, the sequential step
/// dispatch loop, and the graph/run caches.
///
/// All shared state is owned by the engine instance — construct one per
/// process (or per test) and share it behind an `Arc`. Each run is
/// driven by exactly one task; lookups observe cloned records.
pub struct GraphEngine {
    store: Arc<dyn Store>,
    tools: Arc<ToolRegistry>,
    broadcaster: Arc<LogBroadcaster>,
    graphs: RwLock<HashMap<GraphId, Arc<GraphDefinition>>>,
    runs: RwLock<HashMap<RunId, Arc<RwLock<RunRecord>>>>,
}

impl GraphEngine {
    pub fn new(store: Arc<dyn Store>, tools: Arc<ToolRegistry>) -> Self {
        Self::with_config(store, tools, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn Store>,
        tools: Arc<ToolRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            tools,
            broadcaster: Arc::new(LogBroadcaster::new(config.log_channel_capacity)),
            graphs: RwLock::new(HashMap::new()),
            runs: RwLock::new(HashMap::new()),
        }
    }

    /// The per-run log multicast; subscribe before triggering a run to
    /// observe its lines live.
    pub fn broadcaster(&self) -> &Arc<LogBroadcaster> {
        &self.broadcaster
    }

    pub(crate) fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Validate a definition, assign it a fresh id, persist and cache
    /// it. A definition that fails validation is never persisted.
    pub async fn create_graph(
        &self,
        mut definition: GraphDefinition,
    ) -> Result<GraphId, EngineError> {
        validate_graph(&definition)?;
        let graph_id = Uuid::new_v4();
        definition.graph_id = Some(graph_id);
        self.store.save_graph(&definition).await?;
        self.graphs
            .write()
            .await
            .insert(graph_id, Arc::new(definition));
        tracing::info!(%graph_id, "graph created");
        Ok(graph_id)
    }

    pub async fn list_graphs(&self) -> Result<Vec<GraphDefinition>, EngineError> {
        Ok(self.store.list_graphs().await?)
    }

    /// Execute a run to completion in the caller's task and return the
    /// terminal record. Step failures surface as a FAILED record, not
    /// as an error.
    pub async fn run(
        &self,
        graph_id: GraphId,
        initial_state: StateMap,
    ) -> Result<RunRecord, EngineError> {
        let graph = self.resolve_graph(graph_id).await?;
        let record = self.insert_run(graph_id, initial_state, RunStatus::Running).await;
        self.persist_record(&record).await;
        executor::drive(self, graph, Arc::clone(&record)).await;
        let terminal = record.read().await.clone();
        Ok(terminal)
    }

    /// Fire-and-forget entry point: create a PENDING record, schedule
    /// the execution on the runtime, and return the run id immediately.
    /// Callers observe progress and failure via [`GraphEngine::get_run`].
    pub async fn spawn_run(
        self: &Arc<Self>,
        graph_id: GraphId,
        initial_state: StateMap,
    ) -> Result<RunId, EngineError> {
        let graph = self.resolve_graph(graph_id).await?;
        let record = self.insert_run(graph_id, initial_state, RunStatus::Pending).await;
        let run_id = record.read().await.run_id;
        self.persist_record(&record).await;

        let engine = Arc::clone(self);
        let task = tokio::spawn(async move {
            executor::drive(&engine, graph, record).await;
        });
        // Step failures become run state inside `drive`; the supervisor
        // only observes panics and aborts, so the task cannot die silently.
        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::error!(%run_id, "background run task failed: {e}");
            }
        });

        Ok(run_id)
    }

    /// Look up a run: in-memory cache first, then reconstruction from
    /// the store (repopulating the cache). Records reloaded from cold
    /// storage lose metrics and timestamps.
    pub async fn get_run(&self, run_id: RunId) -> Option<RunRecord> {
        if let Some(record) = self.runs.read().await.get(&run_id) {
            return Some(record.read().await.clone());
        }
        let snapshot = match self.store.load_run(run_id).await {
            Ok(snapshot) => snapshot?,
            Err(e) => {
                tracing::warn!(%run_id, "failed to load run from store: {e}");
                return None;
            }
        };
        let record = RunRecord::from_snapshot(snapshot);
        self.runs
            .write()
            .await
            .insert(run_id, Arc::new(RwLock::new(record.clone())));
        Some(record)
    }

    async fn resolve_graph(&self, graph_id: GraphId) -> Result<Arc<GraphDefinition>, EngineError> {
        if let Some(graph) = self.graphs.read().await.get(&graph_id) {
            return Ok(Arc::clone(graph));
        }
        let definition = self
            .store
            .load_graph(graph_id)
            .await?
            .ok_or(EngineError::GraphNotFound(graph_id))?;
        let graph = Arc::new(definition);
        self.graphs
            .write()
            .await
            .insert(graph_id, Arc::clone(&graph));
        Ok(graph)
    }

    async fn insert_run(
        &self,
        graph_id: GraphId,
        initial_state: StateMap,
        status: RunStatus,
    ) -> Arc<RwLock<RunRecord>> {
        let run_id = Uuid::new_v4();
        let record = Arc::new(RwLock::new(RunRecord::new(
            run_id,
            graph_id,
            status,
            initial_state,
        )));
        self.runs.write().await.insert(run_id, Arc::clone(&record));
        record
    }

    /// Persist the current snapshot. A store failure is logged and
    /// swallowed: the in-memory record stays authoritative and the run
    /// keeps going.
    pub(crate) async fn persist_record(&self, record: &Arc<RwLock<RunRecord>>) {
        let snapshot = record.read().await.snapshot();
        if let Err(e) = self.store.save_run(&snapshot).await {
            tracing::warn!(run_id = %snapshot.run_id, "failed to persist run snapshot: {e}");
        }
    }
}
