use crate::{GraphDefinition, GraphId, RunId, RunSnapshot, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence contract consumed by the engine. Implementations hold a
/// serialized mirror of graphs and runs for recovery and listing; the
/// engine keeps the authoritative in-memory copy for live runs.
///
/// Saves are upserts keyed by `graph_id` / `run_id`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn save_graph(&self, definition: &GraphDefinition) -> Result<(), StoreError>;
    async fn load_graph(&self, graph_id: GraphId) -> Result<Option<GraphDefinition>, StoreError>;
    async fn list_graphs(&self) -> Result<Vec<GraphDefinition>, StoreError>;
    async fn save_run(&self, snapshot: &RunSnapshot) -> Result<(), StoreError>;
    async fn load_run(&self, run_id: RunId) -> Result<Option<RunSnapshot>, StoreError>;
}

/// In-memory store, the default for tests and the CLI. Retention is
/// the process lifetime.
#[derive(Default)]
pub struct MemoryStore {
    graphs: RwLock<HashMap<GraphId, GraphDefinition>>,
    runs: RwLock<HashMap<RunId, RunSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_graph(&self, definition: &GraphDefinition) -> Result<(), StoreError> {
        let graph_id = definition.graph_id.ok_or_else(|| {
            StoreError::Backend("graph definition has no assigned graph_id".to_string())
        })?;
        self.graphs.write().await.insert(graph_id, definition.clone());
        Ok(())
    }

    async fn load_graph(&self, graph_id: GraphId) -> Result<Option<GraphDefinition>, StoreError> {
        Ok(self.graphs.read().await.get(&graph_id).cloned())
    }

    async fn list_graphs(&self) -> Result<Vec<GraphDefinition>, StoreError> {
        Ok(self.graphs.read().await.values().cloned().collect())
    }

    async fn save_run(&self, snapshot: &RunSnapshot) -> Result<(), StoreError> {
        self.runs.write().await.insert(snapshot.run_id, snapshot.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: RunId) -> Result<Option<RunSnapshot>, StoreError> {
        Ok(self.runs.read().await.get(&run_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeSpec, RunStatus};
    use uuid::Uuid;

    #[tokio::test]
    async fn graph_save_is_an_upsert() {
        let store = MemoryStore::new();
        let graph_id = Uuid::new_v4();
        let mut def = GraphDefinition::new(vec![NodeSpec::new("a", "f")]);
        def.graph_id = Some(graph_id);

        store.save_graph(&def).await.unwrap();
        def.max_visits = 5;
        store.save_graph(&def).await.unwrap();

        let loaded = store.load_graph(graph_id).await.unwrap().unwrap();
        assert_eq!(loaded.max_visits, 5);
        assert_eq!(store.list_graphs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unassigned_graph_is_rejected() {
        let store = MemoryStore::new();
        let def = GraphDefinition::new(vec![NodeSpec::new("a", "f")]);
        assert!(store.save_graph(&def).await.is_err());
    }

    #[tokio::test]
    async fn run_snapshots_round_trip() {
        let store = MemoryStore::new();
        let run_id = Uuid::new_v4();
        let mut snapshot = RunSnapshot {
            run_id,
            graph_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            state: Default::default(),
            logs: vec![],
            metrics: Default::default(),
            current_node: None,
        };
        store.save_run(&snapshot).await.unwrap();

        snapshot.status = RunStatus::Success;
        snapshot.logs.push("RUN_COMPLETE".to_string());
        store.save_run(&snapshot).await.unwrap();

        let loaded = store.load_run(run_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Success);
        assert_eq!(loaded.logs, vec!["RUN_COMPLETE".to_string()]);
        assert!(store.load_run(Uuid::new_v4()).await.unwrap().is_none());
    }
}
