use crate::{GraphId, RunId, StateContainer, StateMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle of a run: `PENDING → RUNNING → {SUCCESS, FAILED}`.
///
/// `CANCELLED` is part of the wire/store vocabulary but no transition
/// produces it; there is no cancellation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed | RunStatus::Cancelled)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Success => "SUCCESS",
            RunStatus::Failed => "FAILED",
            RunStatus::Cancelled => "CANCELLED",
        })
    }
}

/// Wall-clock timing recorded per executed step. A node visited more
/// than once (loops) accumulates one entry per visit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
    pub time_s: f64,
}

/// One execution instance of a graph. Mutated exclusively by the engine
/// task that owns the run; observers get clones via lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub graph_id: GraphId,
    pub status: RunStatus,
    pub state: StateContainer,
    pub logs: Vec<String>,
    #[serde(default)]
    pub metrics: HashMap<String, Vec<StepTiming>>,
    pub current_node: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    pub fn new(run_id: RunId, graph_id: GraphId, status: RunStatus, initial: StateMap) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            graph_id,
            status,
            state: StateContainer::new(initial),
            logs: Vec::new(),
            metrics: HashMap::new(),
            current_node: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Reconstruct a record from cold storage. Status, state, logs and
    /// current node survive; metrics and timestamps do not.
    pub fn from_snapshot(snapshot: RunSnapshot) -> Self {
        Self {
            run_id: snapshot.run_id,
            graph_id: snapshot.graph_id,
            status: snapshot.status,
            state: StateContainer::new(snapshot.state),
            logs: snapshot.logs,
            metrics: HashMap::new(),
            current_node: snapshot.current_node,
            created_at: None,
            updated_at: None,
        }
    }

    /// Serialized mirror persisted via the store.
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id,
            graph_id: self.graph_id,
            status: self.status,
            state: self.state.data.clone(),
            logs: self.logs.clone(),
            metrics: self.metrics.clone(),
            current_node: self.current_node.clone(),
        }
    }
}

/// The store-boundary representation of a run, upserted by `run_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub graph_id: GraphId,
    pub status: RunStatus,
    #[serde(default)]
    pub state: StateMap,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub metrics: HashMap<String, Vec<StepTiming>>,
    pub current_node: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(serde_json::to_value(RunStatus::Pending).unwrap(), json!("PENDING"));
        assert_eq!(serde_json::to_value(RunStatus::Failed).unwrap(), json!("FAILED"));
        let status: RunStatus = serde_json::from_value(json!("CANCELLED")).unwrap();
        assert_eq!(status, RunStatus::Cancelled);
    }

    #[test]
    fn snapshot_round_trip_preserves_status_state_logs() {
        let mut record = RunRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RunStatus::Success,
            json!({"x": 1}).as_object().cloned().unwrap(),
        );
        record.logs.push("START_NODE:a".to_string());
        record.logs.push("RUN_COMPLETE".to_string());
        record
            .metrics
            .insert("a".to_string(), vec![StepTiming { time_s: 0.25 }]);

        let restored = RunRecord::from_snapshot(record.snapshot());
        assert_eq!(restored.status, RunStatus::Success);
        assert_eq!(restored.state.data, record.state.data);
        assert_eq!(restored.logs, record.logs);
        // cold-storage reload drops metrics and timestamps
        assert!(restored.metrics.is_empty());
        assert!(restored.created_at.is_none());
        assert!(restored.updated_at.is_none());
    }
}
