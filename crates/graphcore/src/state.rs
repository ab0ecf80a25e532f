use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The mapping shared by all steps of one run.
pub type StateMap = serde_json::Map<String, Value>;

/// Mutable state shared across the steps of a single run. Steps read
/// the whole mapping and return a partial mapping that is merged back
/// with shallow key overwrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateContainer {
    #[serde(default)]
    pub data: StateMap,
}

impl StateContainer {
    pub fn new(data: StateMap) -> Self {
        Self { data }
    }

    /// Resolve a dotted path one segment at a time. Returns `None` when
    /// a segment is absent or an intermediate value is not an object —
    /// distinct from a present `Value::Null`.
    pub fn resolve_path(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.data.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Shallow merge: keys in `patch` overwrite, all others are kept.
    pub fn merge(&mut self, patch: StateMap) {
        for (key, value) in patch {
            self.data.insert(key, value);
        }
    }

    /// JSON rendering used for `state_snapshot=` log lines.
    pub fn snapshot_repr(&self) -> String {
        serde_json::to_string(&self.data).unwrap_or_else(|_| "{}".to_string())
    }
}
