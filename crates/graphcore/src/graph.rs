use crate::{GraphId, StateMap};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Loop-guard bound applied when a definition does not set `max_visits`.
pub const DEFAULT_MAX_VISITS: u32 = 1000;

fn default_max_visits() -> u32 {
    DEFAULT_MAX_VISITS
}

/// Static description of a workflow graph: named steps connected by
/// ordered, conditionally guarded edges. Immutable once validated,
/// apart from the `graph_id` assigned at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Assigned by the engine at creation; never supplied by callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<GraphId>,

    /// Declaration order is significant: the first node is the default
    /// start node. Names must be unique (enforced by validation).
    pub nodes: Vec<NodeSpec>,

    /// Outgoing edge options per source node. Each list is evaluated in
    /// order; the first matching option wins.
    #[serde(default)]
    pub edges: HashMap<String, Vec<EdgeOption>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_node: Option<String>,

    #[serde(default = "default_max_visits")]
    pub max_visits: u32,
}

impl GraphDefinition {
    pub fn new(nodes: Vec<NodeSpec>) -> Self {
        Self {
            graph_id: None,
            nodes,
            edges: HashMap::new(),
            start_node: None,
            max_visits: DEFAULT_MAX_VISITS,
        }
    }

    /// Add an edge option from `from`, preserving declaration order.
    pub fn connect(&mut self, from: impl Into<String>, option: EdgeOption) {
        self.edges.entry(from.into()).or_default().push(option);
    }

    /// The explicit start node, or the first declared node.
    pub fn resolved_start(&self) -> Option<&str> {
        self.start_node
            .as_deref()
            .or_else(|| self.nodes.first().map(|n| n.name.as_str()))
    }

    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// A named step: a handler reference plus step-local configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,

    /// Name of the handler to resolve via the tool registry.
    pub func: String,

    /// Passed verbatim to the handler on every invocation.
    #[serde(default)]
    pub meta: StateMap,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, func: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            func: func.into(),
            meta: StateMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// A candidate transition out of a node. An absent `next` terminates
/// the run if selected; an absent `cond` is always selected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<Condition>,
}

impl EdgeOption {
    pub fn to(next: impl Into<String>) -> Self {
        Self {
            next: Some(next.into()),
            cond: None,
        }
    }

    pub fn when(mut self, cond: Condition) -> Self {
        self.cond = Some(cond);
        self
    }
}

/// A comparison against a dotted path into the run state.
///
/// `op` is one of `==`, `!=`, `>`, `<`, `>=`, `<=`; an absent or
/// unrecognized operator degrades to a truthiness test of the resolved
/// value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted path, e.g. `"profile.row_count"`.
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl Condition {
    pub fn new(
        key: impl Into<String>,
        op: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            key: key.into(),
            op: Some(op.into()),
            value: Some(value),
        }
    }

    /// Truthiness test of `key` (no operator).
    pub fn truthy(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: None,
            value: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_node_defaults_to_first_declared() {
        let graph = GraphDefinition::new(vec![
            NodeSpec::new("a", "f"),
            NodeSpec::new("b", "g"),
        ]);
        assert_eq!(graph.resolved_start(), Some("a"));

        let mut graph = graph;
        graph.start_node = Some("b".to_string());
        assert_eq!(graph.resolved_start(), Some("b"));
    }

    #[test]
    fn max_visits_defaults_from_json() {
        let graph: GraphDefinition = serde_json::from_value(json!({
            "nodes": [{"name": "a", "func": "f"}],
            "edges": {"a": [{}]}
        }))
        .unwrap();
        assert_eq!(graph.max_visits, DEFAULT_MAX_VISITS);
        assert!(graph.graph_id.is_none());
        assert!(graph.edges["a"][0].next.is_none());
    }

    #[test]
    fn condition_deserializes_with_optional_fields() {
        let cond: Condition =
            serde_json::from_value(json!({"key": "x", "op": ">", "value": 5})).unwrap();
        assert_eq!(cond.op.as_deref(), Some(">"));

        let cond: Condition = serde_json::from_value(json!({"key": "flag"})).unwrap();
        assert!(cond.op.is_none());
        assert!(cond.value.is_none());
    }
}
