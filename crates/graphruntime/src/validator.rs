use graphcore::{GraphDefinition, GraphError};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};

/// Structural and reachability checks on a graph definition. Pure; must
/// pass before a graph is accepted for storage.
///
/// Reachability is conservative: every `next` target is followed,
/// ignoring conditions, so a node counts as reachable if any possible
/// branch could visit it.
pub fn validate_graph(definition: &GraphDefinition) -> Result<(), GraphError> {
    if definition.nodes.is_empty() {
        return Err(GraphError::EmptyNodes);
    }
    if definition.edges.is_empty() {
        return Err(GraphError::EmptyEdges);
    }

    let mut names: HashSet<&str> = HashSet::with_capacity(definition.nodes.len());
    for node in &definition.nodes {
        if !names.insert(node.name.as_str()) {
            return Err(GraphError::DuplicateNode(node.name.clone()));
        }
    }

    let start = definition
        .resolved_start()
        .filter(|s| names.contains(s))
        .ok_or_else(|| {
            GraphError::BadStartNode(definition.resolved_start().unwrap_or_default().to_string())
        })?;

    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::with_capacity(definition.nodes.len());
    for node in &definition.nodes {
        indices.insert(node.name.as_str(), graph.add_node(node.name.as_str()));
    }

    for (source, options) in &definition.edges {
        let from = *indices
            .get(source.as_str())
            .ok_or_else(|| GraphError::UnknownEdgeSource(source.clone()))?;
        for option in options {
            if let Some(next) = &option.next {
                let to = *indices.get(next.as_str()).ok_or_else(|| {
                    GraphError::UnknownEdgeTarget {
                        from: source.clone(),
                        to: next.clone(),
                    }
                })?;
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut reachable: HashSet<&str> = HashSet::with_capacity(definition.nodes.len());
    let mut dfs = Dfs::new(&graph, indices[start]);
    while let Some(idx) = dfs.next(&graph) {
        reachable.insert(graph[idx]);
    }

    let mut unreachable: Vec<String> = names
        .difference(&reachable)
        .map(|n| n.to_string())
        .collect();
    if !unreachable.is_empty() {
        unreachable.sort();
        return Err(GraphError::Unreachable(unreachable));
    }

    Ok(())
}
