//! Workflow-graph execution runtime
//!
//! This crate provides the graph validator, the edge-condition
//! evaluator, the tool registry, and the run engine that drives graphs
//! node by node against a shared state container.

mod condition;
mod engine;
mod executor;
mod registry;
mod validator;

pub use condition::evaluate_condition;
pub use engine::{EngineConfig, GraphEngine};
pub use registry::ToolRegistry;
pub use validator::validate_graph;
