//! Core types and contracts for the workflow-graph engine
//!
//! This crate provides the data model (graph definitions, run records,
//! the shared state container), the narrow contracts consumed by
//! external collaborators (`Store`, `Tool`), and the per-run log
//! broadcaster. It has no dependency on the runtime crate.

mod broadcast;
mod error;
mod graph;
mod run;
mod state;
mod store;
mod tool;

pub use broadcast::{LogBroadcaster, DEFAULT_CHANNEL_CAPACITY};
pub use error::{EngineError, GraphError, StepError, StoreError, ToolError};
pub use graph::{Condition, EdgeOption, GraphDefinition, NodeSpec, DEFAULT_MAX_VISITS};
pub use run::{RunRecord, RunSnapshot, RunStatus, StepTiming};
pub use state::{StateContainer, StateMap};
pub use store::{MemoryStore, Store};
pub use tool::Tool;

use uuid::Uuid;

pub type GraphId = Uuid;
pub type RunId = Uuid;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
