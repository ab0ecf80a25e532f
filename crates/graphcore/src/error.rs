use thiserror::Error;

/// Validation-time failures. Raised synchronously from graph creation;
/// a graph that fails validation is never persisted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("graph must contain nodes")]
    EmptyNodes,

    #[error("graph must contain edges")]
    EmptyEdges,

    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    #[error("start_node '{0}' is not one of the graph's nodes")]
    BadStartNode(String),

    #[error("edge source '{0}' is not one of the graph's nodes")]
    UnknownEdgeSource(String),

    #[error("edge from '{from}' references unknown node '{to}'")]
    UnknownEdgeTarget { from: String, to: String },

    #[error("unreachable nodes detected: {}", .0.join(", "))]
    Unreachable(Vec<String>),
}

/// Execution-time failures. Contained inside the run loop: converted
/// into a FAILED run record with an `ERR:` log line, never thrown to
/// the scheduler or to a background caller.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("tool '{func}' not found for node '{node}'")]
    ToolNotFound { node: String, func: String },

    #[error("node '{0}' is not defined in the graph")]
    UnknownNode(String),

    #[error("max visits exceeded; possible infinite loop")]
    MaxVisitsExceeded,

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Failure raised by a tool invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("tool failed: {0}")]
    Failed(String),

    #[error("tool panicked or was aborted: {0}")]
    Join(String),
}

impl ToolError {
    pub fn failed(msg: impl Into<String>) -> Self {
        ToolError::Failed(msg.into())
    }
}

/// Persistence failures from a `Store` implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the engine's public entry points.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid graph: {0}")]
    Invalid(#[from] GraphError),

    #[error("graph not found: {0}")]
    GraphNotFound(crate::GraphId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
