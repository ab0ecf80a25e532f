use crate::{StateMap, ToolError};
use async_trait::async_trait;

/// A step handler, resolved by name through the tool registry.
///
/// Receives the whole run state and the node's `meta` configuration;
/// returns a partial state update (`Some`) to merge with shallow key
/// overwrite, or `None` to leave the state untouched.
///
/// Implementations must be async at this seam. Blocking work belongs on
/// the worker pool — register it through the registry's blocking path
/// rather than stalling the scheduler inside `invoke`.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn invoke(&self, state: &StateMap, meta: &StateMap)
        -> Result<Option<StateMap>, ToolError>;
}
