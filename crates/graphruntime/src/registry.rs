use graphcore::{StateMap, Tool, ToolError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of step handlers, resolved by name at execution time.
///
/// Handlers are async at the `Tool` seam. Synchronous handlers go
/// through [`ToolRegistry::register_blocking`], which wraps them so
/// every invocation runs on the blocking worker pool; the engine never
/// has to ask a handler whether it may block.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register an asynchronous tool.
    pub fn register(&mut self, name: impl Into<String>, tool: Arc<dyn Tool>) {
        let name = name.into();
        tracing::info!("Registering tool: {}", name);
        self.tools.insert(name, tool);
    }

    /// Register a synchronous tool. The closure is dispatched through
    /// `spawn_blocking` on every invocation so it cannot stall the
    /// scheduler or the log-streaming path.
    pub fn register_blocking<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&StateMap, &StateMap) -> Result<Option<StateMap>, ToolError>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, Arc::new(BlockingTool::new(func)));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter handing a synchronous handler off to the worker pool.
struct BlockingTool<F> {
    func: Arc<F>,
}

impl<F> BlockingTool<F> {
    fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl<F> Tool for BlockingTool<F>
where
    F: Fn(&StateMap, &StateMap) -> Result<Option<StateMap>, ToolError> + Send + Sync + 'static,
{
    async fn invoke(
        &self,
        state: &StateMap,
        meta: &StateMap,
    ) -> Result<Option<StateMap>, ToolError> {
        let func = Arc::clone(&self.func);
        let state = state.clone();
        let meta = meta.clone();
        tokio::task::spawn_blocking(move || func(&state, &meta))
            .await
            .map_err(|e| ToolError::Join(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn blocking_tools_run_off_the_scheduler() {
        let mut registry = ToolRegistry::new();
        registry.register_blocking("double", |state: &StateMap, _meta: &StateMap| {
            let x = state.get("x").and_then(|v| v.as_i64()).unwrap_or(0);
            let mut patch = StateMap::new();
            patch.insert("x".to_string(), json!(x * 2));
            Ok(Some(patch))
        });

        let tool = registry.get("double").unwrap();
        let state = json!({"x": 21}).as_object().cloned().unwrap();
        let patch = tool.invoke(&state, &StateMap::new()).await.unwrap().unwrap();
        assert_eq!(patch["x"], json!(42));

        assert!(registry.get("missing").is_none());
        assert_eq!(registry.tool_names(), vec!["double".to_string()]);
    }

    #[tokio::test]
    async fn blocking_tool_errors_propagate() {
        let mut registry = ToolRegistry::new();
        registry.register_blocking("boom", |_: &StateMap, _: &StateMap| {
            Err(ToolError::failed("boom"))
        });

        let tool = registry.get("boom").unwrap();
        let err = tool
            .invoke(&StateMap::new(), &StateMap::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
