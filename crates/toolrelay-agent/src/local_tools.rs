//! Registry of local built-in tools (`local::<name>`).

use std::collections::BTreeMap;
use std::sync::Arc;

use toolrelay_core::{LocalTool, ToolDescriptor};

/// Built-in tools keyed by name.
#[derive(Clone, Default)]
pub struct LocalToolRegistry {
    tools: BTreeMap<String, Arc<dyn LocalTool>>,
}

impl LocalToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its descriptor name, replacing any previous one.
    pub fn register(&mut self, tool: Arc<dyn LocalTool>) {
        let name = tool.descriptor().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "replaced local tool");
        }
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn LocalTool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LocalTool>> {
        self.tools.get(name).cloned()
    }

    /// Descriptors in name order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for LocalToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use toolrelay_core::LocalToolError;

    struct Named(&'static str);

    #[async_trait]
    impl LocalTool for Named {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.0)
        }

        async fn invoke(&self, _arguments: Map<String, Value>) -> Result<Value, LocalToolError> {
            Ok(Value::String(self.0.to_string()))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = LocalToolRegistry::new()
            .with_tool(Arc::new(Named("screenshot")))
            .with_tool(Arc::new(Named("click")));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("click").is_some());
        assert!(registry.get("Click").is_none());

        let names: Vec<_> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["click", "screenshot"]);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = LocalToolRegistry::new();
        registry.register(Arc::new(Named("click")));
        registry.register(Arc::new(Named("click")));
        assert_eq!(registry.len(), 1);
    }
}
