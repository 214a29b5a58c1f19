use crate::domain::models::{ToolCallRequest, ToolDescriptor, ToolOutput};
use crate::domain::ports::Tool;
use crate::error::{ChatError, Result};
use serde_json::Value;
use std::sync::Arc;

/// The fixed set of local tools the assistant is allowed to call.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.get(tool.name()).is_some() {
            return Err(ChatError::DuplicateTool(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Error boundary between tool I/O and the run: every request yields exactly
/// one output, failures included.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn execute(&self, request: &ToolCallRequest) -> ToolOutput {
        let Some(tool) = self.registry.get(&request.name) else {
            tracing::warn!(tool = %request.name, call_id = %request.id, "unknown tool requested");
            return ToolOutput::failure(&request.id, format!("Tool '{}' not found", request.name));
        };

        tracing::info!(tool = %request.name, call_id = %request.id, "executing tool");
        match tool.execute(request.arguments.clone()).await {
            Ok(Value::String(text)) => ToolOutput::success(&request.id, text),
            Ok(value) => ToolOutput::success(&request.id, value.to_string()),
            Err(err) => {
                tracing::warn!(tool = %request.name, call_id = %request.id, error = %err, "tool failed");
                let message = if err.is_empty() {
                    format!("Tool '{}' failed", request.name)
                } else {
                    err
                };
                ToolOutput::failure(&request.id, message)
            }
        }
    }

    /// Sequential, one output per request, in request order
    pub async fn execute_all(&self, requests: &[ToolCallRequest]) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(requests.len());
        for request in requests {
            outputs.push(self.execute(request).await);
        }
        outputs
    }
}
