//! Name-keyed tool lookup and invocation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolExecutionContext};
use super::types::ToolDescriptor;
use super::validation::validate_arguments;
use crate::error::HelmError;
use crate::types::ToolInvocationRequest;
use crate::util::timeout::with_timeout;

/// Registry of tools available to a run.
///
/// Populated before a run starts and read-only while it executes.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every tool execution by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Per-execution limit, if one is set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Register a tool. Names must be unique within the registry.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), HelmError> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(HelmError::DuplicateTool(name));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style variant of [`ToolRegistry::register`].
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self, HelmError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<ToolDescriptor> {
        self.lookup(name).map(|tool| tool.descriptor())
    }

    /// Descriptors for every registered tool, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        arguments: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, HelmError> {
        let ctx = ToolExecutionContext::for_name(name, cancel.clone());
        self.invoke(name, arguments, ctx).await
    }

    /// Execute a model-issued invocation request.
    pub async fn execute_request(
        &self,
        request: &ToolInvocationRequest,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, HelmError> {
        let ctx = ToolExecutionContext::for_request(request, cancel.clone());
        self.invoke(&request.name, &request.arguments, ctx).await
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &serde_json::Value,
        ctx: ToolExecutionContext,
    ) -> Result<serde_json::Value, HelmError> {
        let tool = self
            .lookup(name)
            .ok_or_else(|| HelmError::ToolNotFound(name.to_string()))?;
        validate_arguments(arguments, &tool.parameters().schema).map_err(|message| {
            HelmError::InvalidArgument(format!("Argument validation failed: {message}"))
        })?;

        let args = ToolArguments::new(arguments.clone());
        let cancel = ctx.cancel.clone();
        let execution = async {
            match self.timeout {
                Some(limit) => with_timeout(limit, tool.execute(&args, &ctx)).await,
                None => tool.execute(&args, &ctx).await,
            }
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HelmError::Canceled),
            result = execution => result,
        }
    }

    fn lookup(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&index| &self.tools[index])
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        f.debug_struct("ToolRegistry")
            .field("tools", &names)
            .field("timeout", &self.timeout)
            .finish()
    }
}
