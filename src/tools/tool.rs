//! The [`Tool`] contract and a closure-backed implementation.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::arguments::ToolArguments;
use super::types::{ToolDescriptor, ToolParameters};
use crate::error::HelmError;
use crate::types::ToolInvocationRequest;

/// Per-invocation context handed to [`Tool::execute`].
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Id of the invocation request, when the call originates from a model response.
    pub tool_call_id: Option<String>,
    pub tool_name: Option<String>,
    /// Fires when the run is canceled.
    pub cancel: CancellationToken,
}

impl ToolExecutionContext {
    /// Context for a model-issued invocation.
    pub fn for_request(request: &ToolInvocationRequest, cancel: CancellationToken) -> Self {
        Self {
            tool_call_id: Some(request.id.clone()),
            tool_name: Some(request.name.clone()),
            cancel,
        }
    }

    /// Context for a direct call by name.
    pub fn for_name(name: &str, cancel: CancellationToken) -> Self {
        Self {
            tool_call_id: None,
            tool_name: Some(name.to_string()),
            cancel,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A named capability the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name; the model refers to the tool by it.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters(&self) -> &ToolParameters;

    /// Run the tool. Arguments have already been validated against
    /// [`Tool::parameters`].
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, HelmError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters().schema.clone(),
        }
    }
}

type ToolHandler = dyn Fn(ToolArguments, ToolExecutionContext) -> BoxFuture<'static, Result<serde_json::Value, HelmError>>
    + Send
    + Sync;

/// Tool backed by an async closure.
///
/// ```
/// use helm::tools::{AgentTool, ToolParameters};
///
/// let echo = AgentTool::new(
///     "echo",
///     "Returns its arguments",
///     ToolParameters::empty(),
///     |args, _ctx| async move { Ok(args.raw().clone()) },
/// );
/// # let _ = echo;
/// ```
#[derive(Clone)]
pub struct AgentTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, HelmError>> + Send + 'static,
    {
        let handler: Arc<ToolHandler> = Arc::new(
            move |args: ToolArguments,
                  ctx: ToolExecutionContext|
                  -> BoxFuture<'static, Result<serde_json::Value, HelmError>> {
                Box::pin(handler(args, ctx))
            },
        );
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
        }
    }

    /// Shareable handle for registration.
    pub fn into_shared(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, HelmError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn closure_receives_arguments_and_context() {
        let tool = AgentTool::new(
            "whoami",
            "Reports the invocation id",
            ToolParameters::empty(),
            |_args, ctx| async move { Ok(json!(ctx.tool_call_id)) },
        );
        let request = ToolInvocationRequest::new("call-9", "whoami", json!({}));
        let ctx = ToolExecutionContext::for_request(&request, CancellationToken::new());

        let result = tool
            .execute(&ToolArguments::new(json!({})), &ctx)
            .await
            .expect("execute");
        assert_eq!(result, json!("call-9"));
        assert!(!ctx.is_canceled());
    }

    #[test]
    fn descriptor_mirrors_tool_metadata() {
        let tool = AgentTool::new(
            "lookup",
            "Finds things",
            ToolParameters::object().string("q", "Query", true).build(),
            |_args, _ctx| async move { Ok(json!(null)) },
        );
        let descriptor = tool.descriptor();
        assert_eq!(descriptor.name, "lookup");
        assert_eq!(descriptor.description, "Finds things");
        assert_eq!(descriptor.input_schema["required"], json!(["q"]));
    }
}
