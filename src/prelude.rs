//! Convenience re-exports.

pub use crate::agent_loop::{
    AgentEvent, ErrorKind, EventStream, RunId, RunRequest, RunStatus, TurnController, TurnState,
};
pub use crate::config::HelmConfig;
pub use crate::error::{HelmError, Result};
pub use crate::history::HistoryStore;
pub use crate::hooks::{HookContext, HookData, HookDispatcher, HookType, HookVerdict};
pub use crate::provider::{ModelClient, ModelRequest, ModelResponse};
pub use crate::tools::{AgentTool, Tool, ToolArguments, ToolDescriptor, ToolParameters, ToolRegistry};
pub use crate::types::{Message, Role, SamplingParams, ToolInvocationRequest};
pub use crate::util::retry::RetryPolicy;
