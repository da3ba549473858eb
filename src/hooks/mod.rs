//! Policy hooks evaluated at fixed interception points of a run.
//!
//! Callbacks for a [`HookType`] run sequentially in registration order.
//! For enforced points (`PreModelCall`, `PreToolUse`, `PreAgentStop`) the
//! first denial short-circuits the remaining callbacks. Observation points
//! (`PostModelCall`, `PostToolUse`, `PostAgentStop`) always run every
//! callback; a denial there is reported but the controller does not act on it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::provider::ModelResponse;
use crate::types::{Message, ToolInvocationRequest};

/// Interception point in the turn loop.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HookType {
    PreModelCall,
    PostModelCall,
    PreToolUse,
    PostToolUse,
    PreAgentStop,
    PostAgentStop,
}

impl HookType {
    /// Whether a denial stops evaluation of the remaining callbacks.
    pub fn is_enforced(self) -> bool {
        matches!(
            self,
            Self::PreModelCall | Self::PreToolUse | Self::PreAgentStop
        )
    }
}

/// Outcome of a hook callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum HookVerdict {
    Allow,
    Deny { reason: String },
}

impl HookVerdict {
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    pub fn allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Denial reason; `None` when allowed.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason } => Some(reason),
        }
    }
}

/// Run-level context passed to every callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookContext {
    pub turn_number: usize,
    pub session_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Payload handed to a callback, one shape per interception point.
#[derive(Debug, Clone, PartialEq)]
pub enum HookData {
    /// `PreModelCall`: history about to be sent.
    ModelCall { history: Vec<Message> },
    /// `PostModelCall`: raw model response.
    ModelResponse(ModelResponse),
    /// `PreToolUse`: the pending invocation.
    ToolUse(ToolInvocationRequest),
    /// `PostToolUse`: a successful invocation and its result.
    ToolOutcome {
        request: ToolInvocationRequest,
        result: serde_json::Value,
    },
    /// `PreAgentStop` / `PostAgentStop`: history at the stop point.
    AgentStop { history: Vec<Message> },
}

/// Async hook callback.
pub type HookCallback =
    Arc<dyn Fn(HookData, HookContext) -> BoxFuture<'static, HookVerdict> + Send + Sync>;

/// Hook registry keyed by interception point.
#[derive(Clone, Default)]
pub struct HookDispatcher {
    hooks: HashMap<HookType, Vec<HookCallback>>,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async callback for `hook_type`.
    pub fn register(&mut self, hook_type: HookType, callback: HookCallback) {
        self.hooks.entry(hook_type).or_default().push(callback);
    }

    /// Register an async closure for `hook_type`.
    pub fn register_fn<F, Fut>(&mut self, hook_type: HookType, callback: F)
    where
        F: Fn(HookData, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookVerdict> + Send + 'static,
    {
        let callback: HookCallback = Arc::new(
            move |data: HookData, ctx: HookContext| -> BoxFuture<'static, HookVerdict> {
                Box::pin(callback(data, ctx))
            },
        );
        self.register(hook_type, callback);
    }

    /// Register a synchronous callback for `hook_type`.
    pub fn on<F>(&mut self, hook_type: HookType, callback: F)
    where
        F: Fn(&HookData, &HookContext) -> HookVerdict + Send + Sync + 'static,
    {
        self.register_fn(hook_type, move |data, ctx| {
            let verdict = callback(&data, &ctx);
            async move { verdict }
        });
    }

    /// Builder-style variant of [`HookDispatcher::on`].
    pub fn with<F>(mut self, hook_type: HookType, callback: F) -> Self
    where
        F: Fn(&HookData, &HookContext) -> HookVerdict + Send + Sync + 'static,
    {
        self.on(hook_type, callback);
        self
    }

    /// Number of callbacks registered for `hook_type`.
    pub fn len(&self, hook_type: HookType) -> usize {
        self.hooks.get(&hook_type).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }

    /// Evaluate every callback for `hook_type` in registration order.
    ///
    /// Returns the first denial, or [`HookVerdict::Allow`] when nothing denied.
    pub async fn evaluate(
        &self,
        hook_type: HookType,
        data: &HookData,
        ctx: &HookContext,
    ) -> HookVerdict {
        let Some(callbacks) = self.hooks.get(&hook_type) else {
            return HookVerdict::Allow;
        };
        let mut first_denial = None;
        for (index, callback) in callbacks.iter().enumerate() {
            let verdict = callback(data.clone(), ctx.clone()).await;
            if let HookVerdict::Deny { reason } = &verdict {
                tracing::debug!(hook = %hook_type, index, reason = %reason, "hook denied");
                if hook_type.is_enforced() {
                    return verdict;
                }
                first_denial.get_or_insert(verdict);
            }
        }
        first_denial.unwrap_or(HookVerdict::Allow)
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<String, usize> = self
            .hooks
            .iter()
            .map(|(hook_type, callbacks)| (hook_type.to_string(), callbacks.len()))
            .collect();
        f.debug_struct("HookDispatcher")
            .field("hooks", &counts)
            .finish()
    }
}
