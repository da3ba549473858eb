//! Shared test helpers: scripted model clients and sample tools.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use helm::prelude::*;

/// A model client that replays canned responses in order.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<ModelResponse>>>,
    fallback: Option<ModelResponse>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::with_script(responses.into_iter().map(Ok).collect())
    }

    pub fn with_script(script: Vec<Result<ModelResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with `response`.
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn send(
        &self,
        request: &ModelRequest,
        _cancel: CancellationToken,
    ) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| HelmError::Protocol("script exhausted".into())),
        }
    }
}

/// A model client that never answers.
#[derive(Default)]
pub struct HangingClient {
    calls: AtomicUsize,
    cancel_on_send: bool,
}

impl HangingClient {
    /// Cancels the run's token from inside `send`, while the call is in flight.
    pub fn canceling() -> Self {
        Self {
            cancel_on_send: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for HangingClient {
    async fn send(
        &self,
        _request: &ModelRequest,
        cancel: CancellationToken,
    ) -> Result<ModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.cancel_on_send {
            cancel.cancel();
        }
        std::future::pending().await
    }
}

/// An async hook that cancels `trigger` and then never resolves.
pub fn stalled_hook(
    hooks: &mut HookDispatcher,
    hook_type: HookType,
    trigger: CancellationToken,
) {
    hooks.register_fn(hook_type, move |_data, _ctx| {
        let trigger = trigger.clone();
        async move {
            trigger.cancel();
            std::future::pending::<HookVerdict>().await
        }
    });
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ModelResponse {
    ModelResponse::tool_uses(vec![ToolInvocationRequest::new(id, name, arguments)])
}

pub fn calculator_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "calculator",
        "Performs basic arithmetic",
        ToolParameters::object()
            .string_enum(
                "operation",
                "Operation to apply",
                &["add", "subtract", "multiply", "divide"],
                true,
            )
            .number("a", "Left operand", true)
            .number("b", "Right operand", true)
            .build(),
        |args, _ctx| async move {
            let operation = args.get_str("operation")?;
            let a = args.get_f64("a")?;
            let b = args.get_f64("b")?;
            let value = match operation {
                "add" => a + b,
                "subtract" => a - b,
                "multiply" => a * b,
                "divide" if b == 0.0 => {
                    return Err(HelmError::tool("calculator", "division by zero"));
                }
                "divide" => a / b,
                other => {
                    return Err(HelmError::InvalidArgument(format!(
                        "unknown operation {other}"
                    )));
                }
            };
            Ok(json!(format!("{a} {operation} {b} = {value}")))
        },
    ))
}

/// Counts executions and echoes its arguments back.
pub fn counting_tool(name: &str, counter: Arc<AtomicUsize>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        name,
        "Counts calls",
        ToolParameters::empty(),
        move |args, _ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(args.raw().clone())
            }
        },
    ))
}

pub fn failing_tool(name: &str, message: &str) -> Arc<dyn Tool> {
    let tool_name = name.to_string();
    let message = message.to_string();
    Arc::new(AgentTool::new(
        name,
        "Always fails",
        ToolParameters::empty(),
        move |_args, _ctx| {
            let err = HelmError::tool(tool_name.clone(), message.clone());
            async move { Err(err) }
        },
    ))
}

pub fn registry(tools: Vec<Arc<dyn Tool>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool).expect("unique tool names");
    }
    registry
}

pub fn controller(
    client: Arc<dyn ModelClient>,
    tools: Vec<Arc<dyn Tool>>,
    hooks: HookDispatcher,
) -> TurnController {
    TurnController::new(client, registry(tools), hooks)
}

/// Drain a run, returning every event and the final history.
pub async fn run_to_end(
    controller: &TurnController,
    request: RunRequest,
) -> (Vec<AgentEvent>, Vec<Message>) {
    let mut stream = controller.run(request);
    let events = stream.collect_events().await;
    (events, stream.history())
}

pub fn count_calling_model(events: &[AgentEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, AgentEvent::CallingModel { .. }))
        .count()
}
