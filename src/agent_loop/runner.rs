//! Turn controller: the model/tool control loop behind a pull-driven event stream.

mod tooling;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_stream::stream;
use futures::stream::{BoxStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::HelmError;
use crate::history::{HistoryStore, SharedHistory};
use crate::hooks::{HookContext, HookData, HookDispatcher, HookType, HookVerdict};
use crate::provider::{ModelClient, ModelRequest};
use crate::tools::ToolRegistry;
use crate::types::Message;
use crate::util::retry::RetryPolicy;

use super::events::{AgentEvent, ErrorKind};
use super::types::{RunId, RunRequest, TurnState};
use tooling::{
    compose_turn_message, denied_note, failure_note, result_note, tool_error_kind,
};

/// Drives one conversational task: model calls, tool execution and hook checks.
///
/// A controller is reusable; every [`TurnController::run`] starts a fresh
/// event sequence at turn 0 with its own history.
#[derive(Clone)]
pub struct TurnController {
    client: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    hooks: Arc<HookDispatcher>,
    retry: RetryPolicy,
}

impl TurnController {
    pub fn new(client: Arc<dyn ModelClient>, tools: ToolRegistry, hooks: HookDispatcher) -> Self {
        Self {
            client,
            tools: Arc::new(tools),
            hooks: Arc::new(hooks),
            retry: RetryPolicy::none(),
        }
    }

    /// Retry transient model-call failures before treating them as fatal.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn hooks(&self) -> &HookDispatcher {
        &self.hooks
    }

    /// Start a run. No model or tool work happens until the stream is polled,
    /// and dropping the stream abandons the run.
    pub fn run(&self, request: RunRequest) -> EventStream {
        let run_id = Uuid::new_v4();
        let history = SharedHistory::new(HistoryStore::from_messages(request.history.clone()));
        let run = RunContext {
            run_id,
            client: self.client.clone(),
            tools: self.tools.clone(),
            hooks: self.hooks.clone(),
            retry: self.retry.clone(),
            history: history.clone(),
            request,
        };
        EventStream {
            run_id,
            history,
            inner: run_events(run).boxed(),
        }
    }
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("tools", &self.tools)
            .field("hooks", &self.hooks)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Ordered, finite, single-use sequence of events for one run.
pub struct EventStream {
    run_id: RunId,
    history: SharedHistory,
    inner: BoxStream<'static, AgentEvent>,
}

impl EventStream {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Current history of the run, including entries appended so far.
    pub fn history(&self) -> Vec<Message> {
        self.history.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drain the remaining events.
    pub async fn collect_events(&mut self) -> Vec<AgentEvent> {
        self.by_ref().collect().await
    }
}

impl Stream for EventStream {
    type Item = AgentEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

struct RunContext {
    run_id: RunId,
    client: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    hooks: Arc<HookDispatcher>,
    retry: RetryPolicy,
    history: SharedHistory,
    request: RunRequest,
}

fn run_events(run: RunContext) -> impl Stream<Item = AgentEvent> + Send + 'static {
    stream! {
        let RunContext {
            run_id,
            client,
            tools,
            hooks,
            retry,
            history,
            request,
        } = run;
        let cancel: CancellationToken = request.cancel.clone();
        let max_turns = request.max_turns;
        let descriptors = tools.descriptors();
        let mut state = TurnState::default();
        let mut hook_ctx = HookContext {
            turn_number: 0,
            session_id: request.session_id.clone(),
            metadata: request.metadata.clone(),
        };

        if !request.prompt.is_empty() {
            history.append(Message::user(request.prompt.as_str()));
        }
        tracing::debug!(run_id = %run_id, max_turns, tools = descriptors.len(), "helm run start");

        while !state.done && state.turn_number < max_turns {
            let turn = state.turn_number;
            if cancel.is_cancelled() {
                tracing::debug!(run_id = %run_id, turn, "helm run canceled");
                yield AgentEvent::Canceled { turn };
                return;
            }
            hook_ctx.turn_number = turn;

            yield AgentEvent::GatheringContext { turn };
            let snapshot = history.snapshot();

            let data = HookData::ModelCall { history: snapshot.clone() };
            let verdict = match unless_canceled(
                &cancel,
                hooks.evaluate(HookType::PreModelCall, &data, &hook_ctx),
            )
            .await
            {
                Some(verdict) => verdict,
                None => {
                    tracing::debug!(run_id = %run_id, turn, "helm run canceled in pre_model_call");
                    yield AgentEvent::Canceled { turn };
                    return;
                }
            };
            if let HookVerdict::Deny { reason } = verdict {
                tracing::warn!(run_id = %run_id, turn, reason = %reason, "model call denied");
                yield AgentEvent::Error {
                    tool_name: None,
                    kind: ErrorKind::PreModelCallDenied,
                    message: HelmError::PreModelCallDenied(reason).to_string(),
                };
                notify_stop(&hooks, &history, &hook_ctx, &cancel).await;
                return;
            }

            yield AgentEvent::CallingModel { turn };
            let model_request = ModelRequest {
                history: snapshot,
                system_prompt: request.system_prompt.clone(),
                tools: descriptors.clone(),
                max_tokens: request.sampling.max_tokens,
                temperature: request.sampling.temperature,
            };
            let sent = unless_canceled(
                &cancel,
                retry.execute(|| client.send(&model_request, cancel.clone())),
            )
            .await;
            let response = match sent.map(|result| result.and_then(|r| r.validate().map(|()| r))) {
                None | Some(Err(HelmError::Canceled)) => {
                    tracing::debug!(run_id = %run_id, turn, "helm run canceled");
                    yield AgentEvent::Canceled { turn };
                    return;
                }
                Some(Err(err)) => {
                    tracing::warn!(run_id = %run_id, turn, error = %err, "model call failed");
                    let message = if matches!(err, HelmError::ModelCall(_)) {
                        err.to_string()
                    } else {
                        HelmError::ModelCall(err.to_string()).to_string()
                    };
                    yield AgentEvent::Error {
                        tool_name: None,
                        kind: ErrorKind::ModelCall,
                        message,
                    };
                    notify_stop(&hooks, &history, &hook_ctx, &cancel).await;
                    return;
                }
                Some(Ok(response)) => response,
            };

            let data = HookData::ModelResponse(response.clone());
            let observed = match unless_canceled(
                &cancel,
                hooks.evaluate(HookType::PostModelCall, &data, &hook_ctx),
            )
            .await
            {
                Some(observed) => observed,
                None => {
                    tracing::debug!(run_id = %run_id, turn, "helm run canceled in post_model_call");
                    yield AgentEvent::Canceled { turn };
                    return;
                }
            };
            if let Some(reason) = observed.reason() {
                tracing::debug!(run_id = %run_id, turn, reason, "post_model_call denial not enforced");
            }

            let text = response.text_or_empty().to_string();
            if !text.is_empty() {
                yield AgentEvent::ModelResponse { text: text.clone() };
            }

            if response.has_tool_uses() {
                let mut notes = Vec::with_capacity(response.tool_uses.len());
                for call in &response.tool_uses {
                    if cancel.is_cancelled() {
                        tracing::debug!(run_id = %run_id, turn, "helm run canceled");
                        yield AgentEvent::Canceled { turn };
                        return;
                    }

                    let data = HookData::ToolUse(call.clone());
                    let verdict = match unless_canceled(
                        &cancel,
                        hooks.evaluate(HookType::PreToolUse, &data, &hook_ctx),
                    )
                    .await
                    {
                        Some(verdict) => verdict,
                        None => {
                            tracing::debug!(run_id = %run_id, turn, tool = %call.name, "helm run canceled in pre_tool_use");
                            yield AgentEvent::Canceled { turn };
                            return;
                        }
                    };
                    if let HookVerdict::Deny { reason } = verdict {
                        tracing::warn!(run_id = %run_id, turn, tool = %call.name, reason = %reason, "tool denied");
                        notes.push(denied_note(&call.name, &reason));
                        yield AgentEvent::ToolDenied {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            reason,
                        };
                        continue;
                    }

                    yield AgentEvent::ExecutingTool {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    };
                    match tools.execute_request(call, &cancel).await {
                        Ok(result) => {
                            notes.push(result_note(&call.name, &result));
                            yield AgentEvent::ToolResult {
                                id: call.id.clone(),
                                name: call.name.clone(),
                                result: result.clone(),
                            };
                            let data = HookData::ToolOutcome { request: call.clone(), result };
                            let observed = match unless_canceled(
                                &cancel,
                                hooks.evaluate(HookType::PostToolUse, &data, &hook_ctx),
                            )
                            .await
                            {
                                Some(observed) => observed,
                                None => {
                                    tracing::debug!(run_id = %run_id, turn, tool = %call.name, "helm run canceled in post_tool_use");
                                    yield AgentEvent::Canceled { turn };
                                    return;
                                }
                            };
                            if let Some(reason) = observed.reason() {
                                tracing::debug!(run_id = %run_id, turn, tool = %call.name, reason, "post_tool_use denial not enforced");
                            }
                        }
                        Err(HelmError::Canceled) => {
                            tracing::debug!(run_id = %run_id, turn, tool = %call.name, "helm run canceled");
                            yield AgentEvent::Canceled { turn };
                            return;
                        }
                        Err(err) => {
                            tracing::warn!(run_id = %run_id, turn, tool = %call.name, error = %err, "tool failed");
                            let message = err.to_string();
                            notes.push(failure_note(&call.name, &message));
                            yield AgentEvent::Error {
                                tool_name: Some(call.name.clone()),
                                kind: tool_error_kind(&err),
                                message,
                            };
                        }
                    }
                }
                history.append(Message::assistant(compose_turn_message(&text, &notes)));
            } else {
                history.append(Message::assistant(text.as_str()));
                state.done = true;
                let data = HookData::AgentStop { history: history.snapshot() };
                let verdict = match unless_canceled(
                    &cancel,
                    hooks.evaluate(HookType::PreAgentStop, &data, &hook_ctx),
                )
                .await
                {
                    Some(verdict) => verdict,
                    None => {
                        tracing::debug!(run_id = %run_id, turn, "helm run canceled in pre_agent_stop");
                        yield AgentEvent::Canceled { turn };
                        return;
                    }
                };
                if let Some(reason) = verdict.reason() {
                    tracing::debug!(run_id = %run_id, turn, reason, "pre_agent_stop denial not enforced");
                }
                tracing::debug!(run_id = %run_id, turn, "helm run completed");
                yield AgentEvent::Completed { text };
            }

            state.turn_number += 1;
            tracing::debug!(run_id = %run_id, turn, history_len = history.len(), "turn complete");
        }

        if !state.done {
            tracing::debug!(run_id = %run_id, turns = state.turn_number, "max turns reached");
            yield AgentEvent::MaxTurnsReached { turns: state.turn_number };
        }
        hook_ctx.turn_number = state.turn_number;
        notify_stop(&hooks, &history, &hook_ctx, &cancel).await;
    }
}

/// Await `future` unless `cancel` fires first.
///
/// Cancellation is checked before the future is polled, so a token that is
/// already canceled never starts the work.
async fn unless_canceled<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}

/// Run the post_agent_stop observers. The terminal event has already been
/// yielded, so a cancel here only cuts the observers short.
async fn notify_stop(
    hooks: &HookDispatcher,
    history: &SharedHistory,
    ctx: &HookContext,
    cancel: &CancellationToken,
) {
    let data = HookData::AgentStop {
        history: history.snapshot(),
    };
    match unless_canceled(cancel, hooks.evaluate(HookType::PostAgentStop, &data, ctx)).await {
        Some(observed) => {
            if let Some(reason) = observed.reason() {
                tracing::debug!(reason, "post_agent_stop denial not enforced");
            }
        }
        None => tracing::debug!("post_agent_stop canceled"),
    }
}
