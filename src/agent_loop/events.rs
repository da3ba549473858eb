//! Progress events emitted by a run.

use serde::{Deserialize, Serialize};
use strum::Display;

use super::types::RunStatus;

/// Classification carried by [`AgentEvent::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The model client failed; the run ends.
    ModelCall,
    /// A `pre_model_call` hook denied the turn; the run ends.
    PreModelCallDenied,
    /// The model requested an unregistered tool; the run continues.
    ToolNotFound,
    /// A tool failed; the run continues.
    ToolExecution,
}

impl ErrorKind {
    /// Whether an error of this kind terminates the run.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::ModelCall | Self::PreModelCallDenied)
    }
}

/// One observable step of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    GatheringContext {
        turn: usize,
    },
    CallingModel {
        turn: usize,
    },
    ModelResponse {
        text: String,
    },
    ExecutingTool {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    ToolResult {
        id: String,
        name: String,
        result: serde_json::Value,
    },
    ToolDenied {
        id: String,
        name: String,
        reason: String,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        kind: ErrorKind,
        message: String,
    },
    Completed {
        text: String,
    },
    MaxTurnsReached {
        turns: usize,
    },
    Canceled {
        turn: usize,
    },
}

impl AgentEvent {
    /// Status of the run when this event ends it; `None` for progress events.
    pub fn terminal_status(&self) -> Option<RunStatus> {
        match self {
            Self::Completed { .. } => Some(RunStatus::Completed),
            Self::MaxTurnsReached { .. } => Some(RunStatus::MaxTurnsReached),
            Self::Error { kind, .. } if kind.is_fatal() => Some(RunStatus::Failed),
            Self::Canceled { .. } => Some(RunStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_status().is_some()
    }
}
