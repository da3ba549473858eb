//! Core run types for the agent loop.

use std::collections::HashMap;

use bon::Builder;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::{Message, SamplingParams};

/// Unique run identifier.
pub type RunId = Uuid;

/// Default turn budget when a request does not set one.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// How a run ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    MaxTurnsReached,
    Failed,
    Canceled,
}

/// Loop position, mutated only by the turn controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnState {
    pub turn_number: usize,
    pub done: bool,
}

/// Request payload to start a run.
#[derive(Debug, Clone, Builder)]
pub struct RunRequest {
    /// User input appended to the history before the first turn.
    #[builder(into)]
    pub prompt: String,
    /// Conversation preceding `prompt`.
    #[builder(default)]
    pub history: Vec<Message>,
    #[builder(default = DEFAULT_MAX_TURNS)]
    pub max_turns: usize,
    #[builder(into)]
    pub system_prompt: Option<String>,
    #[builder(default)]
    pub sampling: SamplingParams,
    #[builder(default)]
    pub cancel: CancellationToken,
    #[builder(into)]
    pub session_id: Option<String>,
    #[builder(default)]
    pub metadata: HashMap<String, String>,
}

impl RunRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self::builder().prompt(prompt).build()
    }
}
