//! Model client contract.
//!
//! Concrete providers live outside this crate; the turn controller only
//! talks to them through [`ModelClient`].

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::HelmError;
use crate::tools::ToolDescriptor;
use crate::types::{Message, ToolInvocationRequest};

/// A request sent to a model client.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub history: Vec<Message>,
    pub system_prompt: Option<String>,
    pub tools: Vec<ToolDescriptor>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Response from a model client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub tool_uses: Vec<ToolInvocationRequest>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl ModelResponse {
    /// A final text answer with no tool requests.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_uses: Vec::new(),
            is_complete: true,
            stop_reason: Some("end_turn".to_string()),
        }
    }

    /// A response requesting the given tools, without accompanying text.
    pub fn tool_uses(tool_uses: Vec<ToolInvocationRequest>) -> Self {
        Self {
            text: None,
            tool_uses,
            is_complete: false,
            stop_reason: Some("tool_use".to_string()),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Response text, or `""` when the model sent none.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn has_tool_uses(&self) -> bool {
        !self.tool_uses.is_empty()
    }

    /// Reject responses whose tool-use ids are not unique.
    pub fn validate(&self) -> Result<(), HelmError> {
        let mut seen = HashSet::with_capacity(self.tool_uses.len());
        for request in &self.tool_uses {
            if !seen.insert(request.id.as_str()) {
                return Err(HelmError::Protocol(format!(
                    "duplicate tool use id '{}' in model response",
                    request.id
                )));
            }
        }
        Ok(())
    }
}

/// Contract implemented by every model backend.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the conversation and return the model's next step.
    ///
    /// Transient failures should surface as [`HelmError::RateLimited`] or
    /// [`HelmError::Timeout`] so a retry policy can pick them up.
    async fn send(
        &self,
        request: &ModelRequest,
        cancel: CancellationToken,
    ) -> Result<ModelResponse, HelmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_rejects_duplicate_ids() {
        let response = ModelResponse::tool_uses(vec![
            ToolInvocationRequest::new("a", "calc", json!({})),
            ToolInvocationRequest::new("a", "calc", json!({})),
        ]);
        let err = response.validate().expect_err("duplicate ids");
        assert!(matches!(err, HelmError::Protocol(msg) if msg.contains("'a'")));
    }

    #[test]
    fn validate_accepts_distinct_ids() {
        let response = ModelResponse::tool_uses(vec![
            ToolInvocationRequest::new("a", "calc", json!({})),
            ToolInvocationRequest::new("b", "calc", json!({})),
        ]);
        assert!(response.validate().is_ok());
        assert!(response.has_tool_uses());
        assert_eq!(response.text_or_empty(), "");
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let response: ModelResponse =
            serde_json::from_value(json!({ "text": "hi" })).expect("deserialize");
        assert_eq!(response.text_or_empty(), "hi");
        assert!(!response.has_tool_uses());
        assert!(!response.is_complete);
    }
}
