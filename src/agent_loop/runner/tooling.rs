//! Tool-phase helpers: error classification and history notes.

use crate::error::HelmError;

use super::super::events::ErrorKind;

pub(super) fn tool_error_kind(error: &HelmError) -> ErrorKind {
    match error {
        HelmError::ToolNotFound(_) => ErrorKind::ToolNotFound,
        _ => ErrorKind::ToolExecution,
    }
}

pub(super) fn denied_note(name: &str, reason: &str) -> String {
    format!("Tool '{name}' was denied: {reason}")
}

pub(super) fn failure_note(name: &str, message: &str) -> String {
    format!("Tool '{name}' failed: {message}")
}

pub(super) fn result_note(name: &str, result: &serde_json::Value) -> String {
    match result {
        serde_json::Value::String(text) => format!("Tool '{name}' returned: {text}"),
        other => format!("Tool '{name}' returned: {other}"),
    }
}

/// Assistant message recorded for a tool-bearing turn: the response text
/// (if any) followed by one note per requested tool, newline separated.
pub(super) fn compose_turn_message(text: &str, notes: &[String]) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(notes.len() + 1);
    if !text.is_empty() {
        parts.push(text);
    }
    parts.extend(notes.iter().map(String::as_str));
    parts.join("\n")
}
