//! Error types for Helm.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all Helm operations.
#[derive(Error, Debug)]
pub enum HelmError {
    #[error("Model call failed: {0}")]
    ModelCall(String),

    #[error("Model call denied by pre_model_call hook: {0}")]
    PreModelCallDenied(String),

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Tool execution error in {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Canceled")]
    Canceled,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl HelmError {
    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ModelCall(_) | Self::Protocol(_) => ErrorCategory::Model,
            Self::PreModelCallDenied(_) => ErrorCategory::Policy,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::ToolNotFound(_)
            | Self::ToolExecution { .. }
            | Self::DuplicateTool(_)
            | Self::InvalidArgument(_) => ErrorCategory::Tool,
            Self::Configuration(_) | Self::TomlParse(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Canceled => ErrorCategory::Canceled,
            Self::Io(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit | ErrorCategory::Timeout
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            Self::ToolNotFound(_) | Self::DuplicateTool(_) => {
                RecoverySuggestion::CheckToolRegistration
            }
            Self::PreModelCallDenied(_) => RecoverySuggestion::ReviewHookPolicy,
            _ => match self.category() {
                ErrorCategory::RateLimit => RecoverySuggestion::RetryWithBackoff,
                ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
                ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
                ErrorCategory::Tool => RecoverySuggestion::CheckToolImplementation,
                _ => RecoverySuggestion::None,
            },
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, HelmError>;
