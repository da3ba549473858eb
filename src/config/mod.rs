//! Configuration system (layered: code > env > config file).

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use std::sync::Arc;

use crate::agent_loop::{RunRequest, TurnController, DEFAULT_MAX_TURNS};
use crate::error::HelmError;
use crate::hooks::HookDispatcher;
use crate::provider::ModelClient;
use crate::tools::ToolRegistry;
use crate::types::SamplingParams;
use crate::util::retry::RetryPolicy;

/// Run defaults shared by every controller built from this config.
///
/// Resolution order:
/// 1. Values set in code after loading
/// 2. `HELM_*` environment variables (and `.env`)
/// 3. `~/.helm/config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelmConfig {
    pub max_turns: usize,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    /// Per-tool execution limit in milliseconds.
    pub tool_timeout_ms: Option<u64>,
    /// Extra attempts for transient model-call failures.
    pub model_retries: u32,
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            tool_timeout_ms: None,
            model_retries: 0,
        }
    }
}

impl HelmConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, HelmError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HelmError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, HelmError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// `~/.helm/config.toml`
    pub fn default_path() -> PathBuf {
        default_helm_dir().join("config.toml")
    }

    /// Default config file overlaid with environment variables.
    pub fn from_env() -> Result<Self, HelmError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::load_or_default(Self::default_path())?.merge_env()
    }

    /// Overlay `HELM_*` environment variables.
    pub fn merge_env(self) -> Result<Self, HelmError> {
        self.merge_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup using the `HELM_*` names.
    pub fn merge_from<F>(mut self, lookup: F) -> Result<Self, HelmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("HELM_MAX_TURNS") {
            self.max_turns = parse_var("HELM_MAX_TURNS", &value)?;
        }
        if let Some(value) = lookup("HELM_SYSTEM_PROMPT") {
            self.system_prompt = Some(value);
        }
        if let Some(value) = lookup("HELM_MAX_TOKENS") {
            self.max_tokens = Some(parse_var("HELM_MAX_TOKENS", &value)?);
        }
        if let Some(value) = lookup("HELM_TEMPERATURE") {
            self.temperature = Some(parse_var("HELM_TEMPERATURE", &value)?);
        }
        if let Some(value) = lookup("HELM_TOOL_TIMEOUT_MS") {
            self.tool_timeout_ms = Some(parse_var("HELM_TOOL_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = lookup("HELM_MODEL_RETRIES") {
            self.model_retries = parse_var("HELM_MODEL_RETRIES", &value)?;
        }
        Ok(self)
    }

    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Limit from `tool_timeout_ms`; enforced through [`HelmConfig::apply_to`].
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_ms.map(Duration::from_millis)
    }

    /// Bound `registry` by the configured tool timeout. A registry keeps its
    /// own limit when the config sets none.
    pub fn apply_to(&self, registry: ToolRegistry) -> ToolRegistry {
        match self.tool_timeout() {
            Some(limit) => registry.with_timeout(limit),
            None => registry,
        }
    }

    /// A controller with the configured tool timeout and model retries.
    pub fn controller(
        &self,
        client: Arc<dyn ModelClient>,
        tools: ToolRegistry,
        hooks: HookDispatcher,
    ) -> TurnController {
        TurnController::new(client, self.apply_to(tools), hooks)
            .with_retry_policy(self.retry_policy())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.model_retries.saturating_add(1))
    }

    /// A run request for `prompt` carrying this config's defaults.
    pub fn run_request(&self, prompt: impl Into<String>) -> RunRequest {
        RunRequest::builder()
            .prompt(prompt)
            .max_turns(self.max_turns)
            .maybe_system_prompt(self.system_prompt.clone())
            .sampling(self.sampling())
            .build()
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, HelmError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| HelmError::Configuration(format!("invalid {key} '{value}': {e}")))
}

fn default_helm_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".helm"))
        .unwrap_or_else(|| PathBuf::from(".helm"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_are_single_attempt_with_ten_turns() {
        let config = HelmConfig::default();
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.retry_policy().max_attempts, 1);
        assert!(config.tool_timeout().is_none());
    }

    #[test]
    fn parses_partial_toml() {
        let config = HelmConfig::from_toml_str(
            r#"
            max_turns = 4
            system_prompt = "be brief"
            temperature = 0.2
            "#,
        )
        .expect("parse");
        assert_eq!(config.max_turns, 4);
        assert_eq!(config.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(config.sampling().temperature, Some(0.2));
        assert_eq!(config.max_tokens, None);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = HelmConfig::from_toml_str("max_turns = \"many\"").expect_err("bad type");
        assert!(matches!(err, HelmError::TomlParse(_)));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = TempDir::new().expect("tempdir");
        let config =
            HelmConfig::load_or_default(dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(config, HelmConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_turns = 2\ntool_timeout_ms = 1500\n").expect("write");

        let config = HelmConfig::load(&path).expect("load");
        assert_eq!(config.max_turns, 2);
        assert_eq!(config.tool_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn env_overrides_file_values() {
        let base = HelmConfig::from_toml_str("max_turns = 2\nmodel_retries = 1").expect("parse");
        let config = base
            .merge_from(lookup(&[
                ("HELM_MAX_TURNS", "7"),
                ("HELM_MAX_TOKENS", "256"),
                ("HELM_SYSTEM_PROMPT", "You are terse."),
            ]))
            .expect("merge");

        assert_eq!(config.max_turns, 7);
        assert_eq!(config.max_tokens, Some(256));
        assert_eq!(config.system_prompt.as_deref(), Some("You are terse."));
        assert_eq!(config.retry_policy().max_attempts, 2);
    }

    #[test]
    fn invalid_env_value_is_a_configuration_error() {
        let err = HelmConfig::default()
            .merge_from(lookup(&[("HELM_TEMPERATURE", "warm")]))
            .expect_err("not a float");
        assert!(matches!(err, HelmError::Configuration(msg) if msg.contains("HELM_TEMPERATURE")));
    }

    #[test]
    fn apply_to_bounds_the_registry() {
        let config = HelmConfig {
            tool_timeout_ms: Some(250),
            ..HelmConfig::default()
        };
        let registry = config.apply_to(ToolRegistry::new());
        assert_eq!(registry.timeout(), Some(Duration::from_millis(250)));

        let keeps = HelmConfig::default()
            .apply_to(ToolRegistry::new().with_timeout(Duration::from_secs(1)));
        assert_eq!(keeps.timeout(), Some(Duration::from_secs(1)));
        assert_eq!(HelmConfig::default().apply_to(ToolRegistry::new()).timeout(), None);
    }

    #[test]
    fn run_request_carries_defaults() {
        let config = HelmConfig {
            max_turns: 3,
            system_prompt: Some("sys".into()),
            max_tokens: Some(64),
            ..HelmConfig::default()
        };
        let request = config.run_request("hello");
        assert_eq!(request.prompt, "hello");
        assert_eq!(request.max_turns, 3);
        assert_eq!(request.system_prompt.as_deref(), Some("sys"));
        assert_eq!(request.sampling.max_tokens, Some(64));
        assert!(request.history.is_empty());
    }
}
