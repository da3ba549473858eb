//! Helm: turn-based agent control loop.
//!
//! Repeatedly asks a language model for the next step, executes the tools it
//! requests, evaluates allow/deny hooks around every model and tool call, and
//! reports progress as an ordered, pull-driven stream of [`AgentEvent`]s.
//!
//! Model backends and tools are supplied by the caller through the
//! [`ModelClient`](provider::ModelClient) and [`Tool`](tools::Tool) traits.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use helm::prelude::*;
//!
//! # async fn example(client: Arc<dyn ModelClient>) -> helm::error::Result<()> {
//! let config = HelmConfig::from_env()?;
//! let controller = TurnController::new(client, ToolRegistry::new(), HookDispatcher::new())
//!     .with_retry_policy(config.retry_policy());
//!
//! let mut events = controller.run(config.run_request("What's 15 + 27?"));
//! while let Some(event) = events.next().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`AgentEvent`]: agent_loop::AgentEvent

pub mod agent_loop;
pub mod config;
pub mod error;
pub mod history;
pub mod hooks;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;
