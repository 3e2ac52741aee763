//! Agents that turn a prompt into a message history.
//!
//! The clarification engine only depends on [`ModelRunner`]: something that
//! accepts a prompt, runs it to completion asynchronously, and hands back a
//! [`RunResponse`] whose history can itself be awaited. [`AssistantAgent`]
//! is the concrete implementation backed by an [`LlmClient`](crate::llm::LlmClient);
//! [`ScriptedRunner`] replays a fixed history and is used by tests and demos.

mod assistant;
mod scripted;

pub use assistant::AssistantAgent;
pub use scripted::ScriptedRunner;

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::ChatMessage;

/// Per-run options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Allow the run to pause for interactive human input.
    pub user_input: bool,
}

impl RunOptions {
    /// Fully automated run, never interrupted for human input.
    pub fn automated() -> Self {
        Self { user_input: false }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::automated()
    }
}

/// Outcome of a single agent run.
#[async_trait]
pub trait RunResponse: Send + Sync {
    /// Message history produced by the run, oldest first.
    async fn messages(&self) -> anyhow::Result<Vec<ChatMessage>>;
}

/// Capability for asynchronous prompt-in / message-history-out execution.
#[async_trait]
pub trait ModelRunner: Send + Sync {
    /// Human-readable runner name, used in logs.
    fn name(&self) -> &str;

    async fn run(&self, prompt: &str, options: RunOptions)
        -> anyhow::Result<Box<dyn RunResponse>>;
}

/// Shared reference to a runner.
pub type RunnerRef = Arc<dyn ModelRunner>;

/// A run whose history is already fully materialized.
#[derive(Debug, Clone, Default)]
pub struct CompletedRun {
    history: Vec<ChatMessage>,
}

impl CompletedRun {
    pub fn new(history: Vec<ChatMessage>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl RunResponse for CompletedRun {
    async fn messages(&self) -> anyhow::Result<Vec<ChatMessage>> {
        Ok(self.history.clone())
    }
}
