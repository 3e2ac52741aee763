//! Runner that replays a fixed message history.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CompletedRun, ModelRunner, RunOptions, RunResponse};
use crate::llm::ChatMessage;

enum Script {
    History(Vec<ChatMessage>),
    Fail(String),
}

/// Deterministic [`ModelRunner`] for tests and offline demos.
///
/// Every run returns the same scripted history (or error), optionally after
/// a delay. Prompts and options of each run are recorded.
pub struct ScriptedRunner {
    script: Script,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, RunOptions)>>,
}

impl ScriptedRunner {
    /// Runner whose history is a single assistant message with `content`.
    pub fn replying(content: impl Into<String>) -> Self {
        Self::with_history(vec![ChatMessage::assistant(content)])
    }

    pub fn with_history(history: Vec<ChatMessage>) -> Self {
        Self {
            script: Script::History(history),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Runner that produces an empty history.
    pub fn silent() -> Self {
        Self::with_history(Vec::new())
    }

    /// Runner whose every run fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Script::Fail(message.into()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Wait `delay` before answering each run.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts and options seen so far, in call order.
    pub fn calls(&self) -> Vec<(String, RunOptions)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelRunner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(
        &self,
        prompt: &str,
        options: RunOptions,
    ) -> anyhow::Result<Box<dyn RunResponse>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((prompt.to_string(), options));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.script {
            Script::History(history) => Ok(Box::new(CompletedRun::new(history.clone()))),
            Script::Fail(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}
