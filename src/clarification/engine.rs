//! Clarification engine: runs the prompt through a model and validates the answer.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::prompt::{build_prompt, CLARIFIER_SYSTEM_MESSAGE};
use super::{ClarificationOutline, ClarifyError, ClarifyStage, Task};
use crate::agents::{AssistantAgent, RunOptions, RunnerRef};
use crate::llm::{ChatMessage, ChatOptions, LlmClient};

/// Deadline and cancellation for one clarification.
#[derive(Debug, Clone, Default)]
pub struct ClarifyOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl ClarifyOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Produces a [`ClarificationOutline`] per task from a model runner.
///
/// Holds no per-task state, so one engine can serve concurrent requests.
#[derive(Clone)]
pub struct ClarificationEngine {
    runner: RunnerRef,
}

impl ClarificationEngine {
    pub fn new(runner: RunnerRef) -> Self {
        Self { runner }
    }

    /// Engine backed by an [`AssistantAgent`] named `task_clarifier`.
    pub fn with_llm(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self::with_llm_options(llm, model, ChatOptions::default())
    }

    /// Like [`with_llm`](Self::with_llm), sampling every completion with `options`.
    pub fn with_llm_options(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        options: ChatOptions,
    ) -> Self {
        let agent = AssistantAgent::new("task_clarifier", CLARIFIER_SYSTEM_MESSAGE, model, llm)
            .with_options(options);
        Self::new(Arc::new(agent))
    }

    /// Clarify `task` with no deadline.
    pub async fn clarify(&self, task: &Task) -> Result<ClarificationOutline, ClarifyError> {
        self.clarify_with(task, ClarifyOptions::default()).await
    }

    /// Clarify `task`, giving up on timeout or when the token is cancelled.
    pub async fn clarify_with(
        &self,
        task: &Task,
        options: ClarifyOptions,
    ) -> Result<ClarificationOutline, ClarifyError> {
        let ClarifyOptions { timeout, cancel } = options;
        let attempt = self.attempt(task);

        let bounded = async move {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(ClarifyError::TimedOut(limit)),
                },
                None => attempt.await,
            }
        };

        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ClarifyError::Cancelled),
                    result = bounded => result,
                }
            }
            None => bounded.await,
        };

        if let Err(e) = &result {
            tracing::error!(task_id = %task.task_id, "Clarification failed: {}", e);
        }
        result
    }

    async fn attempt(&self, task: &Task) -> Result<ClarificationOutline, ClarifyError> {
        tracing::debug!(
            task_id = %task.task_id,
            stage = %ClarifyStage::Prompting,
            "Received task for clarification: {:?}",
            task
        );
        let prompt = build_prompt(task);

        tracing::debug!(
            task_id = %task.task_id,
            stage = %ClarifyStage::AwaitingModel,
            runner = self.runner.name(),
            "Sending prompt to LLM: {}",
            prompt
        );
        let response = self
            .runner
            .run(&prompt, RunOptions::automated())
            .await
            .map_err(ClarifyError::Model)?;
        let messages = response.messages().await.map_err(|e| {
            tracing::error!(
                task_id = %task.task_id,
                stage = %ClarifyStage::AwaitingModel,
                "Error retrieving message history: {}",
                e
            );
            ClarifyError::Model(e)
        })?;

        let raw = last_message_content(&messages)?;
        tracing::debug!(
            task_id = %task.task_id,
            stage = %ClarifyStage::ExtractingMessage,
            "Raw LLM output extracted from message history: {}",
            raw
        );

        let outline = parse_outline(raw).map_err(|e| {
            tracing::error!(
                task_id = %task.task_id,
                stage = %ClarifyStage::ParsingJson,
                "{}",
                e
            );
            e
        })?;
        check_outline(task, &outline);
        tracing::debug!(
            task_id = %task.task_id,
            stage = %ClarifyStage::Done,
            "Parsed LLM response: {:?}",
            outline
        );
        Ok(outline)
    }
}

/// Content of the final message in `history`. A message without content
/// yields the empty string, which then fails JSON parsing.
fn last_message_content(history: &[ChatMessage]) -> Result<String, ClarifyError> {
    let last = history.last().ok_or(ClarifyError::EmptyResponse)?;
    Ok(last.text_content().unwrap_or_default().to_string())
}

/// Parse `raw` as JSON, then as a clarification outline.
fn parse_outline(raw: String) -> Result<ClarificationOutline, ClarifyError> {
    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(source) => return Err(ClarifyError::MalformedOutput { raw, source }),
    };

    if !value.is_object() {
        return Err(ClarifyError::SchemaViolation {
            raw,
            reason: "expected a JSON object".to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| ClarifyError::SchemaViolation {
        raw,
        reason: e.to_string(),
    })
}

/// Log deviations the model was asked to avoid but that do not invalidate
/// the outline.
fn check_outline(task: &Task, outline: &ClarificationOutline) {
    if outline.task_id != task.task_id {
        tracing::warn!(
            task_id = %task.task_id,
            "Outline refers to task '{}'",
            outline.task_id
        );
    }
    if !outline.is_consistent() {
        tracing::warn!(
            task_id = %task.task_id,
            is_complete = outline.is_complete,
            points = outline.clarification_points.len(),
            "Outline completeness disagrees with its clarification points"
        );
    }
}
