//! Task clarification protocol.
//!
//! A task is turned into a fixed-format prompt ([`prompt`]), run through a
//! [`ModelRunner`](crate::agents::ModelRunner), and the last message of the
//! run is parsed into a [`ClarificationOutline`] by the [`engine`].
//!
//! ```text
//! Prompting -> AwaitingModel -> ExtractingMessage -> ParsingJson -> Done
//!                   |                  |                  |
//!                   +------------------+------------------+--> Failed
//! ```
//!
//! Every failure aborts the attempt; nothing is retried here.

pub mod engine;
pub mod prompt;

pub use engine::{ClarificationEngine, ClarifyOptions};
pub use prompt::{build_prompt, CLARIFIER_SYSTEM_MESSAGE};

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A unit of work submitted for clarification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub description: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Task {
    pub fn new(
        task_id: impl Into<String>,
        description: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            description: description.into(),
            payload,
        }
    }
}

/// The model's judgment of whether a task can proceed as stated.
///
/// `clarification_points` is expected to be empty exactly when
/// `is_complete` is true. That is asked of the model, not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationOutline {
    pub task_id: String,
    pub is_complete: bool,
    pub clarification_points: Vec<String>,
}

impl ClarificationOutline {
    /// Whether the outline honors the complete-iff-no-points rule.
    pub fn is_consistent(&self) -> bool {
        self.is_complete == self.clarification_points.is_empty()
    }
}

/// Step of a clarification attempt, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarifyStage {
    Prompting,
    AwaitingModel,
    ExtractingMessage,
    ParsingJson,
    Done,
}

impl fmt::Display for ClarifyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prompting => write!(f, "prompting"),
            Self::AwaitingModel => write!(f, "awaiting_model"),
            Self::ExtractingMessage => write!(f, "extracting_message"),
            Self::ParsingJson => write!(f, "parsing_json"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Why a clarification attempt failed.
#[derive(Debug, Error)]
pub enum ClarifyError {
    /// The run finished with an empty message history.
    #[error("LLM returned an empty messages list")]
    EmptyResponse,

    /// The last message is not JSON. `raw` is the exact content received.
    #[error("failed to decode LLM output as JSON ({source}); received: {raw}")]
    MalformedOutput {
        raw: String,
        source: serde_json::Error,
    },

    /// The last message is JSON but not a clarification outline.
    #[error("LLM output does not match the clarification outline schema ({reason}); received: {raw}")]
    SchemaViolation { raw: String, reason: String },

    /// The runner itself failed before producing a history.
    #[error("model run failed: {0}")]
    Model(anyhow::Error),

    #[error("clarification timed out after {0:?}")]
    TimedOut(Duration),

    #[error("clarification was cancelled")]
    Cancelled,
}

impl ClarifyError {
    /// Raw model output attached to the error, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::MalformedOutput { raw, .. } | Self::SchemaViolation { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_payload_defaults_to_empty() {
        let task: Task =
            serde_json::from_value(json!({"task_id": "t1", "description": "Analyze data?"}))
                .unwrap();
        assert!(task.payload.is_empty());
    }

    #[test]
    fn test_outline_consistency() {
        let complete = ClarificationOutline {
            task_id: "t".into(),
            is_complete: true,
            clarification_points: vec![],
        };
        assert!(complete.is_consistent());

        let contradictory = ClarificationOutline {
            task_id: "t".into(),
            is_complete: true,
            clarification_points: vec!["what file?".into()],
        };
        assert!(!contradictory.is_consistent());
    }

    #[test]
    fn test_raw_output_is_exposed() {
        let source = serde_json::from_str::<Value>("nope").unwrap_err();
        let err = ClarifyError::MalformedOutput {
            raw: "nope".into(),
            source,
        };
        assert_eq!(err.raw_output(), Some("nope"));
        assert!(ClarifyError::EmptyResponse.raw_output().is_none());
    }
}
