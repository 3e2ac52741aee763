//! Task router: clarifies incoming tasks and wraps the result in an artifact.

mod artifact;

pub use artifact::{format_artifact, format_artifact_at, FormattedArtifact, ARTIFACT_VERSION};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clarification::{
    ClarificationEngine, ClarificationOutline, ClarifyError, ClarifyOptions, Task,
};

/// Processing status reported in an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Complete,
    ClarificationNeeded,
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::ClarificationNeeded => write!(f, "clarification_needed"),
        }
    }
}

/// Standardized wrapper around a clarification outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub task_id: String,
    pub status: ArtifactStatus,
    pub artifact: ClarificationOutline,
}

impl Artifact {
    /// Wrap `outline` for `task`. The status follows `is_complete`; the id is
    /// the task's, whatever the model wrote into the outline.
    pub fn from_outline(task: &Task, outline: ClarificationOutline) -> Self {
        let status = if outline.is_complete {
            ArtifactStatus::Complete
        } else {
            ArtifactStatus::ClarificationNeeded
        };
        Self {
            task_id: task.task_id.clone(),
            status,
            artifact: outline,
        }
    }
}

/// Routes tasks to the clarification engine.
#[derive(Clone)]
pub struct TaskRouter {
    engine: ClarificationEngine,
    timeout: Option<Duration>,
}

impl TaskRouter {
    pub fn new(engine: ClarificationEngine) -> Self {
        Self {
            engine,
            timeout: None,
        }
    }

    /// Bound every clarification by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Clarify `task` and wrap the outline in an [`Artifact`].
    pub async fn process_task(&self, task: &Task) -> Result<Artifact, ClarifyError> {
        let options = ClarifyOptions {
            timeout: self.timeout,
            ..ClarifyOptions::default()
        };
        self.process_task_with(task, options).await
    }

    pub async fn process_task_with(
        &self,
        task: &Task,
        options: ClarifyOptions,
    ) -> Result<Artifact, ClarifyError> {
        tracing::debug!(task_id = %task.task_id, "Processing task: {:?}", task);
        let outline = self.engine.clarify_with(task, options).await?;
        tracing::debug!(task_id = %task.task_id, "Clarification outline: {:?}", outline);

        let artifact = Artifact::from_outline(task, outline);
        tracing::debug!(
            task_id = %task.task_id,
            status = %artifact.status,
            "Generated artifact"
        );
        Ok(artifact)
    }

    /// Process `task` and stamp the resulting artifact.
    pub async fn route(&self, task: &Task) -> Result<FormattedArtifact, ClarifyError> {
        let artifact = self.process_task(task).await?;
        Ok(format_artifact(artifact))
    }
}
