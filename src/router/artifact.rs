//! Artifact formatting: adds a UTC timestamp and the protocol version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Artifact;

pub const ARTIFACT_VERSION: &str = "1.0";

/// An [`Artifact`] as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedArtifact {
    #[serde(flatten)]
    pub artifact: Artifact,
    /// ISO-8601 UTC time with a trailing `Z`.
    pub timestamp: String,
    pub version: String,
}

/// Stamp `artifact` with the current time.
pub fn format_artifact(artifact: Artifact) -> FormattedArtifact {
    format_artifact_at(artifact, Utc::now())
}

pub fn format_artifact_at(artifact: Artifact, now: DateTime<Utc>) -> FormattedArtifact {
    let formatted = FormattedArtifact {
        artifact,
        timestamp: now.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
        version: ARTIFACT_VERSION.to_string(),
    };
    tracing::debug!(
        task_id = %formatted.artifact.task_id,
        "Formatted artifact at {}",
        formatted.timestamp
    );
    formatted
}
