//! Outbound A2A client for submitting tasks to an adapter server.

use reqwest::Client;
use thiserror::Error;

use crate::card::AgentCard;
use crate::clarification::Task;
use crate::router::FormattedArtifact;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// HTTP client for an A2A adapter server.
#[derive(Debug, Clone)]
pub struct A2aClient {
    client: Client,
    server_url: String,
}

impl A2aClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(client: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { client, server_url }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.server_url, path.trim_start_matches('/'))
    }

    /// POST `task` to `/task` and return the formatted artifact.
    pub async fn send_task(&self, task: &Task) -> Result<FormattedArtifact, ClientError> {
        let url = self.endpoint("task");
        tracing::debug!("Sending task {} to {}", task.task_id, url);

        let response = self
            .client
            .post(&url)
            .json(task)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let artifact: FormattedArtifact = Self::decode(url, response).await?;
        tracing::debug!(
            "Received artifact for task {} with status {}",
            artifact.artifact.task_id,
            artifact.artifact.status
        );
        Ok(artifact)
    }

    /// GET `/agent_card`.
    pub async fn agent_card(&self) -> Result<AgentCard, ClientError> {
        let url = self.endpoint("agent_card");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        Self::decode(url, response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        url: String,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(ClientError::Status { url, status, body });
        }

        serde_json::from_str(&body).map_err(|source| ClientError::Decode { url, source })
    }
}
