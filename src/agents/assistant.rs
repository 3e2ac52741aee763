//! LLM-backed assistant agent.

use std::sync::Arc;

use async_trait::async_trait;

use super::{CompletedRun, ModelRunner, RunOptions, RunResponse};
use crate::llm::{ChatMessage, ChatOptions, LlmClient};

/// An assistant with a fixed system message that answers one prompt per run.
///
/// Human input is never requested: runs asking for interactive input are
/// rejected. The returned history contains the assistant replies of the run;
/// a completion without content adds nothing, leaving the history empty.
pub struct AssistantAgent {
    name: String,
    system_message: String,
    model: String,
    llm: Arc<dyn LlmClient>,
    options: ChatOptions,
}

impl AssistantAgent {
    pub fn new(
        name: impl Into<String>,
        system_message: impl Into<String>,
        model: impl Into<String>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let agent = Self {
            name: name.into(),
            system_message: system_message.into(),
            model: model.into(),
            llm,
            options: ChatOptions::default(),
        };
        tracing::debug!(
            agent = %agent.name,
            "Initialized assistant with system message: {}",
            agent.system_message
        );
        agent
    }

    /// Override sampling options for every completion this agent makes.
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl ModelRunner for AssistantAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        prompt: &str,
        options: RunOptions,
    ) -> anyhow::Result<Box<dyn RunResponse>> {
        if options.user_input {
            anyhow::bail!(
                "agent '{}' runs without a human in the loop; interactive input is not supported",
                self.name
            );
        }

        let messages = vec![
            ChatMessage::system(self.system_message.clone()),
            ChatMessage::user(prompt),
        ];

        let response = self
            .llm
            .chat_completion_with_options(&self.model, &messages, self.options.clone())
            .await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                agent = %self.name,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion finished ({:?})",
                response.finish_reason
            );
        }

        let history = match response.content {
            Some(content) => vec![ChatMessage::assistant(content)],
            None => {
                tracing::warn!(agent = %self.name, "Completion returned no content");
                Vec::new()
            }
        };

        Ok(Box::new(CompletedRun::new(history)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatResponse, Role};
    use std::sync::Mutex;

    /// Records the conversation it receives and replies with a fixed content.
    struct RecordingLlm {
        reply: Option<String>,
        seen: Mutex<Vec<(String, Vec<ChatMessage>)>>,
        temperatures: Mutex<Vec<Option<f64>>>,
    }

    impl RecordingLlm {
        fn new(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                seen: Mutex::new(Vec::new()),
                temperatures: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn chat_completion(
            &self,
            model: &str,
            messages: &[ChatMessage],
        ) -> anyhow::Result<ChatResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((model.to_string(), messages.to_vec()));
            Ok(ChatResponse {
                content: self.reply.clone(),
                finish_reason: Some("stop".to_string()),
                usage: None,
                model: Some(model.to_string()),
            })
        }

        async fn chat_completion_with_options(
            &self,
            model: &str,
            messages: &[ChatMessage],
            options: ChatOptions,
        ) -> anyhow::Result<ChatResponse> {
            self.temperatures.lock().unwrap().push(options.temperature);
            self.chat_completion(model, messages).await
        }
    }

    #[tokio::test]
    async fn test_run_sends_system_and_user_messages() {
        let llm = Arc::new(RecordingLlm::new(Some("{}")));
        let agent = AssistantAgent::new("clarifier", "be precise", "test-model", llm.clone());

        let run = agent.run("hello", RunOptions::automated()).await.unwrap();
        let history = run.messages().await.unwrap();

        assert_eq!(history, vec![ChatMessage::assistant("{}")]);

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (model, messages) = &seen[0];
        assert_eq!(model, "test-model");
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].text_content(), Some("be precise"));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].text_content(), Some("hello"));
    }

    #[tokio::test]
    async fn test_run_without_content_has_empty_history() {
        let agent = AssistantAgent::new("a", "sys", "m", Arc::new(RecordingLlm::new(None)));
        let run = agent.run("hello", RunOptions::automated()).await.unwrap();
        assert!(run.messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_rejects_interactive_input() {
        let llm = Arc::new(RecordingLlm::new(Some("{}")));
        let agent = AssistantAgent::new("a", "sys", "m", llm.clone());

        let result = agent.run("hello", RunOptions { user_input: true }).await;
        assert!(result.is_err());
        assert!(llm.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_uses_configured_options() {
        let llm = Arc::new(RecordingLlm::new(Some("{}")));
        let agent = AssistantAgent::new("a", "sys", "m", llm.clone()).with_options(ChatOptions {
            temperature: Some(0.0),
            ..ChatOptions::default()
        });

        agent.run("hello", RunOptions::automated()).await.unwrap();
        agent.run("again", RunOptions::automated()).await.unwrap();
        assert_eq!(*llm.temperatures.lock().unwrap(), vec![Some(0.0), Some(0.0)]);
    }
}
