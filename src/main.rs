use std::sync::Arc;

use cortex_a2a_adapter::api;
use cortex_a2a_adapter::llm::{ChatOptions, OpenRouterClient};
use cortex_a2a_adapter::{logging, ClarificationEngine, Config, TaskRouter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let log_path = logging::init(&config.log_dir)?;
    tracing::info!("Logging to {}", log_path.display());

    let api_key = match config.api_key.clone() {
        Some(key) => key,
        None => {
            tracing::warn!("No API_KEY or OPENROUTER_API_KEY set; LLM requests will be rejected");
            String::new()
        }
    };
    let llm = OpenRouterClient::new(api_key).with_api_url(config.llm_api_url.clone());
    tracing::info!("Using model {} via {}", config.model, llm.api_url());

    let options = ChatOptions {
        temperature: config.temperature,
        ..ChatOptions::default()
    };
    let engine = ClarificationEngine::with_llm_options(Arc::new(llm), config.model.clone(), options);
    let router = TaskRouter::new(engine).with_timeout(config.clarify_timeout);

    api::serve(config, router).await
}
