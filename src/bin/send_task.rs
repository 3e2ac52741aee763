//! Submit a task to a running adapter and print the artifact.
//!
//! Usage: `a2a-send-task [SERVER_URL] [TASK_JSON]`
//!
//! Defaults to `http://localhost:8000` and a sample task.

use anyhow::Context;
use cortex_a2a_adapter::client::A2aClient;
use cortex_a2a_adapter::{logging, Task};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_console();

    let mut args = std::env::args().skip(1);
    let server_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8000".to_string());

    let task: Task = match args.next() {
        Some(raw) => serde_json::from_str(&raw).context("TASK_JSON is not a valid task")?,
        None => serde_json::from_value(json!({
            "task_id": uuid::Uuid::new_v4().to_string(),
            "description": "Test task for clarification?",
            "payload": {"data": "example_data"}
        }))?,
    };

    let client = A2aClient::new(server_url);
    tracing::info!("Sending task {} to {}", task.task_id, client.server_url());

    let artifact = client.send_task(&task).await?;
    println!("{}", serde_json::to_string_pretty(&artifact)?);
    Ok(())
}
