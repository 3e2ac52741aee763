//! Prompt construction for task clarification.
//!
//! The output template below is the contract with the model: the engine's
//! parser expects exactly these field names, bare `true`/`false` booleans,
//! and a JSON array of strings.

use serde_json::Value;

use super::Task;

/// System message of the clarifier agent.
pub const CLARIFIER_SYSTEM_MESSAGE: &str = "You are a task clarification agent. Analyze the incoming task and output a JSON-formatted outline that \
includes 'task_id', a boolean 'is_complete', and a list 'clarification_points'. \
If the task's payload is missing or the description is ambiguous, mark 'is_complete' as false and include \
appropriate messages; otherwise, mark it as true.";

const OUTPUT_TEMPLATE: &str = r#"{ "task_id": "<task_id>", "is_complete": true/false, "clarification_points": ["message1", "message2"] }"#;

const DECISION_RULE: &str = "If the payload is missing or the description is ambiguous, set is_complete to false and include clarification messages; \
otherwise, set is_complete to true with an empty clarification_points array.";

/// Build the clarification prompt for `task`.
///
/// The payload is rendered as compact JSON with keys in sorted order, so the
/// same task always yields the same bytes.
pub fn build_prompt(task: &Task) -> String {
    let payload = Value::Object(task.payload.clone());
    format!(
        "Analyze the task and generate a JSON output in the following format:\n\n\
         {OUTPUT_TEMPLATE}\n\n\
         Task Details:\n\
         Task ID: {}\n\
         Description: {}\n\
         Payload: {}\n\n\
         {DECISION_RULE}",
        task.task_id, task.description, payload
    )
}
