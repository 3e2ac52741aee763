//! Agent card describing this adapter to the A2A ecosystem.

use serde::{Deserialize, Serialize};

pub const AGENT_NAME: &str = "CortexMesh-A2A-Agent";
pub const AGENT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEndpoints {
    pub task_endpoint: String,
    pub agent_card_endpoint: String,
}

/// Agent metadata served at `/agent_card`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCard {
    pub agent_name: String,
    pub version: String,
    pub capabilities: Vec<String>,
    pub endpoints: AgentEndpoints,
    pub contact: String,
    pub license: String,
}

/// Build the card for an adapter reachable at `base_url`.
pub fn generate_agent_card(base_url: &str) -> AgentCard {
    let base = base_url.trim_end_matches('/');
    AgentCard {
        agent_name: AGENT_NAME.to_string(),
        version: AGENT_VERSION.to_string(),
        capabilities: vec![
            "task_processing".to_string(),
            "artifact_generation".to_string(),
        ],
        endpoints: AgentEndpoints {
            task_endpoint: format!("{}/task", base),
            agent_card_endpoint: format!("{}/agent_card", base),
        },
        contact: "support@cortexmesh.io".to_string(),
        license: "Apache-2.0".to_string(),
    }
}
