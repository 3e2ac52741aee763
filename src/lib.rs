//! # CortexMesh A2A Adapter
//!
//! Receives A2A tasks over HTTP, asks an LLM agent whether each task carries
//! enough information to proceed, and returns the verdict as a standardized
//! artifact.
//!
//! ## Task Flow
//! 1. Receive task via `POST /task`
//! 2. Build the clarification prompt
//! 3. Run it through the clarifier agent
//! 4. Parse and validate the JSON outline
//! 5. Wrap, timestamp and return the artifact
//!
//! ## Modules
//! - `clarification`: prompt builder and clarification engine
//! - `agents`: model runner capability and the LLM-backed assistant
//! - `llm`: LLM client trait and OpenRouter implementation
//! - `router`: task router and artifact formatting
//! - `api`: HTTP server
//! - `client`: outbound A2A client
//! - `card`: agent card

pub mod agents;
pub mod api;
pub mod card;
pub mod clarification;
pub mod client;
pub mod config;
pub mod llm;
pub mod logging;
pub mod router;

pub use clarification::{ClarificationEngine, ClarificationOutline, ClarifyError, Task};
pub use config::Config;
pub use router::{Artifact, ArtifactStatus, FormattedArtifact, TaskRouter};
