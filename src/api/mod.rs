//! HTTP API for the A2A adapter.
//!
//! ## Endpoints
//! - `GET /` - liveness message
//! - `GET /agent_card` - agent card
//! - `POST /task` - clarify a task and return the formatted artifact
//! - `GET /api/health` - health check

mod routes;

pub use routes::{app, serve, serve_on, AppState, ErrorDetail};
