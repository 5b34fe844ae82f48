//! HTTP orchestration API for the cockpit.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (also at `/api/health`)
//! - `POST /invoke` - Route a question to an agent: `{question, command, agent, state}`
//! - `GET /api/agents` - List agents in display order
//! - `GET /api/commands` - List optional commands
//! - `GET /api/state` - Read the governance state
//! - `PUT /api/state` - Overwrite the governance state
//! - `GET /api/evidence?limit=N` - Recent evidence entries, newest first
//! - `GET /api/diagnostics` - Provider reachability and masked configuration

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
