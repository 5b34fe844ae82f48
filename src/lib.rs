//! # Green Hill Cockpit
//!
//! Executive cockpit for Green Hill Canarias.
//!
//! This library provides:
//! - A registry of advisory agents (CEO digital twin, finance, strategy, ...)
//! - A dispatcher that routes a question to one agent through the completion provider
//! - The persisted governance state threaded through every prompt
//! - An append-only evidence log of orchestrator answers
//! - The HTTP orchestration API and the client front-ends use to reach it
//!
//! ## Architecture
//!
//! ```text
//!   cockpit CLI ──► OrchestrationClient ──HTTP──► api (POST /invoke)
//!                                                    │
//!                                                    ▼
//!                          StateStore ◄──────── Dispatcher ──► LlmClient (OpenAI-compatible)
//!                                                    │
//!                                                    ▼
//!                                               EvidenceLog
//! ```
//!
//! ## Modules
//! - `agents`: registry, commands and the dispatcher
//! - `llm`: completion provider trait and client
//! - `storage`: state store and evidence log
//! - `api`: axum orchestration server
//! - `orchestration`: front-end client for the orchestration server

pub mod agents;
pub mod api;
pub mod config;
pub mod llm;
pub mod orchestration;
pub mod storage;
pub mod util;

pub use agents::{DispatchRequest, DispatchResponse, Dispatcher};
pub use config::Config;
pub use storage::{DispatchState, EvidenceEntry, EvidenceLog, StateStore};
