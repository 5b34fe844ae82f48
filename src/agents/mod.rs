//! Agents module - advisory personas and the dispatch contract.
//!
//! # Components
//! - **AgentRegistry**: static table of agent descriptors (prompt template + sampling)
//! - **Dispatcher**: one parameterized path that renders the prompt, calls the
//!   completion provider and normalizes the reply
//! - **Commands**: optional front-end commands that prefix the question
//!
//! # Contract
//! - Every agent takes a question plus [`DispatchState`](crate::storage::DispatchState)
//!   and returns `{answer, meta: {agent, tokens}}`
//! - Dispatch never fails; unknown agents, missing credentials and provider
//!   errors all come back as answers with `tokens == 0`
//! - `meta.agent` is the agent that actually served the request
//! - Only the orchestrator (`ghc_dt`) appends to the evidence log

mod commands;
mod dispatcher;
mod registry;

pub use commands::{apply_command, find_command, Command, COMMANDS};
pub use dispatcher::{
    DispatchRequest, DispatchResponse, Dispatcher, ResponseMeta, EMPTY_QUESTION_MESSAGE,
    ERROR_MARKER, NOT_CONFIGURED_MESSAGE,
};
pub use registry::{AgentDescriptor, AgentRegistry, RegistryError, CONTEXT_PLACEHOLDER};

/// The CEO digital twin; the only agent that writes evidence.
pub const ORCHESTRATOR_AGENT_ID: &str = "ghc_dt";

/// Pseudo-agent that lets the orchestrator pick up the question.
pub const AUTO_AGENT_ID: &str = "auto";
