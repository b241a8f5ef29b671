//! Request adaptation and agent invocation.
//!
//! A `deep_search` call flows through here: the effort level is resolved to a
//! preset, [`prepare_input_state`] builds the agent's input state, and
//! [`AgentInvoker`] runs the agent and turns whatever happens into a
//! [`crate::models::ToolResponse`].

mod invoker;

pub use invoker::{AgentInvoker, ExecutionMode, WorkerPool};

use crate::models::{AgentInputState, EffortSettings};

/// Build the agent input state for one query
///
/// The state carries a single user message; the accumulators the graph
/// fills while it runs start empty.
pub fn prepare_input_state(query: &str, settings: &EffortSettings) -> AgentInputState {
    AgentInputState::new(query, settings)
}
