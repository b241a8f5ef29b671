//! The research agent seam.
//!
//! The research graph itself (query generation, web research, reflection,
//! answer synthesis) runs elsewhere. This module defines the [`ResearchAgent`]
//! trait that the tool layer calls, the [`AgentError`] taxonomy it maps to
//! responses, and the implementations shipped with the crate:
//!
//! - [`LangGraphAgent`]: talks to a LangGraph API server over HTTP
//! - [`MockAgent`]: programmable agent for tests
//!
//! [`LangGraphProcess`] optionally supervises a local `langgraph dev` server.

mod langgraph;
pub mod mock;
mod process;

pub use langgraph::{LangGraphAgent, PROVIDER_ERROR_KINDS};
pub use mock::MockAgent;
pub use process::LangGraphProcess;

use crate::models::{AgentInputState, AgentOutput, RunConfiguration};

/// A research agent graph that turns an input state into a final state.
///
/// `invoke` is blocking and may take minutes; callers decide which thread
/// it runs on (see [`crate::research::AgentInvoker`]).
pub trait ResearchAgent: Send + Sync + std::fmt::Debug {
    /// Short identifier for logs
    fn name(&self) -> &str;

    /// Run the graph to completion
    fn invoke(
        &self,
        input: AgentInputState,
        config: &RunConfiguration,
    ) -> Result<AgentOutput, AgentError>;
}

/// Errors that can occur when running the research agent
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    /// The model/search provider rejected a call (quota, auth, bad request, ...)
    #[error("Provider API error ({kind}): {message}")]
    Provider { kind: String, message: String },

    /// The graph run failed for a reason other than a provider error
    #[error("Agent run failed ({kind}): {message}")]
    Run { kind: String, message: String },

    /// Could not reach the agent server
    #[error("Network error: {0}")]
    Network(String),

    /// The agent server answered with a non-success status
    #[error("Agent server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The agent's final state could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid agent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl AgentError {
    /// Create a provider API error
    pub fn provider(kind: impl Into<String>, message: impl Into<String>) -> Self {
        AgentError::Provider {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The provider's message, if this is a provider API error
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            AgentError::Provider { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Parse(format!("JSON: {}", err))
    }
}
