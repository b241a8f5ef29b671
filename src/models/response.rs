//! The `deep_search` tool result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state::AgentOutput;

/// Answer returned for any failure that is not a provider API error
pub const UNEXPECTED_ERROR_ANSWER: &str =
    "An unexpected error occurred during the search process. Please check logs for details.";

/// Result of a `deep_search` call
///
/// Always carries both fields: failures produce an explanatory answer
/// and an empty source list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub answer: String,
    pub sources: Vec<Value>,
}

impl ToolResponse {
    /// Response for a failed run
    pub fn failure(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
        }
    }

    /// Response for a provider API error
    pub fn provider_error(message: &str) -> Self {
        Self::failure(format!(
            "A Google API error occurred: {}. Please check logs for details.",
            message
        ))
    }

    /// Response for any other error
    pub fn unexpected_error() -> Self {
        Self::failure(UNEXPECTED_ERROR_ANSWER)
    }

    /// Response for a run that exceeded the invocation timeout
    pub fn timed_out(secs: u64) -> Self {
        Self::failure(format!(
            "The research agent did not finish within {} seconds. Please try again with a lower effort level.",
            secs
        ))
    }
}

impl From<AgentOutput> for ToolResponse {
    fn from(output: AgentOutput) -> Self {
        Self {
            answer: output.answer(),
            sources: output.sources_gathered,
        }
    }
}
