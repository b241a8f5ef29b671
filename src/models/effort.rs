//! Effort presets for the research agent.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fast model used for the low and medium tiers
pub const FLASH_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// Reasoning model used for the high tier
pub const PRO_MODEL: &str = "gemini-2.5-pro-preview-05-06";

/// How much work the research agent should put into a query
///
/// Controls the number of initial search queries, the number of
/// reflection loops, and which model the agent reasons with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    #[default]
    Low,
    Medium,
    High,
}

impl Effort {
    /// All effort levels, cheapest first
    pub const ALL: [Effort; 3] = [Effort::Low, Effort::Medium, Effort::High];

    /// Returns the wire name of the effort level
    pub fn as_str(&self) -> &'static str {
        match self {
            Effort::Low => "low",
            Effort::Medium => "medium",
            Effort::High => "high",
        }
    }

    /// Resolve the preset for this effort level
    pub fn settings(&self) -> EffortSettings {
        match self {
            Effort::Low => EffortSettings {
                initial_search_query_count: 1,
                max_research_loops: 1,
                reasoning_model: FLASH_MODEL,
            },
            Effort::Medium => EffortSettings {
                initial_search_query_count: 3,
                max_research_loops: 2,
                reasoning_model: FLASH_MODEL,
            },
            Effort::High => EffortSettings {
                initial_search_query_count: 5,
                max_research_loops: 3,
                reasoning_model: PRO_MODEL,
            },
        }
    }
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Effort {
    type Err = ParseEffortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Effort::Low),
            "medium" => Ok(Effort::Medium),
            "high" => Ok(Effort::High),
            other => Err(ParseEffortError(other.to_string())),
        }
    }
}

/// Error returned when an effort string is not one of the known levels
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown effort level '{0}' (expected one of: low, medium, high)")]
pub struct ParseEffortError(pub String);

/// Concrete agent parameters for one effort level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffortSettings {
    /// Number of search queries generated before the first research pass
    pub initial_search_query_count: u32,

    /// Upper bound on reflection / follow-up research loops
    pub max_research_loops: u32,

    /// Model the agent reasons with
    pub reasoning_model: &'static str,
}
