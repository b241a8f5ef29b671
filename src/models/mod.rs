//! Core data models for effort presets, agent state, and tool results.

mod effort;
mod response;
mod state;

pub use effort::{Effort, EffortSettings, ParseEffortError, FLASH_MODEL, PRO_MODEL};
pub use response::{ToolResponse, UNEXPECTED_ERROR_ANSWER};
pub use state::{
    AgentInputState, AgentOutput, Message, OutputMessage, RunConfiguration, NO_ANSWER,
};
