//! # Gemini DeepSearch MCP
//!
//! A Model Context Protocol (MCP) server exposing a single `deep_search` tool
//! backed by a LangGraph web research agent.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Effort presets, agent state and the tool response shape
//! - [`agent`]: The [`agent::ResearchAgent`] seam and its LangGraph client
//! - [`research`]: Input preparation and agent invocation (inline or worker pool)
//! - [`mcp`]: MCP protocol implementation, stdio server and HTTP mount
//! - [`utils`]: HTTP clients
//! - [`config`]: Configuration management

pub mod agent;
pub mod config;
pub mod mcp;
pub mod models;
pub mod research;
pub mod utils;

// Re-export commonly used types
pub use agent::{AgentError, ResearchAgent};
pub use models::{Effort, ToolResponse};
pub use research::AgentInvoker;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
