//! Utility modules shared by the agent client and the HTTP transport.
//!
//! - [`HttpClient`]: shared async client used to forward MCP traffic
//! - [`blocking_client`]: blocking client used for agent runs

mod http;

pub use http::{blocking_client, HttpClient, USER_AGENT};
